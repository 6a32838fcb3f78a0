// src/checker/scripted.rs
// =============================================================================
// A deterministic Probe for tests. A closure decides what each attempt does
// from the identifier and the 1-based attempt number; nothing touches the
// network.
// =============================================================================

use super::probe::{Probe, ProbeOutcome};
use crate::error::ProbeError;
use crate::report::Reporter;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a scripted attempt does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Status(u16),
    Transient,
    Failed,
    Invalid,
    /// Never completes.
    Hang,
}

type Script = dyn Fn(&str, u32) -> Step + Send + Sync;

pub(crate) struct ScriptedProbe {
    script: Box<Script>,
    attempts: Mutex<HashMap<String, u32>>,
    reporter: Option<Arc<Reporter>>,
}

impl ScriptedProbe {
    /// Reported duration of every attempt.
    pub(crate) const ATTEMPT_TIME: Duration = Duration::from_millis(10);

    pub(crate) fn new(script: impl Fn(&str, u32) -> Step + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            attempts: Mutex::new(HashMap::new()),
            reporter: None,
        }
    }

    pub(crate) fn always(step: Step) -> Self {
        Self::new(move |_, _| step)
    }

    /// Routes status responses through a reporter, like the HTTP probe does.
    pub(crate) fn reporting_to(mut self, reporter: Arc<Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub(crate) fn attempts(&self, identifier: &str) -> u32 {
        self.attempts.lock().unwrap().get(identifier).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn probe(&self, identifier: &str) -> Result<ProbeOutcome, ProbeError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let count = attempts.entry(identifier.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        match (self.script)(identifier, attempt) {
            Step::Status(status) => {
                if let Some(reporter) = &self.reporter {
                    let url = format!("https://docs.example.com/{}", identifier);
                    reporter.result(identifier, &url, status);
                }
                Ok(ProbeOutcome::responded(status, Self::ATTEMPT_TIME))
            }
            Step::Transient => Ok(ProbeOutcome::transient(Self::ATTEMPT_TIME)),
            Step::Failed => Ok(ProbeOutcome::failed(Self::ATTEMPT_TIME)),
            Step::Invalid => Err(ProbeError::InvalidTarget {
                target: identifier.to_string(),
                reason: "scripted".to_string(),
            }),
            Step::Hang => std::future::pending().await,
        }
    }
}
