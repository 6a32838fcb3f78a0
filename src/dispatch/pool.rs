// src/dispatch/pool.rs
// =============================================================================
// The worker pool and the global deadline.
//
// How it works:
// 1. The identifier set becomes a stream
// 2. for_each_concurrent pulls from it while fewer than `limit` tasks run
//    (limit = None for the elastic pool, so everything starts at once)
// 3. Each pulled identifier is spawned onto the runtime as its own task:
//    retry policy first, then the aggregator update
// 4. The whole drive is wrapped in tokio::time::timeout
//
// When the deadline hits, the drive future is dropped. Identifiers still in
// the stream are never started; spawned tasks lose their JoinHandle, which
// detaches them rather than aborting them.
//
// Rust concepts:
// - Arc: Shared ownership of the policy, counters and reporter across tasks
// - Streams: for_each_concurrent bounds how many futures are polled at once
// - tokio::spawn: Runs each task on any worker thread of the runtime
// =============================================================================

use crate::checker::{Aggregator, Probe, RetryPolicy};
use crate::config::{Config, WorkerPool};
use crate::report::Reporter;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every task reached a terminal state before the deadline.
    Completed,
    /// The deadline passed with work still outstanding.
    TimedOut,
}

pub struct Dispatcher<P> {
    policy: Arc<RetryPolicy<P>>,
    aggregator: Arc<Aggregator>,
    reporter: Arc<Reporter>,
    pool: WorkerPool,
    timeout: Duration,
}

impl<P: Probe + 'static> Dispatcher<P> {
    pub fn new(
        probe: Arc<P>,
        config: &Config,
        aggregator: Arc<Aggregator>,
        reporter: Arc<Reporter>,
    ) -> Self {
        let policy = RetryPolicy::new(
            probe,
            config.max_retries,
            Arc::clone(&aggregator),
            Arc::clone(&reporter),
        );

        Self {
            policy: Arc::new(policy),
            aggregator,
            reporter,
            pool: config.pool,
            timeout: config.timeout,
        }
    }

    // Checks every identifier once, within the configured deadline
    //
    // Taking a HashSet guarantees no identifier is dispatched twice.
    pub async fn run(&self, identifiers: HashSet<String>) -> RunOutcome {
        info!(
            count = identifiers.len(),
            limit = ?self.pool.limit(),
            timeout = ?self.timeout,
            "Dispatching probes"
        );

        // None lets every identifier start at once (the elastic pool)
        let limit = self.pool.limit();

        // Turn the set into a stream and keep at most `limit` tasks in flight
        let drive = stream::iter(identifiers).for_each_concurrent(limit, |identifier| {
            // Clone the Arcs now so the task owns everything it touches
            let task = self.task(identifier);
            async move {
                // A panicking probe only takes its own identifier down
                if let Err(e) = tokio::spawn(task.run()).await {
                    error!(error = %e, "Probe task failed");
                }
            }
        });

        // Nothing runs until the drive future is awaited; the deadline covers all of it
        match tokio::time::timeout(self.timeout, drive).await {
            Ok(()) => {
                info!("All probes finished");
                RunOutcome::Completed
            }
            Err(_) => {
                // Dropping `drive` here cancels the queue, not the spawned tasks
                warn!(timeout = ?self.timeout, "Deadline passed with probes outstanding");
                RunOutcome::TimedOut
            }
        }
    }

    fn task(&self, identifier: String) -> Task<P> {
        Task {
            identifier,
            policy: Arc::clone(&self.policy),
            aggregator: Arc::clone(&self.aggregator),
            reporter: Arc::clone(&self.reporter),
        }
    }
}

// Everything one unit of work needs, owned so it can move into a spawned task
struct Task<P> {
    identifier: String,
    policy: Arc<RetryPolicy<P>>,
    aggregator: Arc<Aggregator>,
    reporter: Arc<Reporter>,
}

impl<P: Probe> Task<P> {
    async fn run(self) {
        match self.policy.execute(&self.identifier).await {
            // Terminal result: fold it into the run totals
            Ok(result) => {
                debug!(
                    identifier = %result.identifier,
                    terminal = ?result.terminal,
                    retries = result.retries,
                    elapsed = ?result.elapsed,
                    "Identifier finished"
                );
                self.aggregator.record(&result);
            }
            // The identifier couldn't be turned into a request at all
            Err(e) => {
                self.reporter.diagnostic(&e.to_string());
                self.aggregator.record_skipped();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::scripted::{ScriptedProbe, Step};
    use crate::checker::RunStatistics;
    use crate::report::tests::{captured, Captured};
    use crate::report::ReportOptions;

    struct Harness {
        dispatcher: Dispatcher<ScriptedProbe>,
        probe: Arc<ScriptedProbe>,
        aggregator: Arc<Aggregator>,
        out: Captured,
        err: Captured,
    }

    fn harness(probe: ScriptedProbe, config: Config) -> Harness {
        let (reporter, out, err) = captured(ReportOptions::from(&config));
        let reporter = Arc::new(reporter);
        let probe = Arc::new(probe.reporting_to(Arc::clone(&reporter)));
        let aggregator = Arc::new(Aggregator::default());
        let dispatcher =
            Dispatcher::new(Arc::clone(&probe), &config, Arc::clone(&aggregator), reporter);
        Harness { dispatcher, probe, aggregator, out, err }
    }

    fn ids(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    // ok-N succeed after N % 3 transient attempts, down-N never answer,
    // bad-N are invalid targets
    fn mixed_script(identifier: &str, attempt: u32) -> Step {
        let (kind, n) = identifier.split_once('-').unwrap();
        let n: u32 = n.parse().unwrap();
        match kind {
            "ok" if attempt > n % 3 => Step::Status(200),
            "ok" | "down" => Step::Transient,
            _ => Step::Invalid,
        }
    }

    fn mixed_ids() -> HashSet<String> {
        let mut set = HashSet::new();
        for n in 0..60 {
            set.insert(format!("ok-{}", n));
        }
        for n in 0..15 {
            set.insert(format!("down-{}", n));
        }
        for n in 0..5 {
            set.insert(format!("bad-{}", n));
        }
        set
    }

    async fn run_mixed(threads: usize) -> RunStatistics {
        let config = Config::new("https://docs.example.com/")
            .with_max_retries(2)
            .with_threads(threads);
        let h = harness(ScriptedProbe::new(mixed_script), config);
        assert_eq!(h.dispatcher.run(mixed_ids()).await, RunOutcome::Completed);
        h.aggregator.snapshot()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_totals_for_mixed_run() {
        let stats = run_mixed(8).await;

        // 60 ok + 15 down recorded, 5 invalid skipped
        assert_eq!(stats.successes + stats.failures, 75);
        assert_eq!(stats.successes, 60);
        assert_eq!(stats.failures, 15);
        assert_eq!(stats.skipped, 5);

        // ok-N uses N % 3 retries: 20 * (0 + 1 + 2)
        assert_eq!(stats.success_retries, 60);
        assert_eq!(stats.failure_retries, 15 * 2);

        // requests = sum over terminal results of (1 + retries)
        let expected = 75 + stats.success_retries + stats.failure_retries;
        assert_eq!(stats.requests, expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pool_size_does_not_change_totals() {
        let single = run_mixed(1).await;
        let fixed = run_mixed(4).await;
        let elastic = run_mixed(0).await;

        assert_eq!(single, fixed);
        assert_eq!(single, elastic);
    }

    #[tokio::test]
    async fn test_each_identifier_probed_once() {
        let config = Config::new("https://docs.example.com/").with_threads(2);
        let h = harness(ScriptedProbe::always(Step::Status(200)), config);

        let input = ids(&["a.pdf", "b.pdf", "a.pdf", "c.pdf", "b.pdf"]);
        assert_eq!(h.dispatcher.run(input).await, RunOutcome::Completed);
        for id in ["a.pdf", "b.pdf", "c.pdf"] {
            assert_eq!(h.probe.attempts(id), 1);
        }
        assert_eq!(h.aggregator.snapshot().requests, 3);
    }

    #[tokio::test]
    async fn test_all_success_prints_nothing() {
        let config = Config::new("https://docs.example.com/");
        let h = harness(ScriptedProbe::always(Step::Status(200)), config);

        h.dispatcher.run(ids(&["a.pdf", "b.pdf", "c.pdf"])).await;
        assert!(h.out.lines().is_empty());
        assert!(h.err.lines().is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_reported_once_each() {
        let config = Config::new("https://docs.example.com/");
        let probe = ScriptedProbe::new(|id, _| {
            if id.starts_with("missing") { Step::Status(404) } else { Step::Status(200) }
        });
        let h = harness(probe, config);

        h.dispatcher
            .run(ids(&["missing-1.pdf", "present.pdf", "missing-2.pdf"]))
            .await;

        let mut lines = h.out.lines();
        lines.sort();
        assert_eq!(lines, vec!["missing-1.pdf", "missing-2.pdf"]);
    }

    #[tokio::test]
    async fn test_verbose_list_reports_every_status() {
        let config = Config::new("https://docs.example.com/")
            .with_list(true)
            .with_verbose(true)
            .with_decode(true);
        let probe = ScriptedProbe::new(|id, _| {
            if id == "old%20spec.pdf" { Step::Status(410) } else { Step::Status(200) }
        });
        let h = harness(probe, config);

        h.dispatcher.run(ids(&["old%20spec.pdf", "new.pdf"])).await;

        let mut lines = h.out.lines();
        lines.sort();
        assert_eq!(
            lines,
            vec![
                "200\thttps://docs.example.com/new.pdf",
                "410\thttps://docs.example.com/old spec.pdf",
            ]
        );
    }

    #[tokio::test]
    async fn test_exhausted_identifier_logs_one_line() {
        let config = Config::new("https://docs.example.com/").with_max_retries(1);
        let h = harness(ScriptedProbe::always(Step::Transient), config);

        h.dispatcher.run(ids(&["down.pdf"])).await;

        assert_eq!(h.err.lines(), vec!["Retry limit exceeded for down.pdf"]);
        let stats = h.aggregator.snapshot();
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.failure_retries, 1);
    }

    #[tokio::test]
    async fn test_invalid_target_is_logged_and_skipped() {
        let config = Config::new("https://docs.example.com/");
        let probe = ScriptedProbe::new(|id, _| {
            if id == "bad" { Step::Invalid } else { Step::Status(200) }
        });
        let h = harness(probe, config);

        assert_eq!(h.dispatcher.run(ids(&["bad", "good.pdf"])).await, RunOutcome::Completed);

        let stats = h.aggregator.snapshot();
        assert_eq!(stats.successes, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.requests, 1);
        assert_eq!(h.err.lines(), vec!["invalid target 'bad': scripted"]);
    }

    #[tokio::test]
    async fn test_hanging_probe_times_out() {
        let config = Config::new("https://docs.example.com/")
            .with_timeout(Duration::from_millis(50));
        let probe = ScriptedProbe::new(|id, _| {
            if id == "stuck.pdf" { Step::Hang } else { Step::Status(200) }
        });
        let h = harness(probe, config);

        let outcome = h.dispatcher.run(ids(&["stuck.pdf", "fine.pdf"])).await;
        assert_eq!(outcome, RunOutcome::TimedOut);

        // Only the finished identifier made it into the statistics
        let stats = h.aggregator.snapshot();
        assert_eq!(stats.successes, 1);
        assert_eq!(stats.failures, 0);
    }

    #[tokio::test]
    async fn test_queued_work_never_starts_after_timeout() {
        let config = Config::new("https://docs.example.com/")
            .with_threads(1)
            .with_timeout(Duration::from_millis(50));
        let h = harness(ScriptedProbe::always(Step::Hang), config);

        let outcome = h.dispatcher.run(ids(&["a.pdf", "b.pdf", "c.pdf"])).await;
        assert_eq!(outcome, RunOutcome::TimedOut);

        let started: u32 = ["a.pdf", "b.pdf", "c.pdf"]
            .iter()
            .map(|id| h.probe.attempts(id))
            .sum();
        assert_eq!(started, 1);
    }

    #[tokio::test]
    async fn test_empty_set_completes() {
        let config = Config::new("https://docs.example.com/");
        let h = harness(ScriptedProbe::always(Step::Status(200)), config);
        assert_eq!(h.dispatcher.run(HashSet::new()).await, RunOutcome::Completed);
        assert_eq!(h.aggregator.snapshot(), RunStatistics::default());
    }
}
