//! The tick-driven scheduler that fans collection jobs out each cycle.

use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info_span, Instrument};

use crate::bridge::Bridge;
use crate::error::{ExporterError, Result};
use crate::metrics::{GaugeSink, PrometheusSink};

use super::jobs::{GroupsCollector, LightsCollector, SensorsCollector};
use super::CollectionJob;

/// Default pause between collection cycles.
pub const DEFAULT_TICK: Duration = Duration::from_secs(5);

/// Owns the job set and the ticking schedule.
///
/// The job list is fixed at construction; the loop runs every job
/// concurrently each tick and only ever exits through cancellation.
pub struct Gatherer {
    jobs: Vec<Arc<CollectionJob>>,
    interval: Duration,
    handle: PrometheusHandle,
}

impl std::fmt::Debug for Gatherer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gatherer")
            .field("jobs", &self.jobs.len())
            .field("interval", &self.interval)
            .finish()
    }
}

/// Validating constructor for [`Gatherer`].
pub struct GathererBuilder {
    interval: Duration,
    bridge: Option<Arc<Bridge>>,
    handle: Option<PrometheusHandle>,
    sink: Option<Arc<dyn GaugeSink>>,
}

impl GathererBuilder {
    pub fn new() -> Self {
        Self {
            interval: DEFAULT_TICK,
            bridge: None,
            handle: None,
            sink: None,
        }
    }

    /// Override the pause between cycles. Only effective before [`Gatherer::run`].
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_bridge(mut self, bridge: Bridge) -> Self {
        self.bridge = Some(Arc::new(bridge));
        self
    }

    /// Handle of the installed Prometheus recorder; backs the scrape facade.
    pub fn with_exporter(mut self, handle: PrometheusHandle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Substitute the gauge sink. Defaults to the Prometheus recorder sink.
    pub fn with_sink(mut self, sink: Arc<dyn GaugeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Validate required collaborators and assemble the job set.
    pub fn build(self) -> Result<Gatherer> {
        let bridge = self
            .bridge
            .ok_or_else(|| ExporterError::Config("no bridge client was supplied".to_string()))?;
        let handle = self
            .handle
            .ok_or_else(|| ExporterError::Config("no metrics exporter was supplied".to_string()))?;
        let sink = self.sink.unwrap_or_else(|| Arc::new(PrometheusSink));

        let jobs = vec![
            Arc::new(CollectionJob::new(
                Box::new(LightsCollector::new(Arc::clone(&bridge))),
                Arc::clone(&sink),
            )),
            Arc::new(CollectionJob::new(
                Box::new(GroupsCollector::new(Arc::clone(&bridge))),
                Arc::clone(&sink),
            )),
            Arc::new(CollectionJob::new(
                Box::new(SensorsCollector::new(bridge)),
                sink,
            )),
        ];

        Ok(Gatherer {
            jobs,
            interval: self.interval,
            handle,
        })
    }
}

impl Default for GathererBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Gatherer {
    /// Run collection cycles until the token is cancelled.
    ///
    /// Job failures are logged and never stop the loop; cancellation is the
    /// only exit, returned as [`ExporterError::Cancelled`]. A cycle's jobs
    /// all finish (or unwind) before the next cycle starts.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            let cycle = async {
                self.run_cycle(&cancel).await;

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        let err = ExporterError::Cancelled;
                        error!(error = %err, "context was cancelled");
                        Err(err)
                    }
                    _ = ticker.tick() => Ok(()),
                }
            };

            cycle.instrument(info_span!("gatherer_cycle")).await?;
        }
    }

    /// Launch every job concurrently and wait for all of them.
    ///
    /// The first failure is summarized here; each failing job has already
    /// logged its own error with detail.
    async fn run_cycle(&self, cancel: &CancellationToken) {
        let mut tasks = JoinSet::new();
        for job in &self.jobs {
            let job = Arc::clone(job);
            let cancel = cancel.clone();
            tasks.spawn(async move { job.collect(&cancel).await });
        }

        let mut first_failure = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    if first_failure.is_none() {
                        first_failure = Some(e);
                    }
                }
                Err(e) => error!(error = %e, "collection task aborted"),
            }
        }

        if let Some(e) = first_failure {
            error!(error = %e, "job failed to collect metrics");
        }
    }

    /// Prometheus text exposition of the current gauge values.
    ///
    /// Delegates to the exporter handle; performs no collection-loop logic.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{EntityCollector, Snapshot};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Instant;

    fn test_handle() -> PrometheusHandle {
        // A standalone recorder; nothing is installed globally, so every
        // test gets its own handle.
        PrometheusBuilder::new().build_recorder().handle()
    }

    struct CountingCollector {
        kind: &'static str,
        calls: Arc<AtomicUsize>,
        fail: bool,
        delay: Duration,
        active: AtomicUsize,
        overlapped: Arc<AtomicBool>,
    }

    impl CountingCollector {
        fn new(kind: &'static str, calls: Arc<AtomicUsize>, fail: bool) -> Self {
            Self {
                kind,
                calls,
                fail,
                delay: Duration::ZERO,
                active: AtomicUsize::new(0),
                overlapped: Arc::new(AtomicBool::new(false)),
            }
        }

        fn slow(kind: &'static str, delay: Duration, overlapped: Arc<AtomicBool>) -> Self {
            Self {
                kind,
                calls: Arc::new(AtomicUsize::new(0)),
                fail: false,
                delay,
                active: AtomicUsize::new(0),
                overlapped,
            }
        }
    }

    #[async_trait::async_trait]
    impl EntityCollector for CountingCollector {
        fn kind(&self) -> &'static str {
            self.kind
        }

        async fn snapshot(&self) -> Result<Snapshot> {
            if self.active.fetch_add(1, Ordering::SeqCst) > 0 {
                // A second concurrent invocation of the same strategy means
                // two cycles overlapped.
                self.overlapped.store(true, Ordering::SeqCst);
            }
            self.calls.fetch_add(1, Ordering::SeqCst);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.active.fetch_sub(1, Ordering::SeqCst);

            if self.fail {
                Err(ExporterError::Bridge {
                    kind: 3,
                    description: "resource not available".to_string(),
                })
            } else {
                Ok(Snapshot {
                    fetched: 0,
                    families: Vec::new(),
                })
            }
        }
    }

    fn gatherer_with(collectors: Vec<Box<dyn EntityCollector>>, interval: Duration) -> Gatherer {
        let sink: Arc<dyn GaugeSink> = Arc::new(PrometheusSink);
        let jobs = collectors
            .into_iter()
            .map(|collector| Arc::new(CollectionJob::new(collector, Arc::clone(&sink))))
            .collect();

        Gatherer {
            jobs,
            interval,
            handle: test_handle(),
        }
    }

    #[test]
    fn build_requires_a_bridge_client() {
        let err = GathererBuilder::new()
            .with_exporter(test_handle())
            .build()
            .unwrap_err();
        assert!(matches!(err, ExporterError::Config(_)));
    }

    #[test]
    fn build_requires_an_exporter_handle() {
        let err = GathererBuilder::new()
            .with_bridge(Bridge::new(&crate::config::BridgeConfig {
                ip: "127.0.0.1".to_string(),
                username: "nobody".to_string(),
            }))
            .build()
            .unwrap_err();
        assert!(matches!(err, ExporterError::Config(_)));
    }

    #[test]
    fn build_assembles_one_job_per_entity_kind() {
        let gatherer = GathererBuilder::new()
            .with_bridge(Bridge::new(&crate::config::BridgeConfig {
                ip: "127.0.0.1".to_string(),
                username: "nobody".to_string(),
            }))
            .with_exporter(test_handle())
            .build()
            .unwrap();

        let kinds: Vec<&str> = gatherer.jobs.iter().map(|j| j.kind()).collect();
        assert_eq!(kinds, vec!["lights", "groups", "sensors"]);
    }

    #[tokio::test]
    async fn job_failure_does_not_stop_the_loop() {
        let failing_calls = Arc::new(AtomicUsize::new(0));
        let healthy_calls = Arc::new(AtomicUsize::new(0));

        let gatherer = Arc::new(gatherer_with(
            vec![
                Box::new(CountingCollector::new("failing", failing_calls.clone(), true)),
                Box::new(CountingCollector::new("healthy", healthy_calls.clone(), false)),
            ],
            Duration::from_millis(10),
        ));

        let cancel = CancellationToken::new();
        let run = tokio::spawn({
            let gatherer = Arc::clone(&gatherer);
            let cancel = cancel.clone();
            async move { gatherer.run(cancel).await }
        });

        tokio::time::sleep(Duration::from_millis(60)).await;
        cancel.cancel();
        let result = run.await.unwrap();

        assert!(matches!(result, Err(ExporterError::Cancelled)));
        // Both jobs kept being scheduled after the first failed cycle.
        assert!(failing_calls.load(Ordering::SeqCst) >= 2);
        assert!(healthy_calls.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn cancellation_mid_cycle_returns_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let overlapped = Arc::new(AtomicBool::new(false));
        let mut slow =
            CountingCollector::slow("slow", Duration::from_secs(3600), overlapped);
        slow.calls = calls.clone();

        let gatherer = Arc::new(gatherer_with(
            vec![Box::new(slow)],
            Duration::from_millis(5),
        ));

        let cancel = CancellationToken::new();
        let run = tokio::spawn({
            let gatherer = Arc::clone(&gatherer);
            let cancel = cancel.clone();
            async move { gatherer.run(cancel).await }
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        let started = Instant::now();
        cancel.cancel();
        let result = run.await.unwrap();

        assert!(matches!(result, Err(ExporterError::Cancelled)));
        // The in-flight fetch unwound instead of running to completion.
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cycles_never_overlap() {
        let overlapped = Arc::new(AtomicBool::new(false));
        let gatherer = Arc::new(gatherer_with(
            vec![
                Box::new(CountingCollector::slow(
                    "slow-a",
                    Duration::from_millis(30),
                    overlapped.clone(),
                )),
                Box::new(CountingCollector::slow(
                    "slow-b",
                    Duration::from_millis(30),
                    overlapped.clone(),
                )),
            ],
            // Interval shorter than the job duration forces back-to-back
            // cycles.
            Duration::from_millis(5),
        ));

        let cancel = CancellationToken::new();
        let run = tokio::spawn({
            let gatherer = Arc::clone(&gatherer);
            let cancel = cancel.clone();
            async move { gatherer.run(cancel).await }
        });

        tokio::time::sleep(Duration::from_millis(150)).await;
        cancel.cancel();
        let _ = run.await.unwrap();

        assert!(!overlapped.load(Ordering::SeqCst));
    }
}
