//! Scheduled collection of bridge state into gauge metrics.
//!
//! A [`Gatherer`] drives a fixed-interval loop; each tick it fans out one
//! [`CollectionJob`] per entity kind. Jobs fetch through a per-kind
//! [`EntityCollector`] strategy and publish the resulting gauge families
//! through the shared sink.

pub mod gatherer;
pub mod jobs;
pub mod observe;

pub use gatherer::{Gatherer, GathererBuilder};

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument};

use crate::error::{ExporterError, Result};
use crate::metrics::GaugeSink;
use observe::GaugeFamily;

/// Complete result of one job's fetch pass.
///
/// Produced only after every fetch the job performs has succeeded, so a
/// failed cycle publishes nothing rather than a partial snapshot.
pub struct Snapshot {
    /// Number of entities of the job's own kind that were fetched.
    pub fetched: usize,
    /// Gauge families ready for publication.
    pub families: Vec<GaugeFamily>,
}

/// Fetch-and-record strategy for one entity kind.
#[async_trait::async_trait]
pub trait EntityCollector: Send + Sync {
    /// Entity kind, used for span and log fields.
    fn kind(&self) -> &'static str;

    /// Fetch the current state from the bridge and build its gauge families.
    async fn snapshot(&self) -> Result<Snapshot>;
}

/// One schedulable collection job.
///
/// Wraps a strategy with tracing, logging, cancellation, and gauge
/// publication. The same job value is reused across cycles and holds no
/// per-cycle state.
pub struct CollectionJob {
    collector: Box<dyn EntityCollector>,
    sink: Arc<dyn GaugeSink>,
}

impl CollectionJob {
    pub fn new(collector: Box<dyn EntityCollector>, sink: Arc<dyn GaugeSink>) -> Self {
        Self { collector, sink }
    }

    pub fn kind(&self) -> &'static str {
        self.collector.kind()
    }

    /// Run one fetch+publish pass.
    ///
    /// The fetch is raced against the cancellation token so a cancelled
    /// cycle abandons in-flight requests. A sink failure aborts the pass
    /// before any remaining family is attempted.
    pub async fn collect(&self, cancel: &CancellationToken) -> Result<()> {
        let span = info_span!("collect", kind = self.kind());
        async {
            let snapshot = tokio::select! {
                _ = cancel.cancelled() => Err(ExporterError::Cancelled),
                snapshot = self.collector.snapshot() => snapshot,
            }
            .map_err(|e| {
                error!(error = %e, "failed to fetch from bridge");
                e
            })?;

            info!(count = snapshot.fetched, "collected entities");

            for family in &snapshot.families {
                if let Err(e) = self.sink.record(family) {
                    let wrapped = ExporterError::record(family.name.as_str(), e);
                    error!(error = %wrapped, "failed to record gauge family");
                    return Err(wrapped);
                }
            }

            Ok(())
        }
        .instrument(span)
        .await
    }
}
