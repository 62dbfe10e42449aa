//! Exported metric families and the gauge publication seam.
//!
//! Every family exposed by the exporter is named here; the enum eliminates
//! magic strings and keeps the scrape surface reviewable in one place.

use std::fmt;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::collector::observe::GaugeFamily;
use crate::error::{ExporterError, Result};

/// Enum representing all metric families exported for bridge state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    /// Presence of each known light.
    Light,
    /// Brightness (0-255) of each known light.
    LightBrightness,
    /// Lights discovered by the last search but not yet configured.
    NewLight,
    /// Presence of each configured group.
    Group,
    /// Presence of each registered sensor.
    Sensors,
}

impl MetricName {
    /// Get the metric name as it appears in the exposition
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::Light => "hue_light",
            MetricName::LightBrightness => "hue_light_brightness",
            MetricName::NewLight => "hue_new_light",
            MetricName::Group => "hue_group",
            MetricName::Sensors => "hue_sensors",
        }
    }

    /// HELP text registered for the family
    pub fn help(&self) -> &'static str {
        match self {
            MetricName::Light => {
                "Number of lights in the current state. Includes brightness, identifier, and on state."
            }
            MetricName::LightBrightness => "Brightness of lights.",
            MetricName::NewLight => "Number of new lights.",
            MetricName::Group => {
                "Number of groups in the current state. Includes brightness, identifier, and on state."
            }
            MetricName::Sensors => "Number of sensors in the current state.",
        }
    }

    /// All exported families
    pub fn all() -> impl Iterator<Item = MetricName> {
        [
            MetricName::Light,
            MetricName::LightBrightness,
            MetricName::NewLight,
            MetricName::Group,
            MetricName::Sensors,
        ]
        .into_iter()
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Install the Prometheus recorder and return the handle that backs the
/// scrape facade. Must run before the first gauge is recorded; failures are
/// fatal to startup.
pub fn install() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        ExporterError::Config(format!("failed to install Prometheus recorder: {e}"))
    })?;

    describe_metrics();

    Ok(handle)
}

/// Attach HELP text to every exported family.
fn describe_metrics() {
    use metrics::describe_gauge;

    for name in MetricName::all() {
        describe_gauge!(name.as_str(), name.help());
    }
}

/// Destination for gauge observations.
///
/// Production publishes to the installed Prometheus recorder; tests
/// substitute capturing or failing sinks to drive the job error paths.
pub trait GaugeSink: Send + Sync {
    /// Publish every observation of a family, replacing previous values for
    /// the same label sets.
    fn record(&self, family: &GaugeFamily) -> Result<()>;
}

/// Sink backed by the globally installed Prometheus recorder.
pub struct PrometheusSink;

impl GaugeSink for PrometheusSink {
    fn record(&self, family: &GaugeFamily) -> Result<()> {
        for observation in &family.observations {
            ::metrics::gauge!(family.name.as_str(), &observation.labels)
                .set(observation.value as f64);
        }
        Ok(())
    }
}
