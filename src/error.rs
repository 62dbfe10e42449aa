use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bridge API error {kind}: {description}")]
    Bridge { kind: u32, description: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to collect {family}: {source}")]
    Record {
        family: &'static str,
        #[source]
        source: Box<ExporterError>,
    },

    #[error("collection was cancelled")]
    Cancelled,
}

impl ExporterError {
    /// Wrap an error with the metric family whose publication failed.
    pub fn record(family: &'static str, source: ExporterError) -> Self {
        ExporterError::Record {
            family,
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExporterError>;
