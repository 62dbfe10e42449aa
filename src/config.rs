use std::env;

/// Connection settings for the Hue bridge.
///
/// Credentials are not validated here: a missing or wrong username surfaces
/// as a fetch failure on the first collection cycle, keeping startup
/// independent of bridge availability.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// IP address (or host:port) of the bridge.
    pub ip: String,
    /// API username/token issued by the bridge.
    pub username: String,
}

impl BridgeConfig {
    /// Load bridge settings from `HUE_ADDRESS` and `HUE_USERNAME`.
    pub fn from_env() -> Self {
        Self {
            ip: env::var("HUE_ADDRESS").unwrap_or_default(),
            username: env::var("HUE_USERNAME").unwrap_or_default(),
        }
    }
}
