//! Typed client for the Hue bridge REST API.
//!
//! The bridge speaks JSON over plain HTTP and keys most collections by
//! numeric id (`{"1": {...}, "2": {...}}`). Application-level failures such
//! as an unauthorized user come back as a 200 response whose body is an
//! array of error objects; those are surfaced as [`ExporterError::Bridge`].

mod types;

pub use types::{Group, GroupAction, Light, LightState, NewLights, Sensor};

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::BridgeConfig;
use crate::error::{ExporterError, Result};

pub struct Bridge {
    client: reqwest::Client,
    base: String,
}

impl Bridge {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: format!("http://{}/api/{}", config.ip, config.username),
        }
    }

    /// Fetch all lights, ordered by numeric id.
    pub async fn lights(&self) -> Result<Vec<Light>> {
        let map: BTreeMap<String, Light> = self.get("lights").await?;
        Ok(types::collect_keyed(map))
    }

    /// Fetch all groups, ordered by numeric id.
    pub async fn groups(&self) -> Result<Vec<Group>> {
        let map: BTreeMap<String, Group> = self.get("groups").await?;
        Ok(types::collect_keyed(map))
    }

    /// Fetch all sensors, ordered by numeric id.
    pub async fn sensors(&self) -> Result<Vec<Sensor>> {
        let map: BTreeMap<String, Sensor> = self.get("sensors").await?;
        Ok(types::collect_keyed(map))
    }

    /// Fetch the result of the bridge's last search for new lights.
    pub async fn new_lights(&self) -> Result<NewLights> {
        let wire: types::NewLightsWire = self.get("lights/new").await?;
        Ok(wire.into())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{}", self.base, path);
        let payload: Value = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = api_error(&payload) {
            return Err(err);
        }

        Ok(serde_json::from_value(payload)?)
    }
}

/// Extract the first in-band error from a bridge response, if any.
fn api_error(payload: &Value) -> Option<ExporterError> {
    let entries = payload.as_array()?;
    entries.iter().find_map(|entry| {
        let error = entry.get("error")?;
        Some(ExporterError::Bridge {
            kind: error.get("type").and_then(Value::as_u64).unwrap_or(0) as u32,
            description: error
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("unknown bridge error")
                .to_string(),
        })
    })
}
