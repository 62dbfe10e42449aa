//! Per-entity-kind fetch strategies.

use std::sync::Arc;

use crate::bridge::Bridge;
use crate::error::Result;

use super::{observe, EntityCollector, Snapshot};

/// Lights strategy. Fetches groups first (for membership labels), then the
/// lights themselves, then the bridge's newly discovered lights; yields the
/// presence, brightness, and new-light families.
pub struct LightsCollector {
    bridge: Arc<Bridge>,
}

impl LightsCollector {
    pub fn new(bridge: Arc<Bridge>) -> Self {
        Self { bridge }
    }
}

#[async_trait::async_trait]
impl EntityCollector for LightsCollector {
    fn kind(&self) -> &'static str {
        "lights"
    }

    async fn snapshot(&self) -> Result<Snapshot> {
        let groups = self.bridge.groups().await?;
        let index = observe::GroupIndex::new(&groups);

        let lights = self.bridge.lights().await?;
        let new_lights = self.bridge.new_lights().await?;

        Ok(Snapshot {
            fetched: lights.len(),
            families: vec![
                observe::lights(&lights, &index),
                observe::light_brightness(&lights, &index),
                observe::new_lights(&new_lights),
            ],
        })
    }
}

/// Groups strategy.
pub struct GroupsCollector {
    bridge: Arc<Bridge>,
}

impl GroupsCollector {
    pub fn new(bridge: Arc<Bridge>) -> Self {
        Self { bridge }
    }
}

#[async_trait::async_trait]
impl EntityCollector for GroupsCollector {
    fn kind(&self) -> &'static str {
        "groups"
    }

    async fn snapshot(&self) -> Result<Snapshot> {
        let groups = self.bridge.groups().await?;

        Ok(Snapshot {
            fetched: groups.len(),
            families: vec![observe::groups(&groups)],
        })
    }
}

/// Sensors strategy.
pub struct SensorsCollector {
    bridge: Arc<Bridge>,
}

impl SensorsCollector {
    pub fn new(bridge: Arc<Bridge>) -> Self {
        Self { bridge }
    }
}

#[async_trait::async_trait]
impl EntityCollector for SensorsCollector {
    fn kind(&self) -> &'static str {
        "sensors"
    }

    async fn snapshot(&self) -> Result<Snapshot> {
        let sensors = self.bridge.sensors().await?;

        Ok(Snapshot {
            fetched: sensors.len(),
            families: vec![observe::sensors(&sensors)],
        })
    }
}
