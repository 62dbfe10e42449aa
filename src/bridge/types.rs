use serde::Deserialize;
use std::collections::BTreeMap;

/// On/off switch and brightness of a single light.
#[derive(Debug, Clone, Deserialize)]
pub struct LightState {
    pub on: bool,
    #[serde(default)]
    pub bri: u8,
}

/// A light as reported by the bridge, tagged with its numeric identifier.
///
/// The wire format keys lights by id (`{"1": {...}}`); the id is filled in
/// from the key after decoding.
#[derive(Debug, Clone, Deserialize)]
pub struct Light {
    #[serde(skip)]
    pub id: u32,
    pub name: String,
    pub state: LightState,
}

/// The last action applied to a group. Carries the on/off switch and
/// brightness values the exporter labels groups with.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupAction {
    #[serde(default)]
    pub on: bool,
    #[serde(default)]
    pub bri: u8,
}

/// A group of lights (room, zone) as reported by the bridge.
#[derive(Debug, Clone, Deserialize)]
pub struct Group {
    #[serde(skip)]
    pub id: u32,
    pub name: String,
    /// Ids of the member lights, as the bridge reports them (strings).
    #[serde(default)]
    pub lights: Vec<String>,
    #[serde(default)]
    pub action: GroupAction,
}

/// A sensor as reported by the bridge.
#[derive(Debug, Clone, Deserialize)]
pub struct Sensor {
    #[serde(skip)]
    pub id: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Devices found by the bridge's last search that are not yet configured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewLights {
    pub last_scan: String,
    pub names: Vec<String>,
}

/// Wire shape of `/lights/new`: a `lastscan` timestamp next to id-keyed
/// entries for each discovered light.
#[derive(Debug, Deserialize)]
pub(crate) struct NewLightsWire {
    #[serde(default)]
    lastscan: String,
    #[serde(flatten)]
    lights: BTreeMap<String, NewLightEntry>,
}

#[derive(Debug, Deserialize)]
struct NewLightEntry {
    name: String,
}

impl From<NewLightsWire> for NewLights {
    fn from(wire: NewLightsWire) -> Self {
        let mut entries: Vec<(u32, String)> = wire
            .lights
            .into_iter()
            .filter_map(|(key, entry)| Some((key.parse().ok()?, entry.name)))
            .collect();
        entries.sort_by_key(|(id, _)| *id);

        NewLights {
            last_scan: wire.lastscan,
            names: entries.into_iter().map(|(_, name)| name).collect(),
        }
    }
}

/// Entities decoded from an id-keyed object adopt the key as their id.
pub(crate) trait Identified {
    fn set_id(&mut self, id: u32);
}

impl Identified for Light {
    fn set_id(&mut self, id: u32) {
        self.id = id;
    }
}

impl Identified for Group {
    fn set_id(&mut self, id: u32) {
        self.id = id;
    }
}

impl Identified for Sensor {
    fn set_id(&mut self, id: u32) {
        self.id = id;
    }
}

/// Flatten an id-keyed object into a vector ordered by numeric id.
/// Entries whose key is not numeric are dropped.
pub(crate) fn collect_keyed<T: Identified>(map: BTreeMap<String, T>) -> Vec<T> {
    let mut entries: Vec<(u32, T)> = map
        .into_iter()
        .filter_map(|(key, mut value)| {
            let id: u32 = key.parse().ok()?;
            value.set_id(id);
            Some((id, value))
        })
        .collect();
    entries.sort_by_key(|(id, _)| *id);
    entries.into_iter().map(|(_, value)| value).collect()
}
