//! Builds gauge observations from fetched bridge entities.
//!
//! Everything here is a pure function of its inputs: no I/O, no error
//! returns. An empty batch always yields a single zero-valued observation so
//! a scrape can distinguish "zero known" from "never collected".

use std::collections::HashMap;

use crate::bridge::{Group, Light, NewLights, Sensor};
use crate::metrics::MetricName;

/// A single gauge sample: value plus its label set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub value: i64,
    pub labels: Vec<(&'static str, String)>,
}

impl Observation {
    fn zero() -> Self {
        Self {
            value: 0,
            labels: Vec::new(),
        }
    }
}

/// All observations for one exported metric family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaugeFamily {
    pub name: MetricName,
    pub observations: Vec<Observation>,
}

/// Ephemeral mapping from light id to the name of its assigned group.
///
/// Rebuilt from the fetched groups every cycle and discarded with it. When a
/// light appears in several groups, the first group in fetch order wins.
#[derive(Debug, Default)]
pub struct GroupIndex {
    by_light: HashMap<u32, String>,
}

impl GroupIndex {
    pub fn new(groups: &[Group]) -> Self {
        let mut by_light = HashMap::new();
        for group in groups {
            for id in &group.lights {
                if let Ok(id) = id.parse::<u32>() {
                    by_light
                        .entry(id)
                        .or_insert_with(|| group.name.clone());
                }
            }
        }
        Self { by_light }
    }

    /// Name of the group the light is assigned to, if any.
    pub fn group_for(&self, light_id: u32) -> Option<&str> {
        self.by_light.get(&light_id).map(String::as_str)
    }
}

/// Presence observations for lights: one per light, value 1, labeled with
/// the on state, id, and resolved group name (empty when unassigned).
pub fn lights(lights: &[Light], groups: &GroupIndex) -> GaugeFamily {
    GaugeFamily {
        name: MetricName::Light,
        observations: light_observations(lights, groups, |_| 1),
    }
}

/// Brightness observations for lights, carrying the same labels as
/// [`lights`] with the brightness value in place of the constant 1.
pub fn light_brightness(lights: &[Light], groups: &GroupIndex) -> GaugeFamily {
    GaugeFamily {
        name: MetricName::LightBrightness,
        observations: light_observations(lights, groups, |light| i64::from(light.state.bri)),
    }
}

fn light_observations(
    lights: &[Light],
    groups: &GroupIndex,
    value: impl Fn(&Light) -> i64,
) -> Vec<Observation> {
    if lights.is_empty() {
        return vec![Observation::zero()];
    }

    lights
        .iter()
        .map(|light| {
            let assigned = groups.group_for(light.id).unwrap_or("").to_string();
            Observation {
                value: value(light),
                labels: vec![
                    ("on", light.state.on.to_string()),
                    ("id", light.id.to_string()),
                    ("group", assigned),
                ],
            }
        })
        .collect()
}

/// Presence observations for groups, labeled with the group's switch state,
/// id, brightness, and name.
pub fn groups(groups: &[Group]) -> GaugeFamily {
    let observations = if groups.is_empty() {
        vec![Observation::zero()]
    } else {
        groups
            .iter()
            .map(|group| Observation {
                value: 1,
                labels: vec![
                    ("on", group.action.on.to_string()),
                    ("id", group.id.to_string()),
                    ("bri", group.action.bri.to_string()),
                    ("name", group.name.clone()),
                ],
            })
            .collect()
    };

    GaugeFamily {
        name: MetricName::Group,
        observations,
    }
}

/// Presence observations for sensors, labeled with the sensor type and id.
pub fn sensors(sensors: &[Sensor]) -> GaugeFamily {
    let observations = if sensors.is_empty() {
        vec![Observation::zero()]
    } else {
        sensors
            .iter()
            .map(|sensor| Observation {
                value: 1,
                labels: vec![
                    ("type", sensor.kind.clone()),
                    ("id", sensor.id.to_string()),
                ],
            })
            .collect()
    };

    GaugeFamily {
        name: MetricName::Sensors,
        observations,
    }
}

/// Presence observations for newly discovered lights. The `last_scan` label
/// is carried on every observation, including the empty-batch zero.
pub fn new_lights(batch: &NewLights) -> GaugeFamily {
    let observations = if batch.names.is_empty() {
        vec![Observation {
            value: 0,
            labels: vec![("last_scan", batch.last_scan.clone())],
        }]
    } else {
        batch
            .names
            .iter()
            .map(|name| Observation {
                value: 1,
                labels: vec![
                    ("name", name.clone()),
                    ("last_scan", batch.last_scan.clone()),
                ],
            })
            .collect()
    };

    GaugeFamily {
        name: MetricName::NewLight,
        observations,
    }
}
