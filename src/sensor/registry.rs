use std::sync::Arc;
use tracing::debug;

use super::{HouseConsumptionPowerSensor, UpdateOutcome};
use crate::domain::SensorEntity;
use crate::host::{EntityState, Host};

/// Sensors created for one config entry
#[derive(Debug, Default)]
pub struct SensorRegistry {
    sensors: Vec<Arc<HouseConsumptionPowerSensor>>,
}

impl SensorRegistry {
    pub fn new(sensors: Vec<Arc<HouseConsumptionPowerSensor>>) -> Self {
        Self { sensors }
    }

    pub fn get(&self, unique_id: &str) -> Option<Arc<HouseConsumptionPowerSensor>> {
        self.sensors
            .iter()
            .find(|s| s.unique_id() == unique_id)
            .cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<HouseConsumptionPowerSensor>> {
        self.sensors.iter()
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Poll every sensor once; returns how many wrote a new state
    pub async fn refresh_all(&self) -> usize {
        let mut written = 0;
        for sensor in &self.sensors {
            match sensor.refresh().await {
                UpdateOutcome::Updated(_) | UpdateOutcome::ParseFailed => written += 1,
                _ => {}
            }
        }
        debug!(written, "refreshed sensors");
        written
    }

    /// Currently published states of all sensors
    pub fn states(&self, host: &Host) -> Vec<EntityState> {
        self.sensors
            .iter()
            .filter_map(|s| host.states.get(&s.entity_id()))
            .collect()
    }

    /// Stop all sensors from tracking their sources
    pub fn unload(&self) -> usize {
        self.sensors.iter().filter(|s| s.detach()).count()
    }
}
