use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::constants::HOURS_PER_DAY;
use crate::entry::ConfigEntry;
use crate::error::SensorError;
use crate::host::Host;
use crate::sensor::{HouseConsumptionPowerSensor, SensorRegistry};

/// `(start, end)` for every hour of the day; the last block wraps to 00
pub fn hour_blocks() -> impl Iterator<Item = (u32, u32)> {
    (0..HOURS_PER_DAY).map(|hour| (hour, (hour + 1) % HOURS_PER_DAY))
}

/// Create and attach one house consumption sensor per hour block
pub async fn setup_entry(
    host: &Host,
    entry: Arc<ConfigEntry>,
) -> Result<SensorRegistry, SensorError> {
    let mut sensors = Vec::with_capacity(HOURS_PER_DAY as usize);
    for (hour_start, hour_end) in hour_blocks() {
        let sensor = Arc::new(HouseConsumptionPowerSensor::new(
            entry.clone(),
            hour_start,
            hour_end,
        )?);
        sensor.attach(host).await?;
        sensors.push(sensor);
    }

    info!(
        entry_id = %entry.entry_id,
        sensors = sensors.len(),
        "house consumption sensors set up"
    );
    Ok(SensorRegistry::new(sensors))
}

/// Save the published sensor states so they survive a restart
pub async fn persist_states(host: &Host, registry: &SensorRegistry) -> Result<()> {
    host.restore
        .persist(registry.states(host))
        .await
        .context("persisting sensor states")
}

/// Detach every sensor and save their final states
pub async fn unload_entry(host: &Host, registry: &SensorRegistry) -> Result<()> {
    let detached = registry.unload();
    persist_states(host, registry).await?;
    info!(detached, "house consumption sensors unloaded");
    Ok(())
}
