use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Timelike};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};
use strum::AsRefStr;
use tracing::{debug, info, trace, warn};

use crate::constants::{
    CONF_EV_CHARGER_POWER, CONF_HOUSE_CONSUMPTION_POWER,
    CONF_HOUSE_POWER_INCLUDES_EV_CHARGER_POWER, DEFAULT_HOUSE_POWER_INCLUDES_EV_CHARGER_POWER,
    DOMAIN, HOURS_PER_DAY, ICON,
};
use crate::conversion::{convert_to_boolean, convert_to_float, is_readable};
use crate::domain::{ConfigBoundEntity, DeviceClass, SensorEntity, UnitOfMeasurement};
use crate::entry::ConfigEntry;
use crate::error::{ConversionError, SensorError};
use crate::host::{Host, ListenerId, StateChangeListener, StateChangedEvent};

/// Entity ids the sensor reads from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceEntities {
    pub house_consumption_power: Option<String>,
    pub ev_charger_power: Option<String>,
    pub house_power_includes_ev_charger_power: Option<String>,
}

impl SourceEntities {
    pub fn from_entity(entity: &impl ConfigBoundEntity) -> Self {
        Self {
            house_consumption_power: entity.config_entity_id(CONF_HOUSE_CONSUMPTION_POWER),
            ev_charger_power: entity.config_entity_id(CONF_EV_CHARGER_POWER),
            house_power_includes_ev_charger_power: entity
                .config_entity_id(CONF_HOUSE_POWER_INCLUDES_EV_CHARGER_POWER),
        }
    }

    /// Power sources whose changes trigger a recomputation
    pub fn tracked(&self) -> Vec<String> {
        let mut ids: Vec<String> = [&self.house_consumption_power, &self.ev_charger_power]
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        ids.dedup();
        ids
    }
}

/// Result of a single update attempt
#[derive(Debug, Clone, Copy, PartialEq, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum UpdateOutcome {
    NotAttached,
    OutsideHourBlock { current_hour: u32 },
    SourceUnavailable,
    Updated(f64),
    /// A source held a non-numeric value; the state was reset to 0.0
    ParseFailed,
}

#[derive(Debug, Default)]
struct SensorState {
    value: f64,
    last_updated: Option<DateTime<FixedOffset>>,
}

/// House power draw captured during one hour of the day.
///
/// The value is only refreshed while the wall-clock hour equals
/// `hour_start`; outside that hour the sensor keeps its last reading.
pub struct HouseConsumptionPowerSensor {
    entry: Arc<ConfigEntry>,
    hour_start: u32,
    hour_end: u32,
    unique_id: String,
    sources: RwLock<SourceEntities>,
    state: Mutex<SensorState>,
    host: OnceLock<Host>,
    listener: Mutex<Option<ListenerId>>,
}

impl std::fmt::Debug for HouseConsumptionPowerSensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HouseConsumptionPowerSensor")
            .field("unique_id", &self.unique_id)
            .field("sources", &*self.sources.read())
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl HouseConsumptionPowerSensor {
    pub fn new(
        entry: Arc<ConfigEntry>,
        hour_start: u32,
        hour_end: u32,
    ) -> Result<Self, SensorError> {
        for hour in [hour_start, hour_end] {
            if hour >= HOURS_PER_DAY {
                return Err(SensorError::InvalidHour(hour));
            }
        }

        let sensor = Self {
            unique_id: format!(
                "{DOMAIN}_house_consumption_power_{hour_start:02}_{hour_end:02}"
            ),
            entry,
            hour_start,
            hour_end,
            sources: RwLock::new(SourceEntities::default()),
            state: Mutex::new(SensorState::default()),
            host: OnceLock::new(),
            listener: Mutex::new(None),
        };
        sensor.update_settings();
        Ok(sensor)
    }

    /// Re-read the source entity ids from the config entry
    pub fn update_settings(&self) {
        *self.sources.write() = SourceEntities::from_entity(self);
    }

    pub fn hour_start(&self) -> u32 {
        self.hour_start
    }

    pub fn hour_end(&self) -> u32 {
        self.hour_end
    }

    pub fn sources(&self) -> SourceEntities {
        self.sources.read().clone()
    }

    pub fn last_updated(&self) -> Option<DateTime<FixedOffset>> {
        self.state.lock().last_updated
    }

    pub fn is_attached(&self) -> bool {
        self.host.get().is_some()
    }

    /// Bind the sensor to a running host.
    ///
    /// Restores the last persisted state, starts tracking the power sources
    /// and publishes the initial state.
    pub async fn attach(self: &Arc<Self>, host: &Host) -> Result<(), SensorError> {
        self.host
            .set(host.clone())
            .map_err(|_| SensorError::AlreadyAttached(self.unique_id.clone()))?;

        self.restore_state(host).await;

        let tracked = self.sources.read().tracked();
        if tracked.is_empty() {
            warn!(unique_id = %self.unique_id, "no power sources configured, nothing to track");
        } else {
            for entity_id in &tracked {
                info!(unique_id = %self.unique_id, %entity_id, "starting to track state changes");
            }
            let listener: Arc<dyn StateChangeListener> = self.clone();
            let id = host.states.track_state_change(&tracked, listener);
            *self.listener.lock() = Some(id);
        }

        self.write_state(host).await;
        Ok(())
    }

    /// Stop tracking the power sources; returns false when nothing was tracked
    pub fn detach(&self) -> bool {
        let (Some(host), Some(id)) = (self.host.get(), self.listener.lock().take()) else {
            return false;
        };
        host.states.remove_listener(id)
    }

    async fn restore_state(&self, host: &Host) {
        let entity_id = self.entity_id();
        let restored = match host.restore.last_state(&entity_id).await {
            Ok(restored) => restored,
            Err(e) => {
                warn!(%entity_id, error = %e, "failed to load restore state");
                None
            }
        };

        let mut state = self.state.lock();
        match restored {
            Some(old) => {
                state.value = convert_to_float(&old.state).unwrap_or_else(|e| {
                    warn!(%entity_id, error = %e, "restored state is not numeric, using 0.0");
                    0.0
                });
                state.last_updated = old
                    .attribute_str("last_updated")
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok());
                debug!(%entity_id, value = state.value, "state restored");
            }
            None => {
                state.value = 0.0;
                state.last_updated = None;
            }
        }
    }

    /// Manually trigger an update
    pub async fn refresh(&self) -> UpdateOutcome {
        self.handle_update(None).await
    }

    /// Recompute the state from the current source values.
    ///
    /// Only acts while the wall-clock hour equals `hour_start`.
    pub async fn handle_update(&self, trigger: Option<&StateChangedEvent>) -> UpdateOutcome {
        let Some(host) = self.host.get() else {
            return UpdateOutcome::NotAttached;
        };

        let now = host.clock.now();
        if now.hour() != self.hour_start {
            trace!(
                unique_id = %self.unique_id,
                current_hour = now.hour(),
                "outside hour block, ignoring update"
            );
            return UpdateOutcome::OutsideHourBlock {
                current_hour: now.hour(),
            };
        }

        let sources = self.sources();
        let read = |id: &Option<String>| {
            id.as_deref()
                .and_then(|id| host.states.get(id))
                .map(|s| s.state)
                .filter(|s| is_readable(s))
        };

        let Some(house_power) = read(&sources.house_consumption_power) else {
            debug!(
                unique_id = %self.unique_id,
                source = ?sources.house_consumption_power,
                "house consumption power unavailable, skipping"
            );
            return UpdateOutcome::SourceUnavailable;
        };
        let includes_ev = read(&sources.house_power_includes_ev_charger_power);
        let ev_power = read(&sources.ev_charger_power);

        let outcome = match compute_house_consumption(
            &house_power,
            includes_ev.as_deref(),
            ev_power.as_deref(),
        ) {
            Ok(value) => UpdateOutcome::Updated(value),
            Err(e) => {
                warn!(
                    unique_id = %self.unique_id,
                    error = %e,
                    house_power = %house_power,
                    ev_power = ?ev_power,
                    "could not parse power reading, resetting state to 0.0"
                );
                UpdateOutcome::ParseFailed
            }
        };

        {
            let mut state = self.state.lock();
            state.value = match outcome {
                UpdateOutcome::Updated(value) => value,
                _ => 0.0,
            };
            state.last_updated = Some(now);
        }

        debug!(
            unique_id = %self.unique_id,
            trigger = trigger.map(|e| e.entity_id.as_str()),
            value = self.native_value(),
            "updated state"
        );
        self.write_state(host).await;
        outcome
    }

    async fn write_state(&self, host: &Host) {
        host.states
            .set(&self.entity_id(), self.state_string(), self.state_attributes())
            .await;
    }
}

/// `house - ev` when house power includes the EV charger draw, else `house`.
///
/// A missing flag falls back to the integration default; a missing EV
/// reading counts as 0 W.
pub fn compute_house_consumption(
    house_power: &str,
    includes_ev_charger_power: Option<&str>,
    ev_charger_power: Option<&str>,
) -> Result<f64, ConversionError> {
    let house = convert_to_float(house_power)?;
    let includes_ev = includes_ev_charger_power
        .map_or(DEFAULT_HOUSE_POWER_INCLUDES_EV_CHARGER_POWER, convert_to_boolean);
    let ev = ev_charger_power.map(convert_to_float).transpose()?.unwrap_or(0.0);

    Ok(if includes_ev { house - ev } else { house })
}

impl SensorEntity for HouseConsumptionPowerSensor {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn name(&self) -> String {
        format!(
            "House Consumption {:02}-{:02} Power",
            self.hour_start, self.hour_end
        )
    }

    fn native_value(&self) -> f64 {
        self.state.lock().value
    }

    fn unit_of_measurement(&self) -> Option<UnitOfMeasurement> {
        Some(UnitOfMeasurement::Watt)
    }

    fn device_class(&self) -> Option<DeviceClass> {
        self.unit_of_measurement().map(|u| u.device_class())
    }

    fn icon(&self) -> Option<&str> {
        Some(ICON)
    }

    fn extra_state_attributes(&self) -> Map<String, Value> {
        let sources = self.sources();
        let mut attrs = Map::new();
        attrs.insert(
            "house_consumption_power_entity".into(),
            sources.house_consumption_power.into(),
        );
        attrs.insert(
            "ev_charger_power_entity".into(),
            sources.ev_charger_power.into(),
        );
        attrs.insert(
            "house_power_includes_ev_charger_power_entity".into(),
            sources.house_power_includes_ev_charger_power.into(),
        );
        attrs.insert("hour_start".into(), self.hour_start.into());
        attrs.insert("hour_end".into(), self.hour_end.into());
        attrs.insert(
            "last_updated".into(),
            self.last_updated().map(|t| t.to_rfc3339()).into(),
        );
        attrs.insert("unique_id".into(), self.unique_id.clone().into());
        attrs
    }
}

impl ConfigBoundEntity for HouseConsumptionPowerSensor {
    fn config_entry(&self) -> &ConfigEntry {
        &self.entry
    }
}

#[async_trait]
impl StateChangeListener for HouseConsumptionPowerSensor {
    async fn on_state_change(&self, event: &StateChangedEvent) {
        self.handle_update(Some(event)).await;
    }
}
