use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use super::error::ApiError;
use crate::{
    controller::AppState,
    domain::{SensorEntity, UnitOfMeasurement},
    sensor::{HouseConsumptionPowerSensor, SourceEntities},
};

#[derive(Debug, Serialize)]
pub struct SensorSummary {
    pub unique_id: String,
    pub entity_id: String,
    pub name: String,
    pub hour_start: u32,
    pub hour_end: u32,
    pub state: f64,
    pub unit_of_measurement: Option<UnitOfMeasurement>,
    pub last_updated: Option<DateTime<FixedOffset>>,
    pub sources: SourceEntities,
}

impl From<&HouseConsumptionPowerSensor> for SensorSummary {
    fn from(sensor: &HouseConsumptionPowerSensor) -> Self {
        Self {
            unique_id: sensor.unique_id().to_string(),
            entity_id: sensor.entity_id(),
            name: sensor.name(),
            hour_start: sensor.hour_start(),
            hour_end: sensor.hour_end(),
            state: sensor.native_value(),
            unit_of_measurement: sensor.unit_of_measurement(),
            last_updated: sensor.last_updated(),
            sources: sensor.sources(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub outcome: String,
    pub sensor: SensorSummary,
}

/// GET /api/v1/sensors
pub async fn list_sensors(State(st): State<AppState>) -> Json<Vec<SensorSummary>> {
    Json(st.sensors.iter().map(|s| SensorSummary::from(&**s)).collect())
}

/// POST /api/v1/sensors/:unique_id/refresh - Manually trigger an update
pub async fn refresh_sensor(
    State(st): State<AppState>,
    Path(unique_id): Path<String>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let sensor = st
        .sensors
        .get(&unique_id)
        .ok_or_else(|| ApiError::NotFound(unique_id))?;

    let outcome = sensor.refresh().await;
    Ok(Json(RefreshResponse {
        outcome: outcome.as_ref().to_string(),
        sensor: SensorSummary::from(&*sensor),
    }))
}
