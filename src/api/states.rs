use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::error::ApiError;
use crate::{controller::AppState, host::EntityState};

const MAX_STATE_LENGTH: usize = 255;

#[derive(Debug, Deserialize)]
pub struct SetStateRequest {
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

/// GET /api/v1/states
pub async fn list_states(State(st): State<AppState>) -> Json<Vec<EntityState>> {
    Json(st.host.states.all())
}

/// GET /api/v1/states/:entity_id
pub async fn get_state(
    State(st): State<AppState>,
    Path(entity_id): Path<String>,
) -> Result<Json<EntityState>, ApiError> {
    st.host
        .states
        .get(&entity_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(entity_id))
}

/// POST /api/v1/states/:entity_id - Set a source state and notify listeners
pub async fn set_state(
    State(st): State<AppState>,
    Path(entity_id): Path<String>,
    Json(req): Json<SetStateRequest>,
) -> Result<(StatusCode, Json<EntityState>), ApiError> {
    validate_entity_id(&entity_id)?;
    if req.state.len() > MAX_STATE_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "state must be at most {MAX_STATE_LENGTH} characters"
        )));
    }

    let existed = st.host.states.get(&entity_id).is_some();
    st.host.states.set(&entity_id, req.state, req.attributes).await;

    let current = st
        .host
        .states
        .get(&entity_id)
        .ok_or_else(|| ApiError::InternalError(format!("{entity_id} vanished after write")))?;
    let status = if existed { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(current)))
}

fn validate_entity_id(entity_id: &str) -> Result<(), ApiError> {
    let valid = entity_id.split_once('.').is_some_and(|(domain, object_id)| {
        !domain.is_empty()
            && !object_id.is_empty()
            && entity_id
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '.')
    });
    if valid {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("invalid entity id: {entity_id}")))
    }
}
