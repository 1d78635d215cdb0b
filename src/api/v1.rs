use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};

use super::{sensors, states};
use crate::controller::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/states", get(states::list_states))
        .route(
            "/states/:entity_id",
            get(states::get_state).post(states::set_state),
        )
        .route("/sensors", get(sensors::list_sensors))
        .route("/sensors/:unique_id/refresh", post(sensors::refresh_sensor))
        .with_state(state)
}

pub async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}
