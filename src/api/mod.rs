pub mod error;
pub mod sensors;
pub mod states;
pub mod v1;

use axum::Router;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{config::Config, controller::AppState};

pub fn router(state: AppState, cfg: &Config) -> Router {
    Router::new()
        .nest("/api/v1", v1::router(state))
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(64 * 1024))
                .layer(TimeoutLayer::new(Duration::from_secs(cfg.server.request_timeout_secs))),
        )
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RestoreConfig, SensorsConfig, ServerConfig};
    use crate::constants::{CONF_EV_CHARGER_POWER, CONF_HOUSE_CONSUMPTION_POWER};
    use crate::domain::SensorEntity;
    use crate::entry::ConfigEntry;
    use crate::host::{FixedClock, Host, JsonRestoreStore};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use chrono::{FixedOffset, TimeZone};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                request_timeout_secs: 5,
            },
            sensors: SensorsConfig {
                scan_interval_seconds: 30,
            },
            restore: RestoreConfig {
                path: None,
                save_interval_seconds: 900,
            },
            entry: ConfigEntry::new("hsem", "HSEM")
                .with_data(CONF_HOUSE_CONSUMPTION_POWER, "sensor.house_power")
                .with_data(CONF_EV_CHARGER_POWER, "sensor.ev_power"),
        }
    }

    async fn test_app() -> (Router, AppState) {
        let cfg = test_config();
        let clock = FixedClock::new(
            FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2024, 5, 1, 18, 5, 0)
                .unwrap(),
        );
        let host = Host::new(Arc::new(JsonRestoreStore::in_memory()), Arc::new(clock));
        let state = AppState::with_host(cfg.clone(), host).await.unwrap();
        (router(state.clone(), &cfg), state)
    }

    async fn json_body(resp: axum::response::Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_healthz() {
        let (app, _) = test_app().await;
        let resp = app
            .oneshot(Request::get("/api/v1/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_list_sensors() {
        let (app, _) = test_app().await;
        let resp = app
            .oneshot(Request::get("/api/v1/sensors").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = json_body(resp).await;
        let sensors = body.as_array().unwrap();
        assert_eq!(sensors.len(), 24);
        assert_eq!(sensors[18]["unique_id"], "hsem_house_consumption_power_18_19");
        assert_eq!(sensors[18]["unit_of_measurement"], "W");
    }

    #[tokio::test]
    async fn test_posting_source_state_updates_current_hour_sensor() {
        let (app, state) = test_app().await;

        let resp = app
            .clone()
            .oneshot(post_json("/api/v1/states/sensor.ev_power", json!({"state": "120"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = app
            .clone()
            .oneshot(post_json(
                "/api/v1/states/sensor.house_power",
                json!({"state": "500", "attributes": {"unit_of_measurement": "W"}}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = app
            .oneshot(
                Request::get("/api/v1/states/sensor.hsem_house_consumption_power_18_19")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["state"], "380.0");

        let other = state.sensors.get("hsem_house_consumption_power_17_18").unwrap();
        assert_eq!(other.native_value(), 0.0);
    }

    #[tokio::test]
    async fn test_refresh_endpoint() {
        let (app, state) = test_app().await;
        state.host.states.set("sensor.house_power", "250", Default::default()).await;

        let resp = app
            .clone()
            .oneshot(post_json(
                "/api/v1/sensors/hsem_house_consumption_power_09_10/refresh",
                json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["outcome"], "outside_hour_block");

        let resp = app
            .oneshot(post_json(
                "/api/v1/sensors/hsem_house_consumption_power_18_19/refresh",
                json!({}),
            ))
            .await
            .unwrap();
        let body = json_body(resp).await;
        assert_eq!(body["outcome"], "updated");
        assert_eq!(body["sensor"]["state"], 250.0);
    }

    #[tokio::test]
    async fn test_unknown_entities() {
        let (app, _) = test_app().await;
        let resp = app
            .clone()
            .oneshot(Request::get("/api/v1/states/sensor.nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(resp).await["error"], "NotFound");

        let resp = app
            .clone()
            .oneshot(post_json("/api/v1/sensors/nope/refresh", json!({})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = app
            .oneshot(post_json("/api/v1/states/Not-An-Entity", json!({"state": "1"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
