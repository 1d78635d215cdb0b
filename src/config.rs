use anyhow::{Context, Result};
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use validator::Validate;

use crate::entry::ConfigEntry;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(nested)]
    pub sensors: SensorsConfig,
    #[validate(nested)]
    pub restore: RestoreConfig,
    pub entry: ConfigEntry,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[validate(range(min = 1, max = 300))]
    pub request_timeout_secs: u64,
}
impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SensorsConfig {
    /// How often every sensor is polled with a manual refresh
    #[validate(range(min = 1, max = 3600))]
    pub scan_interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RestoreConfig {
    /// JSON file holding states across restarts; memory only when unset
    pub path: Option<PathBuf>,
    #[validate(range(min = 1))]
    pub save_interval_seconds: u64,
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("HSEM__").split("__"));
        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let cfg: Self = figment.extract().context("loading configuration")?;
        cfg.validate().context("validating configuration")?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [server]
        host = "127.0.0.1"
        port = 8080
        request_timeout_secs = 30

        [sensors]
        scan_interval_seconds = 30

        [restore]
        save_interval_seconds = 900

        [entry]
        entry_id = "hsem"
        title = "HSEM"

        [entry.data]
        hsem_house_consumption_power = "sensor.house_power"
    "#;

    #[test]
    fn test_parse_sample_config() {
        let cfg = Config::from_figment(Figment::from(Toml::string(SAMPLE))).unwrap();
        assert_eq!(cfg.server.socket_addr().unwrap().port(), 8080);
        assert!(cfg.restore.path.is_none());
        assert_eq!(
            cfg.entry.get_entity_id("hsem_house_consumption_power").as_deref(),
            Some("sensor.house_power")
        );
        assert!(cfg.entry.options.is_empty());
    }

    #[test]
    fn test_rejects_zero_scan_interval() {
        let figment = Figment::from(Toml::string(SAMPLE))
            .merge(("sensors.scan_interval_seconds", 0));
        assert!(Config::from_figment(figment).is_err());
    }
}
