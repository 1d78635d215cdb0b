use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::host::{Host, JsonRestoreStore, RestoreStateStore, SystemClock};
use crate::integration;
use crate::sensor::SensorRegistry;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub host: Host,
    pub sensors: Arc<SensorRegistry>,
}

impl AppState {
    pub async fn new(cfg: Config) -> Result<Self> {
        let restore: Arc<dyn RestoreStateStore> = match &cfg.restore.path {
            Some(path) => Arc::new(JsonRestoreStore::open(path).await?),
            None => {
                warn!("no restore path configured, sensor states will not survive a restart");
                Arc::new(JsonRestoreStore::in_memory())
            }
        };
        let host = Host::new(restore, Arc::new(SystemClock));
        Self::with_host(cfg, host).await
    }

    pub async fn with_host(cfg: Config, host: Host) -> Result<Self> {
        let sensors = integration::setup_entry(&host, Arc::new(cfg.entry.clone())).await?;
        Ok(Self {
            cfg,
            host,
            sensors: Arc::new(sensors),
        })
    }

    /// Detach the sensors and save their states
    pub async fn shutdown(&self) -> Result<()> {
        integration::unload_entry(&self.host, &self.sensors).await
    }
}

/// Handles of the background loops started by [`spawn_controller_tasks`]
#[derive(Debug)]
pub struct ControllerTasks {
    stop: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl ControllerTasks {
    /// Signal both loops to stop and wait for them.
    ///
    /// A save or poll already running completes first.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "controller task ended abnormally");
            }
        }
    }
}

pub fn spawn_controller_tasks(state: AppState, cfg: Config) -> ControllerTasks {
    let (stop, stopped) = watch::channel(false);

    let scan_interval = cfg.sensors.scan_interval_seconds;
    let poller = state.clone();
    let poll_stop = stopped.clone();
    let poll = tokio::spawn(async move {
        poll_loop(&poller, scan_interval, poll_stop).await;
    });

    let save_interval = cfg.restore.save_interval_seconds;
    let persist = tokio::spawn(async move {
        persist_loop(&state, save_interval, stopped).await;
    });

    ControllerTasks {
        stop,
        handles: vec![poll, persist],
    }
}

async fn poll_loop(state: &AppState, every_seconds: u64, mut stop: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(Duration::from_secs(every_seconds.max(1)));
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = stop.changed() => break,
        }
        state.sensors.refresh_all().await;
    }
    debug!("poll loop stopped");
}

async fn persist_loop(state: &AppState, every_seconds: u64, mut stop: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(Duration::from_secs(every_seconds.max(1)));
    // the first tick completes immediately
    interval.tick().await;
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = stop.changed() => break,
        }
        match integration::persist_states(&state.host, &state.sensors).await {
            Ok(()) => info!(sensors = state.sensors.len(), "sensor states saved"),
            Err(e) => warn!(error = %e, "saving sensor states failed"),
        }
    }
    debug!("persist loop stopped");
}
