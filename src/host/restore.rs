use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::state::EntityState;

/// Persistence of entity states across restarts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RestoreStateStore: Send + Sync {
    /// Last state saved for `entity_id`, if any
    async fn last_state(&self, entity_id: &str) -> Result<Option<EntityState>>;
    /// Save the given states, replacing older entries for the same entities
    async fn persist(&self, states: Vec<EntityState>) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredStates {
    saved_at: Option<DateTime<Utc>>,
    states: Vec<EntityState>,
}

/// Restore store backed by a JSON file, or memory only when no path is given
#[derive(Debug, Default)]
pub struct JsonRestoreStore {
    path: Option<PathBuf>,
    states: RwLock<HashMap<String, EntityState>>,
    // one snapshot-and-write at a time; they share the temp file
    writer: tokio::sync::Mutex<()>,
}

impl JsonRestoreStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn with_states(states: impl IntoIterator<Item = EntityState>) -> Self {
        let states = states
            .into_iter()
            .map(|s| (s.entity_id.clone(), s))
            .collect();
        Self {
            path: None,
            states: RwLock::new(states),
            writer: tokio::sync::Mutex::new(()),
        }
    }

    /// Load previously saved states from `path`.
    ///
    /// A missing file starts empty. A corrupt file is logged and ignored.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let stored = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<StoredStates>(&bytes) {
                Ok(stored) => stored,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ignoring unreadable restore file");
                    StoredStates::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no restore file yet");
                StoredStates::default()
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("reading restore file {}", path.display()))
            }
        };

        info!(
            path = %path.display(),
            count = stored.states.len(),
            "loaded restore states"
        );

        let store = Self::with_states(stored.states);
        Ok(Self {
            path: Some(path),
            ..store
        })
    }

    async fn write_file(&self, path: &Path) -> Result<()> {
        let mut states: Vec<EntityState> = self.states.read().values().cloned().collect();
        states.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        let stored = StoredStates {
            saved_at: Some(Utc::now()),
            states,
        };
        let bytes = serde_json::to_vec_pretty(&stored)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl RestoreStateStore for JsonRestoreStore {
    async fn last_state(&self, entity_id: &str) -> Result<Option<EntityState>> {
        Ok(self.states.read().get(entity_id).cloned())
    }

    async fn persist(&self, states: Vec<EntityState>) -> Result<()> {
        let count = states.len();
        let _writer = self.writer.lock().await;
        {
            let mut stored = self.states.write();
            for state in states {
                stored.insert(state.entity_id.clone(), state);
            }
        }

        if let Some(path) = &self.path {
            self.write_file(path).await?;
            debug!(path = %path.display(), count, "restore states saved");
        }
        Ok(())
    }
}
