use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

pub type ListenerId = u64;

/// Current state of a single entity as held by the state store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    pub last_changed: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl EntityState {
    pub fn new(entity_id: impl Into<String>, state: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            entity_id: entity_id.into(),
            state: state.into(),
            attributes: Map::new(),
            last_changed: now,
            last_updated: now,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

/// Fired whenever a tracked entity changes state or attributes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateChangedEvent {
    pub entity_id: String,
    pub old_state: Option<EntityState>,
    pub new_state: Option<EntityState>,
}

/// Callback invoked by the [`StateStore`] for tracked entities
#[async_trait]
pub trait StateChangeListener: Send + Sync {
    async fn on_state_change(&self, event: &StateChangedEvent);
}

struct Subscription {
    id: ListenerId,
    listener: Arc<dyn StateChangeListener>,
}

/// In-memory entity state machine with change notification
#[derive(Default)]
pub struct StateStore {
    states: RwLock<HashMap<String, EntityState>>,
    listeners: RwLock<HashMap<String, Vec<Subscription>>>,
    next_listener_id: AtomicU64,
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("entities", &self.states.read().len())
            .field("tracked", &self.listeners.read().len())
            .finish()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, entity_id: &str) -> Option<EntityState> {
        self.states.read().get(entity_id).cloned()
    }

    /// All states, ordered by entity id
    pub fn all(&self) -> Vec<EntityState> {
        let mut states: Vec<EntityState> = self.states.read().values().cloned().collect();
        states.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        states
    }

    /// Set the state of an entity and notify its listeners.
    ///
    /// Returns the fired event, or `None` when neither state nor attributes
    /// changed (no event is fired in that case).
    pub async fn set(
        &self,
        entity_id: &str,
        state: impl Into<String>,
        attributes: Map<String, Value>,
    ) -> Option<StateChangedEvent> {
        let state = state.into();
        let event = {
            let mut states = self.states.write();
            let old_state = states.get(entity_id).cloned();

            if let Some(old) = &old_state {
                if old.state == state && old.attributes == attributes {
                    trace!(entity_id, "state unchanged, skipping event");
                    return None;
                }
            }

            let now = Utc::now();
            let last_changed = match &old_state {
                Some(old) if old.state == state => old.last_changed,
                _ => now,
            };
            let new_state = EntityState {
                entity_id: entity_id.to_string(),
                state,
                attributes,
                last_changed,
                last_updated: now,
            };
            states.insert(entity_id.to_string(), new_state.clone());

            StateChangedEvent {
                entity_id: entity_id.to_string(),
                old_state,
                new_state: Some(new_state),
            }
        };

        self.dispatch(&event).await;
        Some(event)
    }

    /// Register `listener` for state changes of every entity in `entity_ids`
    pub fn track_state_change(
        &self,
        entity_ids: &[String],
        listener: Arc<dyn StateChangeListener>,
    ) -> ListenerId {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let mut listeners = self.listeners.write();
        for entity_id in entity_ids {
            listeners
                .entry(entity_id.clone())
                .or_default()
                .push(Subscription {
                    id,
                    listener: listener.clone(),
                });
        }
        debug!(listener_id = id, ?entity_ids, "listener registered");
        id
    }

    /// Unregister a listener; returns false when the id was unknown
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let mut removed = false;
        for subs in listeners.values_mut() {
            let before = subs.len();
            subs.retain(|s| s.id != id);
            removed |= subs.len() != before;
        }
        listeners.retain(|_, subs| !subs.is_empty());
        removed
    }

    pub fn listener_count(&self, entity_id: &str) -> usize {
        self.listeners.read().get(entity_id).map_or(0, Vec::len)
    }

    async fn dispatch(&self, event: &StateChangedEvent) {
        let listeners: Vec<Arc<dyn StateChangeListener>> = self
            .listeners
            .read()
            .get(&event.entity_id)
            .map(|subs| subs.iter().map(|s| s.listener.clone()).collect())
            .unwrap_or_default();

        for listener in listeners {
            listener.on_state_change(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingListener {
        seen: Mutex<Vec<StateChangedEvent>>,
    }

    #[async_trait]
    impl StateChangeListener for RecordingListener {
        async fn on_state_change(&self, event: &StateChangedEvent) {
            self.seen.lock().push(event.clone());
        }
    }

    #[tokio::test]
    async fn test_set_and_get_state() {
        let store = StateStore::new();
        let event = store.set("sensor.house_power", "500", Map::new()).await;

        assert!(event.is_some());
        let state = store.get("sensor.house_power").unwrap();
        assert_eq!(state.state, "500");
        assert!(store.get("sensor.other").is_none());
    }

    #[tokio::test]
    async fn test_listener_receives_events_for_tracked_entities_only() {
        let store = StateStore::new();
        let listener = Arc::new(RecordingListener::default());
        store.track_state_change(&["sensor.house_power".to_string()], listener.clone());

        store.set("sensor.house_power", "500", Map::new()).await;
        store.set("sensor.unrelated", "1", Map::new()).await;

        let seen = listener.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].entity_id, "sensor.house_power");
        assert!(seen[0].old_state.is_none());
        assert_eq!(seen[0].new_state.as_ref().unwrap().state, "500");
    }

    #[tokio::test]
    async fn test_unchanged_write_fires_no_event() {
        let store = StateStore::new();
        let listener = Arc::new(RecordingListener::default());
        store.track_state_change(&["sensor.house_power".to_string()], listener.clone());

        store.set("sensor.house_power", "500", Map::new()).await;
        let second = store.set("sensor.house_power", "500", Map::new()).await;

        assert!(second.is_none());
        assert_eq!(listener.seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_last_changed_only_moves_with_state() {
        let store = StateStore::new();
        store.set("sensor.x", "1", Map::new()).await;
        let first = store.get("sensor.x").unwrap();

        let mut attrs = Map::new();
        attrs.insert("unit_of_measurement".to_string(), Value::from("W"));
        store.set("sensor.x", "1", attrs).await;
        let second = store.get("sensor.x").unwrap();

        assert_eq!(first.last_changed, second.last_changed);
        assert!(second.last_updated >= first.last_updated);
    }

    #[tokio::test]
    async fn test_remove_listener() {
        let store = StateStore::new();
        let listener = Arc::new(RecordingListener::default());
        let ids = vec!["sensor.a".to_string(), "sensor.b".to_string()];
        let id = store.track_state_change(&ids, listener.clone());
        assert_eq!(store.listener_count("sensor.a"), 1);

        assert!(store.remove_listener(id));
        assert!(!store.remove_listener(id));
        assert_eq!(store.listener_count("sensor.a"), 0);

        store.set("sensor.a", "1", Map::new()).await;
        assert!(listener.seen.lock().is_empty());
    }
}
