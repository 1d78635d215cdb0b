use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A configured instance of the integration: setup `data` plus user `options`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub entry_id: String,
    pub title: String,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub options: Map<String, Value>,
}

impl ConfigEntry {
    pub fn new(entry_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            title: title.into(),
            data: Map::new(),
            options: Map::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Look up a setting, preferring options over the original setup data.
    ///
    /// Null values and empty strings count as unset.
    pub fn get_config_value(&self, key: &str) -> Option<&Value> {
        self.options
            .get(key)
            .filter(|v| is_set(v))
            .or_else(|| self.data.get(key).filter(|v| is_set(v)))
    }

    /// Same as [`get_config_value`](Self::get_config_value) for settings holding an entity id
    pub fn get_entity_id(&self, key: &str) -> Option<String> {
        match self.get_config_value(key)? {
            Value::String(s) => Some(s.trim().to_string()),
            _ => None,
        }
    }
}

fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}
