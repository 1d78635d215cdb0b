use serde_json::{Map, Value};

use super::types::{DeviceClass, UnitOfMeasurement};
use crate::conversion::format_state;
use crate::entry::ConfigEntry;

/// An entity publishing a numeric sensor reading
pub trait SensorEntity {
    fn unique_id(&self) -> &str;

    /// Display name
    fn name(&self) -> String;

    fn native_value(&self) -> f64;

    fn unit_of_measurement(&self) -> Option<UnitOfMeasurement> {
        None
    }

    fn device_class(&self) -> Option<DeviceClass> {
        None
    }

    fn icon(&self) -> Option<&str> {
        None
    }

    fn extra_state_attributes(&self) -> Map<String, Value> {
        Map::new()
    }

    fn entity_id(&self) -> String {
        format!("sensor.{}", self.unique_id())
    }

    /// State string as written to the state store
    fn state_string(&self) -> String {
        format_state(self.native_value())
    }

    /// Published attributes: entity specific ones plus unit, class, icon and name
    fn state_attributes(&self) -> Map<String, Value> {
        let mut attrs = self.extra_state_attributes();
        if let Some(unit) = self.unit_of_measurement() {
            attrs.insert("unit_of_measurement".into(), unit.as_ref().into());
        }
        if let Some(class) = self.device_class() {
            attrs.insert("device_class".into(), class.as_ref().into());
        }
        if let Some(icon) = self.icon() {
            attrs.insert("icon".into(), icon.into());
        }
        attrs.insert("friendly_name".into(), self.name().into());
        attrs
    }
}

/// An entity whose settings come from a shared config entry
pub trait ConfigBoundEntity {
    fn config_entry(&self) -> &ConfigEntry;

    fn config_entity_id(&self, key: &str) -> Option<String> {
        self.config_entry().get_entity_id(key)
    }
}
