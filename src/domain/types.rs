use serde::Serialize;
use strum::{AsRefStr, Display, EnumString};

/// Kind of quantity a sensor measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceClass {
    Power,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr, EnumString)]
pub enum UnitOfMeasurement {
    #[serde(rename = "W")]
    #[strum(serialize = "W")]
    Watt,
}

impl UnitOfMeasurement {
    /// Device class implied by the unit
    pub fn device_class(&self) -> DeviceClass {
        match self {
            UnitOfMeasurement::Watt => DeviceClass::Power,
        }
    }
}
