pub mod house_consumption_power;
pub mod registry;

pub use house_consumption_power::{
    compute_house_consumption, HouseConsumptionPowerSensor, SourceEntities, UpdateOutcome,
};
pub use registry::SensorRegistry;
