//! Integration-wide constants

pub const DOMAIN: &str = "hsem";
pub const ICON: &str = "mdi:flash";

/// Used when the "house power includes EV charger power" flag entity is not configured
pub const DEFAULT_HOUSE_POWER_INCLUDES_EV_CHARGER_POWER: bool = true;

pub const CONF_HOUSE_CONSUMPTION_POWER: &str = "hsem_house_consumption_power";
pub const CONF_EV_CHARGER_POWER: &str = "hsem_ev_charger_power";
pub const CONF_HOUSE_POWER_INCLUDES_EV_CHARGER_POWER: &str =
    "hsem_house_power_includes_ev_charger_power";

pub const STATE_UNKNOWN: &str = "unknown";
pub const STATE_UNAVAILABLE: &str = "unavailable";

pub const HOURS_PER_DAY: u32 = 24;
