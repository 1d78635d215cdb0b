//! Hour-block house consumption power sensors for the HSEM energy manager.
//!
//! One sensor per hour of the day captures the house power draw (optionally
//! excluding the EV charger) while that hour is current, and keeps the
//! reading for the rest of the day.

pub mod api;
pub mod config;
pub mod constants;
pub mod controller;
pub mod conversion;
pub mod domain;
pub mod entry;
pub mod error;
pub mod host;
pub mod integration;
pub mod sensor;
pub mod telemetry;
