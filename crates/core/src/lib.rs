//! Core functionality for the skydrop mission-control system.
//!
//! This crate provides the geographic types, the injected mission
//! configuration and the logging setup shared by every other skydrop crate.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::{
    FlightConfig, MissionControlConfig, NavSpeedConfig, PayloadConfig, SafetyConfig,
};
pub use error::{ConfigError, Result};
pub use types::{BlockCoordinates, Location};
