//! Flight-controller session abstraction
//!
//! The wire protocol itself lives behind [`FlightController`]; mission control
//! only speaks in terms of these primitives.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use skydrop_core::Location;

use crate::error::LinkError;

/// Flight mode reported by or requested from the FCU
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum FlightMode {
    /// Autonomous mode accepting real-time navigation commands
    Guided,
    /// Automatic descent and disarm
    Land,
    /// Position hold
    Loiter,
    /// Return-to-launch failsafe
    Rtl,
    /// Manual stabilized flight
    Stabilize,
    /// Any other autopilot-specific mode
    Other(String),
}

impl FlightMode {
    /// Canonical upper-case mode name
    pub fn as_str(&self) -> &str {
        match self {
            FlightMode::Guided => "GUIDED",
            FlightMode::Land => "LAND",
            FlightMode::Loiter => "LOITER",
            FlightMode::Rtl => "RTL",
            FlightMode::Stabilize => "STABILIZE",
            FlightMode::Other(name) => name,
        }
    }
}

impl fmt::Display for FlightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for FlightMode {
    fn from(name: String) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "GUIDED" => FlightMode::Guided,
            "LAND" => FlightMode::Land,
            "LOITER" => FlightMode::Loiter,
            "RTL" => FlightMode::Rtl,
            "STABILIZE" => FlightMode::Stabilize,
            _ => FlightMode::Other(name),
        }
    }
}

impl From<FlightMode> for String {
    fn from(mode: FlightMode) -> Self {
        mode.as_str().to_string()
    }
}

/// Read-only telemetry snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    /// Current flight mode
    pub mode: FlightMode,
    /// Whether motors are armed
    pub armed: bool,
    /// Position in the relative-to-home frame, `None` without a fix
    pub position: Option<Location>,
    /// Battery level in percent, if reported
    pub battery: Option<f64>,
}

impl Telemetry {
    /// Relative altitude, zero without a position fix
    pub fn altitude(&self) -> f64 {
        self.position.map(|p| p.alt).unwrap_or(0.0)
    }
}

/// Live protocol session with one flight controller
///
/// Implementations must allow [`FlightController::telemetry`] to run
/// concurrently with a command in progress; status polling never takes the
/// per-link command lock.
#[async_trait]
pub trait FlightController: Send + Sync {
    /// Request a flight-mode change; acceptance is observed through telemetry
    async fn set_mode(&self, mode: FlightMode) -> Result<(), LinkError>;

    /// Request arming; confirmation is observed through telemetry
    async fn arm(&self) -> Result<(), LinkError>;

    /// Request disarming
    async fn disarm(&self) -> Result<(), LinkError>;

    /// Take off to the given relative altitude
    async fn takeoff(&self, altitude_m: f64) -> Result<(), LinkError>;

    /// Fly to a target, optionally at a commanded groundspeed
    async fn goto(&self, target: Location, groundspeed_mps: Option<f64>) -> Result<(), LinkError>;

    /// Drive a servo output to a PWM value
    async fn set_servo(&self, channel: u16, pwm: u16) -> Result<(), LinkError>;

    /// Lock the controller's home to the current position
    async fn set_home_here(&self) -> Result<(), LinkError>;

    /// Write a vehicle parameter
    async fn set_parameter(&self, name: &str, value: f32) -> Result<(), LinkError>;

    /// Read the current telemetry snapshot
    async fn telemetry(&self) -> Result<Telemetry, LinkError>;

    /// Take the STATUSTEXT messages received since the previous call
    fn drain_status_text(&self) -> Vec<String>;

    /// Close the session
    async fn close(&self);
}

/// Opens flight-controller sessions from connection descriptors
#[async_trait]
pub trait LinkConnector: Send + Sync {
    /// Establish a session; may block for a long time on real transports
    async fn connect(&self, descriptor: &str) -> Result<Arc<dyn FlightController>, LinkError>;
}
