//! One live connection to one drone

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};
use tracing::{debug, info, warn};

use skydrop_core::Location;

use crate::controller::{FlightController, FlightMode, LinkConnector, Telemetry};
use crate::diagnostics::DiagnosticLog;
use crate::error::LinkError;

/// Status snapshot published to operators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DroneStatus {
    /// Whether motors are armed
    pub armed: bool,
    /// Flight mode name, `UNKNOWN` when telemetry failed
    pub mode: String,
    /// Relative altitude in meters
    pub altitude: f64,
    /// Connection descriptor of the link
    pub connection_string: String,
    /// Battery level in percent
    pub battery: Option<f64>,
    /// Current position
    pub location: Option<Location>,
}

/// Live connection handle for one drone
pub struct VehicleLink {
    descriptor: String,
    controller: Arc<dyn FlightController>,
    command_lock: AsyncMutex<()>,
    diagnostics: Mutex<DiagnosticLog>,
    mission_home: Mutex<Option<Location>>,
    connected: AtomicBool,
}

impl std::fmt::Debug for VehicleLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VehicleLink")
            .field("descriptor", &self.descriptor)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl VehicleLink {
    /// Wrap an already-open controller session
    pub fn new(descriptor: impl Into<String>, controller: Arc<dyn FlightController>) -> Self {
        Self {
            descriptor: descriptor.into(),
            controller,
            command_lock: AsyncMutex::new(()),
            diagnostics: Mutex::new(DiagnosticLog::default()),
            mission_home: Mutex::new(None),
            connected: AtomicBool::new(true),
        }
    }

    /// Connect through `connector` and apply the one-time parameter writes.
    ///
    /// Parameter failures are logged; only the connection itself can fail.
    pub async fn establish(
        connector: &dyn LinkConnector,
        descriptor: &str,
        parameters: &[(&'static str, f32)],
    ) -> Result<Self, LinkError> {
        info!(descriptor, "connecting to flight controller");
        let controller = connector.connect(descriptor).await?;

        for (name, value) in parameters {
            if let Err(e) = controller.set_parameter(name, *value).await {
                warn!(descriptor, parameter = name, "failed to set parameter: {}", e);
            }
        }

        info!(descriptor, "flight controller connected");
        Ok(Self::new(descriptor, controller))
    }

    /// Connection descriptor this link was created from
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Whether the link has not been closed
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Acquire the command lock, waiting for any sequence in progress
    pub async fn commands(&self) -> CommandGuard<'_> {
        let guard = self.command_lock.lock().await;
        CommandGuard {
            link: self,
            _guard: guard,
        }
    }

    /// Acquire the command lock only if it is free
    pub fn try_commands(&self) -> Option<CommandGuard<'_>> {
        self.command_lock.try_lock().ok().map(|guard| CommandGuard {
            link: self,
            _guard: guard,
        })
    }

    /// Read telemetry without taking the command lock
    pub async fn telemetry(&self) -> Result<Telemetry, LinkError> {
        self.ensure_connected()?;
        let telemetry = self.controller.telemetry().await;
        self.collect_diagnostics();
        telemetry
    }

    /// Operator-facing status; a failed read degrades to an `UNKNOWN` status
    pub async fn status(&self) -> DroneStatus {
        match self.telemetry().await {
            Ok(t) => DroneStatus {
                armed: t.armed,
                mode: t.mode.to_string(),
                altitude: t.altitude(),
                connection_string: self.descriptor.clone(),
                battery: t.battery,
                location: t.position,
            },
            Err(e) => {
                warn!(descriptor = %self.descriptor, "error getting drone status: {}", e);
                DroneStatus {
                    armed: false,
                    mode: "UNKNOWN".to_string(),
                    altitude: 0.0,
                    connection_string: self.descriptor.clone(),
                    battery: None,
                    location: None,
                }
            }
        }
    }

    /// The last `n` diagnostic messages received from the FCU
    pub fn recent_diagnostics(&self, n: usize) -> Vec<String> {
        self.collect_diagnostics();
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recent(n)
    }

    /// Home saved at the start of the most recent outbound leg
    pub fn mission_home(&self) -> Option<Location> {
        *self
            .mission_home
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Close the session; in-flight and later commands fail with `Disconnected`
    pub async fn close(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!(descriptor = %self.descriptor, "closing connection");
            self.controller.close().await;
        }
    }

    fn ensure_connected(&self) -> Result<(), LinkError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(LinkError::Disconnected(self.descriptor.clone()))
        }
    }

    fn collect_diagnostics(&self) {
        let fresh = self.controller.drain_status_text();
        if fresh.is_empty() {
            return;
        }
        let mut log = self
            .diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for text in fresh {
            debug!(descriptor = %self.descriptor, "STATUSTEXT: {}", text);
            log.push(text);
        }
    }
}

/// Proof of holding a link's command lock
///
/// Every flight-affecting operation is only reachable through this guard.
pub struct CommandGuard<'a> {
    link: &'a VehicleLink,
    _guard: MutexGuard<'a, ()>,
}

impl<'a> CommandGuard<'a> {
    /// The guarded link
    pub fn link(&self) -> &'a VehicleLink {
        self.link
    }

    /// Request a flight mode
    pub async fn set_mode(&self, mode: FlightMode) -> Result<(), LinkError> {
        self.link.ensure_connected()?;
        debug!(descriptor = %self.link.descriptor, %mode, "set mode");
        self.link.controller.set_mode(mode).await
    }

    /// Request arming
    pub async fn arm(&self) -> Result<(), LinkError> {
        self.link.ensure_connected()?;
        debug!(descriptor = %self.link.descriptor, "arm");
        self.link.controller.arm().await
    }

    /// Request disarming
    pub async fn disarm(&self) -> Result<(), LinkError> {
        self.link.ensure_connected()?;
        debug!(descriptor = %self.link.descriptor, "disarm");
        self.link.controller.disarm().await
    }

    /// Take off to a relative altitude
    pub async fn takeoff(&self, altitude_m: f64) -> Result<(), LinkError> {
        self.link.ensure_connected()?;
        debug!(descriptor = %self.link.descriptor, altitude_m, "takeoff");
        self.link.controller.takeoff(altitude_m).await
    }

    /// Fly to a target
    pub async fn goto(&self, target: Location, groundspeed_mps: Option<f64>) -> Result<(), LinkError> {
        self.link.ensure_connected()?;
        debug!(
            descriptor = %self.link.descriptor,
            lat = target.lat,
            lon = target.lon,
            alt = target.alt,
            "goto"
        );
        self.link.controller.goto(target, groundspeed_mps).await
    }

    /// Drive a servo output
    pub async fn set_servo(&self, channel: u16, pwm: u16) -> Result<(), LinkError> {
        self.link.ensure_connected()?;
        debug!(descriptor = %self.link.descriptor, channel, pwm, "set servo");
        self.link.controller.set_servo(channel, pwm).await
    }

    /// Lock the controller home to the current position
    pub async fn set_home_here(&self) -> Result<(), LinkError> {
        self.link.ensure_connected()?;
        debug!(descriptor = %self.link.descriptor, "lock home");
        self.link.controller.set_home_here().await
    }

    /// Cache the mission home for this link
    pub fn record_mission_home(&self, home: Location) {
        info!(
            descriptor = %self.link.descriptor,
            lat = home.lat,
            lon = home.lon,
            "mission home saved"
        );
        *self
            .link
            .mission_home
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(home);
    }
}
