//! Simulated flight controller
//!
//! A kinematic stand-in for a real autopilot, addressed with `sim://<name>`
//! descriptors. Motion is integrated against `tokio::time`, so paused-clock
//! tests advance it deterministically. Every command is recorded, and the
//! number of commands in flight at once is tracked to detect interleaving.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use skydrop_core::Location;

use crate::controller::{FlightController, FlightMode, LinkConnector, Telemetry};
use crate::error::LinkError;

/// Descriptor scheme understood by [`SimConnector`]
pub const SIM_SCHEME: &str = "sim://";

/// Behaviour of a simulated vehicle
#[derive(Debug, Clone)]
pub struct SimProfile {
    /// Initial ground position
    pub start: Location,
    /// Horizontal speed in degrees per second
    pub horizontal_speed_dps: f64,
    /// Climb rate in m/s
    pub climb_rate_mps: f64,
    /// Descent rate in m/s
    pub descent_rate_mps: f64,
    /// Delay before a requested mode takes effect
    pub mode_accept_delay: Duration,
    /// Modes the controller refuses outright
    pub rejected_modes: Vec<FlightMode>,
    /// Delay before an arm request takes effect
    pub arm_delay: Duration,
    /// Whether touching down in LAND disarms automatically
    pub auto_disarm_on_land: bool,
    /// Number of initial goto commands silently dropped
    pub ignored_gotos: usize,
    /// Whether servo commands fail
    pub fail_servo: bool,
    /// Time each command spends in flight
    pub command_latency: Duration,
    /// Reported battery level
    pub battery: Option<f64>,
    /// Whether a position fix is reported
    pub gps_fix: bool,
}

impl Default for SimProfile {
    fn default() -> Self {
        Self {
            start: Location::new(16.463000, 80.507800, 0.0),
            horizontal_speed_dps: 0.0002,
            climb_rate_mps: 10.0,
            descent_rate_mps: 5.0,
            mode_accept_delay: Duration::ZERO,
            rejected_modes: Vec::new(),
            arm_delay: Duration::ZERO,
            auto_disarm_on_land: true,
            ignored_gotos: 0,
            fail_servo: false,
            command_latency: Duration::ZERO,
            battery: Some(100.0),
            gps_fix: true,
        }
    }
}

/// Command observed by a simulated vehicle
#[derive(Debug, Clone, PartialEq)]
pub enum SimCommand {
    /// Mode change request
    SetMode(FlightMode),
    /// Arm request
    Arm,
    /// Disarm request
    Disarm,
    /// Takeoff to altitude
    Takeoff(f64),
    /// Goto target with optional groundspeed
    Goto(Location, Option<f64>),
    /// Servo output
    Servo {
        /// Servo channel
        channel: u16,
        /// PWM value
        pwm: u16,
    },
    /// Home locked to current position
    SetHome,
    /// Parameter write
    SetParameter(String, f32),
}

#[derive(Debug)]
struct SimState {
    position: Location,
    mode: FlightMode,
    armed: bool,
    pending_mode: Option<(FlightMode, Instant)>,
    pending_arm: Option<Instant>,
    takeoff_target: Option<f64>,
    nav_target: Option<Location>,
    ignored_gotos: usize,
    last_update: Instant,
    status_text: Vec<String>,
    commands: Vec<SimCommand>,
}

/// Simulated vehicle implementing [`FlightController`]
#[derive(Debug)]
pub struct SimulatedVehicle {
    name: String,
    profile: SimProfile,
    state: Mutex<SimState>,
    closed: AtomicBool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SimulatedVehicle {
    /// Create a vehicle on the ground, disarmed, in STABILIZE
    pub fn new(name: impl Into<String>, profile: SimProfile) -> Self {
        let state = SimState {
            position: profile.start,
            mode: FlightMode::Stabilize,
            armed: false,
            pending_mode: None,
            pending_arm: None,
            takeoff_target: None,
            nav_target: None,
            ignored_gotos: profile.ignored_gotos,
            last_update: Instant::now(),
            status_text: Vec::new(),
            commands: Vec::new(),
        };
        Self {
            name: name.into(),
            profile,
            state: Mutex::new(state),
            closed: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Every command received so far, in order
    pub fn commands(&self) -> Vec<SimCommand> {
        self.lock().commands.clone()
    }

    /// Count of received commands matching a predicate
    pub fn count_commands(&self, predicate: impl Fn(&SimCommand) -> bool) -> usize {
        self.lock().commands.iter().filter(|c| predicate(c)).count()
    }

    /// Highest number of commands observed executing at the same time
    pub fn max_concurrent_commands(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Whether the session was closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Current simulated position
    pub fn position(&self) -> Location {
        let mut state = self.lock();
        self.advance(&mut state);
        state.position
    }

    /// Force a mode change from the vehicle side, as a failsafe would
    pub fn inject_mode(&self, mode: FlightMode) {
        let mut state = self.lock();
        self.advance(&mut state);
        state.status_text.push(format!("Mode changed to {}", mode));
        Self::switch_mode(&mut state, mode);
    }

    /// Queue a STATUSTEXT message
    pub fn push_status_text(&self, text: impl Into<String>) {
        self.lock().status_text.push(text.into());
    }

    /// Drop the session from the vehicle side
    pub fn disconnect(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn switch_mode(state: &mut SimState, mode: FlightMode) {
        if state.mode != mode {
            state.mode = mode;
            state.nav_target = None;
            state.takeoff_target = None;
        }
    }

    fn advance(&self, state: &mut SimState) {
        let now = Instant::now();
        let dt = now.saturating_duration_since(state.last_update).as_secs_f64();
        state.last_update = now;

        if let Some((mode, at)) = state.pending_mode.clone() {
            if now >= at {
                state.pending_mode = None;
                Self::switch_mode(state, mode);
            }
        }
        if let Some(at) = state.pending_arm {
            if now >= at {
                state.pending_arm = None;
                state.armed = true;
                state.status_text.push("Arming motors".to_string());
            }
        }

        if !state.armed || dt <= 0.0 {
            return;
        }

        match state.mode {
            FlightMode::Guided => {
                if let Some(target) = state.nav_target {
                    let distance = state.position.planar_distance(&target);
                    let step = self.profile.horizontal_speed_dps * dt;
                    if distance <= step {
                        state.position.lat = target.lat;
                        state.position.lon = target.lon;
                    } else {
                        let fraction = step / distance;
                        state.position.lat += (target.lat - state.position.lat) * fraction;
                        state.position.lon += (target.lon - state.position.lon) * fraction;
                    }
                    state.position.alt = self.approach(state.position.alt, target.alt, dt);
                } else if let Some(altitude) = state.takeoff_target {
                    state.position.alt = self.approach(state.position.alt, altitude, dt);
                }
            }
            FlightMode::Land => {
                state.position.alt =
                    (state.position.alt - self.profile.descent_rate_mps * dt).max(0.0);
                if state.position.alt <= 0.0 && self.profile.auto_disarm_on_land {
                    state.armed = false;
                    state.status_text.push("Disarming motors".to_string());
                }
            }
            _ => {}
        }
    }

    fn approach(&self, current: f64, target: f64, dt: f64) -> f64 {
        if target > current {
            (current + self.profile.climb_rate_mps * dt).min(target)
        } else {
            (current - self.profile.descent_rate_mps * dt).max(target)
        }
    }

    async fn command<T>(
        &self,
        command: SimCommand,
        apply: impl FnOnce(&mut SimState) -> Result<T, LinkError>,
    ) -> Result<T, LinkError> {
        if self.is_closed() {
            return Err(LinkError::Disconnected(self.name.clone()));
        }

        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        if self.profile.command_latency.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.profile.command_latency).await;
        }

        let result = {
            let mut state = self.lock();
            self.advance(&mut state);
            state.commands.push(command);
            apply(&mut state)
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.is_closed() {
            return Err(LinkError::Disconnected(self.name.clone()));
        }
        result
    }
}

#[async_trait]
impl FlightController for SimulatedVehicle {
    async fn set_mode(&self, mode: FlightMode) -> Result<(), LinkError> {
        let rejected = self.profile.rejected_modes.contains(&mode);
        let delay = self.profile.mode_accept_delay;
        self.command(SimCommand::SetMode(mode.clone()), move |state| {
            if rejected {
                state.status_text.push(format!("Flight mode change failed: {}", mode));
                return Err(LinkError::ModeRejected {
                    mode: mode.to_string(),
                    reason: "not allowed by controller".to_string(),
                });
            }
            if delay.is_zero() {
                state.pending_mode = None;
                Self::switch_mode(state, mode);
            } else {
                state.pending_mode = Some((mode, Instant::now() + delay));
            }
            Ok(())
        })
        .await
    }

    async fn arm(&self) -> Result<(), LinkError> {
        let delay = self.profile.arm_delay;
        self.command(SimCommand::Arm, move |state| {
            if state.armed {
                return Ok(());
            }
            if matches!(state.mode, FlightMode::Land | FlightMode::Rtl) {
                state.status_text.push("Arm: Mode not armable".to_string());
                return Ok(());
            }
            if delay.is_zero() {
                state.armed = true;
                state.status_text.push("Arming motors".to_string());
            } else {
                state.pending_arm = Some(Instant::now() + delay);
            }
            Ok(())
        })
        .await
    }

    async fn disarm(&self) -> Result<(), LinkError> {
        self.command(SimCommand::Disarm, |state| {
            state.armed = false;
            state.pending_arm = None;
            state.nav_target = None;
            state.takeoff_target = None;
            state.status_text.push("Disarming motors".to_string());
            Ok(())
        })
        .await
    }

    async fn takeoff(&self, altitude_m: f64) -> Result<(), LinkError> {
        self.command(SimCommand::Takeoff(altitude_m), move |state| {
            if !state.armed || state.mode != FlightMode::Guided {
                return Err(LinkError::CommandFailed {
                    command: "takeoff".to_string(),
                    reason: "vehicle not armed in GUIDED".to_string(),
                });
            }
            state.nav_target = None;
            state.takeoff_target = Some(altitude_m);
            Ok(())
        })
        .await
    }

    async fn goto(&self, target: Location, groundspeed_mps: Option<f64>) -> Result<(), LinkError> {
        self.command(SimCommand::Goto(target, groundspeed_mps), move |state| {
            if state.ignored_gotos > 0 {
                state.ignored_gotos -= 1;
                return Ok(());
            }
            if state.armed && state.mode == FlightMode::Guided {
                state.takeoff_target = None;
                state.nav_target = Some(target);
            }
            Ok(())
        })
        .await
    }

    async fn set_servo(&self, channel: u16, pwm: u16) -> Result<(), LinkError> {
        let fail = self.profile.fail_servo;
        self.command(SimCommand::Servo { channel, pwm }, move |_| {
            if fail {
                Err(LinkError::CommandFailed {
                    command: "servo".to_string(),
                    reason: format!("no response on channel {}", channel),
                })
            } else {
                Ok(())
            }
        })
        .await
    }

    async fn set_home_here(&self) -> Result<(), LinkError> {
        self.command(SimCommand::SetHome, |_| Ok(())).await
    }

    async fn set_parameter(&self, name: &str, value: f32) -> Result<(), LinkError> {
        self.command(SimCommand::SetParameter(name.to_string(), value), |_| Ok(()))
            .await
    }

    async fn telemetry(&self) -> Result<Telemetry, LinkError> {
        if self.is_closed() {
            return Err(LinkError::Disconnected(self.name.clone()));
        }
        let mut state = self.lock();
        self.advance(&mut state);
        Ok(Telemetry {
            mode: state.mode.clone(),
            armed: state.armed,
            position: self.profile.gps_fix.then_some(state.position),
            battery: self.profile.battery,
        })
    }

    fn drain_status_text(&self) -> Vec<String> {
        std::mem::take(&mut self.lock().status_text)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Connector for `sim://` descriptors
///
/// Each successful connect creates a fresh vehicle; the latest vehicle per
/// descriptor stays reachable through [`SimConnector::vehicle`].
#[derive(Debug, Default)]
pub struct SimConnector {
    default_profile: SimProfile,
    profiles: Mutex<HashMap<String, SimProfile>>,
    refused: Mutex<HashSet<String>>,
    vehicles: Mutex<HashMap<String, Arc<SimulatedVehicle>>>,
}

impl SimConnector {
    /// Connector using `profile` for every descriptor
    pub fn new(profile: SimProfile) -> Self {
        Self {
            default_profile: profile,
            ..Self::default()
        }
    }

    /// Use a dedicated profile for one descriptor
    pub fn set_profile(&self, descriptor: &str, profile: SimProfile) {
        self.profiles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(descriptor.to_string(), profile);
    }

    /// Make connection attempts to `descriptor` fail
    pub fn refuse(&self, descriptor: &str) {
        self.refused
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(descriptor.to_string());
    }

    /// Most recent vehicle created for `descriptor`
    pub fn vehicle(&self, descriptor: &str) -> Option<Arc<SimulatedVehicle>> {
        self.vehicles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(descriptor)
            .cloned()
    }
}

#[async_trait]
impl LinkConnector for SimConnector {
    async fn connect(&self, descriptor: &str) -> Result<Arc<dyn FlightController>, LinkError> {
        let name = descriptor
            .strip_prefix(SIM_SCHEME)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| LinkError::UnsupportedDescriptor(descriptor.to_string()))?;

        let refused = self
            .refused
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(descriptor);
        if refused {
            return Err(LinkError::Connect {
                descriptor: descriptor.to_string(),
                reason: "no heartbeat received".to_string(),
            });
        }

        let profile = self
            .profiles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(descriptor)
            .cloned()
            .unwrap_or_else(|| self.default_profile.clone());
        let vehicle = Arc::new(SimulatedVehicle::new(name, profile));
        self.vehicles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(descriptor.to_string(), Arc::clone(&vehicle));
        Ok(vehicle)
    }
}
