//! Configuration management for skydrop.
//!
//! Mission parameters are injected once at startup and never mutated at
//! runtime. [`MissionControlConfig::default`] reproduces the field deployment
//! values; a TOML file may override any subset of them.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::types::{BlockCoordinates, Location};

/// Complete mission-control configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionControlConfig {
    /// Named delivery zones
    #[serde(default = "default_blocks")]
    pub blocks: BlockCoordinates,
    /// Static home used when no live position can be read
    #[serde(default = "default_home")]
    pub home: Location,
    /// Flight profile
    #[serde(default)]
    pub flight: FlightConfig,
    /// One-time vehicle-wide navigation speed parameters
    #[serde(default)]
    pub nav_speeds: NavSpeedConfig,
    /// Payload release mechanism
    #[serde(default)]
    pub payload: PayloadConfig,
    /// Timeouts, thresholds and fallbacks
    #[serde(default)]
    pub safety: SafetyConfig,
}

/// Altitudes, speeds and polling cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightConfig {
    pub cruise_altitude_m: f64,
    pub landing_altitude_m: f64,
    pub go_home_altitude_m: f64,
    /// Commanded cruise groundspeed; `0` leaves the vehicle default in place
    pub groundspeed_mps: f64,
    pub poll_interval_ms: u64,
}

/// ArduCopter WPNAV speed parameters, written once per link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavSpeedConfig {
    pub enabled: bool,
    pub speed_mps: f64,
    pub speed_up_mps: f64,
    pub speed_dn_mps: f64,
}

/// Servo release profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadConfig {
    pub servo_channel: u16,
    pub release_pwm: u16,
    pub neutral_pwm: u16,
    pub hold_ms: u64,
    /// Settle delay between payload release and rearming; `0` skips the step
    pub rearm_delay_ms: u64,
}

/// Safety timeouts and navigation thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub arming_timeout_secs: u64,
    pub mode_retry_interval_ms: u64,
    /// `0` disables the climb ceiling
    pub climb_ceiling_secs: u64,
    pub mode_recovery_secs: u64,
    pub land_mode_wait_secs: u64,
    pub land_mode_retries: u32,
    pub ground_threshold_m: f64,
    pub stall_window_ms: u64,
    pub stall_epsilon_deg: f64,
    pub descent_epsilon_m: f64,
    pub arrival_threshold_deg: f64,
    pub home_arrival_threshold_deg: f64,
    pub takeoff_ratio: f64,
    pub descent_ratio: f64,
    /// `0` lets a mission poll forever
    pub mission_ceiling_secs: u64,
    pub diagnostic_lines: usize,
}

fn default_blocks() -> BlockCoordinates {
    BlockCoordinates::from_entries([
        ("A", 16.462584016312782, 80.50752136420085),
        ("B", 16.460755182984183, 80.50745167996868),
        ("C", 16.464311965140684, 80.50803103711354),
    ])
}

fn default_home() -> Location {
    Location::new(16.463000, 80.507800, 0.0)
}

impl Default for MissionControlConfig {
    fn default() -> Self {
        Self {
            blocks: default_blocks(),
            home: default_home(),
            flight: FlightConfig::default(),
            nav_speeds: NavSpeedConfig::default(),
            payload: PayloadConfig::default(),
            safety: SafetyConfig::default(),
        }
    }
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            cruise_altitude_m: 20.0,
            landing_altitude_m: 1.0,
            go_home_altitude_m: 10.0,
            groundspeed_mps: 5.0,
            poll_interval_ms: 1000,
        }
    }
}

impl Default for NavSpeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            speed_mps: 5.0,
            speed_up_mps: 2.0,
            speed_dn_mps: 1.5,
        }
    }
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            servo_channel: 10,
            release_pwm: 1500,
            neutral_pwm: 1000,
            hold_ms: 2000,
            rearm_delay_ms: 3000,
        }
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            arming_timeout_secs: 45,
            mode_retry_interval_ms: 5000,
            climb_ceiling_secs: 120,
            mode_recovery_secs: 5,
            land_mode_wait_secs: 10,
            land_mode_retries: 1,
            ground_threshold_m: 0.3,
            stall_window_ms: 3000,
            stall_epsilon_deg: 5e-7,
            descent_epsilon_m: 0.1,
            arrival_threshold_deg: 0.00005,
            home_arrival_threshold_deg: 0.0001,
            takeoff_ratio: 0.95,
            descent_ratio: 1.1,
            mission_ceiling_secs: 1800,
            diagnostic_lines: 10,
        }
    }
}

impl MissionControlConfig {
    /// Load and validate a TOML configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no mission could fly
    pub fn validate(&self) -> Result<()> {
        if self.blocks.is_empty() {
            return Err(ConfigError::Validation(
                "at least one delivery block is required".to_string(),
            ));
        }
        if self.flight.cruise_altitude_m <= 0.0 || self.flight.landing_altitude_m <= 0.0 {
            return Err(ConfigError::Validation(
                "altitudes must be positive".to_string(),
            ));
        }
        if self.flight.landing_altitude_m >= self.flight.cruise_altitude_m {
            return Err(ConfigError::Validation(format!(
                "landing altitude {}m must be below cruise altitude {}m",
                self.flight.landing_altitude_m, self.flight.cruise_altitude_m
            )));
        }
        if self.flight.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "poll interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl FlightConfig {
    /// Tick between two telemetry polls
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Commanded groundspeed, if one is configured
    pub fn groundspeed(&self) -> Option<f64> {
        (self.groundspeed_mps > 0.0).then_some(self.groundspeed_mps)
    }
}

impl NavSpeedConfig {
    /// Parameter writes in the controller's units (cm/s), if enabled
    pub fn parameters(&self) -> Option<[(&'static str, f32); 3]> {
        if !self.enabled {
            return None;
        }
        let cm = |mps: f64| (mps * 100.0).round() as f32;
        Some([
            ("WPNAV_SPEED", cm(self.speed_mps)),
            ("WPNAV_SPEED_UP", cm(self.speed_up_mps)),
            ("WPNAV_SPEED_DN", cm(self.speed_dn_mps)),
        ])
    }
}

impl PayloadConfig {
    /// How long the release pulse is held
    pub fn hold(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }

    /// Settle delay before rearming, if enabled
    pub fn rearm_delay(&self) -> Option<Duration> {
        (self.rearm_delay_ms > 0).then(|| Duration::from_millis(self.rearm_delay_ms))
    }
}

impl SafetyConfig {
    pub fn arming_timeout(&self) -> Duration {
        Duration::from_secs(self.arming_timeout_secs)
    }

    pub fn mode_retry_interval(&self) -> Duration {
        Duration::from_millis(self.mode_retry_interval_ms)
    }

    pub fn climb_ceiling(&self) -> Option<Duration> {
        (self.climb_ceiling_secs > 0).then(|| Duration::from_secs(self.climb_ceiling_secs))
    }

    pub fn mode_recovery(&self) -> Duration {
        Duration::from_secs(self.mode_recovery_secs)
    }

    pub fn land_mode_wait(&self) -> Duration {
        Duration::from_secs(self.land_mode_wait_secs)
    }

    pub fn stall_window(&self) -> Duration {
        Duration::from_millis(self.stall_window_ms)
    }

    pub fn mission_ceiling(&self) -> Option<Duration> {
        (self.mission_ceiling_secs > 0).then(|| Duration::from_secs(self.mission_ceiling_secs))
    }
}
