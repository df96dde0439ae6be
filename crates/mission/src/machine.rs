//! Mission state machine
//!
//! [`MissionMachine`] is a pure, tick-driven model of one delivery cycle:
//!
//! ```text
//! Idle → Arming → TakingOff → OutboundNav → DescendToLanding → Landing
//!      → PayloadRelease → RearmDelayWait → RearmAndTakeoff → ReturnNav
//!      → LandAtHome → Completed | Failed
//! ```
//!
//! Each [`MissionMachine::tick`] takes one telemetry [`Observation`] stamped
//! with mission time and returns the [`Directive`]s to issue plus any
//! [`Milestone`]s reached. The machine never sleeps and never talks to a link;
//! the executor owns time and the command lock. Directive failures are fed
//! back through [`MissionMachine::directive_failed`], which decides whether
//! the failure is absorbed or ends the mission.

use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use skydrop_core::{FlightConfig, Location, MissionControlConfig, PayloadConfig, SafetyConfig};
use skydrop_link::{FlightMode, LinkError, Telemetry};

use crate::error::MissionError;
use crate::navigation::StallDetector;

/// Minimum spacing between two ground-level disarm fallbacks
const DISARM_RETRY: Duration = Duration::from_secs(2);

/// Externally visible mission phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    Arming,
    TakingOff,
    OutboundNav,
    DescendToLanding,
    Landing,
    PayloadRelease,
    RearmDelayWait,
    RearmAndTakeoff,
    ReturnNav,
    LandAtHome,
    Completed,
    Failed,
}

impl Phase {
    /// Phase name used in logs and errors
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Arming => "arming",
            Phase::TakingOff => "taking_off",
            Phase::OutboundNav => "outbound_nav",
            Phase::DescendToLanding => "descend_to_landing",
            Phase::Landing => "landing",
            Phase::PayloadRelease => "payload_release",
            Phase::RearmDelayWait => "rearm_delay_wait",
            Phase::RearmAndTakeoff => "rearm_and_takeoff",
            Phase::ReturnNav => "return_nav",
            Phase::LandAtHome => "land_at_home",
            Phase::Completed => "completed",
            Phase::Failed => "failed",
        }
    }

    /// Whether no further ticks change anything
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition an arming sequence is waiting on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmWait {
    /// Controller has not yet reported GUIDED
    GuidedMode,
    /// Controller has not yet reported armed
    Armed,
}

impl fmt::Display for ArmWait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArmWait::GuidedMode => f.write_str("GUIDED mode"),
            ArmWait::Armed => f.write_str("arm confirmation"),
        }
    }
}

/// Command the executor must issue under the command lock
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    SetMode(FlightMode),
    Arm,
    Disarm,
    Takeoff(f64),
    Goto {
        target: Location,
        groundspeed: Option<f64>,
    },
    Servo {
        channel: u16,
        pwm: u16,
    },
    /// Lock the controller home to the current position
    LockHome,
    /// Cache the mission home on the link
    SaveMissionHome(Location),
}

impl Directive {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Directive::SetMode(_) => "set_mode",
            Directive::Arm => "arm",
            Directive::Disarm => "disarm",
            Directive::Takeoff(_) => "takeoff",
            Directive::Goto { .. } => "goto",
            Directive::Servo { .. } => "servo",
            Directive::LockHome => "lock_home",
            Directive::SaveMissionHome(_) => "save_mission_home",
        }
    }
}

/// Progress notification emitted by the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    /// Outbound leg reached the delivery block
    Arrived,
    /// Payload release confirmed
    Delivered,
}

/// One telemetry reading stamped with mission time
#[derive(Debug, Clone)]
pub struct Observation {
    /// Time since the mission took the command lock
    pub elapsed: Duration,
    pub telemetry: Telemetry,
}

/// Result of one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Step {
    /// Commands to issue, in order
    pub directives: Vec<Directive>,
    /// Milestones reached during this tick
    pub milestones: Vec<Milestone>,
    /// Mission completed; no further ticks are needed
    pub finished: bool,
}

/// What the mission is for
#[derive(Debug, Clone, PartialEq)]
pub enum MissionPlan {
    /// Full delivery round trip to a block
    Delivery { block: String, target: Location },
    /// Fly back to the mission home and land
    ReturnHome,
}

#[derive(Debug, Clone)]
struct ArmSequence {
    waiting: ArmWait,
    stage_started: Duration,
    last_request: Duration,
}

#[derive(Debug, Clone)]
struct Climb {
    target_m: f64,
    started: Duration,
}

#[derive(Debug, Clone)]
struct NavLeg {
    target: Location,
    threshold: f64,
    stall: StallDetector,
    recovering_since: Option<Duration>,
}

#[derive(Debug, Clone)]
struct Descent {
    target: Location,
    stall: StallDetector,
}

#[derive(Debug, Clone)]
struct LandSequence {
    awaiting_mode: bool,
    mode_requested: Duration,
    retries_left: u32,
    last_disarm: Option<Duration>,
}

#[derive(Debug, Clone)]
struct Release {
    started: Duration,
    neutral_sent: bool,
}

#[derive(Debug, Clone)]
enum State {
    Idle,
    Arming(ArmSequence),
    TakingOff(Climb),
    OutboundNav(NavLeg),
    DescendToLanding(Descent),
    Landing(LandSequence),
    PayloadRelease(Release),
    RearmDelayWait { until: Duration },
    Rearming(ArmSequence),
    Reclimbing(Climb),
    ReturnNav(NavLeg),
    LandAtHome(LandSequence),
    Completed,
    Failed,
}

/// Tick-driven delivery state machine for one mission
#[derive(Debug, Clone)]
pub struct MissionMachine {
    plan: MissionPlan,
    flight: FlightConfig,
    payload: PayloadConfig,
    safety: SafetyConfig,
    fallback_home: Location,
    mission_home: Option<Location>,
    servo_fault: bool,
    state: State,
}

impl MissionMachine {
    /// Delivery round trip to `block` located at `target`
    pub fn delivery(config: &MissionControlConfig, block: impl Into<String>, target: Location) -> Self {
        Self::new(
            config,
            MissionPlan::Delivery {
                block: block.into(),
                target,
            },
            None,
        )
    }

    /// Return to `saved_home` (or the configured home) and land
    pub fn return_home(config: &MissionControlConfig, saved_home: Option<Location>) -> Self {
        Self::new(config, MissionPlan::ReturnHome, saved_home)
    }

    fn new(config: &MissionControlConfig, plan: MissionPlan, mission_home: Option<Location>) -> Self {
        Self {
            plan,
            flight: config.flight.clone(),
            payload: config.payload.clone(),
            safety: config.safety.clone(),
            fallback_home: config.home,
            mission_home,
            servo_fault: false,
            state: State::Idle,
        }
    }

    pub fn plan(&self) -> &MissionPlan {
        &self.plan
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        state_phase(&self.state)
    }

    /// Home saved for this mission, if any
    pub fn mission_home(&self) -> Option<Location> {
        self.mission_home
    }

    /// Tick spacing expected by the machine
    pub fn poll_interval(&self) -> Duration {
        self.flight.poll_interval()
    }

    /// Number of FCU diagnostic lines to attach to failures
    pub fn diagnostic_lines(&self) -> usize {
        self.safety.diagnostic_lines
    }

    /// Advance the machine with one observation.
    ///
    /// An error is terminal: the machine moves to [`Phase::Failed`].
    pub fn tick(&mut self, observation: &Observation) -> Result<Step, MissionError> {
        let result = self.advance(observation);
        if result.is_err() {
            self.state = State::Failed;
        }
        result
    }

    /// Report a directive the link refused.
    ///
    /// Mode changes, home lock, servo pulses and disarm fallbacks are
    /// absorbed; anything that blocks forward progress, and any lost
    /// connection, fails the mission.
    pub fn directive_failed(
        &mut self,
        directive: &Directive,
        error: &LinkError,
    ) -> Result<(), MissionError> {
        if error.is_disconnect() {
            error!(directive = directive.name(), "link lost: {}", error);
            self.state = State::Failed;
            return Err(error.clone().into());
        }

        match directive {
            Directive::SetMode(mode) => {
                warn!(%mode, phase = %self.phase(), "mode change failed: {}", error);
                Ok(())
            }
            Directive::LockHome => {
                warn!("failed to lock home location: {}", error);
                Ok(())
            }
            Directive::Disarm => {
                warn!("disarm fallback failed: {}", error);
                Ok(())
            }
            Directive::Servo { channel, pwm } => {
                warn!(channel, pwm, "servo actuation failed: {}", error);
                self.servo_fault = true;
                Ok(())
            }
            Directive::SaveMissionHome(_) => Ok(()),
            Directive::Arm | Directive::Takeoff(_) | Directive::Goto { .. } => {
                error!(directive = directive.name(), phase = %self.phase(), "command failed: {}", error);
                self.state = State::Failed;
                Err(error.clone().into())
            }
        }
    }

    fn advance(&mut self, observation: &Observation) -> Result<Step, MissionError> {
        let now = observation.elapsed;
        let telemetry = &observation.telemetry;
        let mut step = Step::default();

        match self.state {
            State::Completed => {
                step.finished = true;
                return Ok(step);
            }
            State::Failed => {
                return Err(MissionError::Aborted("mission already failed".to_string()));
            }
            _ => {}
        }

        if let Some(ceiling) = self.safety.mission_ceiling() {
            if now >= ceiling {
                error!(phase = %self.phase(), elapsed_s = now.as_secs(), "mission ceiling exceeded");
                return Err(MissionError::MissionTimeout {
                    elapsed: now,
                    phase: self.phase(),
                });
            }
        }

        let state = std::mem::replace(&mut self.state, State::Failed);
        let before = state_phase(&state);
        self.state = match state {
            State::Idle => match self.plan.clone() {
                MissionPlan::Delivery { block, .. } => {
                    info!(%block, "starting delivery, arming");
                    step.directives.push(Directive::SetMode(FlightMode::Guided));
                    step.directives.push(Directive::LockHome);
                    State::Arming(ArmSequence::start(now))
                }
                MissionPlan::ReturnHome => {
                    let home = self.return_target(self.flight.go_home_altitude_m);
                    info!(lat = home.lat, lon = home.lon, "returning to home");
                    State::ReturnNav(self.start_leg(
                        home,
                        self.safety.home_arrival_threshold_deg,
                        telemetry,
                        now,
                        &mut step,
                    ))
                }
            },
            State::Arming(seq) => match self.step_arming(seq, telemetry, now, &mut step)? {
                Some(seq) => State::Arming(seq),
                None => State::TakingOff(self.start_climb(now, &mut step)),
            },
            State::TakingOff(climb) => match self.step_climb(climb, telemetry, now)? {
                Some(climb) => State::TakingOff(climb),
                None => self.enter_outbound(telemetry, now, &mut step),
            },
            State::OutboundNav(leg) => match self.step_leg(leg, telemetry, now, &mut step) {
                Some(leg) => State::OutboundNav(leg),
                None => {
                    step.milestones.push(Milestone::Arrived);
                    let target = self.block_target();
                    State::DescendToLanding(self.start_descent(target, now, &mut step))
                }
            },
            State::DescendToLanding(descent) => {
                match self.step_descent(descent, telemetry, now, &mut step) {
                    Some(descent) => State::DescendToLanding(descent),
                    None => State::Landing(self.start_landing(now, &mut step)),
                }
            }
            State::Landing(land) => match self.step_land(land, telemetry, now, &mut step) {
                Some(land) => State::Landing(land),
                None => {
                    info!(
                        channel = self.payload.servo_channel,
                        pwm = self.payload.release_pwm,
                        "releasing payload"
                    );
                    step.directives.push(Directive::Servo {
                        channel: self.payload.servo_channel,
                        pwm: self.payload.release_pwm,
                    });
                    State::PayloadRelease(Release {
                        started: now,
                        neutral_sent: false,
                    })
                }
            },
            State::PayloadRelease(release) => match self.step_release(release, now, &mut step) {
                Some(release) => State::PayloadRelease(release),
                None => match self.payload.rearm_delay() {
                    Some(delay) => {
                        debug!(delay_ms = delay.as_millis() as u64, "settling before rearm");
                        State::RearmDelayWait { until: now + delay }
                    }
                    None => self.enter_rearm(now, &mut step),
                },
            },
            State::RearmDelayWait { until } => {
                if now >= until {
                    self.enter_rearm(now, &mut step)
                } else {
                    State::RearmDelayWait { until }
                }
            }
            State::Rearming(seq) => match self.step_arming(seq, telemetry, now, &mut step)? {
                Some(seq) => State::Rearming(seq),
                None => State::Reclimbing(self.start_climb(now, &mut step)),
            },
            State::Reclimbing(climb) => match self.step_climb(climb, telemetry, now)? {
                Some(climb) => State::Reclimbing(climb),
                None => {
                    let home = self.return_target(self.flight.cruise_altitude_m);
                    info!(lat = home.lat, lon = home.lon, "returning to saved home");
                    State::ReturnNav(self.start_leg(
                        home,
                        self.safety.arrival_threshold_deg,
                        telemetry,
                        now,
                        &mut step,
                    ))
                }
            },
            State::ReturnNav(leg) => match self.step_leg(leg, telemetry, now, &mut step) {
                Some(leg) => State::ReturnNav(leg),
                None => {
                    info!("home reached, landing");
                    State::LandAtHome(self.start_landing(now, &mut step))
                }
            },
            State::LandAtHome(land) => match self.step_land(land, telemetry, now, &mut step) {
                Some(land) => State::LandAtHome(land),
                None => {
                    info!("mission complete, landed and disarmed at home");
                    step.finished = true;
                    State::Completed
                }
            },
            terminal @ (State::Completed | State::Failed) => terminal,
        };

        let after = self.phase();
        if after != before {
            info!(from = %before, to = %after, "phase transition");
        }
        Ok(step)
    }

    fn step_arming(
        &self,
        mut seq: ArmSequence,
        telemetry: &Telemetry,
        now: Duration,
        step: &mut Step,
    ) -> Result<Option<ArmSequence>, MissionError> {
        match seq.waiting {
            ArmWait::GuidedMode if telemetry.mode == FlightMode::Guided => {
                info!("GUIDED mode confirmed, arming motors");
                seq.waiting = ArmWait::Armed;
                seq.stage_started = now;
                seq.last_request = now;
                step.directives.push(Directive::Arm);
                return Ok(Some(seq));
            }
            ArmWait::Armed if telemetry.armed => {
                info!("motors armed");
                return Ok(None);
            }
            _ => {}
        }

        let waited = now.saturating_sub(seq.stage_started);
        if waited >= self.safety.arming_timeout() {
            error!(stage = %seq.waiting, waited_s = waited.as_secs(), "arming timed out");
            return Err(MissionError::ArmingTimeout {
                stage: seq.waiting,
                waited,
                diagnostics: Vec::new(),
            });
        }

        if now.saturating_sub(seq.last_request) >= self.safety.mode_retry_interval() {
            seq.last_request = now;
            match seq.waiting {
                ArmWait::GuidedMode => {
                    debug!(mode = %telemetry.mode, "still waiting for GUIDED, re-requesting");
                    step.directives.push(Directive::SetMode(FlightMode::Guided));
                }
                ArmWait::Armed => {
                    debug!("still waiting for arming, re-requesting");
                    if telemetry.mode != FlightMode::Guided {
                        step.directives.push(Directive::SetMode(FlightMode::Guided));
                    }
                    step.directives.push(Directive::Arm);
                }
            }
        }
        Ok(Some(seq))
    }

    fn start_climb(&self, now: Duration, step: &mut Step) -> Climb {
        let target_m = self.flight.cruise_altitude_m;
        info!(target_m, "taking off");
        step.directives.push(Directive::Takeoff(target_m));
        Climb {
            target_m,
            started: now,
        }
    }

    fn step_climb(
        &self,
        climb: Climb,
        telemetry: &Telemetry,
        now: Duration,
    ) -> Result<Option<Climb>, MissionError> {
        let altitude = telemetry.altitude();
        if altitude >= climb.target_m * self.safety.takeoff_ratio {
            info!(altitude, "target altitude reached");
            return Ok(None);
        }
        let waited = now.saturating_sub(climb.started);
        if let Some(ceiling) = self.safety.climb_ceiling() {
            if waited >= ceiling {
                return Err(MissionError::ClimbTimeout {
                    target_m: climb.target_m,
                    altitude_m: altitude,
                    waited,
                });
            }
        }
        debug!(altitude, "climbing");
        Ok(Some(climb))
    }

    fn enter_outbound(&mut self, telemetry: &Telemetry, now: Duration, step: &mut Step) -> State {
        let home = match telemetry.position {
            Some(position) => position,
            None => {
                warn!("no position fix, using configured home as mission home");
                self.fallback_home
            }
        };
        self.mission_home = Some(home);
        step.directives.push(Directive::SaveMissionHome(home));

        let target = self.block_target().at_altitude(self.flight.cruise_altitude_m);
        info!(lat = target.lat, lon = target.lon, alt = target.alt, "flying to destination");
        State::OutboundNav(self.start_leg(
            target,
            self.safety.arrival_threshold_deg,
            telemetry,
            now,
            step,
        ))
    }

    fn start_leg(
        &self,
        target: Location,
        threshold: f64,
        telemetry: &Telemetry,
        now: Duration,
        step: &mut Step,
    ) -> NavLeg {
        if telemetry.mode != FlightMode::Guided {
            step.directives.push(Directive::SetMode(FlightMode::Guided));
        }
        step.directives.push(self.goto(target));
        NavLeg {
            target,
            threshold,
            stall: StallDetector::new(
                self.safety.stall_window(),
                self.safety.stall_epsilon_deg,
                now,
            ),
            recovering_since: None,
        }
    }

    fn step_leg(
        &self,
        mut leg: NavLeg,
        telemetry: &Telemetry,
        now: Duration,
        step: &mut Step,
    ) -> Option<NavLeg> {
        let distance = telemetry
            .position
            .map(|position| position.planar_distance(&leg.target));
        if let Some(distance) = distance {
            if distance < leg.threshold {
                info!(distance, "destination reached");
                return None;
            }
        }

        if telemetry.mode != FlightMode::Guided {
            let due = leg
                .recovering_since
                .map_or(true, |since| now.saturating_sub(since) >= self.safety.mode_recovery());
            if due {
                warn!(mode = %telemetry.mode, "vehicle left GUIDED mid-transit, forcing it back");
                step.directives.push(Directive::SetMode(FlightMode::Guided));
                leg.recovering_since = Some(now);
            }
            return Some(leg);
        }
        if leg.recovering_since.take().is_some() {
            info!("GUIDED mode restored");
        }

        if leg.stall.observe(distance, now) {
            info!(
                ?distance,
                reissues = leg.stall.reissues(),
                "no progress toward target, reissuing goto"
            );
            step.directives.push(self.goto(leg.target));
        } else {
            debug!(?distance, "navigating");
        }
        Some(leg)
    }

    fn start_descent(&self, target: Location, now: Duration, step: &mut Step) -> Descent {
        let target = target.at_altitude(self.flight.landing_altitude_m);
        info!(alt = target.alt, "descending for landing");
        step.directives.push(Directive::Goto {
            target,
            groundspeed: None,
        });
        Descent {
            target,
            stall: StallDetector::new(
                self.safety.stall_window(),
                self.safety.descent_epsilon_m,
                now,
            ),
        }
    }

    fn step_descent(
        &self,
        mut descent: Descent,
        telemetry: &Telemetry,
        now: Duration,
        step: &mut Step,
    ) -> Option<Descent> {
        let altitude = telemetry.position.map(|position| position.alt);
        if let Some(altitude) = altitude {
            if altitude <= descent.target.alt * self.safety.descent_ratio {
                info!(altitude, "landing altitude reached");
                return None;
            }
        }
        if descent.stall.observe(altitude, now) {
            info!(?altitude, "descent stalled, reissuing goto");
            step.directives.push(Directive::Goto {
                target: descent.target,
                groundspeed: None,
            });
        }
        Some(descent)
    }

    fn start_landing(&self, now: Duration, step: &mut Step) -> LandSequence {
        step.directives.push(Directive::SetMode(FlightMode::Land));
        LandSequence {
            awaiting_mode: true,
            mode_requested: now,
            retries_left: self.safety.land_mode_retries,
            last_disarm: None,
        }
    }

    fn step_land(
        &self,
        mut land: LandSequence,
        telemetry: &Telemetry,
        now: Duration,
        step: &mut Step,
    ) -> Option<LandSequence> {
        if !telemetry.armed {
            info!("landed and disarmed");
            return None;
        }

        if land.awaiting_mode {
            if telemetry.mode == FlightMode::Land {
                debug!("LAND mode accepted");
                land.awaiting_mode = false;
            } else if now.saturating_sub(land.mode_requested) >= self.safety.land_mode_wait() {
                if land.retries_left > 0 {
                    warn!(mode = %telemetry.mode, "LAND not accepted, retrying");
                    land.retries_left -= 1;
                    land.mode_requested = now;
                    step.directives.push(Directive::SetMode(FlightMode::Land));
                } else {
                    warn!(mode = %telemetry.mode, "LAND not accepted, waiting for disarm anyway");
                    land.awaiting_mode = false;
                }
            }
        }

        if let Some(altitude) = telemetry.position.map(|position| position.alt) {
            if altitude < self.safety.ground_threshold_m {
                let due = land
                    .last_disarm
                    .map_or(true, |at| now.saturating_sub(at) >= DISARM_RETRY);
                if due {
                    warn!(altitude, "still armed at ground level, sending disarm");
                    step.directives.push(Directive::Disarm);
                    land.last_disarm = Some(now);
                }
            }
        }
        Some(land)
    }

    fn step_release(&self, mut release: Release, now: Duration, step: &mut Step) -> Option<Release> {
        if self.servo_fault {
            warn!("payload not confirmed dropped");
            return None;
        }
        if release.neutral_sent {
            info!("payload dropped");
            step.milestones.push(Milestone::Delivered);
            return None;
        }
        if now.saturating_sub(release.started) >= self.payload.hold() {
            step.directives.push(Directive::Servo {
                channel: self.payload.servo_channel,
                pwm: self.payload.neutral_pwm,
            });
            release.neutral_sent = true;
        }
        Some(release)
    }

    fn enter_rearm(&self, now: Duration, step: &mut Step) -> State {
        info!("re-arming for return flight");
        step.directives.push(Directive::SetMode(FlightMode::Guided));
        State::Rearming(ArmSequence::start(now))
    }

    fn goto(&self, target: Location) -> Directive {
        Directive::Goto {
            target,
            groundspeed: self.flight.groundspeed(),
        }
    }

    fn block_target(&self) -> Location {
        match &self.plan {
            MissionPlan::Delivery { target, .. } => *target,
            MissionPlan::ReturnHome => self.return_target(0.0),
        }
    }

    fn return_target(&self, altitude: f64) -> Location {
        self.mission_home
            .unwrap_or(self.fallback_home)
            .at_altitude(altitude)
    }
}

impl ArmSequence {
    fn start(now: Duration) -> Self {
        Self {
            waiting: ArmWait::GuidedMode,
            stage_started: now,
            last_request: now,
        }
    }
}

fn state_phase(state: &State) -> Phase {
    match state {
        State::Idle => Phase::Idle,
        State::Arming(_) => Phase::Arming,
        State::TakingOff(_) => Phase::TakingOff,
        State::OutboundNav(_) => Phase::OutboundNav,
        State::DescendToLanding(_) => Phase::DescendToLanding,
        State::Landing(_) => Phase::Landing,
        State::PayloadRelease(_) => Phase::PayloadRelease,
        State::RearmDelayWait { .. } => Phase::RearmDelayWait,
        State::Rearming(_) | State::Reclimbing(_) => Phase::RearmAndTakeoff,
        State::ReturnNav(_) => Phase::ReturnNav,
        State::LandAtHome(_) => Phase::LandAtHome,
        State::Completed => Phase::Completed,
        State::Failed => Phase::Failed,
    }
}
