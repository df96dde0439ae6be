//! Mission executor
//!
//! Drives a [`MissionMachine`] against one [`VehicleLink`]: reads telemetry,
//! ticks the machine with mission time, and issues the resulting directives
//! through the link's [`CommandGuard`]. The command lock is held from the
//! first tick until the mission ends, so no other flight-affecting sequence
//! can interleave.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use skydrop_link::{CommandGuard, LinkError, VehicleLink};

use crate::error::MissionError;
use crate::machine::{Directive, MissionMachine, Milestone, Observation};

/// Run `machine` to completion on `link`.
///
/// Milestones are forwarded on `milestones` as they are reached; a closed
/// receiver does not stop the mission.
pub async fn execute(
    link: Arc<VehicleLink>,
    mut machine: MissionMachine,
    milestones: mpsc::Sender<Milestone>,
) -> Result<(), MissionError> {
    let descriptor = link.descriptor().to_string();
    let guard = link.commands().await;
    let started = Instant::now();
    info!(%descriptor, plan = ?machine.plan(), "mission started");

    let result = drive(&guard, &mut machine, &milestones, started).await;

    match &result {
        Ok(()) => info!(
            %descriptor,
            elapsed_s = started.elapsed().as_secs(),
            "mission finished"
        ),
        Err(e) => warn!(%descriptor, phase = %machine.phase(), "mission failed: {}", e),
    }

    result.map_err(|e| e.with_diagnostics(link.recent_diagnostics(machine.diagnostic_lines())))
}

async fn drive(
    guard: &CommandGuard<'_>,
    machine: &mut MissionMachine,
    milestones: &mpsc::Sender<Milestone>,
    started: Instant,
) -> Result<(), MissionError> {
    let link = guard.link();
    loop {
        let observation = Observation {
            elapsed: started.elapsed(),
            telemetry: link.telemetry().await?,
        };
        let step = machine.tick(&observation)?;

        for directive in &step.directives {
            if let Err(e) = apply(guard, directive).await {
                machine.directive_failed(directive, &e)?;
            }
        }

        for milestone in step.milestones {
            if milestones.send(milestone).await.is_err() {
                debug!(?milestone, "milestone receiver gone");
            }
        }

        if step.finished {
            return Ok(());
        }
        tokio::time::sleep(machine.poll_interval()).await;
    }
}

async fn apply(guard: &CommandGuard<'_>, directive: &Directive) -> Result<(), LinkError> {
    match directive {
        Directive::SetMode(mode) => guard.set_mode(mode.clone()).await,
        Directive::Arm => guard.arm().await,
        Directive::Disarm => guard.disarm().await,
        Directive::Takeoff(altitude_m) => guard.takeoff(*altitude_m).await,
        Directive::Goto {
            target,
            groundspeed,
        } => guard.goto(*target, *groundspeed).await,
        Directive::Servo { channel, pwm } => guard.set_servo(*channel, *pwm).await,
        Directive::LockHome => guard.set_home_here().await,
        Directive::SaveMissionHome(home) => {
            guard.record_mission_home(*home);
            Ok(())
        }
    }
}
