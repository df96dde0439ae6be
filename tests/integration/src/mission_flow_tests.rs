//! Single-drone delivery scenarios
//!
//! Each test launches through the runner against a simulated vehicle and
//! checks the published events, the mission record, and the commands the
//! vehicle actually received.

use skydrop_core::{Location, MissionControlConfig};
use skydrop_link::{SimCommand, SimProfile};
use skydrop_mission::{MissionOutcome, MissionStatus};

use crate::test_utils::*;

fn is_outbound_goto(command: &SimCommand, block: Location, cruise_m: f64) -> bool {
    matches!(command, SimCommand::Goto(target, _)
        if target.planar_distance(&block) < 1e-12 && target.alt == cruise_m)
}

#[tokio::test(start_paused = true)]
async fn test_delivery_emits_events_in_order() {
    // Reaches block A on the third navigation tick
    let harness = Harness::new(
        MissionControlConfig::default(),
        SimProfile {
            horizontal_speed_dps: 0.00018,
            ..SimProfile::default()
        },
    );
    let mut feed = harness.subscribe();

    let ack = harness
        .runner
        .launch(launch_request("D1", "sim://1", "A", Some("ord-100")))
        .await
        .unwrap();
    assert_eq!(
        harness.runner.wait(ack.mission_id).await,
        Some(MissionOutcome::Completed)
    );

    let events = drain(&mut feed);
    assert_eq!(
        event_types(&events),
        vec!["arrived_at_block", "order_delivered", "mission_completed"]
    );
    assert_eq!(events[0]["drone_id"], "D1");
    assert_eq!(events[0]["order_id"], ack.mission_id);
    assert_eq!(events[1]["order_id"], "ord-100");
    assert_eq!(events[2]["block"], "A");

    let record = harness.runner.store().get(ack.mission_id).unwrap();
    assert_eq!(record.status, MissionStatus::Completed);
    assert_eq!(record.order_ref.as_deref(), Some("ord-100"));
    assert!(record.completed_at.is_some());
    assert_eq!(harness.orders.delivered(), vec!["ord-100".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_vehicle_returns_to_launch_position() {
    let config = MissionControlConfig::default();
    let start = Location::new(16.46310, 80.50790, 0.0);
    let harness = Harness::new(
        config.clone(),
        SimProfile {
            start,
            ..SimProfile::default()
        },
    );

    let ack = harness
        .runner
        .launch(launch_request("D1", "sim://1", "C", None))
        .await
        .unwrap();
    harness.runner.wait(ack.mission_id).await;

    let vehicle = harness.connector.vehicle("sim://1").unwrap();
    // Mission home is the live launch position, not the configured home
    let link = harness.runner.registry().get("D1").await.unwrap();
    assert!(link.mission_home().unwrap().planar_distance(&start) < 1e-9);
    assert!(vehicle.position().planar_distance(&start) < config.safety.arrival_threshold_deg);
    assert_eq!(vehicle.position().alt, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_goto_is_reissued() {
    let config = MissionControlConfig::default();
    let harness = Harness::new(
        config.clone(),
        SimProfile {
            ignored_gotos: 2,
            ..SimProfile::default()
        },
    );

    let ack = harness
        .runner
        .launch(launch_request("D1", "sim://1", "A", None))
        .await
        .unwrap();
    assert_eq!(
        harness.runner.wait(ack.mission_id).await,
        Some(MissionOutcome::Completed)
    );

    let vehicle = harness.connector.vehicle("sim://1").unwrap();
    let block = config.blocks.get("A").unwrap();
    let cruise = config.flight.cruise_altitude_m;
    assert_eq!(
        vehicle.count_commands(|c| is_outbound_goto(c, block, cruise)),
        3
    );
}

#[tokio::test(start_paused = true)]
async fn test_ground_disarm_fallback_when_land_does_not_disarm() {
    let harness = Harness::new(
        MissionControlConfig::default(),
        SimProfile {
            auto_disarm_on_land: false,
            ..SimProfile::default()
        },
    );
    let mut feed = harness.subscribe();

    let ack = harness
        .runner
        .launch(launch_request("D1", "sim://1", "B", None))
        .await
        .unwrap();
    assert_eq!(
        harness.runner.wait(ack.mission_id).await,
        Some(MissionOutcome::Completed)
    );

    let vehicle = harness.connector.vehicle("sim://1").unwrap();
    // Once at the block, once at home
    assert!(vehicle.count_commands(|c| matches!(c, SimCommand::Disarm)) >= 2);
    assert_eq!(
        event_types(&drain(&mut feed)),
        vec!["arrived_at_block", "order_delivered", "mission_completed"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_servo_fault_skips_delivery() {
    let harness = Harness::new(
        MissionControlConfig::default(),
        SimProfile {
            fail_servo: true,
            ..SimProfile::default()
        },
    );
    let mut feed = harness.subscribe();

    let ack = harness
        .runner
        .launch(launch_request("D1", "sim://1", "A", Some("ord-5")))
        .await
        .unwrap();
    assert_eq!(
        harness.runner.wait(ack.mission_id).await,
        Some(MissionOutcome::Completed)
    );

    assert_eq!(
        event_types(&drain(&mut feed)),
        vec!["arrived_at_block", "mission_completed"]
    );
    assert!(harness.orders.delivered().is_empty());
    assert_eq!(
        harness.runner.store().get(ack.mission_id).unwrap().status,
        MissionStatus::Completed
    );
}

fn slow_profile() -> SimProfile {
    SimProfile {
        horizontal_speed_dps: 0.00001,
        ..SimProfile::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_mission_ceiling_fails_long_mission() {
    let mut config = MissionControlConfig::default();
    config.safety.mission_ceiling_secs = 30;
    let harness = Harness::new(config, slow_profile());
    let mut feed = harness.subscribe();

    let ack = harness
        .runner
        .launch(launch_request("D1", "sim://1", "A", None))
        .await
        .unwrap();
    let Some(MissionOutcome::Failed(reason)) = harness.runner.wait(ack.mission_id).await else {
        panic!("mission should hit the ceiling");
    };
    assert!(reason.starts_with("Mission exceeded 30s during outbound_nav"));

    let events = drain(&mut feed);
    assert_eq!(event_types(&events), vec!["mission_failed"]);
    assert_eq!(events[0]["error"], reason.as_str());
    assert_eq!(
        harness.runner.store().get(ack.mission_id).unwrap().status,
        MissionStatus::Failed(reason)
    );
}

#[tokio::test(start_paused = true)]
async fn test_disabled_ceiling_lets_long_mission_finish() {
    let mut config = MissionControlConfig::default();
    config.safety.mission_ceiling_secs = 0;
    let harness = Harness::new(config, slow_profile());

    let ack = harness
        .runner
        .launch(launch_request("D1", "sim://1", "A", None))
        .await
        .unwrap();
    assert_eq!(
        harness.runner.wait(ack.mission_id).await,
        Some(MissionOutcome::Completed)
    );
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_during_mission_fails_record() {
    let harness = Harness::with_defaults();
    let mut feed = harness.subscribe();

    let ack = harness
        .runner
        .launch(launch_request("D1", "sim://1", "A", None))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_secs(3)).await;
    harness.runner.registry().remove("D1").await.unwrap();

    let Some(MissionOutcome::Failed(reason)) = harness.runner.wait(ack.mission_id).await else {
        panic!("mission should fail after disconnect");
    };
    assert!(reason.contains("disconnected"));

    let events = drain(&mut feed);
    assert_eq!(event_types(&events).last().map(String::as_str), Some("mission_failed"));
    let record = harness.runner.store().get(ack.mission_id).unwrap();
    assert!(matches!(record.status, MissionStatus::Failed(_)));
    assert!(record.completed_at.is_some());
}
