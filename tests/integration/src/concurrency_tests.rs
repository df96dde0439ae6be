//! Per-drone serialization and multi-drone concurrency

use std::sync::Arc;
use std::time::Duration;

use skydrop_mission::{MissionOutcome, MissionStatus};

use crate::test_utils::*;

#[tokio::test(start_paused = true)]
async fn test_second_launch_for_same_drone_waits_for_first() {
    let harness = Harness::with_defaults();
    let mut feed = harness.subscribe();

    let first = harness
        .runner
        .launch(launch_request("D1", "sim://1", "A", None))
        .await
        .unwrap();
    let second = harness
        .runner
        .launch(launch_request("D1", "sim://1", "B", None))
        .await
        .unwrap();
    assert_ne!(first.mission_id, second.mission_id);
    assert_eq!(harness.runner.registry().len().await, 1);

    assert_eq!(
        harness.runner.wait(first.mission_id).await,
        Some(MissionOutcome::Completed)
    );
    assert_eq!(
        harness.runner.wait(second.mission_id).await,
        Some(MissionOutcome::Completed)
    );

    let events = drain(&mut feed);
    let sequence: Vec<(String, i64)> = events
        .iter()
        .filter(|e| e["type"] != "order_delivered")
        .map(|e| (e["type"].as_str().unwrap().to_string(), e["order_id"].as_i64().unwrap()))
        .collect();
    assert_eq!(
        sequence,
        vec![
            ("arrived_at_block".to_string(), first.mission_id),
            ("mission_completed".to_string(), first.mission_id),
            ("arrived_at_block".to_string(), second.mission_id),
            ("mission_completed".to_string(), second.mission_id),
        ]
    );

    let vehicle = harness.connector.vehicle("sim://1").unwrap();
    assert_eq!(vehicle.max_concurrent_commands(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_queued_mission_is_recorded_before_it_flies() {
    let harness = Harness::with_defaults();
    let first = harness
        .runner
        .launch(launch_request("D1", "sim://1", "A", None))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    let second = harness
        .runner
        .launch(launch_request("D1", "sim://1", "C", None))
        .await
        .unwrap();
    let queued = harness.runner.store().get(second.mission_id).unwrap();
    assert_eq!(queued.status, MissionStatus::InProgress);
    assert_eq!(
        harness.runner.active_missions(),
        vec![first.mission_id, second.mission_id]
    );

    harness.runner.wait(first.mission_id).await;
    harness.runner.wait(second.mission_id).await;
}

#[tokio::test(start_paused = true)]
async fn test_two_drones_fly_independently() {
    let harness = Harness::with_defaults();
    let mut feed = harness.subscribe();

    let d1 = harness
        .runner
        .launch(launch_request("D1", "sim://1", "A", Some("ord-1")))
        .await
        .unwrap();
    let d2 = harness
        .runner
        .launch(launch_request("D2", "sim://2", "B", Some("ord-2")))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(harness.runner.active_missions().len(), 2);
    let v1 = harness.connector.vehicle("sim://1").unwrap();
    let v2 = harness.connector.vehicle("sim://2").unwrap();
    assert!(v1.position().alt > 0.0);
    assert!(v2.position().alt > 0.0);

    assert_eq!(harness.runner.wait(d1.mission_id).await, Some(MissionOutcome::Completed));
    assert_eq!(harness.runner.wait(d2.mission_id).await, Some(MissionOutcome::Completed));

    let mut delivered = harness.orders.delivered();
    delivered.sort();
    assert_eq!(delivered, vec!["ord-1".to_string(), "ord-2".to_string()]);

    let events = drain(&mut feed);
    for mission_id in [d1.mission_id, d2.mission_id] {
        let types: Vec<String> = events
            .iter()
            .filter(|e| e["order_id"] == mission_id)
            .map(|e| e["type"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(types, vec!["arrived_at_block", "mission_completed"]);
    }
    assert_eq!(v1.max_concurrent_commands(), 1);
    assert_eq!(v2.max_concurrent_commands(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_status_read_does_not_wait_for_mission_lock() {
    let harness = Harness::with_defaults();
    let ack = harness
        .runner
        .launch(launch_request("D1", "sim://1", "A", None))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(4)).await;

    let link = harness.runner.registry().get("D1").await.unwrap();
    assert!(link.try_commands().is_none());
    let status = tokio::time::timeout(Duration::from_millis(10), link.status())
        .await
        .expect("status read blocked behind the command lock");
    assert!(status.armed);
    assert_eq!(status.mode, "GUIDED");

    harness.runner.wait(ack.mission_id).await;
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_registrations_share_one_link() {
    let harness = Harness::with_defaults();
    let registry = Arc::clone(harness.runner.registry());

    let (a, b) = tokio::join!(
        registry.get_or_create("D1", "sim://1"),
        registry.get_or_create("D1", "sim://1")
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(registry.list().await, vec!["D1".to_string()]);
    let live = registry.get("D1").await.unwrap();
    // The displaced link, if any, was closed before the winner became visible
    for link in [a, b] {
        assert_eq!(Arc::ptr_eq(&link, &live), link.is_connected());
    }
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_waits_for_mission_in_flight() {
    let harness = Harness::with_defaults();
    let ack = harness
        .runner
        .launch(launch_request("D1", "sim://1", "B", None))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    let registry = Arc::clone(harness.runner.registry());
    let flying = registry.get("D1").await.unwrap();
    let reconnect = {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move { registry.replace("D1", "sim://1").await })
    };
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!reconnect.is_finished());
    assert!(flying.is_connected());

    assert_eq!(
        harness.runner.wait(ack.mission_id).await,
        Some(MissionOutcome::Completed)
    );
    let fresh = reconnect.await.unwrap().unwrap();
    assert!(!flying.is_connected());
    assert!(fresh.is_connected());
    assert!(Arc::ptr_eq(&fresh, &registry.get("D1").await.unwrap()));
    assert_eq!(
        harness.runner.store().get(ack.mission_id).unwrap().status,
        MissionStatus::Completed
    );
}
