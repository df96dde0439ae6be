//! Broadcaster isolation and the periodic status feed

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use skydrop_broadcast::{
    spawn_status_loop, BroadcastError, Subscriber, DEFAULT_STATUS_INTERVAL,
};
use skydrop_mission::MissionOutcome;

use crate::test_utils::*;

/// Subscriber whose connection is already gone
struct DeadSubscriber {
    attempts: AtomicUsize,
}

impl Subscriber for DeadSubscriber {
    fn send(&self, _message: &str) -> Result<(), BroadcastError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(BroadcastError::SubscriberClosed(0))
    }
}

#[tokio::test(start_paused = true)]
async fn test_failed_subscriber_does_not_starve_others() {
    let harness = Harness::with_defaults();
    let mut before = harness.subscribe();
    let dead = Arc::new(DeadSubscriber {
        attempts: AtomicUsize::new(0),
    });
    harness.broadcaster().subscribe(dead.clone());
    let mut after = harness.subscribe();
    assert_eq!(harness.broadcaster().subscriber_count(), 3);

    let ack = harness
        .runner
        .launch(launch_request("D1", "sim://1", "A", None))
        .await
        .unwrap();
    harness.runner.wait(ack.mission_id).await;

    let expected = vec!["arrived_at_block", "order_delivered", "mission_completed"];
    assert_eq!(event_types(&drain(&mut before)), expected);
    assert_eq!(event_types(&drain(&mut after)), expected);

    // Dropped after the first failed pass, never retried
    assert_eq!(dead.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(harness.broadcaster().subscriber_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_status_feed_runs_alongside_mission() {
    let harness = Harness::with_defaults();
    let mut feed = harness.subscribe();
    let status_loop = spawn_status_loop(
        Arc::clone(harness.runner.registry()),
        Arc::clone(harness.broadcaster()),
        DEFAULT_STATUS_INTERVAL,
    );

    let ack = harness
        .runner
        .launch(launch_request("D1", "sim://1", "B", None))
        .await
        .unwrap();

    let mut events = Vec::new();
    loop {
        let message = feed.recv().await.unwrap();
        let event: serde_json::Value = serde_json::from_str(&message).unwrap();
        let done = event["type"] == "mission_completed";
        events.push(event);
        if done {
            break;
        }
    }
    status_loop.abort();
    assert_eq!(harness.runner.wait(ack.mission_id).await, Some(MissionOutcome::Completed));

    let arrived = events
        .iter()
        .position(|e| e["type"] == "arrived_at_block")
        .unwrap();
    let airborne_updates = events[..arrived]
        .iter()
        .filter(|e| e["type"] == "status_update" && e["drones"]["D1"]["armed"] == true)
        .count();
    assert!(airborne_updates > 0);
    assert!(events
        .iter()
        .filter(|e| e["type"] == "status_update")
        .all(|e| e["timestamp"].is_string()));

    assert_eq!(
        event_types(&mission_events(&events)),
        vec!["arrived_at_block", "order_delivered", "mission_completed"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_status_feed_drops_disconnected_drones() {
    let harness = Harness::with_defaults();
    let registry = Arc::clone(harness.runner.registry());
    registry.get_or_create("D1", "sim://1").await.unwrap();
    registry.get_or_create("D2", "sim://2").await.unwrap();
    let mut feed = harness.subscribe();
    let status_loop = spawn_status_loop(
        Arc::clone(&registry),
        Arc::clone(harness.broadcaster()),
        DEFAULT_STATUS_INTERVAL,
    );

    let first: serde_json::Value = serde_json::from_str(&feed.recv().await.unwrap()).unwrap();
    assert_eq!(first["drones"].as_object().unwrap().len(), 2);

    registry.remove("D2").await.unwrap();
    let next: serde_json::Value = serde_json::from_str(&feed.recv().await.unwrap()).unwrap();
    let drones = next["drones"].as_object().unwrap();
    assert!(drones.contains_key("D1"));
    assert!(!drones.contains_key("D2"));

    status_loop.abort();
}
