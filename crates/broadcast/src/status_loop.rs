//! Periodic status feed
//!
//! Polls every registered link on a fixed tick and publishes one aggregate
//! `status_update`. Telemetry reads never take a link's command lock, so the
//! loop keeps running while missions are in flight.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use skydrop_link::DroneRegistry;

use crate::broadcaster::Broadcaster;
use crate::schema::FeedEvent;

/// Tick of the status feed
pub const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_secs(2);

/// Build one `status_update` from the links currently registered
pub async fn status_snapshot(registry: &DroneRegistry) -> FeedEvent {
    let mut drones = BTreeMap::new();
    for (drone_id, link) in registry.snapshot().await {
        if link.is_connected() {
            drones.insert(drone_id, link.status().await);
        }
    }
    FeedEvent::StatusUpdate {
        drones,
        timestamp: Utc::now().to_rfc3339(),
    }
}

/// Run the status feed until the returned handle is aborted
pub fn spawn_status_loop(
    registry: Arc<DroneRegistry>,
    broadcaster: Arc<Broadcaster>,
    interval: Duration,
) -> JoinHandle<()> {
    info!(interval_ms = interval.as_millis() as u64, "status feed started");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let event = status_snapshot(&registry).await;
            let delivered = broadcaster.publish(&event);
            debug!(delivered, "status update sent");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use skydrop_link::{SimConnector, SimProfile};

    fn registry() -> Arc<DroneRegistry> {
        Arc::new(DroneRegistry::new(Arc::new(SimConnector::new(
            SimProfile::default(),
        ))))
    }

    #[tokio::test]
    async fn test_snapshot_skips_closed_links() {
        let registry = registry();
        registry.get_or_create("D1", "sim://1").await.unwrap();
        let closed = registry.get_or_create("D2", "sim://2").await.unwrap();
        closed.close().await;

        let FeedEvent::StatusUpdate { drones, timestamp } = status_snapshot(&registry).await else {
            panic!("expected a status update");
        };
        assert_eq!(drones.keys().collect::<Vec<_>>(), vec!["D1"]);
        assert_eq!(drones["D1"].connection_string, "sim://1");
        assert!(chrono::DateTime::parse_from_rfc3339(&timestamp).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_publishes_on_every_tick() {
        let registry = registry();
        registry.get_or_create("D1", "sim://1").await.unwrap();
        let broadcaster = Arc::new(Broadcaster::new());
        let (_id, mut rx) = broadcaster.subscribe_channel();

        let handle = spawn_status_loop(registry, broadcaster, DEFAULT_STATUS_INTERVAL);

        for _ in 0..3 {
            let message = rx.recv().await.unwrap();
            let value: serde_json::Value = serde_json::from_str(&message).unwrap();
            assert_eq!(value["type"], "status_update");
            assert_eq!(value["drones"]["D1"]["mode"], "STABILIZE");
        }
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_runs_without_subscribers_or_drones() {
        let broadcaster = Arc::new(Broadcaster::new());
        let handle = spawn_status_loop(registry(), broadcaster.clone(), DEFAULT_STATUS_INTERVAL);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!handle.is_finished());

        let (_id, mut rx) = broadcaster.subscribe_channel();
        let message = rx.recv().await.unwrap();
        assert!(message.contains("\"drones\":{}"));
        handle.abort();
    }
}
