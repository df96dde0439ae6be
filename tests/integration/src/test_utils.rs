//! Shared fixtures for the end-to-end scenarios

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::Receiver;

use skydrop_broadcast::Broadcaster;
use skydrop_core::MissionControlConfig;
use skydrop_link::{DroneRegistry, SimConnector, SimProfile};
use skydrop_mission::{
    LaunchRequest, MissionRunner, MissionStore, NotifyError, OrdersNotifier,
};

/// Orders collaborator double that records every delivered order id
#[derive(Default)]
pub struct RecordingOrders {
    delivered: Mutex<Vec<String>>,
}

impl RecordingOrders {
    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrdersNotifier for RecordingOrders {
    async fn mark_delivered(&self, order_id: &str) -> Result<(), NotifyError> {
        self.delivered.lock().unwrap().push(order_id.to_string());
        Ok(())
    }
}

/// Runner wired to simulated vehicles, an in-memory store and a recording
/// orders double
pub struct Harness {
    pub runner: Arc<MissionRunner>,
    pub connector: Arc<SimConnector>,
    pub orders: Arc<RecordingOrders>,
}

impl Harness {
    pub fn new(config: MissionControlConfig, profile: SimProfile) -> Self {
        let connector = Arc::new(SimConnector::new(profile));
        let orders = Arc::new(RecordingOrders::default());
        let runner = MissionRunner::new(
            Arc::new(config),
            Arc::new(DroneRegistry::new(connector.clone())),
            Arc::new(MissionStore::open_in_memory().unwrap()),
            orders.clone(),
            Arc::new(Broadcaster::new()),
        );
        Self {
            runner: Arc::new(runner),
            connector,
            orders,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(MissionControlConfig::default(), SimProfile::default())
    }

    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        self.runner.broadcaster()
    }

    /// New channel subscriber on the feed
    pub fn subscribe(&self) -> Receiver<String> {
        self.broadcaster().subscribe_channel().1
    }
}

pub fn launch_request(drone_id: &str, descriptor: &str, block: &str, order_id: Option<&str>) -> LaunchRequest {
    LaunchRequest {
        drone_id: drone_id.to_string(),
        connection_string: descriptor.to_string(),
        block: block.to_string(),
        order_id: order_id.map(str::to_string),
    }
}

/// Every event already queued on `rx`
pub fn drain(rx: &mut Receiver<String>) -> Vec<Value> {
    let mut events = Vec::new();
    while let Ok(message) = rx.try_recv() {
        events.push(serde_json::from_str(&message).unwrap());
    }
    events
}

pub fn event_types(events: &[Value]) -> Vec<String> {
    events
        .iter()
        .map(|event| event["type"].as_str().unwrap_or_default().to_string())
        .collect()
}

/// Mission events only, skipping periodic status updates
pub fn mission_events(events: &[Value]) -> Vec<Value> {
    events
        .iter()
        .filter(|event| event["type"] != "status_update")
        .cloned()
        .collect()
}

/// Configuration that completes a mission in well under a second of wall time
pub fn fast_config() -> MissionControlConfig {
    let mut config = MissionControlConfig::default();
    config.flight.poll_interval_ms = 20;
    config.payload.hold_ms = 40;
    config.payload.rearm_delay_ms = 0;
    config
}

/// Simulated vehicle fast enough for wall-clock tests
pub fn fast_profile() -> SimProfile {
    SimProfile {
        horizontal_speed_dps: 0.02,
        climb_rate_mps: 200.0,
        descent_rate_mps: 200.0,
        ..SimProfile::default()
    }
}

pub const WALL_CLOCK_LIMIT: Duration = Duration::from_secs(20);
