use chrono::{DateTime, Utc};
use std::sync::Arc;

use skydrop_broadcast::Broadcaster;
use skydrop_core::MissionControlConfig;
use skydrop_link::{DroneRegistry, LinkConnector, SimConnector};
use skydrop_mission::{HttpOrdersClient, MissionRunner, MissionStore};

use crate::config::ServiceConfig;
use crate::error::StartupError;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<MissionRunner>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(runner: Arc<MissionRunner>) -> Self {
        Self {
            runner,
            started_at: Utc::now(),
        }
    }

    /// Wire the registry, store, orders client and broadcaster for a process
    pub fn from_config(
        service: &ServiceConfig,
        mission: MissionControlConfig,
    ) -> Result<Self, StartupError> {
        let connector: Arc<dyn LinkConnector> = Arc::new(SimConnector::default());
        let mut registry = DroneRegistry::new(connector);
        if let Some(parameters) = mission.nav_speeds.parameters() {
            registry = registry.with_link_parameters(&parameters);
        }

        let store = MissionStore::open(&service.database_path)?;
        let orders = HttpOrdersClient::new(service.orders_api_base.clone())?;

        let runner = MissionRunner::new(
            Arc::new(mission),
            Arc::new(registry),
            Arc::new(store),
            Arc::new(orders),
            Arc::new(Broadcaster::new()),
        );
        Ok(Self::new(Arc::new(runner)))
    }

    pub fn registry(&self) -> &Arc<DroneRegistry> {
        self.runner.registry()
    }

    pub fn store(&self) -> &Arc<MissionStore> {
        self.runner.store()
    }

    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        self.runner.broadcaster()
    }
}
