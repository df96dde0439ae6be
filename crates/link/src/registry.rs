//! Drone registry
//!
//! Concurrent map of drone identifier to live [`VehicleLink`]. Connection
//! attempts run outside the registry lock; installation happens under it.
//! When two creations for the same id race, the last one to install wins and
//! the displaced link is closed before the new one becomes visible.
//!
//! An explicit [`DroneRegistry::replace`] first takes the current link's
//! command lock, so a reconnect waits for any mission flying on that link.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::controller::LinkConnector;
use crate::error::RegistryError;
use crate::link::VehicleLink;

/// Registry of live vehicle links keyed by drone id
pub struct DroneRegistry {
    links: Mutex<HashMap<String, Arc<VehicleLink>>>,
    connector: Arc<dyn LinkConnector>,
    parameters: Vec<(&'static str, f32)>,
}

impl DroneRegistry {
    /// Create an empty registry
    pub fn new(connector: Arc<dyn LinkConnector>) -> Self {
        Self {
            links: Mutex::new(HashMap::new()),
            connector,
            parameters: Vec::new(),
        }
    }

    /// Parameters written once on every new link
    pub fn with_link_parameters(mut self, parameters: &[(&'static str, f32)]) -> Self {
        self.parameters = parameters.to_vec();
        self
    }

    /// Existing link for `drone_id`, or a freshly connected one.
    ///
    /// A connection failure leaves the registry untouched.
    pub async fn get_or_create(
        &self,
        drone_id: &str,
        descriptor: &str,
    ) -> Result<Arc<VehicleLink>, RegistryError> {
        if let Some(link) = self.get(drone_id).await {
            return Ok(link);
        }
        let link = Arc::new(self.connect(descriptor).await?);
        self.install(drone_id, Arc::clone(&link)).await;
        Ok(link)
    }

    /// Connect a new link and install it, closing any previous one.
    ///
    /// Waits for the previous link's command lock first; the registry lock is
    /// not held while waiting.
    pub async fn replace(
        &self,
        drone_id: &str,
        descriptor: &str,
    ) -> Result<Arc<VehicleLink>, RegistryError> {
        let previous = self.get(drone_id).await;
        let _commands = match &previous {
            Some(link) => {
                info!(drone_id, "waiting for command sequence before reconnecting");
                Some(link.commands().await)
            }
            None => None,
        };

        let link = Arc::new(self.connect(descriptor).await?);
        self.install(drone_id, Arc::clone(&link)).await;
        Ok(link)
    }

    /// Close and deregister a link
    pub async fn remove(&self, drone_id: &str) -> Result<(), RegistryError> {
        let mut links = self.links.lock().await;
        let link = links
            .remove(drone_id)
            .ok_or_else(|| RegistryError::NotRegistered(drone_id.to_string()))?;
        link.close().await;
        info!(drone_id, "drone disconnected");
        Ok(())
    }

    /// Look up a link
    pub async fn get(&self, drone_id: &str) -> Option<Arc<VehicleLink>> {
        self.links.lock().await.get(drone_id).cloned()
    }

    /// Registered drone ids, sorted
    pub async fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.links.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Snapshot of every registered link, sorted by id
    pub async fn snapshot(&self) -> Vec<(String, Arc<VehicleLink>)> {
        let mut entries: Vec<_> = self
            .links
            .lock()
            .await
            .iter()
            .map(|(id, link)| (id.clone(), Arc::clone(link)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Number of registered links
    pub async fn len(&self) -> usize {
        self.links.lock().await.len()
    }

    /// Whether no links are registered
    pub async fn is_empty(&self) -> bool {
        self.links.lock().await.is_empty()
    }

    async fn connect(&self, descriptor: &str) -> Result<VehicleLink, RegistryError> {
        Ok(VehicleLink::establish(self.connector.as_ref(), descriptor, &self.parameters).await?)
    }

    async fn install(&self, drone_id: &str, link: Arc<VehicleLink>) {
        let mut links = self.links.lock().await;
        if let Some(previous) = links.remove(drone_id) {
            if !Arc::ptr_eq(&previous, &link) {
                info!(drone_id, previous = previous.descriptor(), "replacing existing link");
                previous.close().await;
            }
        }
        info!(drone_id, descriptor = link.descriptor(), "drone registered");
        links.insert(drone_id.to_string(), link);
    }
}
