//! Mission runner
//!
//! Accepts launch requests, records them, and runs each mission on its own
//! task. A per-mission supervisor consumes the executor's milestones and
//! turns them into record updates, orders notifications and feed events, so
//! events for one mission are always published in the order
//! `arrived_at_block`, `order_delivered`, then `mission_completed` or
//! `mission_failed`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use skydrop_broadcast::{Broadcaster, FeedEvent, OrderRef};
use skydrop_core::MissionControlConfig;
use skydrop_link::{DroneRegistry, VehicleLink};

use crate::error::{LaunchError, MissionError};
use crate::executor;
use crate::machine::{MissionMachine, Milestone};
use crate::orders::OrdersNotifier;
use crate::store::{MissionId, MissionStore};

/// Block name recorded for return-home missions
pub const HOME_BLOCK: &str = "HOME";

/// Launch request as received from operators
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchRequest {
    pub drone_id: String,
    pub connection_string: String,
    pub block: String,
    #[serde(default)]
    pub order_id: Option<String>,
}

/// Immediate answer to an accepted launch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchAck {
    pub status: String,
    pub mission_id: MissionId,
}

/// How a mission ended
#[derive(Debug, Clone, PartialEq)]
pub enum MissionOutcome {
    Completed,
    Failed(String),
}

/// Starts and tracks missions
pub struct MissionRunner {
    config: Arc<MissionControlConfig>,
    registry: Arc<DroneRegistry>,
    store: Arc<MissionStore>,
    orders: Arc<dyn OrdersNotifier>,
    broadcaster: Arc<Broadcaster>,
    tasks: Mutex<HashMap<MissionId, JoinHandle<MissionOutcome>>>,
}

impl MissionRunner {
    pub fn new(
        config: Arc<MissionControlConfig>,
        registry: Arc<DroneRegistry>,
        store: Arc<MissionStore>,
        orders: Arc<dyn OrdersNotifier>,
        broadcaster: Arc<Broadcaster>,
    ) -> Self {
        Self {
            config,
            registry,
            store,
            orders,
            broadcaster,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &MissionControlConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<DroneRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<MissionStore> {
        &self.store
    }

    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    /// Validate, record and start a delivery.
    ///
    /// Returns as soon as the mission task is spawned; the outcome is only
    /// visible through the feed, the record store, or [`MissionRunner::wait`].
    pub async fn launch(&self, request: LaunchRequest) -> Result<LaunchAck, LaunchError> {
        let target = self.config.blocks.get(&request.block).ok_or_else(|| {
            LaunchError::UnknownBlock(
                request.block.clone(),
                self.config.blocks.names().collect::<Vec<_>>().join(", "),
            )
        })?;

        let link = self
            .registry
            .get_or_create(&request.drone_id, &request.connection_string)
            .await?;

        let mission_id =
            self.store
                .create(&request.drone_id, &request.block, request.order_id.as_deref())?;

        let machine = MissionMachine::delivery(&self.config, request.block.clone(), target);
        self.spawn(
            Supervisor {
                mission_id,
                drone_id: request.drone_id.clone(),
                block: request.block,
                external_order: request.order_id,
                store: Arc::clone(&self.store),
                orders: Arc::clone(&self.orders),
                broadcaster: Arc::clone(&self.broadcaster),
            },
            link,
            machine,
        );

        info!(mission_id, drone_id = %request.drone_id, "mission launched");
        Ok(LaunchAck {
            status: format!("Mission started for drone {}", request.drone_id),
            mission_id,
        })
    }

    /// Fly a connected drone back to its mission home and land
    pub async fn return_home(&self, drone_id: &str) -> Result<LaunchAck, LaunchError> {
        let link = self
            .registry
            .get(drone_id)
            .await
            .filter(|link| link.is_connected())
            .ok_or_else(|| LaunchError::NotConnected(drone_id.to_string()))?;

        let mission_id = self.store.create(drone_id, HOME_BLOCK, None)?;
        let machine = MissionMachine::return_home(&self.config, link.mission_home());
        self.spawn(
            Supervisor {
                mission_id,
                drone_id: drone_id.to_string(),
                block: HOME_BLOCK.to_string(),
                external_order: None,
                store: Arc::clone(&self.store),
                orders: Arc::clone(&self.orders),
                broadcaster: Arc::clone(&self.broadcaster),
            },
            link,
            machine,
        );

        info!(mission_id, drone_id, "return home launched");
        Ok(LaunchAck {
            status: format!("Return home started for drone {}", drone_id),
            mission_id,
        })
    }

    /// Wait for a mission started by this runner; `None` if unknown or
    /// already awaited
    pub async fn wait(&self, mission_id: MissionId) -> Option<MissionOutcome> {
        let handle = self.lock_tasks().remove(&mission_id)?;
        Some(
            handle
                .await
                .unwrap_or_else(|e| MissionOutcome::Failed(format!("supervisor task ended: {}", e))),
        )
    }

    /// Missions whose task is still running
    pub fn active_missions(&self) -> Vec<MissionId> {
        let mut ids: Vec<MissionId> = self
            .lock_tasks()
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    fn spawn(&self, supervisor: Supervisor, link: Arc<VehicleLink>, machine: MissionMachine) {
        let mission_id = supervisor.mission_id;
        let handle = tokio::spawn(supervisor.run(link, machine));

        // Finished handles stay until `wait` collects their outcome
        self.lock_tasks().insert(mission_id, handle);
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, HashMap<MissionId, JoinHandle<MissionOutcome>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Everything one mission needs to report its progress
struct Supervisor {
    mission_id: MissionId,
    drone_id: String,
    block: String,
    external_order: Option<String>,
    store: Arc<MissionStore>,
    orders: Arc<dyn OrdersNotifier>,
    broadcaster: Arc<Broadcaster>,
}

impl Supervisor {
    async fn run(self, link: Arc<VehicleLink>, machine: MissionMachine) -> MissionOutcome {
        let (tx, mut rx) = mpsc::channel(8);
        let mission = tokio::spawn(executor::execute(link, machine, tx));

        // Channel closes when the executor returns
        while let Some(milestone) = rx.recv().await {
            self.on_milestone(milestone).await;
        }

        let result = match mission.await {
            Ok(result) => result,
            Err(e) => Err(MissionError::Aborted(e.to_string())),
        };
        self.finish(result)
    }

    async fn on_milestone(&self, milestone: Milestone) {
        match milestone {
            Milestone::Arrived => {
                info!(mission_id = self.mission_id, block = %self.block, "arrived at block");
                self.broadcaster.publish(&FeedEvent::ArrivedAtBlock {
                    drone_id: self.drone_id.clone(),
                    order_id: OrderRef::Mission(self.mission_id),
                    block: self.block.clone(),
                });
            }
            Milestone::Delivered => {
                if let Err(e) = self.store.mark_delivered(self.mission_id) {
                    error!(mission_id = self.mission_id, "failed to record delivery: {}", e);
                }

                let order_id = match &self.external_order {
                    Some(external) => {
                        if let Err(e) = self.orders.mark_delivered(external).await {
                            warn!(mission_id = self.mission_id, order_id = %external, "orders service update failed: {}", e);
                        }
                        OrderRef::External(external.clone())
                    }
                    None => OrderRef::Mission(self.mission_id),
                };

                info!(mission_id = self.mission_id, "payload delivered");
                self.broadcaster.publish(&FeedEvent::OrderDelivered {
                    drone_id: self.drone_id.clone(),
                    order_id,
                });
            }
        }
    }

    fn finish(&self, result: Result<(), MissionError>) -> MissionOutcome {
        match result {
            Ok(()) => {
                if let Err(e) = self.store.mark_completed(self.mission_id) {
                    error!(mission_id = self.mission_id, "failed to record completion: {}", e);
                }
                info!(mission_id = self.mission_id, drone_id = %self.drone_id, "mission completed");
                self.broadcaster.publish(&FeedEvent::MissionCompleted {
                    drone_id: self.drone_id.clone(),
                    order_id: OrderRef::Mission(self.mission_id),
                    block: self.block.clone(),
                });
                MissionOutcome::Completed
            }
            Err(e) => {
                let reason = e.to_string();
                if let Err(store_err) = self.store.mark_failed(self.mission_id, &reason) {
                    error!(mission_id = self.mission_id, "failed to record failure: {}", store_err);
                }
                error!(mission_id = self.mission_id, drone_id = %self.drone_id, "mission failed: {}", reason);
                self.broadcaster.publish(&FeedEvent::MissionFailed {
                    drone_id: self.drone_id.clone(),
                    order_id: OrderRef::Mission(self.mission_id),
                    error: reason.clone(),
                });
                MissionOutcome::Failed(reason)
            }
        }
    }
}
