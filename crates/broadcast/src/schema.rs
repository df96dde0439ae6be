//! Wire schema of the live event feed.
//!
//! Every event is a JSON object tagged by `type`. Field names are snake_case
//! and stable; dashboard clients key on them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use skydrop_link::DroneStatus;

/// Order reference carried by mission events.
///
/// Locally created missions are referred to by their numeric id; deliveries
/// launched on behalf of the Orders service carry the external order id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderRef {
    /// Mission record id
    Mission(i64),
    /// External order id
    External(String),
}

impl From<i64> for OrderRef {
    fn from(id: i64) -> Self {
        OrderRef::Mission(id)
    }
}

impl From<String> for OrderRef {
    fn from(id: String) -> Self {
        OrderRef::External(id)
    }
}

/// Event pushed to feed subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FeedEvent {
    /// Aggregate status of every connected drone.
    #[serde(rename = "status_update")]
    StatusUpdate {
        /// Status keyed by drone id.
        drones: BTreeMap<String, DroneStatus>,
        /// RFC 3339 UTC timestamp of the snapshot.
        timestamp: String,
    },

    /// Outbound leg reached its delivery block.
    #[serde(rename = "arrived_at_block")]
    ArrivedAtBlock {
        /// Drone identifier.
        drone_id: String,
        /// Mission record id.
        order_id: OrderRef,
        /// Delivery block name.
        block: String,
    },

    /// Payload release confirmed.
    #[serde(rename = "order_delivered")]
    OrderDelivered {
        /// Drone identifier.
        drone_id: String,
        /// External order id if one was supplied, else the mission id.
        order_id: OrderRef,
    },

    /// Mission landed and disarmed back home.
    #[serde(rename = "mission_completed")]
    MissionCompleted {
        /// Drone identifier.
        drone_id: String,
        /// Mission record id.
        order_id: OrderRef,
        /// Delivery block name.
        block: String,
    },

    /// Mission aborted on an unrecovered error.
    #[serde(rename = "mission_failed")]
    MissionFailed {
        /// Drone identifier.
        drone_id: String,
        /// Mission record id.
        order_id: OrderRef,
        /// Failure reason.
        error: String,
    },
}

impl FeedEvent {
    /// Wire `type` tag of the event.
    pub fn kind(&self) -> &'static str {
        match self {
            FeedEvent::StatusUpdate { .. } => "status_update",
            FeedEvent::ArrivedAtBlock { .. } => "arrived_at_block",
            FeedEvent::OrderDelivered { .. } => "order_delivered",
            FeedEvent::MissionCompleted { .. } => "mission_completed",
            FeedEvent::MissionFailed { .. } => "mission_failed",
        }
    }
}
