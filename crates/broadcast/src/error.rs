//! Broadcast error types

use thiserror::Error;

/// Failure to deliver an event to one subscriber
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BroadcastError {
    /// The subscriber's connection is gone
    #[error("Subscriber {0} closed")]
    SubscriberClosed(u64),

    /// The subscriber is not draining its queue
    #[error("Subscriber {0} is lagging")]
    SubscriberLagging(u64),
}
