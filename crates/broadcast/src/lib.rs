//! Live event feed for skydrop
//!
//! Operators watch missions through a stream of JSON events:
//! - periodic `status_update` snapshots of every registered drone
//! - `arrived_at_block`, `order_delivered`, `mission_completed` and
//!   `mission_failed` milestones pushed as missions progress
//!
//! The [`Broadcaster`] owns the set of live subscribers. A failed send never
//! interrupts delivery to the others; failed subscribers are dropped after the
//! pass.

#![warn(missing_docs)]

pub mod broadcaster;
pub mod error;
pub mod schema;
pub mod status_loop;

pub use broadcaster::{Broadcaster, ChannelSubscriber, Subscriber, SubscriberId};
pub use error::BroadcastError;
pub use schema::{FeedEvent, OrderRef};
pub use status_loop::{spawn_status_loop, status_snapshot, DEFAULT_STATUS_INTERVAL};
