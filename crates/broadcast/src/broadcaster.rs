//! Subscriber set and fan-out

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

use crate::error::BroadcastError;
use crate::schema::FeedEvent;

/// Identifier handed out on subscription
pub type SubscriberId = u64;

/// Destination for serialized feed events
///
/// `send` must not block; a subscriber that cannot accept a message right now
/// reports an error and is dropped by the broadcaster.
pub trait Subscriber: Send + Sync {
    /// Deliver one serialized event
    fn send(&self, message: &str) -> Result<(), BroadcastError>;
}

/// Subscriber backed by a bounded channel drained by a connection task
pub struct ChannelSubscriber {
    id: SubscriberId,
    tx: mpsc::Sender<String>,
}

impl ChannelSubscriber {
    /// Wrap the sending half of a connection's outbound queue
    pub fn new(id: SubscriberId, tx: mpsc::Sender<String>) -> Self {
        Self { id, tx }
    }
}

impl Subscriber for ChannelSubscriber {
    fn send(&self, message: &str) -> Result<(), BroadcastError> {
        self.tx.try_send(message.to_string()).map_err(|e| match e {
            TrySendError::Full(_) => BroadcastError::SubscriberLagging(self.id),
            TrySendError::Closed(_) => BroadcastError::SubscriberClosed(self.id),
        })
    }
}

/// Fan-out of feed events to every live subscriber
#[derive(Default)]
pub struct Broadcaster {
    subscribers: Mutex<Vec<(SubscriberId, Arc<dyn Subscriber>)>>,
    next_id: AtomicU64,
}

impl Broadcaster {
    /// Queue depth of subscribers created by [`Broadcaster::subscribe_channel`]
    pub const CHANNEL_CAPACITY: usize = 64;

    /// Create a broadcaster with no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an accepted connection
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>) -> SubscriberId {
        let id = self.allocate_id();
        self.lock().push((id, subscriber));
        info!(subscriber = id, "subscriber added");
        id
    }

    /// Register a channel-backed subscriber and return its receiving end
    ///
    /// The receiver yields `None` once the subscriber has been dropped.
    pub fn subscribe_channel(&self) -> (SubscriberId, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(Self::CHANNEL_CAPACITY);
        let id = self.allocate_id();
        self.lock()
            .push((id, Arc::new(ChannelSubscriber::new(id, tx))));
        info!(subscriber = id, "subscriber added");
        (id, rx)
    }

    /// Remove a subscriber; unknown ids are ignored
    pub fn unsubscribe(&self, id: SubscriberId) {
        let mut subscribers = self.lock();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        if subscribers.len() != before {
            info!(subscriber = id, "subscriber removed");
        }
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    /// Send an event to every subscriber.
    ///
    /// Returns the number of subscribers that accepted it. Subscribers whose
    /// send failed are removed once the pass is over.
    pub fn publish(&self, event: &FeedEvent) -> usize {
        let message = match serde_json::to_string(event) {
            Ok(m) => m,
            Err(e) => {
                error!(kind = event.kind(), "failed to serialize event: {}", e);
                return 0;
            }
        };

        let targets: Vec<(SubscriberId, Arc<dyn Subscriber>)> = self.lock().clone();
        let mut failed = Vec::new();
        for (id, subscriber) in &targets {
            if let Err(e) = subscriber.send(&message) {
                warn!(subscriber = id, kind = event.kind(), "send failed: {}", e);
                failed.push(*id);
            }
        }

        if !failed.is_empty() {
            self.lock().retain(|(id, _)| !failed.contains(id));
            info!(removed = failed.len(), "dropped failed subscribers");
        }

        let delivered = targets.len() - failed.len();
        debug!(kind = event.kind(), delivered, "event published");
        delivered
    }

    fn allocate_id(&self) -> SubscriberId {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriberId, Arc<dyn Subscriber>)>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
