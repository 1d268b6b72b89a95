use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Handle naming one live subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Messages a subscriber may fall behind by before its feed is dropped.
pub const DEFAULT_FEED_CAPACITY: usize = 4096;

/// Serialized feed messages, in delivery order.
pub type FeedReceiver = mpsc::Receiver<Arc<str>>;

/// Registry of live subscriber feeds.
///
/// Holds only channel senders keyed by id; the sockets themselves are owned
/// by their forwarding tasks. A feed whose receiver is gone, or that is
/// full because its subscriber stopped reading, is pruned on the next
/// broadcast. Its receiver then drains what was queued and ends.
#[derive(Debug)]
pub struct SubscriberHub {
    next_id: u64,
    capacity: usize,
    feeds: HashMap<SubscriberId, mpsc::Sender<Arc<str>>>,
}

impl Default for SubscriberHub {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }
}

impl SubscriberHub {
    /// A hub whose feeds buffer at most `capacity` undelivered messages.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            next_id: 0,
            capacity: capacity.max(1),
            feeds: HashMap::new(),
        }
    }

    /// Register a feed whose first message is `first`.
    pub fn register(&mut self, first: Arc<str>) -> (SubscriberId, FeedReceiver) {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;

        let (sender, receiver) = mpsc::channel(self.capacity);
        // Fresh channel with capacity of at least one, the send cannot fail.
        let _ = sender.try_send(first);
        self.feeds.insert(id, sender);
        (id, receiver)
    }

    pub fn remove(&mut self, id: SubscriberId) -> bool {
        self.feeds.remove(&id).is_some()
    }

    /// Push to every feed; returns how many feeds are still live.
    pub fn broadcast(&mut self, message: &Arc<str>) -> usize {
        self.feeds.retain(|id, feed| match feed.try_send(Arc::clone(message)) {
            Ok(()) => true,
            Err(TrySendError::Closed(_)) => {
                debug!(subscriber = %id, "dropping closed subscriber feed");
                false
            }
            Err(TrySendError::Full(_)) => {
                warn!(subscriber = %id, "dropping subscriber that stopped reading");
                false
            }
        });
        self.feeds.len()
    }

    /// Drop every feed; receivers observe end-of-stream.
    pub fn clear(&mut self) {
        self.feeds.clear();
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }
}
