//! Resource subscriptions.
//!
//! The manager keeps at most one bounded channel per `(uri, client_id)`
//! pair. Delivery never blocks: a full buffer drops the notification and a
//! closed channel is skipped. Every subscription owns a cancellation token
//! that is cancelled when the subscription is removed, replaced or shut
//! down, so a watcher task can never outlive its subscription.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::mcp::protocol::OutgoingNotification;

/// Default per-subscriber buffer size.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 10;

/// Where watchers forward drained notifications for delivery to the client.
pub type NotificationOutlet = mpsc::UnboundedSender<OutgoingNotification>;

/// Outcome of a single non-blocking delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The notification was buffered.
    Delivered,
    /// The buffer was full; the notification was discarded.
    Dropped,
    /// The subscription no longer exists.
    Closed,
}

/// Counts from a fan-out [`SubscriptionManager::publish`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers that buffered the notification.
    pub delivered: usize,
    /// Subscribers whose buffer was full.
    pub dropped: usize,
    /// Subscribers whose receiving side had gone away.
    pub closed: usize,
}

struct Subscription {
    sender: mpsc::Sender<OutgoingNotification>,
    token: CancellationToken,
}

impl Subscription {
    fn close(self) {
        self.token.cancel();
        // Dropping the only strong sender closes the channel.
    }
}

/// Receiving side of one subscription.
///
/// Holds only a weak handle to the sender, so the channel closes as soon
/// as the manager forgets the subscription.
#[derive(Debug)]
pub struct SubscriptionStream {
    uri: String,
    client_id: String,
    receiver: mpsc::Receiver<OutgoingNotification>,
    sender: mpsc::WeakSender<OutgoingNotification>,
    token: CancellationToken,
}

impl SubscriptionStream {
    /// The subscribed URI.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The subscribing client.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Token cancelled when this subscription ends.
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Receives the next notification.
    ///
    /// Returns `None` once the subscription is closed and the buffer drained.
    pub async fn recv(&mut self) -> Option<OutgoingNotification> {
        self.receiver.recv().await
    }

    /// Receives a buffered notification without waiting.
    pub fn try_recv(&mut self) -> Option<OutgoingNotification> {
        self.receiver.try_recv().ok()
    }

    /// Delivers a notification to this subscription's own buffer.
    pub fn deliver(&self, notification: OutgoingNotification) -> Delivery {
        if self.token.is_cancelled() {
            return Delivery::Closed;
        }
        match self.sender.upgrade() {
            Some(sender) => try_deliver(&sender, notification),
            None => Delivery::Closed,
        }
    }
}

fn try_deliver(
    sender: &mpsc::Sender<OutgoingNotification>,
    notification: OutgoingNotification,
) -> Delivery {
    match sender.try_send(notification) {
        Ok(()) => Delivery::Delivered,
        Err(TrySendError::Full(_)) => Delivery::Dropped,
        Err(TrySendError::Closed(_)) => Delivery::Closed,
    }
}

/// Concurrent map of `uri -> client_id -> subscription`.
pub struct SubscriptionManager {
    capacity: usize,
    subscriptions: RwLock<HashMap<String, HashMap<String, Subscription>>>,
}

impl SubscriptionManager {
    /// Creates a manager whose channels buffer `capacity` notifications.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            subscriptions: RwLock::new(HashMap::new()),
        }
    }

    /// Per-subscriber buffer size.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Subscribes `client_id` to `uri`.
    ///
    /// An existing subscription for the same pair is closed and its token
    /// cancelled before the new one is installed.
    pub fn subscribe(&self, uri: &str, client_id: &str) -> SubscriptionStream {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let token = CancellationToken::new();
        let weak = sender.downgrade();

        let previous = self
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(uri.to_string())
            .or_default()
            .insert(
                client_id.to_string(),
                Subscription {
                    sender,
                    token: token.clone(),
                },
            );

        if let Some(previous) = previous {
            debug!(uri, client_id, "Replacing existing subscription");
            previous.close();
        }

        SubscriptionStream {
            uri: uri.to_string(),
            client_id: client_id.to_string(),
            receiver,
            sender: weak,
            token,
        }
    }

    /// Removes a subscription and closes its channel.
    ///
    /// Returns `false` if the pair was not subscribed.
    pub fn unsubscribe(&self, uri: &str, client_id: &str) -> bool {
        let removed = {
            let mut subscriptions = self
                .subscriptions
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let Some(clients) = subscriptions.get_mut(uri) else {
                return false;
            };
            let removed = clients.remove(client_id);
            if clients.is_empty() {
                subscriptions.remove(uri);
            }
            removed
        };

        removed.map(Subscription::close).is_some()
    }

    /// Delivers a notification to every subscriber of `uri` without blocking.
    pub fn publish(&self, uri: &str, notification: &OutgoingNotification) -> PublishReport {
        let subscriptions = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut report = PublishReport::default();

        let Some(clients) = subscriptions.get(uri) else {
            return report;
        };

        for (client_id, subscription) in clients {
            match try_deliver(&subscription.sender, notification.clone()) {
                Delivery::Delivered => report.delivered += 1,
                Delivery::Dropped => {
                    debug!(uri, client_id, "Subscriber buffer full, notification dropped");
                    report.dropped += 1;
                }
                Delivery::Closed => report.closed += 1,
            }
        }

        report
    }

    /// Delivers a notification to one subscriber without blocking.
    pub fn notify(
        &self,
        uri: &str,
        client_id: &str,
        notification: OutgoingNotification,
    ) -> Delivery {
        let subscriptions = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        subscriptions
            .get(uri)
            .and_then(|clients| clients.get(client_id))
            .map_or(Delivery::Closed, |subscription| {
                try_deliver(&subscription.sender, notification)
            })
    }

    /// Returns the client ids subscribed to `uri`, sorted.
    #[must_use]
    pub fn list_subscribers(&self, uri: &str) -> Vec<String> {
        let subscriptions = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let mut clients: Vec<String> = subscriptions
            .get(uri)
            .map(|clients| clients.keys().cloned().collect())
            .unwrap_or_default();
        clients.sort();
        clients
    }

    /// Returns `true` if `uri` has at least one subscriber.
    #[must_use]
    pub fn has_subscribers(&self, uri: &str) -> bool {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(uri)
    }

    /// Closes every subscription and cancels every watcher.
    pub fn shutdown(&self) {
        let drained = std::mem::take(
            &mut *self
                .subscriptions
                .write()
                .unwrap_or_else(PoisonError::into_inner),
        );

        let count: usize = drained.values().map(HashMap::len).sum();
        for subscription in drained.into_values().flat_map(HashMap::into_values) {
            subscription.close();
        }
        debug!(count, "Closed all subscriptions");
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl std::fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscriptions = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("SubscriptionManager")
            .field("capacity", &self.capacity)
            .field("uris", &subscriptions.len())
            .finish()
    }
}

/// Spawns the watcher for one subscription.
///
/// Every `period` the watcher pushes `notifications/resources/updated` into
/// its own subscriber's buffer and stops once that buffer is full or closed.
/// With an outlet attached it also drains the buffer into the outlet. It
/// exits as soon as the subscription's token is cancelled.
pub fn spawn_watcher(
    mut stream: SubscriptionStream,
    period: Duration,
    outlet: Option<NotificationOutlet>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let token = stream.token().clone();

        loop {
            tokio::select! {
                biased;

                () = token.cancelled() => break,

                Some(notification) = stream.recv(), if outlet.is_some() => {
                    if let Some(outlet) = &outlet {
                        if outlet.send(notification).is_err() {
                            break;
                        }
                    }
                }

                _ = ticker.tick() => {
                    let update = OutgoingNotification::resource_updated(stream.uri());
                    match stream.deliver(update) {
                        Delivery::Delivered => {}
                        Delivery::Dropped => {
                            debug!(uri = stream.uri(), client_id = stream.client_id(), "Subscriber not draining, stopping watcher");
                            break;
                        }
                        Delivery::Closed => break,
                    }
                }
            }
        }

        trace!(uri = stream.uri(), client_id = stream.client_id(), "Watcher stopped");
    })
}
