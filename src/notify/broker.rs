//! In-process publish/subscribe registry for live notifications.
//!
//! Delivery is best effort: every subscriber owns a bounded mailbox and a
//! publish that finds it full drops the event for that subscriber instead of
//! waiting.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

use crate::db::Notification;

#[derive(Debug)]
struct Mailbox {
    id: u64,
    sender: mpsc::Sender<Notification>,
}

/// Registry of live notification subscribers, keyed by recipient.
#[derive(Debug)]
pub struct NotificationBroker {
    capacity: usize,
    next_id: AtomicU64,
    subscribers: RwLock<HashMap<i64, Vec<Mailbox>>>,
}

impl NotificationBroker {
    /// Create a broker whose mailboxes hold at most `capacity` pending events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            next_id: AtomicU64::new(1),
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new mailbox for `recipient_id`.
    ///
    /// The returned [`Subscription`] removes itself from the registry when it
    /// is unsubscribed or dropped.
    pub fn subscribe(self: &Arc<Self>, recipient_id: i64) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.capacity);

        {
            let mut subscribers = self
                .subscribers
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            subscribers
                .entry(recipient_id)
                .or_default()
                .push(Mailbox { id, sender });
        }

        debug!(recipient_id, subscription_id = id, "Notification subscriber added");

        Subscription {
            broker: Arc::clone(self),
            recipient_id,
            id,
            receiver,
            active: true,
        }
    }

    /// Offer `notification` to every mailbox of `recipient_id` without waiting.
    ///
    /// Returns the number of mailboxes that accepted it. Nobody listening and
    /// full mailboxes are not errors.
    pub fn publish(&self, recipient_id: i64, notification: &Notification) -> usize {
        let subscribers = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(mailboxes) = subscribers.get(&recipient_id) else {
            return 0;
        };

        let mut delivered = 0;
        for mailbox in mailboxes {
            match mailbox.sender.try_send(notification.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    debug!(
                        recipient_id,
                        subscription_id = mailbox.id,
                        notification_id = notification.id,
                        "Mailbox full, dropping notification"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(
                        recipient_id,
                        subscription_id = mailbox.id,
                        "Mailbox closed, skipping"
                    );
                }
            }
        }
        delivered
    }

    /// Number of live mailboxes for `recipient_id`.
    #[must_use]
    pub fn subscriber_count(&self, recipient_id: i64) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&recipient_id)
            .map_or(0, Vec::len)
    }

    fn remove(&self, recipient_id: i64, id: u64) {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(mailboxes) = subscribers.get_mut(&recipient_id) {
            mailboxes.retain(|mailbox| mailbox.id != id);
            if mailboxes.is_empty() {
                subscribers.remove(&recipient_id);
            }
        }
    }
}

/// A live mailbox registered with a [`NotificationBroker`].
#[derive(Debug)]
pub struct Subscription {
    broker: Arc<NotificationBroker>,
    recipient_id: i64,
    id: u64,
    receiver: mpsc::Receiver<Notification>,
    active: bool,
}

impl Subscription {
    #[must_use]
    pub const fn recipient_id(&self) -> i64 {
        self.recipient_id
    }

    /// Wait for the next notification.
    ///
    /// Returns `None` once unsubscribed and drained.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.receiver.recv().await
    }

    /// Take a pending notification without waiting.
    pub fn try_recv(&mut self) -> Option<Notification> {
        self.receiver.try_recv().ok()
    }

    /// Leave the registry and close the mailbox. Safe to call repeatedly.
    pub fn unsubscribe(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        // Registry removal completes under the write lock before the mailbox
        // closes, so no publish can target a released mailbox.
        self.broker.remove(self.recipient_id, self.id);
        self.receiver.close();

        debug!(
            recipient_id = self.recipient_id,
            subscription_id = self.id,
            "Notification subscriber removed"
        );
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
