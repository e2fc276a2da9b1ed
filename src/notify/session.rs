//! One live notification stream per connected viewer.

use std::sync::Arc;
use std::time::Duration;

use futures_util::Stream;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::broker::{NotificationBroker, Subscription};
use crate::db::Notification;

/// A frame emitted on a notification stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Connected,
    Ping,
    Notification(Notification),
}

impl Frame {
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Ping => "ping",
            Self::Notification(_) => "notification",
        }
    }

    /// JSON payload for the frame.
    #[must_use]
    pub fn payload(&self) -> String {
        match self {
            Self::Connected => r#"{"status":"ok"}"#.to_string(),
            Self::Ping => "{}".to_string(),
            Self::Notification(notification) => {
                serde_json::to_string(notification).unwrap_or_else(|_| "{}".to_string())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Streaming,
    Closed,
}

enum Wake {
    Heartbeat,
    Mailbox(Option<Notification>),
    Shutdown,
}

/// Drives one viewer's stream: connect, then heartbeats and notifications
/// until the shutdown token fires or the session is dropped.
///
/// The subscription is released on every exit path, including when the
/// transport drops the session mid-wait.
#[derive(Debug)]
pub struct StreamSession {
    broker: Arc<NotificationBroker>,
    recipient_id: i64,
    state: SessionState,
    subscription: Option<Subscription>,
    heartbeat: Interval,
    shutdown: CancellationToken,
}

impl StreamSession {
    #[must_use]
    pub fn new(
        broker: Arc<NotificationBroker>,
        recipient_id: i64,
        heartbeat_every: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        let mut heartbeat = time::interval_at(Instant::now() + heartbeat_every, heartbeat_every);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            broker,
            recipient_id,
            state: SessionState::Connecting,
            subscription: None,
            heartbeat,
            shutdown,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Produce the next frame, or `None` once the session is closed.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        match self.state {
            SessionState::Connecting => {
                if self.shutdown.is_cancelled() {
                    self.close();
                    return None;
                }
                self.subscription = Some(self.broker.subscribe(self.recipient_id));
                self.state = SessionState::Streaming;
                debug!(recipient_id = self.recipient_id, "Notification stream connected");
                Some(Frame::Connected)
            }
            SessionState::Streaming => {
                let Some(subscription) = self.subscription.as_mut() else {
                    self.close();
                    return None;
                };

                let wake = tokio::select! {
                    () = self.shutdown.cancelled() => Wake::Shutdown,
                    _ = self.heartbeat.tick() => Wake::Heartbeat,
                    received = subscription.recv() => Wake::Mailbox(received),
                };

                match wake {
                    Wake::Heartbeat => Some(Frame::Ping),
                    Wake::Mailbox(Some(notification)) => Some(Frame::Notification(notification)),
                    Wake::Mailbox(None) | Wake::Shutdown => {
                        self.close();
                        None
                    }
                }
            }
            SessionState::Closed => None,
        }
    }

    /// Release the subscription and enter the terminal state.
    pub fn close(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        if self.state != SessionState::Closed {
            debug!(recipient_id = self.recipient_id, "Notification stream closed");
        }
        self.state = SessionState::Closed;
    }

    /// Turn the session into a stream of frames that ends when it closes.
    pub fn into_stream(mut self) -> impl Stream<Item = Frame> + Send {
        async_stream::stream! {
            while let Some(frame) = self.next_frame().await {
                yield frame;
            }
        }
    }
}
