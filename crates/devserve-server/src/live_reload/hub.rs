//! Broadcast hub for live reload notifications.
//!
//! Owns the set of open notification channels. The socket task of each
//! browser tab registers its channel on connect and unregisters it on close;
//! the watcher only ever calls [`BroadcastHub::broadcast`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;
use uuid::Uuid;

/// Unique identity of a notification channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChannelId(Uuid);

impl ChannelId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Sending half of one browser's notification channel.
///
/// The receiving half lives in the socket task. The channel counts as open
/// until that receiver is dropped.
#[derive(Clone, Debug)]
pub struct NotificationChannel {
    id: ChannelId,
    sender: mpsc::UnboundedSender<String>,
}

impl NotificationChannel {
    /// Create a channel and the receiver its socket task reads from.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let channel = Self {
            id: ChannelId::new(),
            sender,
        };
        (channel, receiver)
    }

    /// Channel identity.
    #[must_use]
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Whether the connection behind this channel is still being served.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }
}

/// Set of live notification channels with fan-out delivery.
#[derive(Debug, Default)]
pub struct BroadcastHub {
    channels: Mutex<HashMap<ChannelId, NotificationChannel>>,
}

impl BroadcastHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a channel. Registering the same channel twice is a no-op.
    pub fn register(&self, channel: NotificationChannel) {
        self.lock().entry(channel.id).or_insert(channel);
    }

    /// Remove a channel. Returns `false` if it was not registered.
    pub fn unregister(&self, id: ChannelId) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Deliver `message` to every open channel.
    ///
    /// Closed channels are skipped but stay registered; their socket task
    /// removes them. Returns the number of channels the message reached.
    pub fn broadcast(&self, message: &str) -> usize {
        let channels = self.lock();
        let mut delivered = 0;
        for channel in channels.values() {
            if !channel.is_open() {
                continue;
            }
            // A receiver dropped between the check and the send is skipped too
            if channel.sender.send(message.to_owned()).is_ok() {
                delivered += 1;
            }
        }

        tracing::debug!(
            delivered,
            registered = channels.len(),
            message,
            "Broadcast notification"
        );
        delivered
    }

    /// Number of registered channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no channel is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ChannelId, NotificationChannel>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
