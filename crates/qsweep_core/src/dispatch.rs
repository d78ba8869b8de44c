//! Notification channel between live system handles and the sweeps derived from them.
//!
//! A system handle publishes [`DispatchEvent::SystemUpdate`] whenever its
//! configuration changes; a sweep publishes [`DispatchEvent::SweepUpdate`] when
//! its own fields are reassigned. Subscribers receive every event while the
//! channel is enabled. During bulk computation the sweep suppresses the
//! channel with [`NotificationChannel::suppress`], so per-point updates never
//! reach subscribers.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, Weak};

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Identity of an event sender (a system handle or a sweep)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SenderId(pub u64);

/// Kinds of events carried by the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchEvent {
    /// Configuration of a system handle changed
    SystemUpdate,
    /// Parameters or stored results of a sweep were reassigned
    SweepUpdate,
}

/// Receiver side of the channel
pub trait DispatchClient: Send + Sync {
    fn receive(&self, event: DispatchEvent, sender: SenderId);
}

/// Channel with an explicit enable flag and weakly held subscribers
pub struct NotificationChannel {
    enabled: AtomicBool,
    next_sender: AtomicU64,
    clients: Mutex<Vec<Weak<dyn DispatchClient>>>,
}

impl NotificationChannel {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            next_sender: AtomicU64::new(1),
            clients: Mutex::new(Vec::new()),
        }
    }

    /// Hand out a fresh sender identity
    pub fn register_sender(&self) -> SenderId {
        SenderId(self.next_sender.fetch_add(1, Ordering::Relaxed))
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Disable the channel until the returned guard is dropped.
    ///
    /// The previous enabled state is restored on drop, including when the
    /// guarded computation returns early with an error.
    #[must_use = "the channel is re-enabled as soon as the guard is dropped"]
    pub fn suppress(&self) -> DispatchGuard<'_> {
        let was_enabled = self.enabled.swap(false, Ordering::SeqCst);
        DispatchGuard {
            channel: self,
            was_enabled,
        }
    }

    /// Register a subscriber. The channel holds it weakly; dropped subscribers
    /// are pruned on the next publish.
    pub fn subscribe(&self, client: Weak<dyn DispatchClient>) {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(client);
    }

    /// Deliver an event to all live subscribers. Returns the number of
    /// subscribers reached, zero while the channel is disabled.
    pub fn publish(&self, event: DispatchEvent, sender: SenderId) -> usize {
        if !self.is_enabled() {
            trace!(?event, ?sender, "dispatch suppressed");
            return 0;
        }

        // Receivers run outside the lock so they may publish or subscribe themselves
        let receivers: Vec<_> = {
            let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
            clients.retain(|client| client.strong_count() > 0);
            clients.iter().filter_map(Weak::upgrade).collect()
        };

        trace!(?event, ?sender, receivers = receivers.len(), "dispatch");
        for receiver in &receivers {
            receiver.receive(event, sender);
        }
        receivers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|client| client.strong_count() > 0)
            .count()
    }
}

impl Default for NotificationChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationChannel")
            .field("enabled", &self.is_enabled())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Scope guard returned by [`NotificationChannel::suppress`]
#[derive(Debug)]
pub struct DispatchGuard<'a> {
    channel: &'a NotificationChannel,
    was_enabled: bool,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.channel
            .enabled
            .store(self.was_enabled, Ordering::SeqCst);
    }
}
