//! Alert channel
//!
//! Every user-facing notification (fetch failures, rejected actions,
//! transaction summaries) is published here. Front ends subscribe; the
//! core has no rendering knowledge.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use crate::models::Alert;
use crate::utils::lock;

/// Number of alerts a slow subscriber may lag behind before skipping
const CHANNEL_CAPACITY: usize = 64;

/// Cloneable handle to a shared alert channel
///
/// Keeps the latest alert so late subscribers can render it, and fans out
/// every published alert to live subscribers.
#[derive(Clone)]
pub struct AlertChannel {
    sender: broadcast::Sender<Alert>,
    latest: Arc<Mutex<Option<Alert>>>,
}

impl AlertChannel {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            latest: Arc::new(Mutex::new(None)),
        }
    }

    /// Publish an alert, replacing the current one
    pub fn publish(&self, alert: Alert) {
        log::debug!("[alert] {:?}: {}", alert.kind, alert.message);
        *lock(&self.latest) = Some(alert.clone());
        // No subscribers is fine: the latest value is still kept
        let _ = self.sender.send(alert);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
        self.sender.subscribe()
    }

    /// The alert currently on display, if any
    pub fn current(&self) -> Option<Alert> {
        lock(&self.latest).clone()
    }

    /// Dismiss the current alert
    pub fn dismiss(&self) {
        *lock(&self.latest) = None;
    }
}

impl Default for AlertChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AlertChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertChannel")
            .field("subscribers", &self.sender.receiver_count())
            .field("current", &self.current())
            .finish()
    }
}
