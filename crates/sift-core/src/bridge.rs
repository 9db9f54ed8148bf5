//! Directive delivery to feed-observer instances
//!
//! Observers live in another execution context and can disappear at any
//! moment (navigation, teardown). Delivery is best-effort: one
//! re-injection and one redelivery, then the failure is logged and
//! swallowed. The orchestrator never sees a delivery error.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::Result;

/// Identifier of one feed-observer instance (a tab, in browser terms).
pub type TargetId = u64;

/// What the observer is being told to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "directive", rename_all = "camelCase")]
pub enum Directive {
    /// Begin watching the feed and submitting items for evaluation.
    Activate,
    /// Stop watching; leave the page as-is.
    Deactivate,
    /// Visually hide one item.
    Hide { id: String },
}

/// Transport to feed-observer instances.
pub trait FeedObserver: Send + Sync {
    /// Liveness probe for a target.
    fn ping(&self, target: TargetId) -> BoxFuture<'_, Result<()>>;

    /// Deliver a directive to a target.
    fn send(&self, target: TargetId, directive: Directive) -> BoxFuture<'_, Result<()>>;

    /// Re-inject the observer into a target whose instance went away.
    fn reinject(&self, target: TargetId) -> BoxFuture<'_, Result<()>>;
}

pub struct ContentBridge {
    observer: Arc<dyn FeedObserver>,
    connected: HashSet<TargetId>,
    grace: Duration,
}

impl ContentBridge {
    pub fn new(observer: Arc<dyn FeedObserver>, grace: Duration) -> Self {
        Self {
            observer,
            connected: HashSet::new(),
            grace,
        }
    }

    /// Deliver `directive` to `target`, re-injecting once on an
    /// unreachable instance. Never fails; never retries more than once.
    pub async fn deliver(&mut self, target: TargetId, directive: Directive) {
        if self.try_once(target, directive.clone()).await {
            return;
        }

        debug!("Target {} unreachable, re-injecting observer", target);
        if let Err(e) = self.observer.reinject(target).await {
            warn!("Re-injection into target {} failed: {}", target, e);
            self.connected.remove(&target);
            return;
        }

        tokio::time::sleep(self.grace).await;
        if !self.try_once(target, directive).await {
            warn!("Delivery to target {} failed after re-injection", target);
            self.connected.remove(&target);
        }
    }

    async fn try_once(&mut self, target: TargetId, directive: Directive) -> bool {
        if let Err(e) = self.observer.ping(target).await {
            debug!("Ping of target {} failed: {}", target, e);
            return false;
        }
        match self.observer.send(target, directive).await {
            Ok(()) => {
                self.connected.insert(target);
                true
            }
            Err(e) => {
                debug!("Send to target {} failed: {}", target, e);
                false
            }
        }
    }

    /// Drop a target on navigation or instance teardown.
    pub fn forget(&mut self, target: TargetId) {
        self.connected.remove(&target);
    }

    pub fn is_connected(&self, target: TargetId) -> bool {
        self.connected.contains(&target)
    }

    pub fn connected_count(&self) -> usize {
        self.connected.len()
    }
}
