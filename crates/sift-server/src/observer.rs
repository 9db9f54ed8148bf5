//! Observer transport over a broadcast channel
//!
//! Feed-observer clients (the browser side of the system) subscribe to
//! `/v1/observer/events`; directives are frames on that stream. A target
//! is reachable while at least one subscriber is listening.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use sift_core::{Directive, Error, FeedObserver, TargetId};

/// One directive addressed to one observer instance.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObserverFrame {
    pub target: TargetId,
    #[serde(flatten)]
    pub directive: Directive,
}

pub struct ChannelObserver {
    frames: broadcast::Sender<ObserverFrame>,
}

impl ChannelObserver {
    pub fn new(capacity: usize) -> Self {
        let (frames, _) = broadcast::channel(capacity);
        Self { frames }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ObserverFrame> {
        self.frames.subscribe()
    }
}

impl FeedObserver for ChannelObserver {
    fn ping(&self, target: TargetId) -> BoxFuture<'_, sift_core::Result<()>> {
        let listening = self.frames.receiver_count() > 0;
        async move {
            if listening {
                Ok(())
            } else {
                Err(Error::Delivery(format!(
                    "no observer listening for target {}",
                    target
                )))
            }
        }
        .boxed()
    }

    fn send(&self, target: TargetId, directive: Directive) -> BoxFuture<'_, sift_core::Result<()>> {
        let result = self
            .frames
            .send(ObserverFrame { target, directive })
            .map(|_| ())
            .map_err(|_| Error::Delivery("no observer listening".to_string()));
        async move { result }.boxed()
    }

    fn reinject(&self, target: TargetId) -> BoxFuture<'_, sift_core::Result<()>> {
        // Re-injection is the client's job; all the host can do is note
        // that a fresh subscription is expected.
        debug!("Re-injection requested for target {}", target);
        async { Ok(()) }.boxed()
    }
}
