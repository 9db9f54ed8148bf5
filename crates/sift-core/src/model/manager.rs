//! Provider lifecycle management
//!
//! Owns acquisition of the embedding provider: reachability probe, library
//! import, timed construction, single-flight memoization, and failure
//! reporting. All interested callers share one pending attempt; a failed
//! attempt clears the memo so the next call starts fresh.

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::CuratorConfig;
use crate::error::{Error, Result};
use crate::model::probe::probe_endpoint;
use crate::model::status::ModelLoadState;
use crate::provider::{EmbeddingProvider, ProviderFactory};

/// Lifecycle notifications delivered to the orchestrator.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    Progress {
        state: ModelLoadState,
        detail: String,
    },
    Ready,
    Failed {
        category: &'static str,
        message: String,
    },
}

type AcquireOutcome = std::result::Result<Arc<dyn EmbeddingProvider>, Arc<Error>>;
type AcquireFuture = Shared<BoxFuture<'static, AcquireOutcome>>;

#[derive(Default)]
struct InflightSlot {
    generation: u64,
    attempt: Option<AcquireFuture>,
}

pub struct ModelLifecycleManager {
    factory: Arc<dyn ProviderFactory>,
    config: CuratorConfig,
    notices: mpsc::UnboundedSender<LifecycleEvent>,
    state: RwLock<ModelLoadState>,
    provider: RwLock<Option<Arc<dyn EmbeddingProvider>>>,
    inflight: Mutex<InflightSlot>,
}

impl ModelLifecycleManager {
    pub fn new(
        factory: Arc<dyn ProviderFactory>,
        config: CuratorConfig,
        notices: mpsc::UnboundedSender<LifecycleEvent>,
    ) -> Self {
        Self {
            factory,
            config,
            notices,
            state: RwLock::new(ModelLoadState::Idle),
            provider: RwLock::new(None),
            inflight: Mutex::new(InflightSlot::default()),
        }
    }

    /// Acquire the provider, joining any attempt already in flight.
    ///
    /// Idempotent: once an attempt succeeds the memoized outcome is
    /// returned immediately; after a failure the memo is cleared and the
    /// next call starts a fresh attempt.
    pub async fn acquire(self: &Arc<Self>) -> AcquireOutcome {
        let (generation, attempt) = {
            let mut slot = self.inflight.lock().await;
            match &slot.attempt {
                Some(attempt) => (slot.generation, attempt.clone()),
                None => {
                    slot.generation += 1;
                    let this = Arc::clone(self);
                    let attempt = async move { this.run_attempt().await.map_err(Arc::new) }
                        .boxed()
                        .shared();
                    slot.attempt = Some(attempt.clone());
                    (slot.generation, attempt)
                }
            }
        };

        let outcome = attempt.await;
        if outcome.is_err() {
            let mut slot = self.inflight.lock().await;
            // Only clear our own attempt; a reset may have started a new
            // one while we were waiting.
            if slot.generation == generation {
                slot.attempt = None;
            }
        }
        outcome
    }

    /// Drop any memoized attempt and return to `Idle` (manual retry path).
    pub async fn reset(&self) {
        {
            let mut slot = self.inflight.lock().await;
            slot.generation += 1;
            slot.attempt = None;
        }
        *self.provider.write().await = None;
        *self.state.write().await = ModelLoadState::Idle;
        self.notify_progress(ModelLoadState::Idle, "reset".to_string());
    }

    pub async fn state(&self) -> ModelLoadState {
        *self.state.read().await
    }

    pub async fn provider(&self) -> Option<Arc<dyn EmbeddingProvider>> {
        self.provider.read().await.clone()
    }

    async fn run_attempt(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        match self.load_stages().await {
            Ok(provider) => {
                *self.provider.write().await = Some(provider.clone());
                self.transition(ModelLoadState::Ready, "provider ready".to_string())
                    .await;
                info!("Embedding provider ready");
                let _ = self.notices.send(LifecycleEvent::Ready);
                Ok(provider)
            }
            Err(e) => {
                self.transition(ModelLoadState::Failed, e.to_string()).await;
                warn!("Provider acquisition failed: {}", e);
                let _ = self.notices.send(LifecycleEvent::Failed {
                    category: e.category(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn load_stages(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        let endpoint = self.factory.endpoint();
        if endpoint.is_empty() {
            debug!("Factory has no distribution endpoint; skipping probe");
        } else {
            self.transition(
                ModelLoadState::TestingNetwork,
                "checking provider endpoint".to_string(),
            )
            .await;
            let client = reqwest::Client::builder()
                .timeout(self.config.probe_timeout())
                .build()
                .map_err(|e| Error::Network(e.to_string()))?;
            probe_endpoint(
                &client,
                &endpoint,
                self.config.probe_attempts,
                self.config.probe_backoff(),
            )
            .await?;
        }

        self.transition(
            ModelLoadState::ImportingProvider,
            "loading inference library".to_string(),
        )
        .await;
        self.factory.import().await.map_err(|e| match e {
            e @ Error::Library(_) => e,
            other => Error::Library(other.to_string()),
        })?;

        self.transition(
            ModelLoadState::Downloading,
            "constructing provider".to_string(),
        )
        .await;
        // Whichever settles first wins; on the deadline the pending work
        // is abandoned, not torn down.
        let deadline = self.config.acquire_deadline();
        match tokio::time::timeout(deadline, self.factory.build()).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "provider construction exceeded {}s",
                deadline.as_secs()
            ))),
        }
    }

    async fn transition(&self, state: ModelLoadState, detail: String) {
        *self.state.write().await = state;
        self.notify_progress(state, detail);
    }

    fn notify_progress(&self, state: ModelLoadState, detail: String) {
        let _ = self
            .notices
            .send(LifecycleEvent::Progress { state, detail });
    }
}
