//! Curation orchestrator
//!
//! Single task owning the session state, interest cache, decision log, and
//! content bridge. Everything reaches it through an mpsc command channel;
//! everything it has to say goes out on a broadcast event channel. State is
//! only ever mutated on this task's own turn.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bridge::{ContentBridge, Directive, FeedObserver, TargetId};
use crate::classify::classify;
use crate::config::CuratorConfig;
use crate::decision_log::{DecisionEntry, DecisionLog};
use crate::error::{Error, Result};
use crate::interests::InterestCache;
use crate::model::{LifecycleEvent, ModelLifecycleManager, ModelLoadState};
use crate::protocol::{Classification, EvaluationRequest, Event, WireMessage};
use crate::provider::{EmbeddingProvider, ProviderFactory};
use crate::session::{AiStatus, SessionState};
use crate::store::{keys, PersistentStore};

/// Result of a start request. Ineligible surfaces decline rather than
/// error; the caller decides how to present that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
    Declined { reason: String },
}

/// Point-in-time view of the session, for STATUS_UPDATE and the status RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub is_running: bool,
    pub ai_ready: bool,
    pub ai_status: AiStatus,
}

enum Command {
    Start {
        url: Option<String>,
        target: Option<TargetId>,
        reply: Option<oneshot::Sender<StartOutcome>>,
    },
    Stop {
        reply: Option<oneshot::Sender<()>>,
    },
    Evaluate(EvaluationRequest),
    Classify {
        text: Option<String>,
        reply: oneshot::Sender<Classification>,
    },
    SetInterests {
        interests: Vec<String>,
        spam_keywords: Option<Vec<String>>,
        threshold: Option<f32>,
    },
    MarkTweet {
        id: String,
        is_uninteresting: bool,
    },
    Lifecycle(LifecycleEvent),
    ForwardProgress {
        stage: String,
        detail: String,
    },
    ForwardClassification {
        id: String,
        is_uninteresting: bool,
        reason: String,
    },
    RetryLoad,
    Status {
        reply: oneshot::Sender<StatusSnapshot>,
    },
    ExportLog {
        reply: oneshot::Sender<Vec<DecisionEntry>>,
    },
    Unknown,
    KeepAliveTick,
    DeferredRetry,
}

/// Clonable handle used by hosts to talk to the orchestrator.
#[derive(Clone)]
pub struct CuratorHandle {
    tx: mpsc::Sender<Command>,
    events: broadcast::Sender<Event>,
    rpc_timeout: std::time::Duration,
}

impl CuratorHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub async fn start(
        &self,
        url: Option<String>,
        target: Option<TargetId>,
    ) -> Result<StartOutcome> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Start {
            url,
            target,
            reply: Some(reply),
        })
        .await?;
        self.wait(rx).await
    }

    pub async fn stop(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Stop { reply: Some(reply) }).await?;
        self.wait(rx).await
    }

    pub async fn evaluate(&self, request: EvaluationRequest) -> Result<()> {
        self.send(Command::Evaluate(request)).await
    }

    pub async fn classify(&self, text: Option<String>) -> Result<Classification> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Classify { text, reply }).await?;
        self.wait(rx).await
    }

    pub async fn set_interests(
        &self,
        interests: Vec<String>,
        spam_keywords: Option<Vec<String>>,
        threshold: Option<f32>,
    ) -> Result<()> {
        self.send(Command::SetInterests {
            interests,
            spam_keywords,
            threshold,
        })
        .await
    }

    pub async fn mark_tweet(&self, id: String, is_uninteresting: bool) -> Result<()> {
        self.send(Command::MarkTweet {
            id,
            is_uninteresting,
        })
        .await
    }

    pub async fn retry_model_load(&self) -> Result<()> {
        self.send(Command::RetryLoad).await
    }

    pub async fn status(&self) -> Result<StatusSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Status { reply }).await?;
        self.wait(rx).await
    }

    pub async fn export_log(&self) -> Result<Vec<DecisionEntry>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::ExportLog { reply }).await?;
        self.wait(rx).await
    }

    /// Dispatch a raw wire message, returning its JSON reply.
    ///
    /// This is the exhaustive routing table: every known tag maps to one
    /// operation and the unknown branch is answered with an error.
    pub async fn dispatch_wire(&self, message: WireMessage) -> Result<serde_json::Value> {
        match message {
            WireMessage::StartCuration { url, target } => {
                let outcome = self.start(url, target).await?;
                Ok(serde_json::to_value(outcome)?)
            }
            WireMessage::StopCuration => {
                self.stop().await?;
                Ok(json!({ "stopped": true }))
            }
            WireMessage::EvaluateTweet {
                id,
                text,
                image_urls,
                video_frames,
            } => {
                self.evaluate(EvaluationRequest {
                    id,
                    text,
                    image_urls,
                    video_frames,
                })
                .await?;
                Ok(json!({ "accepted": true }))
            }
            WireMessage::Classify { id, text } => {
                let result = self.classify(text).await?;
                Ok(json!({
                    "id": id,
                    "isUninteresting": result.is_uninteresting,
                    "reason": result.reason,
                }))
            }
            WireMessage::SetInterests {
                interests,
                spam_keywords,
                threshold,
            } => {
                self.set_interests(interests, spam_keywords, threshold)
                    .await?;
                Ok(json!({ "updated": true }))
            }
            WireMessage::MarkTweet {
                id,
                is_uninteresting,
            } => {
                self.mark_tweet(id, is_uninteresting).await?;
                Ok(json!({ "marked": true }))
            }
            WireMessage::AiReady => {
                self.send(Command::Lifecycle(LifecycleEvent::Ready)).await?;
                Ok(json!({ "acknowledged": true }))
            }
            WireMessage::AiLoadFailed { error } => {
                let classified = Error::classify(error.clone());
                self.send(Command::Lifecycle(LifecycleEvent::Failed {
                    category: classified.category(),
                    message: error,
                }))
                .await?;
                Ok(json!({ "acknowledged": true }))
            }
            WireMessage::AiLoadProgress { stage, detail } => {
                self.send(Command::ForwardProgress { stage, detail }).await?;
                Ok(json!({ "acknowledged": true }))
            }
            WireMessage::ClassificationResult {
                id,
                is_uninteresting,
                reason,
            } => {
                self.send(Command::ForwardClassification {
                    id,
                    is_uninteresting,
                    reason,
                })
                .await?;
                Ok(json!({ "acknowledged": true }))
            }
            WireMessage::RetryAiLoad => {
                self.retry_model_load().await?;
                Ok(json!({ "retrying": true }))
            }
            WireMessage::StatusRequest => {
                let status = self.status().await?;
                Ok(serde_json::to_value(status)?)
            }
            WireMessage::ExportLog => {
                let entries = self.export_log().await?;
                Ok(serde_json::to_value(entries)?)
            }
            WireMessage::Unknown => {
                let _ = self.send(Command::Unknown).await;
                Err(Error::InvalidInput("unknown message type".to_string()))
            }
        }
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| Error::Delivery("orchestrator is gone".to_string()))
    }

    async fn wait<T>(&self, rx: oneshot::Receiver<T>) -> Result<T> {
        match tokio::time::timeout(self.rpc_timeout, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(Error::Delivery("orchestrator dropped reply".to_string())),
            Err(_) => Err(Error::Timeout("orchestrator reply timed out".to_string())),
        }
    }
}

pub struct Orchestrator {
    config: CuratorConfig,
    session: SessionState,
    interests: InterestCache,
    log: DecisionLog,
    bridge: ContentBridge,
    store: Arc<dyn PersistentStore>,
    lifecycle: Arc<ModelLifecycleManager>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    events: broadcast::Sender<Event>,
    tx: mpsc::Sender<Command>,
    active_target: Option<TargetId>,
    keep_alive: Option<JoinHandle<()>>,
    retry_scheduled: bool,
}

impl Orchestrator {
    /// Build the orchestrator and spawn its event loop, returning the
    /// handle hosts use to talk to it.
    pub fn spawn(
        config: CuratorConfig,
        store: Arc<dyn PersistentStore>,
        observer: Arc<dyn FeedObserver>,
        factory: Arc<dyn ProviderFactory>,
    ) -> CuratorHandle {
        let (tx, rx) = mpsc::channel(64);
        let (events, _) = broadcast::channel(256);
        let (notices_tx, mut notices_rx) = mpsc::unbounded_channel();

        let lifecycle = Arc::new(ModelLifecycleManager::new(
            factory,
            config.clone(),
            notices_tx,
        ));

        // Lifecycle notices become commands so all state changes happen on
        // the orchestrator's own turn.
        let lifecycle_tx = tx.clone();
        tokio::spawn(async move {
            while let Some(notice) = notices_rx.recv().await {
                if lifecycle_tx.send(Command::Lifecycle(notice)).await.is_err() {
                    break;
                }
            }
        });

        let mut interests = InterestCache::new(config.similarity_threshold);
        if let Ok(Some(value)) = store.get(keys::INTERESTS) {
            match serde_json::from_value::<Vec<String>>(value) {
                Ok(saved) => interests.set_inputs(saved, None, None),
                Err(e) => warn!("Discarding unreadable saved interests: {}", e),
            }
        }

        let log = DecisionLog::load(store.clone(), config.log_capacity);
        let bridge = ContentBridge::new(observer, config.grace_period());

        let orchestrator = Self {
            session: SessionState::default(),
            interests,
            log,
            bridge,
            store,
            lifecycle,
            provider: None,
            events: events.clone(),
            tx: tx.clone(),
            active_target: None,
            keep_alive: None,
            retry_scheduled: false,
            config: config.clone(),
        };

        tokio::spawn(orchestrator.run(rx));

        CuratorHandle {
            tx,
            events,
            rpc_timeout: config.rpc_timeout(),
        }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        info!("Curation orchestrator started");
        while let Some(command) = rx.recv().await {
            self.handle(command).await;
        }
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Start { url, target, reply } => {
                let outcome = self.start(url, target).await;
                if let Some(reply) = reply {
                    let _ = reply.send(outcome);
                }
            }
            Command::Stop { reply } => {
                self.stop().await;
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
            }
            Command::Evaluate(request) => self.evaluate(request).await,
            Command::Classify { text, reply } => {
                let _ = reply.send(self.classify_now(text.as_deref()));
            }
            Command::SetInterests {
                interests,
                spam_keywords,
                threshold,
            } => self.set_interests(interests, spam_keywords, threshold),
            Command::MarkTweet {
                id,
                is_uninteresting,
            } => {
                if is_uninteresting {
                    if let Some(target) = self.active_target {
                        self.bridge.deliver(target, Directive::Hide { id }).await;
                    }
                }
            }
            Command::Lifecycle(event) => self.handle_lifecycle(event).await,
            Command::ForwardProgress { stage, detail } => {
                self.emit(Event::AiLoadProgress { stage, detail });
            }
            Command::ForwardClassification {
                id,
                is_uninteresting,
                reason,
            } => {
                self.emit(Event::ClassificationResult {
                    id,
                    is_uninteresting,
                    reason,
                });
            }
            Command::RetryLoad => {
                self.retry_scheduled = false;
                self.lifecycle.reset().await;
                self.trigger_acquire();
            }
            Command::Status { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::ExportLog { reply } => {
                let _ = reply.send(self.log.dump());
            }
            Command::Unknown => {
                warn!("Unknown message type received");
                self.emit(Event::Error {
                    message: "unknown message type".to_string(),
                });
            }
            Command::KeepAliveTick => {
                if self.session.is_running {
                    debug!("Keep-alive tick");
                    self.persist_bool(keys::IS_RUNNING, true);
                }
            }
            Command::DeferredRetry => {
                self.retry_scheduled = false;
                if self.session.is_running && !self.session.ai_ready {
                    info!("Retrying provider acquisition after network failure");
                    self.trigger_acquire();
                }
            }
        }
    }

    async fn start(&mut self, url: Option<String>, target: Option<TargetId>) -> StartOutcome {
        if self.session.is_running {
            return StartOutcome::AlreadyRunning;
        }

        let url = match url {
            Some(url) => url,
            None => {
                return StartOutcome::Declined {
                    reason: "no active feed surface".to_string(),
                }
            }
        };
        if !self.surface_eligible(&url) {
            return StartOutcome::Declined {
                reason: format!("not an eligible feed surface: {}", url),
            };
        }

        self.session.is_running = true;
        self.active_target = Some(target.unwrap_or(0));
        self.persist_bool(keys::IS_RUNNING, true);
        self.arm_keep_alive();

        if self.session.ai_ready {
            if let Some(target) = self.active_target {
                self.bridge.deliver(target, Directive::Activate).await;
            }
        } else {
            self.trigger_acquire();
        }

        info!("Curation started on {}", url);
        self.broadcast_status();
        StartOutcome::Started
    }

    async fn stop(&mut self) {
        if !self.session.is_running {
            return;
        }
        self.session.is_running = false;
        self.persist_bool(keys::IS_RUNNING, false);
        if let Some(handle) = self.keep_alive.take() {
            handle.abort();
        }
        if let Some(target) = self.active_target {
            self.bridge.deliver(target, Directive::Deactivate).await;
        }
        info!("Curation stopped");
        self.broadcast_status();
    }

    async fn evaluate(&mut self, mut request: EvaluationRequest) {
        if !self.session.is_running {
            return;
        }
        if request.id.is_empty() {
            request.id = uuid::Uuid::new_v4().to_string();
        }

        let result = self.classify_now(request.text.as_deref());
        let text = request.text.clone().unwrap_or_default();

        self.log.append(DecisionEntry::now(
            request.id.clone(),
            result.decision(),
            result.reason.clone(),
            text.clone(),
        ));
        self.emit(Event::ActivityLog {
            tweet_text: text,
            decision: result.decision(),
            reason: result.reason.clone(),
        });

        if result.is_uninteresting {
            if let Some(target) = self.active_target {
                self.bridge
                    .deliver(target, Directive::Hide { id: request.id })
                    .await;
            }
        }
    }

    fn classify_now(&self, text: Option<&str>) -> Classification {
        let provider = if self.session.ai_ready {
            self.provider.as_ref()
        } else {
            None
        };
        classify(text, &self.interests, provider)
    }

    fn set_interests(
        &mut self,
        interests: Vec<String>,
        spam_keywords: Option<Vec<String>>,
        threshold: Option<f32>,
    ) {
        self.interests.set_inputs(interests, spam_keywords, threshold);
        match serde_json::to_value(self.interests.terms()) {
            Ok(value) => {
                if let Err(e) = self.store.set(keys::INTERESTS, value) {
                    warn!("Persisting interests failed: {}", e);
                }
            }
            Err(e) => warn!("Serializing interests failed: {}", e),
        }

        if let Some(provider) = &self.provider {
            if let Err(e) = self.interests.recompute(provider.as_ref()) {
                warn!("Interest recompute failed: {}", e);
            }
        }
    }

    async fn handle_lifecycle(&mut self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::Progress { state, detail } => {
                if !state.is_terminal() && state != ModelLoadState::Idle {
                    self.set_ai_status(AiStatus::Loading);
                }
                self.emit(Event::AiLoadProgress {
                    stage: state.as_str().to_string(),
                    detail,
                });
            }
            LifecycleEvent::Ready => self.on_model_ready().await,
            LifecycleEvent::Failed { category, message } => {
                self.on_model_failed(category, message);
            }
        }
    }

    async fn on_model_ready(&mut self) {
        self.session.ai_ready = true;
        self.set_ai_status(AiStatus::Ready);
        self.provider = self.lifecycle.provider().await;

        if let Some(provider) = self.provider.clone() {
            if self.interests.is_dirty() || !self.interests.has_embeddings() {
                if let Err(e) = self.interests.recompute(provider.as_ref()) {
                    warn!("Interest recompute on ready failed: {}", e);
                }
            }
        }

        if self.session.is_running {
            if let Some(target) = self.active_target {
                self.bridge.deliver(target, Directive::Activate).await;
            }
        }

        self.emit(Event::AiReady);
        self.broadcast_status();
    }

    fn on_model_failed(&mut self, category: &'static str, message: String) {
        self.session.ai_ready = false;
        self.provider = None;
        self.set_ai_status(AiStatus::Stopped);
        self.emit(Event::AiLoadFailed {
            category: category.to_string(),
            message,
        });
        self.broadcast_status();

        // Curation continues on the fallback tier; a network failure earns
        // one deferred re-acquire while the session is still running.
        if category == "NetworkError" && self.session.is_running && !self.retry_scheduled {
            self.retry_scheduled = true;
            let tx = self.tx.clone();
            let delay = self.config.retry_backoff();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = tx.send(Command::DeferredRetry).await;
            });
        }
    }

    fn trigger_acquire(&mut self) {
        self.set_ai_status(AiStatus::Loading);
        self.broadcast_status();
        let lifecycle = self.lifecycle.clone();
        tokio::spawn(async move {
            // The outcome arrives back as a lifecycle notice.
            let _ = lifecycle.acquire().await;
        });
    }

    fn arm_keep_alive(&mut self) {
        let tx = self.tx.clone();
        let period = self.config.keep_alive_period();
        self.keep_alive = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // immediate first tick
            loop {
                interval.tick().await;
                if tx.send(Command::KeepAliveTick).await.is_err() {
                    break;
                }
            }
        }));
    }

    fn surface_eligible(&self, url: &str) -> bool {
        match host_of(url) {
            Some(host) => self
                .config
                .eligible_hosts
                .iter()
                .any(|eligible| host == eligible || host.ends_with(&format!(".{}", eligible))),
            None => false,
        }
    }

    fn set_ai_status(&mut self, status: AiStatus) {
        if self.session.ai_status != status {
            self.session.ai_status = status;
            let key = keys::AI_STATUS;
            if let Err(e) = self.store.set(key, json!(status.as_str())) {
                warn!("Persisting {} failed: {}", key, e);
            }
        }
    }

    fn persist_bool(&self, key: &str, value: bool) {
        if let Err(e) = self.store.set(key, json!(value)) {
            warn!("Persisting {} failed: {}", key, e);
        }
    }

    fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            is_running: self.session.is_running,
            ai_ready: self.session.ai_ready,
            ai_status: self.session.ai_status,
        }
    }

    fn broadcast_status(&self) {
        self.emit(Event::StatusUpdate {
            is_running: self.session.is_running,
            ai_ready: self.session.ai_ready,
            ai_status: self.session.ai_status,
        });
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine; the UI may not be open.
        let _ = self.events.send(event);
    }
}

fn host_of(url: &str) -> Option<&str> {
    let rest = url.split("://").nth(1).unwrap_or(url);
    let authority = rest.split(['/', '?', '#']).next()?;
    let host = authority.rsplit('@').next()?.split(':').next()?;
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}
