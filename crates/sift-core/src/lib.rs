//! Sift Core - Live Social-Feed Curation Engine
//!
//! This crate decides, per feed item, whether to keep or hide it, using a
//! semantic-similarity classifier backed by a locally-hosted text-embedding
//! provider with a deterministic rule-based fallback.
//!
//! # Architecture
//!
//! Three loosely-coupled execution contexts (feed observer, inference host,
//! UI) coordinate exclusively through asynchronous message passing:
//! - The orchestrator owns session state and routes every inbound message
//! - The model lifecycle manager acquires the provider with single-flight
//!   memoization and retry/backoff
//! - The classification engine is a total two-tier decision function
//!
//! # Example
//!
//! ```ignore
//! use sift_core::{CuratorConfig, Orchestrator};
//!
//! let handle = Orchestrator::spawn(config, store, observer, factory);
//! handle.start(Some("https://x.com/home".into()), None).await?;
//! ```

pub mod bridge;
pub mod classify;
pub mod config;
pub mod decision_log;
pub mod error;
pub mod interests;
pub mod model;
pub mod orchestrator;
pub mod protocol;
pub mod provider;
pub mod session;
pub mod store;

pub use bridge::{ContentBridge, Directive, FeedObserver, TargetId};
pub use classify::{classify, cosine};
pub use config::{CuratorConfig, HubConfig};
pub use decision_log::{DecisionEntry, DecisionLog};
pub use error::{Error, Result};
pub use interests::InterestCache;
pub use model::{LifecycleEvent, ModelLifecycleManager, ModelLoadState};
pub use orchestrator::{CuratorHandle, Orchestrator, StartOutcome, StatusSnapshot};
pub use protocol::{Classification, Decision, EvaluationRequest, Event, WireMessage};
pub use provider::{EmbeddingProvider, HashedEmbedder, HubProviderFactory, ProviderFactory};
pub use session::{AiStatus, SessionState};
pub use store::{JsonFileStore, MemoryStore, PersistentStore};
