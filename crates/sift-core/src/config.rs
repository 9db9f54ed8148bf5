//! Configuration types for the sift curation engine

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main curator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuratorConfig {
    /// Minimum cosine similarity for an item to count as interesting
    #[serde(default = "default_threshold")]
    pub similarity_threshold: f32,

    /// Decision log capacity (oldest entries evicted first)
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,

    /// Hosts on which curation may be started
    #[serde(default = "default_eligible_hosts")]
    pub eligible_hosts: Vec<String>,

    /// Attempts for the provider endpoint reachability probe
    #[serde(default = "default_probe_attempts")]
    pub probe_attempts: u32,

    /// Per-attempt probe timeout in seconds
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// First probe backoff in seconds; doubles per attempt
    #[serde(default = "default_probe_backoff_secs")]
    pub probe_backoff_secs: u64,

    /// Overall deadline for provider construction in seconds
    #[serde(default = "default_acquire_deadline_secs")]
    pub acquire_deadline_secs: u64,

    /// Gap before the single automatic re-acquire after a network failure
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,

    /// Keep-alive tick period in seconds while curation is running
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,

    /// Grace period after re-injecting an observer, in milliseconds
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Timeout for request/response calls into the orchestrator, in seconds
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,
}

impl Default for CuratorConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_threshold(),
            log_capacity: default_log_capacity(),
            eligible_hosts: default_eligible_hosts(),
            probe_attempts: default_probe_attempts(),
            probe_timeout_secs: default_probe_timeout_secs(),
            probe_backoff_secs: default_probe_backoff_secs(),
            acquire_deadline_secs: default_acquire_deadline_secs(),
            retry_backoff_secs: default_retry_backoff_secs(),
            keep_alive_secs: default_keep_alive_secs(),
            grace_period_ms: default_grace_period_ms(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
        }
    }
}

impl CuratorConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn probe_backoff(&self) -> Duration {
        Duration::from_secs(self.probe_backoff_secs)
    }

    pub fn acquire_deadline(&self) -> Duration {
        Duration::from_secs(self.acquire_deadline_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }

    pub fn keep_alive_period(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }
}

fn default_threshold() -> f32 {
    0.35
}

fn default_log_capacity() -> usize {
    2000
}

fn default_eligible_hosts() -> Vec<String> {
    vec![
        "x.com".to_string(),
        "twitter.com".to_string(),
        "mobile.twitter.com".to_string(),
    ]
}

fn default_probe_attempts() -> u32 {
    3
}

fn default_probe_timeout_secs() -> u64 {
    30
}

fn default_probe_backoff_secs() -> u64 {
    1
}

fn default_acquire_deadline_secs() -> u64 {
    120
}

fn default_retry_backoff_secs() -> u64 {
    120
}

fn default_keep_alive_secs() -> u64 {
    25
}

fn default_grace_period_ms() -> u64 {
    250
}

fn default_rpc_timeout_secs() -> u64 {
    10
}

/// Where the embedding provider's artifacts come from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Endpoint probed for reachability before any download
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model repository id
    #[serde(default = "default_repo")]
    pub repo: String,

    /// Files fetched during provider construction
    #[serde(default = "default_files")]
    pub files: Vec<String>,

    /// Local cache directory for downloaded artifacts
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Embedding dimensionality of the constructed provider
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            repo: default_repo(),
            files: default_files(),
            cache_dir: default_cache_dir(),
            dimension: default_dimension(),
        }
    }
}

fn default_endpoint() -> String {
    "https://huggingface.co".to_string()
}

fn default_repo() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

fn default_files() -> Vec<String> {
    vec!["tokenizer.json".to_string()]
}

fn default_cache_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sift")
        .join("models")
}

fn default_dimension() -> usize {
    384
}
