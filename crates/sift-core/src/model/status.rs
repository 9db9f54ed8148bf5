//! Model load state machine

use serde::{Deserialize, Serialize};

/// Stages of one provider acquisition attempt.
///
/// Transitions are monotonic within an attempt; `Failed` is reachable from
/// any non-terminal state, and a fresh attempt restarts from `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelLoadState {
    #[default]
    Idle,
    TestingNetwork,
    ImportingProvider,
    Downloading,
    Ready,
    Failed,
}

impl ModelLoadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelLoadState::Idle => "idle",
            ModelLoadState::TestingNetwork => "testing_network",
            ModelLoadState::ImportingProvider => "importing_provider",
            ModelLoadState::Downloading => "downloading",
            ModelLoadState::Ready => "ready",
            ModelLoadState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ModelLoadState::Ready | ModelLoadState::Failed)
    }
}
