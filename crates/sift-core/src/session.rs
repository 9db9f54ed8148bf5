//! Session state owned by the orchestrator

use serde::{Deserialize, Serialize};

/// Provider readiness as reported to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiStatus {
    #[default]
    Stopped,
    Loading,
    Ready,
}

impl AiStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiStatus::Stopped => "stopped",
            AiStatus::Loading => "loading",
            AiStatus::Ready => "ready",
        }
    }
}

/// Process-wide curation state.
///
/// Mutated only by the orchestrator on its own event-loop turn; everyone
/// else sees snapshots via STATUS_UPDATE broadcasts or the status RPC.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub is_running: bool,
    pub ai_ready: bool,
    pub ai_status: AiStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_is_stopped() {
        let state = SessionState::default();
        assert!(!state.is_running);
        assert!(!state.ai_ready);
        assert_eq!(state.ai_status, AiStatus::Stopped);
    }

    #[test]
    fn ai_status_wire_strings() {
        assert_eq!(
            serde_json::to_string(&AiStatus::Loading).unwrap(),
            "\"loading\""
        );
        assert_eq!(AiStatus::Ready.as_str(), "ready");
    }
}
