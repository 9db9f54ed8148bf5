//! Wire messages and broadcast events
//!
//! Every cross-context interaction is one of these tagged unions: inbound
//! traffic from the observer and UI deserializes into [`WireMessage`],
//! outbound UI traffic is an [`Event`] on the broadcast channel.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::session::AiStatus;

/// One item pulled off the feed, as submitted by the observer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRequest {
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub video_frames: Vec<String>,
}

impl EvaluationRequest {
    /// Content-hash id for items without a stable permalink.
    ///
    /// Hashes the username, the first 64 chars of text, and the image URLs
    /// so repeated sightings of the same item map to the same id.
    pub fn fallback_id(username: &str, text: &str, image_urls: &[String]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(username.as_bytes());
        let prefix: String = text.chars().take(64).collect();
        hasher.update(prefix.as_bytes());
        for url in image_urls {
            hasher.update(url.as_bytes());
        }
        let digest = hasher.finalize();
        let mut id = String::with_capacity(16);
        for byte in digest.iter().take(8) {
            id.push_str(&format!("{:02x}", byte));
        }
        id
    }
}

/// Keep-or-hide verdict for one item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Hide,
    Keep,
}

/// Output of the classification engine; always fully populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub is_uninteresting: bool,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
}

impl Classification {
    pub fn hide(reason: impl Into<String>) -> Self {
        Self {
            is_uninteresting: true,
            reason: reason.into(),
            similarity: None,
        }
    }

    pub fn keep(reason: impl Into<String>) -> Self {
        Self {
            is_uninteresting: false,
            reason: reason.into(),
            similarity: None,
        }
    }

    pub fn decision(&self) -> Decision {
        if self.is_uninteresting {
            Decision::Hide
        } else {
            Decision::Keep
        }
    }
}

/// Inbound message union.
///
/// Anything with an unrecognized tag lands in `Unknown` and is answered
/// with an unknown-message error rather than dropped silently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum WireMessage {
    StartCuration {
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        target: Option<u64>,
    },
    StopCuration,
    EvaluateTweet {
        id: String,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        image_urls: Vec<String>,
        #[serde(default)]
        video_frames: Vec<String>,
    },
    Classify {
        id: String,
        #[serde(default)]
        text: Option<String>,
    },
    SetInterests {
        interests: Vec<String>,
        #[serde(default)]
        spam_keywords: Option<Vec<String>>,
        #[serde(default)]
        threshold: Option<f32>,
    },
    MarkTweet {
        id: String,
        is_uninteresting: bool,
    },
    AiReady,
    AiLoadFailed {
        #[serde(default)]
        error: String,
    },
    AiLoadProgress {
        stage: String,
        #[serde(default)]
        detail: String,
    },
    ClassificationResult {
        id: String,
        is_uninteresting: bool,
        reason: String,
    },
    RetryAiLoad,
    StatusRequest,
    ExportLog,
    #[serde(other)]
    Unknown,
}

/// Outbound broadcast union consumed by the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Event {
    StatusUpdate {
        is_running: bool,
        ai_ready: bool,
        ai_status: AiStatus,
    },
    ActivityLog {
        tweet_text: String,
        decision: Decision,
        reason: String,
    },
    AiLoadProgress {
        stage: String,
        detail: String,
    },
    AiReady,
    AiLoadFailed {
        category: String,
        message: String,
    },
    ClassificationResult {
        id: String,
        is_uninteresting: bool,
        reason: String,
    },
    Error {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_tags_round_trip() {
        let msg: WireMessage = serde_json::from_str(
            r#"{"type":"EVALUATE_TWEET","id":"t1","text":"hello","imageUrls":["a"]}"#,
        )
        .unwrap();
        match msg {
            WireMessage::EvaluateTweet {
                id,
                text,
                image_urls,
                video_frames,
            } => {
                assert_eq!(id, "t1");
                assert_eq!(text.as_deref(), Some("hello"));
                assert_eq!(image_urls, vec!["a"]);
                assert!(video_frames.is_empty());
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn unrecognized_tag_becomes_unknown() {
        let msg: WireMessage = serde_json::from_str(r#"{"type":"SELF_DESTRUCT"}"#).unwrap();
        assert!(matches!(msg, WireMessage::Unknown));
    }

    #[test]
    fn status_update_uses_camel_case_fields() {
        let event = Event::StatusUpdate {
            is_running: true,
            ai_ready: false,
            ai_status: AiStatus::Loading,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "STATUS_UPDATE");
        assert_eq!(json["isRunning"], true);
        assert_eq!(json["aiStatus"], "loading");
    }

    #[test]
    fn fallback_id_is_stable_and_content_sensitive() {
        let a = EvaluationRequest::fallback_id("user", "same text", &["pic".to_string()]);
        let b = EvaluationRequest::fallback_id("user", "same text", &["pic".to_string()]);
        let c = EvaluationRequest::fallback_id("user", "other text", &["pic".to_string()]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
    }
}
