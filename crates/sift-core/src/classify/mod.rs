//! Two-tier classification: embedding similarity with a rule-based fallback

mod engine;
mod fallback;
mod similarity;

pub use engine::classify;
pub use fallback::{fallback, DEFAULT_SPAM_KEYWORDS};
pub use similarity::cosine;
