//! Rule-based fallback classifier
//!
//! Runs whenever the embedding provider is unavailable. Rules apply in a
//! strict order; the first match decides.

use crate::protocol::Classification;

/// Spam keywords used when the UI has not supplied its own list.
pub const DEFAULT_SPAM_KEYWORDS: &[&str] = &[
    "buy now",
    "limited offer",
    "limited time",
    "click here",
    "click the link",
    "dm me",
    "check my bio",
    "link in bio",
    "free money",
    "giveaway",
    "promo code",
    "sponsored",
    "100% guaranteed",
];

const BAIT_PREFIXES: &[&str] = &["rt if", "retweet if", "like if", "agree or disagree"];

const QUALITY_INDICATORS: &[&str] = &[
    "research",
    "study",
    "breakthrough",
    "published",
    "scientists",
    "university",
    "data shows",
];

const ABBREVIATIONS: &[(&str, &[&str])] = &[
    ("ai", &["artificial", "intelligence"]),
    ("ml", &["machine", "learning"]),
    ("gpu", &["graphics"]),
    ("cpu", &["processor"]),
];

/// Classify `text` without the provider. Total: every input produces a
/// fully-populated result.
pub fn fallback(text: &str, interests: &[String], spam_keywords: &[String]) -> Classification {
    let lower = text.to_lowercase();
    let trimmed = lower.trim();
    if trimmed.is_empty() {
        return Classification::hide("Invalid input");
    }

    // 1. Spam keywords outrank everything, including direct interest hits.
    for keyword in spam_keywords {
        if !keyword.is_empty() && trimmed.contains(keyword.as_str()) {
            return Classification::hide(format!("Spam keyword: \"{}\"", keyword));
        }
    }

    // 2. Direct mention of an interest.
    for interest in interests {
        if !interest.is_empty() && trimmed.contains(interest.as_str()) {
            return Classification::keep(format!("Mentions interest: \"{}\"", interest));
        }
    }

    // 3. Engagement bait.
    for prefix in BAIT_PREFIXES {
        if trimmed.starts_with(prefix) {
            return Classification::hide("Engagement bait");
        }
    }

    // 4. Quality indicators.
    for indicator in QUALITY_INDICATORS {
        if trimmed.contains(indicator) {
            return Classification::keep(format!("Quality indicator: \"{}\"", indicator));
        }
    }

    // 5. Weak token overlap against the best-scoring interest.
    let text_tokens: Vec<&str> = trimmed.split_whitespace().collect();
    let mut best_score = 0.0f32;
    let mut best_interest: Option<&str> = None;
    for interest in interests {
        let interest_tokens: Vec<&str> = interest.split_whitespace().collect();
        if interest_tokens.is_empty() {
            continue;
        }
        let matches = interest_tokens
            .iter()
            .filter(|it| text_tokens.iter().any(|tt| tokens_overlap(tt, it)))
            .count();
        let score = matches as f32 / interest_tokens.len() as f32;
        if score > best_score {
            best_score = score;
            best_interest = Some(interest);
        }
    }
    if best_score > 0.5 {
        if let Some(interest) = best_interest {
            return Classification::keep(format!(
                "Weak match with \"{}\" ({:.0}%)",
                interest,
                best_score * 100.0
            ));
        }
    }

    // 6. Nothing matched.
    Classification::hide("No matching interests")
}

fn tokens_overlap(a: &str, b: &str) -> bool {
    if a.len() >= 3 && b.len() >= 3 && (a.contains(b) || b.contains(a)) {
        return true;
    }
    for (abbr, expansions) in ABBREVIATIONS {
        if (a == *abbr && expansions.contains(&b)) || (b == *abbr && expansions.contains(&a)) {
            return true;
        }
    }
    false
}
