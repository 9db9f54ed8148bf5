//! Interest terms and their cached embeddings

use tracing::{debug, warn};

use crate::classify::DEFAULT_SPAM_KEYWORDS;
use crate::error::Result;
use crate::provider::EmbeddingProvider;

/// Current interest inputs plus derived embedding vectors.
///
/// Owned by the orchestrator; embeddings are rebuilt wholesale and swapped
/// in a single assignment so a reader on the same task never observes a
/// mix of old and new vectors.
pub struct InterestCache {
    terms: Vec<String>,
    spam_keywords: Vec<String>,
    threshold: f32,
    embeddings: Vec<Vec<f32>>,
    dirty: bool,
}

impl InterestCache {
    pub fn new(threshold: f32) -> Self {
        Self {
            terms: Vec::new(),
            spam_keywords: DEFAULT_SPAM_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            threshold,
            embeddings: Vec::new(),
            dirty: false,
        }
    }

    /// Replace the interest inputs, invalidating any cached embeddings.
    pub fn set_inputs(
        &mut self,
        interests: Vec<String>,
        spam_keywords: Option<Vec<String>>,
        threshold: Option<f32>,
    ) {
        self.terms = interests
            .into_iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if let Some(keywords) = spam_keywords {
            self.spam_keywords = keywords
                .into_iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect();
        }
        if let Some(threshold) = threshold {
            self.threshold = threshold;
        }
        self.embeddings.clear();
        self.dirty = !self.terms.is_empty();
        debug!(
            "Interest inputs updated: {} terms, {} spam keywords",
            self.terms.len(),
            self.spam_keywords.len()
        );
    }

    /// Recompute every interest embedding and swap the cache atomically.
    ///
    /// All-or-nothing: an embedding failure leaves the previous cache and
    /// the dirty flag untouched.
    pub fn recompute(&mut self, provider: &dyn EmbeddingProvider) -> Result<()> {
        if self.terms.is_empty() {
            self.embeddings = Vec::new();
            self.dirty = false;
            return Ok(());
        }

        let mut fresh = Vec::with_capacity(self.terms.len());
        for term in &self.terms {
            match provider.embed(term) {
                Ok(vector) => fresh.push(vector),
                Err(e) => {
                    warn!("Interest embedding failed for \"{}\": {}", term, e);
                    return Err(e);
                }
            }
        }

        self.embeddings = fresh;
        self.dirty = false;
        debug!("Recomputed {} interest embeddings", self.embeddings.len());
        Ok(())
    }

    /// True when a recompute was requested but has not run yet.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// True when tier-1 matching has a full set of vectors to work with.
    pub fn has_embeddings(&self) -> bool {
        !self.terms.is_empty() && self.embeddings.len() == self.terms.len()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn spam_keywords(&self) -> &[String] {
        &self.spam_keywords
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn embeddings(&self) -> &[Vec<f32>] {
        &self.embeddings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::HashedEmbedder;

    #[test]
    fn inputs_are_normalized() {
        let mut cache = InterestCache::new(0.35);
        cache.set_inputs(
            vec!["  Rust  ".to_string(), "".to_string(), "AI".to_string()],
            None,
            None,
        );
        assert_eq!(cache.terms(), ["rust", "ai"]);
        assert!(cache.is_dirty());
        assert!(!cache.has_embeddings());
    }

    #[test]
    fn recompute_fills_one_vector_per_term() {
        let provider = HashedEmbedder::new(32);
        let mut cache = InterestCache::new(0.35);
        cache.set_inputs(vec!["rust".to_string(), "ai".to_string()], None, None);

        cache.recompute(&provider).unwrap();
        assert!(cache.has_embeddings());
        assert!(!cache.is_dirty());
        assert_eq!(cache.embeddings().len(), 2);
        assert_eq!(cache.embeddings()[0].len(), 32);
    }

    #[test]
    fn failed_recompute_keeps_previous_cache() {
        struct Failing;
        impl EmbeddingProvider for Failing {
            fn embed(&self, _: &str) -> Result<Vec<f32>> {
                Err(crate::error::Error::Library("gone".to_string()))
            }
            fn dimension(&self) -> usize {
                32
            }
        }

        let provider = HashedEmbedder::new(32);
        let mut cache = InterestCache::new(0.35);
        cache.set_inputs(vec!["rust".to_string()], None, None);
        cache.recompute(&provider).unwrap();
        let before = cache.embeddings().to_vec();

        cache.set_inputs(vec!["rust".to_string(), "ai".to_string()], None, None);
        // New inputs cleared the cache; a failing recompute must not
        // install a partial one.
        assert!(cache.recompute(&Failing).is_err());
        assert!(cache.is_dirty());
        assert!(!cache.has_embeddings());
        assert_ne!(before.len(), cache.terms().len());
    }

    #[test]
    fn spam_keywords_default_then_replace() {
        let mut cache = InterestCache::new(0.35);
        assert!(!cache.spam_keywords().is_empty());

        cache.set_inputs(
            vec!["rust".to_string()],
            Some(vec!["Buy NOW".to_string()]),
            Some(0.5),
        );
        assert_eq!(cache.spam_keywords(), ["buy now"]);
        assert_eq!(cache.threshold(), 0.5);
    }
}
