//! Two-tier classification entry point

use std::sync::Arc;
use tracing::warn;

use super::fallback::fallback;
use super::similarity::cosine;
use crate::error::{Error, Result};
use crate::interests::InterestCache;
use crate::protocol::Classification;
use crate::provider::EmbeddingProvider;

/// Decide whether `text` is uninteresting.
///
/// Tier 1 (embedding similarity) runs when a provider is available; any
/// tier-1 failure degrades to the rule-based fallback, and any residual
/// failure (including a panicking provider) is replaced with a safe hide
/// result. Never returns an error.
pub fn classify(
    text: Option<&str>,
    cache: &InterestCache,
    provider: Option<&Arc<dyn EmbeddingProvider>>,
) -> Classification {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        classify_inner(text, cache, provider)
    }))
    .unwrap_or_else(|_| {
        warn!("Classifier panicked; hiding item");
        Classification::hide("Classification error")
    })
}

fn classify_inner(
    text: Option<&str>,
    cache: &InterestCache,
    provider: Option<&Arc<dyn EmbeddingProvider>>,
) -> Classification {
    let text = match text {
        Some(t) if !t.trim().is_empty() => t,
        _ => return Classification::hide("Invalid input"),
    };

    if let Some(provider) = provider {
        if cache.terms().is_empty() {
            return Classification::keep("No interests");
        }
        if cache.has_embeddings() {
            match semantic(text, cache, provider.as_ref()) {
                Ok(result) => return result,
                Err(e) => warn!("Semantic classification failed, using fallback: {}", e),
            }
        }
    }

    fallback(text, cache.terms(), cache.spam_keywords())
}

fn semantic(
    text: &str,
    cache: &InterestCache,
    provider: &dyn EmbeddingProvider,
) -> Result<Classification> {
    let embedding = provider.embed(text)?;

    let mut max_similarity = f32::MIN;
    let mut best_term = "";
    for (term, interest_embedding) in cache.terms().iter().zip(cache.embeddings()) {
        let similarity = cosine(&embedding, interest_embedding);
        if similarity > max_similarity {
            max_similarity = similarity;
            best_term = term;
        }
    }
    if best_term.is_empty() {
        return Err(Error::InvalidInput("no interest embeddings".to_string()));
    }

    let threshold = cache.threshold();
    let mut result = if max_similarity < threshold {
        Classification::hide(format!(
            "Max similarity {:.2} below threshold {:.2}",
            max_similarity, threshold
        ))
    } else {
        Classification::keep(format!(
            "Similar to \"{}\" ({:.2})",
            best_term, max_similarity
        ))
    };
    result.similarity = Some(max_similarity);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::HashedEmbedder;

    fn ready_cache(terms: &[&str], provider: &dyn EmbeddingProvider) -> InterestCache {
        let mut cache = InterestCache::new(0.35);
        cache.set_inputs(terms.iter().map(|s| s.to_string()).collect(), None, None);
        cache.recompute(provider).unwrap();
        cache
    }

    #[test]
    fn missing_text_short_circuits_to_invalid_input() {
        let cache = InterestCache::new(0.35);
        let result = classify(None, &cache, None);
        assert!(result.is_uninteresting);
        assert!(result.reason.contains("Invalid input"));

        let result = classify(Some("   "), &cache, None);
        assert!(result.is_uninteresting);
    }

    #[test]
    fn result_is_always_fully_populated() {
        let cache = InterestCache::new(0.35);
        for text in [None, Some(""), Some("plain text"), Some("🦀 emoji only")] {
            let result = classify(text, &cache, None);
            assert!(!result.reason.is_empty());
        }
    }

    #[test]
    fn provider_with_no_interests_keeps_without_embedding() {
        struct Panicking;
        impl EmbeddingProvider for Panicking {
            fn embed(&self, _: &str) -> crate::error::Result<Vec<f32>> {
                panic!("provider must not be invoked");
            }
            fn dimension(&self) -> usize {
                8
            }
        }

        let cache = InterestCache::new(0.35);
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(Panicking);
        let result = classify(Some("anything"), &cache, Some(&provider));
        assert!(!result.is_uninteresting);
        assert_eq!(result.reason, "No interests");
    }

    #[test]
    fn identical_text_scores_above_threshold() {
        let embedder = HashedEmbedder::new(128);
        let cache = ready_cache(&["rust programming"], &embedder);
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(HashedEmbedder::new(128));

        let result = classify(Some("rust programming"), &cache, Some(&provider));
        assert!(!result.is_uninteresting);
        assert!(result.similarity.unwrap() > 0.99);
    }

    #[test]
    fn unrelated_text_falls_below_threshold() {
        let embedder = HashedEmbedder::new(128);
        let cache = ready_cache(&["rust programming"], &embedder);
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(HashedEmbedder::new(128));

        let result = classify(
            Some("pumpkin spice latte season is here"),
            &cache,
            Some(&provider),
        );
        assert!(result.is_uninteresting);
        assert!(result.similarity.unwrap() < 0.35);
        assert!(result.reason.contains("below threshold"));
    }

    #[test]
    fn provider_failure_degrades_to_fallback() {
        struct Failing;
        impl EmbeddingProvider for Failing {
            fn embed(&self, _: &str) -> crate::error::Result<Vec<f32>> {
                Err(Error::Library("inference backend gone".to_string()))
            }
            fn dimension(&self) -> usize {
                128
            }
        }

        let embedder = HashedEmbedder::new(128);
        let cache = ready_cache(&["rust"], &embedder);
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(Failing);

        let result = classify(Some("a new rust release"), &cache, Some(&provider));
        assert!(!result.is_uninteresting);
        assert!(result.reason.contains("rust"));
        assert!(result.similarity.is_none());
    }

    #[test]
    fn panicking_provider_yields_safe_default() {
        struct Panicking;
        impl EmbeddingProvider for Panicking {
            fn embed(&self, _: &str) -> crate::error::Result<Vec<f32>> {
                panic!("backend crashed");
            }
            fn dimension(&self) -> usize {
                128
            }
        }

        let embedder = HashedEmbedder::new(128);
        let cache = ready_cache(&["rust"], &embedder);
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(Panicking);

        let result = classify(Some("a new rust release"), &cache, Some(&provider));
        assert!(result.is_uninteresting);
        assert_eq!(result.reason, "Classification error");
    }

    #[test]
    fn stale_cache_uses_fallback_even_with_provider() {
        let mut cache = InterestCache::new(0.35);
        cache.set_inputs(vec!["rust".to_string()], None, None);
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(HashedEmbedder::new(128));

        // Inputs set but never recomputed: tier 1 has nothing to compare.
        let result = classify(Some("a new rust release"), &cache, Some(&provider));
        assert!(!result.is_uninteresting);
        assert!(result.reason.contains("rust"));
    }
}
