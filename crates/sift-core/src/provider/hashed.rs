//! Deterministic token-hash embedder
//!
//! Maps each token to a signed bucket of the output vector via SHA-256 and
//! L2-normalizes the sum. Tokenization uses the downloaded tokenizer when
//! one is available and whitespace splitting otherwise, so the same
//! provider type serves both the hub-constructed path and tests.

use sha2::{Digest, Sha256};
use tokenizers::Tokenizer;

use super::EmbeddingProvider;
use crate::error::{Error, Result};

pub struct HashedEmbedder {
    tokenizer: Option<Tokenizer>,
    dimension: usize,
}

impl HashedEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            tokenizer: None,
            dimension,
        }
    }

    pub fn with_tokenizer(tokenizer: Tokenizer, dimension: usize) -> Self {
        Self {
            tokenizer: Some(tokenizer),
            dimension,
        }
    }

    fn tokens(&self, text: &str) -> Result<Vec<String>> {
        match &self.tokenizer {
            Some(tokenizer) => {
                let encoding = tokenizer
                    .encode(text, false)
                    .map_err(|e| Error::Library(format!("tokenization failed: {}", e)))?;
                Ok(encoding.get_tokens().to_vec())
            }
            None => Ok(text
                .to_lowercase()
                .split_whitespace()
                .map(str::to_string)
                .collect()),
        }
    }
}

impl EmbeddingProvider for HashedEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in self.tokens(text)? {
            let digest = Sha256::digest(token.as_bytes());
            let bucket =
                u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize
                    % self.dimension;
            let sign = if digest[4] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
