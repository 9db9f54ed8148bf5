//! Embedding provider abstraction
//!
//! The curator consumes exactly two contracts: a constructed provider that
//! turns text into fixed-dimension vectors, and a factory that knows how to
//! build one. The numerics behind `embed` are the provider's business.

mod hashed;
mod hub;

pub use hashed::HashedEmbedder;
pub use hub::HubProviderFactory;

use futures::future::BoxFuture;
use std::sync::Arc;

use crate::error::Result;

/// A ready text-embedding provider.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed `text` into a vector of `dimension()` components.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Fixed output dimensionality.
    fn dimension(&self) -> usize;
}

/// Builds an embedding provider, in the three observable stages the
/// lifecycle manager drives: reachability, library import, construction.
pub trait ProviderFactory: Send + Sync {
    /// Distribution endpoint probed before any download starts. Empty
    /// when the factory is fully local and there is nothing to probe.
    fn endpoint(&self) -> String;

    /// Initialize the inference library. Failures are library errors.
    fn import(&self) -> BoxFuture<'_, Result<()>>;

    /// Fetch artifacts and construct the provider.
    fn build(&self) -> BoxFuture<'_, Result<Arc<dyn EmbeddingProvider>>>;
}
