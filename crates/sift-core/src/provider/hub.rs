//! Provider construction from a model hub
//!
//! Downloads the tokenizer artifacts through hf-hub's sync API inside
//! `spawn_blocking` and assembles a [`HashedEmbedder`] around them. The
//! lifecycle manager drives the stages; this factory only knows how to
//! perform each one.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use super::{EmbeddingProvider, HashedEmbedder, ProviderFactory};
use crate::config::HubConfig;
use crate::error::{Error, Result};

pub struct HubProviderFactory {
    config: HubConfig,
}

impl HubProviderFactory {
    pub fn new(config: HubConfig) -> Self {
        Self { config }
    }

    fn fetch_files(config: &HubConfig) -> Result<Vec<PathBuf>> {
        let api = hf_hub::api::sync::ApiBuilder::new()
            .with_cache_dir(config.cache_dir.clone())
            .build()
            .map_err(|e| Error::classify(e.to_string()))?;
        let repo = api.model(config.repo.clone());

        let mut paths = Vec::with_capacity(config.files.len());
        for file in &config.files {
            debug!("Fetching {} from {}", file, config.repo);
            paths.push(repo.get(file)?);
        }
        Ok(paths)
    }
}

impl ProviderFactory for HubProviderFactory {
    fn endpoint(&self) -> String {
        self.config.endpoint.clone()
    }

    fn import(&self) -> BoxFuture<'_, Result<()>> {
        async move {
            // The tokenizer runtime is linked in; importing amounts to
            // making sure the artifact cache is usable.
            std::fs::create_dir_all(&self.config.cache_dir)
                .map_err(|e| Error::Library(format!("cache dir unavailable: {}", e)))?;
            Ok(())
        }
        .boxed()
    }

    fn build(&self) -> BoxFuture<'_, Result<Arc<dyn EmbeddingProvider>>> {
        let config = self.config.clone();
        async move {
            let paths = tokio::task::spawn_blocking({
                let config = config.clone();
                move || Self::fetch_files(&config)
            })
            .await
            .map_err(|e| Error::Library(format!("download task failed: {}", e)))??;

            let tokenizer_path = paths
                .iter()
                .find(|p| {
                    p.file_name()
                        .map(|n| n == "tokenizer.json")
                        .unwrap_or(false)
                })
                .cloned();

            let provider: Arc<dyn EmbeddingProvider> = match tokenizer_path {
                Some(path) => {
                    let tokenizer = tokenizers::Tokenizer::from_file(&path)
                        .map_err(|e| Error::Library(format!("tokenizer load failed: {}", e)))?;
                    info!("Constructed embedder with tokenizer from {:?}", path);
                    Arc::new(HashedEmbedder::with_tokenizer(tokenizer, config.dimension))
                }
                None => {
                    info!("No tokenizer artifact listed; using whitespace tokens");
                    Arc::new(HashedEmbedder::new(config.dimension))
                }
            };
            Ok(provider)
        }
        .boxed()
    }
}
