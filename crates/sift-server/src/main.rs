//! Sift Server - HTTP host for the feed-curation engine

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod error;
mod observer;
mod settings;
mod state;

use observer::ChannelObserver;
use settings::Settings;
use sift_core::{HubProviderFactory, JsonFileStore, Orchestrator};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sift_server=debug,sift_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Sift curation server");

    // Load configuration
    let settings = Settings::load()?;

    let store = Arc::new(JsonFileStore::open_default()?);
    info!("State file: {:?}", store.path());

    let channel_observer = Arc::new(ChannelObserver::new(256));
    let factory = Arc::new(HubProviderFactory::new(settings.hub.clone()));

    let curator = Orchestrator::spawn(
        settings.curator.clone(),
        store,
        channel_observer.clone(),
        factory,
    );
    let state = AppState::new(curator, channel_observer);

    // Build router
    let app = api::create_router(state);

    // Start server
    let addr = settings.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
