mod config;
mod errors;
mod generation;
mod lecture;
mod llm_client;
mod models;
mod openalex;
mod routes;
mod sources;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::generation::ExpansionPolicy;
use crate::lecture::pipeline::LecturePipeline;
use crate::lecture::store::ArtifactStore;
use crate::llm_client::ProviderSet;
use crate::openalex::OpenAlexClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Configuration errors abort startup before anything is served
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting LectureFlow API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM providers
    let providers = ProviderSet::from_config(&config).context("Failed to build LLM providers")?;
    info!(default = %providers.default_kind(), "LLM providers initialized");

    // Initialize OpenAlex
    let openalex = OpenAlexClient::new(&config.openalex_base_url, config.openalex_email.clone())
        .context("Failed to build OpenAlex client")?;
    info!(
        base_url = %config.openalex_base_url,
        polite_pool = config.openalex_email.is_some(),
        "OpenAlex client initialized"
    );

    let store = ArtifactStore::new(&config.outputs_dir);
    tokio::fs::create_dir_all(store.root())
        .await
        .with_context(|| format!("Failed to create {}", store.root().display()))?;
    info!(outputs_dir = %store.root().display(), "Artifact store ready");

    let policy = ExpansionPolicy {
        max_expansion_rounds: config.max_expansion_rounds,
    };
    info!(max_expansion_rounds = policy.max_expansion_rounds, "Length guarantee policy");

    // Build app state
    let state = AppState {
        config: config.clone(),
        providers: providers.clone(),
        policy,
        pipeline: LecturePipeline::new(providers, openalex, store, policy),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
