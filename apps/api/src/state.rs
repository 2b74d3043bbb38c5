use crate::config::Config;
use crate::generation::ExpansionPolicy;
use crate::lecture::pipeline::LecturePipeline;
use crate::llm_client::ProviderSet;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Built once at startup; immutable afterwards.
    pub providers: ProviderSet,
    /// Expansion rounds applied when a request does not set its own.
    pub policy: ExpansionPolicy,
    pub pipeline: LecturePipeline,
}
