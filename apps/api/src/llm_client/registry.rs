//! The set of configured providers, built once at startup.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use super::{ChatProvider, LlmError, OpenAiCompatProvider, ProviderKind};
use crate::config::{Config, ProviderSettings};
use crate::generation::GenerationError;

/// Configured providers keyed by kind, plus the default selection.
#[derive(Clone)]
pub struct ProviderSet {
    providers: HashMap<ProviderKind, Arc<dyn ChatProvider>>,
    default_kind: ProviderKind,
}

impl ProviderSet {
    pub fn new(default_kind: ProviderKind) -> Self {
        Self {
            providers: HashMap::new(),
            default_kind,
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn ChatProvider>) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    /// Builds an HTTP provider for every kind that has credentials configured.
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let mut set = ProviderSet::new(config.default_provider);

        for (kind, settings) in config.provider_settings() {
            let Some(ProviderSettings {
                api_key,
                base_url,
                model,
            }) = settings
            else {
                continue;
            };

            let provider = OpenAiCompatProvider::new(
                kind,
                &base_url,
                api_key,
                model,
                config.llm_timeout_secs,
            )?;
            info!(
                provider = %kind,
                model = provider.model(),
                endpoint = provider.endpoint(),
                "LLM provider configured"
            );
            set = set.with_provider(Arc::new(provider));
        }

        Ok(set)
    }

    pub fn default_kind(&self) -> ProviderKind {
        self.default_kind
    }

    pub fn is_configured(&self, kind: ProviderKind) -> bool {
        self.providers.contains_key(&kind)
    }

    /// The provider for `kind`, or a configuration error when it has no credentials.
    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn ChatProvider>, GenerationError> {
        self.providers.get(&kind).cloned().ok_or_else(|| {
            GenerationError::Configuration(format!(
                "provider '{kind}' is not configured (missing API key)"
            ))
        })
    }

    pub fn default_provider(&self) -> Result<Arc<dyn ChatProvider>, GenerationError> {
        self.get(self.default_kind)
    }

    /// Picks the provider for analysing a document of roughly `document_tokens` tokens.
    ///
    /// The high-context provider is preferred whenever it is configured. Without it,
    /// documents larger than the standard context window are still sent to the
    /// standard provider, which only ever sees them chunk by chunk.
    pub fn for_document(
        &self,
        document_tokens: u64,
    ) -> Result<Arc<dyn ChatProvider>, GenerationError> {
        if self.is_configured(ProviderKind::HighContext) {
            return self.get(ProviderKind::HighContext);
        }
        let window = ProviderKind::Standard.limits().context_window as u64;
        if document_tokens > window {
            info!(
                document_tokens,
                window, "Document exceeds standard context window; relying on chunking"
            );
        }
        self.get(ProviderKind::Standard)
    }
}
