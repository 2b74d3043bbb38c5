use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::llm_client::ProviderKind;

/// Credentials and endpoint for one chat-completion provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// Application configuration loaded from environment variables.
/// Startup fails if no provider key is set or the default provider has none.
#[derive(Debug, Clone)]
pub struct Config {
    pub deepseek: Option<ProviderSettings>,
    pub grok: Option<ProviderSettings>,
    pub default_provider: ProviderKind,
    pub max_expansion_rounds: u32,
    pub llm_timeout_secs: u64,
    pub openalex_base_url: String,
    pub openalex_email: Option<String>,
    pub outputs_dir: PathBuf,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = |kind: ProviderKind, prefix: &str| {
            get(&format!("{prefix}_API_KEY")).map(|api_key| ProviderSettings {
                api_key,
                base_url: get(&format!("{prefix}_BASE_URL"))
                    .unwrap_or_else(|| kind.default_base_url().to_string()),
                model: get(&format!("{prefix}_MODEL"))
                    .unwrap_or_else(|| kind.default_model().to_string()),
            })
        };

        let default_provider = match get("DEFAULT_PROVIDER") {
            Some(raw) => raw
                .parse::<ProviderKind>()
                .map_err(anyhow::Error::msg)
                .context("DEFAULT_PROVIDER is invalid")?,
            None => ProviderKind::Standard,
        };

        let config = Config {
            deepseek: provider(ProviderKind::Standard, "DEEPSEEK"),
            grok: provider(ProviderKind::HighContext, "GROK"),
            default_provider,
            max_expansion_rounds: parse_or(&get, "MAX_EXPANSION_ROUNDS", 1)?,
            llm_timeout_secs: parse_or(&get, "LLM_TIMEOUT_SECS", 300)?,
            openalex_base_url: get("OPENALEX_BASE_URL")
                .unwrap_or_else(|| "https://api.openalex.org".to_string()),
            openalex_email: get("OPENALEX_EMAIL"),
            outputs_dir: PathBuf::from(get("OUTPUTS_DIR").unwrap_or_else(|| "outputs".to_string())),
            port: parse_or(&get, "PORT", 8080)?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        };

        if config.deepseek.is_none() && config.grok.is_none() {
            bail!("No LLM provider configured: set DEEPSEEK_API_KEY or GROK_API_KEY");
        }
        if config.settings_for(config.default_provider).is_none() {
            bail!(
                "DEFAULT_PROVIDER is '{}' but its API key is not set",
                config.default_provider
            );
        }

        Ok(config)
    }

    pub fn settings_for(&self, kind: ProviderKind) -> Option<&ProviderSettings> {
        match kind {
            ProviderKind::Standard => self.deepseek.as_ref(),
            ProviderKind::HighContext => self.grok.as_ref(),
        }
    }

    /// Every provider kind paired with its settings, if configured.
    pub fn provider_settings(&self) -> Vec<(ProviderKind, Option<ProviderSettings>)> {
        ProviderKind::ALL
            .into_iter()
            .map(|kind| (kind, self.settings_for(kind).cloned()))
            .collect()
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number")),
        None => Ok(default),
    }
}
