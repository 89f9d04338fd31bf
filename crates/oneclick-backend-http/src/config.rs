//! Environment-driven backend configuration.

use thiserror::Error;

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("ONECLICK_SUPABASE_URL is not set")]
    MissingSupabaseUrl,
    #[error("ONECLICK_SUPABASE_ANON_KEY is not set")]
    MissingSupabaseAnonKey,
    #[error("ONECLICK_GEMINI_API_KEY is not set")]
    MissingGeminiApiKey,
    #[error("ONECLICK_POLL_INTERVAL_MS is not a positive integer: {0}")]
    InvalidPollInterval(String),
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub poll_interval_ms: u64,
}

impl BackendConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`] but with an injected lookup, for tests.
    ///
    /// [`from_env`]: BackendConfig::from_env
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let supabase_url = lookup("ONECLICK_SUPABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingSupabaseUrl)?
            .trim_end_matches('/')
            .to_string();
        let supabase_anon_key = lookup("ONECLICK_SUPABASE_ANON_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingSupabaseAnonKey)?;
        let gemini_api_key = lookup("ONECLICK_GEMINI_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingGeminiApiKey)?;
        let gemini_model =
            lookup("ONECLICK_GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        let poll_interval_ms = match lookup("ONECLICK_POLL_INTERVAL_MS") {
            None => DEFAULT_POLL_INTERVAL_MS,
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or(ConfigError::InvalidPollInterval(raw))?,
        };
        Ok(Self {
            supabase_url,
            supabase_anon_key,
            gemini_api_key,
            gemini_model,
            poll_interval_ms,
        })
    }
}
