use std::time::Duration;

use anyhow::Context;

pub const DEFAULT_API_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;
const DEFAULT_INSIGHT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_CHAT_TIMEOUT_SECS: u64 = 20;

/// Runtime settings read from the environment (and `.env`, when present).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub chat_api_key: Option<String>,
    pub api_base_url: String,
    pub model: String,
    pub insight_timeout: Duration,
    pub chat_timeout: Duration,
    pub host: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            chat_api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            insight_timeout: Duration::from_secs(DEFAULT_INSIGHT_TIMEOUT_SECS),
            chat_timeout: Duration::from_secs(DEFAULT_CHAT_TIMEOUT_SECS),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        // a missing .env is fine; variables may come from the shell
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let insight_timeout = match get("LOADCHECK_INSIGHT_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(
                raw.parse().with_context(|| {
                    format!("LOADCHECK_INSIGHT_TIMEOUT_SECS is not a number: {raw}")
                })?,
            ),
            None => defaults.insight_timeout,
        };
        let chat_timeout = match get("LOADCHECK_CHAT_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(
                raw.parse().with_context(|| {
                    format!("LOADCHECK_CHAT_TIMEOUT_SECS is not a number: {raw}")
                })?,
            ),
            None => defaults.chat_timeout,
        };
        let port = match get("LOADCHECK_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("LOADCHECK_PORT is not a valid port: {raw}"))?,
            None => defaults.port,
        };

        if insight_timeout.is_zero() {
            anyhow::bail!("LOADCHECK_INSIGHT_TIMEOUT_SECS must be greater than zero");
        }

        Ok(Self {
            api_key: get("GROQ_API_KEY"),
            chat_api_key: get("GROQ_API_KEY_CHAT"),
            api_base_url: get("LOADCHECK_API_BASE_URL").unwrap_or(defaults.api_base_url),
            model: get("LOADCHECK_MODEL").unwrap_or(defaults.model),
            insight_timeout,
            chat_timeout,
            host: get("LOADCHECK_HOST").unwrap_or(defaults.host),
            port,
        })
    }

    /// Chat prefers its own key and falls back to the shared one.
    pub fn chat_key(&self) -> Option<&str> {
        self.chat_api_key.as_deref().or(self.api_key.as_deref())
    }
}
