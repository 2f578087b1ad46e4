// src/config.rs

use std::env;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use url::Url;

/// Default number of resources attached to an incorrect answer.
pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 3;

/// Upper bound of resources on the fallback path.
pub const FALLBACK_RECOMMENDATION_LIMIT: usize = 3;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_LLM_CONCURRENCY: usize = 4;

/// Lifetime of tokens issued by `sign_jwt` in tests and tooling.
pub const DEFAULT_JWT_EXPIRATION_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,

    /// Absent key disables the text generator; every question then takes the basic path.
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    pub llm_concurrency: usize,

    pub recommendation_limit: usize,
    pub personalized_recommendation_limit: usize,

    /// Optional JSON file overriding the level / time-budget tables.
    pub recommendation_policy_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let llm_api_key = env::var("LLM_API_KEY").ok().filter(|k| !k.trim().is_empty());

        let llm_base_url = env::var("LLM_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_LLM_BASE_URL.to_string());
        if Url::parse(&llm_base_url).is_err() {
            panic!("LLM_BASE_URL is not a valid URL: {}", llm_base_url);
        }

        let llm_model = env::var("LLM_MODEL")
            .unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string());

        Self {
            database_url,
            jwt_secret,
            rust_log,
            llm_api_key,
            llm_base_url: llm_base_url.trim_end_matches('/').to_string(),
            llm_model,
            llm_timeout_secs: parse_or("LLM_TIMEOUT_SECS", DEFAULT_LLM_TIMEOUT_SECS),
            llm_concurrency: parse_or("LLM_CONCURRENCY", DEFAULT_LLM_CONCURRENCY).max(1),
            recommendation_limit: parse_or("RECOMMENDATION_LIMIT", DEFAULT_RECOMMENDATION_LIMIT),
            personalized_recommendation_limit: parse_or(
                "PERSONALIZED_RECOMMENDATION_LIMIT",
                DEFAULT_RECOMMENDATION_LIMIT,
            ),
            recommendation_policy_path: env::var("RECOMMENDATION_POLICY_PATH").ok(),
        }
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }
}

/// Reads an env var, falling back to `default` when unset or unparsable.
fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}
