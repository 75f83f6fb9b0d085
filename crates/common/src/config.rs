use std::collections::BTreeSet;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{Chain, Secret, SourceKind};

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Address the API server binds to
    pub bind_addr: String,

    /// Etherscan-compatible source lookup endpoint
    pub etherscan_api_url: String,

    /// Etherscan API key
    pub etherscan_api_key: Secret,

    /// Liquidity monitoring / token metrics endpoint
    pub liquidity_api_url: String,

    /// Sentiment analysis endpoint
    pub sentiment_api_url: String,

    /// Contract audit endpoint consulted by the token-risk aggregator
    pub contract_audit_url: String,

    /// Base URL of the generative language model API
    pub gemini_api_url: String,

    /// Generative API key
    pub gemini_api_key: Secret,

    /// Model used for contract audits
    pub audit_model: String,

    /// Model used for token risk reports
    pub risk_model: String,

    /// Sampling temperature sent with every generation request
    pub generation_temperature: f32,

    /// Upper bound on generated tokens
    pub generation_max_output_tokens: u32,

    /// Chain used for token metrics when the caller does not name one
    pub default_chain: Chain,

    /// Timeout applied to every outbound HTTP call, in seconds
    pub http_timeout_secs: u64,

    /// Maximum characters of upstream text embedded in a prompt (default: 30000)
    pub prompt_source_budget: usize,

    /// Attempts per upstream fetch (default: 1 = no retry)
    pub fetch_max_attempts: u32,

    /// Attempts per generation call (default: 1 = no retry)
    pub generation_max_attempts: u32,

    /// First retry delay in milliseconds
    pub retry_initial_backoff_ms: u64,

    /// Retry delay cap in milliseconds
    pub retry_max_backoff_ms: u64,

    /// Token-risk sources whose failure degrades the report instead of aborting it
    pub optional_sources: BTreeSet<SourceKind>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            etherscan_api_url: std::env::var("ETHERSCAN_API_URL")
                .unwrap_or_else(|_| "https://api.etherscan.io/api".to_string()),
            etherscan_api_key: std::env::var("ETHERSCAN_API_KEY")
                .map(Secret::new)
                .map_err(|_| anyhow::anyhow!("ETHERSCAN_API_KEY environment variable is required"))?,
            liquidity_api_url: std::env::var("LIQUIDITY_API_URL").unwrap_or_else(|_| {
                "https://liquidity-monitoring-1.onrender.com/get_token".to_string()
            }),
            sentiment_api_url: std::env::var("SENTIMENT_API_URL")
                .unwrap_or_else(|_| "https://sentiment-agent-1.onrender.com/analyze".to_string()),
            contract_audit_url: std::env::var("CONTRACT_AUDIT_URL")
                .unwrap_or_else(|_| "https://assure-fi.onrender.com/analyze-contract".to_string()),
            gemini_api_url: std::env::var("GEMINI_API_URL").unwrap_or_else(|_| {
                "https://generativelanguage.googleapis.com/v1beta".to_string()
            }),
            gemini_api_key: std::env::var("GEMINI_API_KEY")
                .map(Secret::new)
                .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY environment variable is required"))?,
            audit_model: std::env::var("AUDIT_MODEL")
                .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            risk_model: std::env::var("RISK_MODEL").unwrap_or_else(|_| "gemini-1.5-pro".to_string()),
            generation_temperature: std::env::var("GENERATION_TEMPERATURE")
                .unwrap_or_else(|_| "0.2".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("GENERATION_TEMPERATURE must be a valid f32"))?,
            generation_max_output_tokens: std::env::var("GENERATION_MAX_OUTPUT_TOKENS")
                .unwrap_or_else(|_| "8192".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("GENERATION_MAX_OUTPUT_TOKENS must be a valid u32"))?,
            default_chain: std::env::var("DEFAULT_CHAIN")
                .unwrap_or_else(|_| "solana".to_string())
                .parse()
                .map_err(|e| anyhow::anyhow!("DEFAULT_CHAIN: {}", e))?,
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("HTTP_TIMEOUT_SECS must be a valid u64"))?,
            prompt_source_budget: std::env::var("PROMPT_SOURCE_BUDGET")
                .unwrap_or_else(|_| "30000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PROMPT_SOURCE_BUDGET must be a valid usize"))?,
            fetch_max_attempts: std::env::var("FETCH_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("FETCH_MAX_ATTEMPTS must be a valid u32"))?,
            generation_max_attempts: std::env::var("GENERATION_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("GENERATION_MAX_ATTEMPTS must be a valid u32"))?,
            retry_initial_backoff_ms: std::env::var("RETRY_INITIAL_BACKOFF_MS")
                .unwrap_or_else(|_| "500".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("RETRY_INITIAL_BACKOFF_MS must be a valid u64"))?,
            retry_max_backoff_ms: std::env::var("RETRY_MAX_BACKOFF_MS")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("RETRY_MAX_BACKOFF_MS must be a valid u64"))?,
            optional_sources: parse_source_list(
                &std::env::var("OPTIONAL_SOURCES").unwrap_or_default(),
            )
            .map_err(|e| anyhow::anyhow!("OPTIONAL_SOURCES: {}", e))?,
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Parse a comma-separated list of source names, e.g. `"sentiment, token"`.
pub fn parse_source_list(raw: &str) -> Result<BTreeSet<SourceKind>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}
