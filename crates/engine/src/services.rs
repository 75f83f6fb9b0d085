//! Wiring of the three analysis services from configuration.

use std::sync::Arc;
use std::time::Duration;

use assure_common::config::AppConfig;
use assure_common::error::AppError;
use assure_upstream::fetcher::{Fetcher, HttpFetcher};
use assure_upstream::generator::{GeminiClient, GenerationParams, TextGenerator};
use assure_upstream::retry::RetryPolicy;
use assure_upstream::sources::SourceEndpoints;

use crate::audit::ContractAuditor;
use crate::dataset::SourcePolicy;
use crate::liquidity::LiquidityLookup;
use crate::prompt::PromptBuilder;
use crate::risk::TokenRiskAggregator;

pub struct Services {
    pub auditor: ContractAuditor,
    pub risk: TokenRiskAggregator,
    pub liquidity: LiquidityLookup,
}

impl Services {
    /// Build the services on top of the given upstream seams.
    pub fn new(
        config: &AppConfig,
        fetcher: Arc<dyn Fetcher>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let endpoints = SourceEndpoints::from_config(config);
        let prompts = PromptBuilder::new(config.prompt_source_budget);

        let auditor = ContractAuditor::new(
            fetcher.clone(),
            generator.clone(),
            endpoints.clone(),
            prompts,
            generation_params(config, &config.audit_model),
        );
        let risk = TokenRiskAggregator::new(
            fetcher.clone(),
            generator,
            endpoints.clone(),
            prompts,
            generation_params(config, &config.risk_model),
            SourcePolicy::with_optional(config.optional_sources.clone()),
            config.default_chain,
        );
        let liquidity = LiquidityLookup::new(fetcher, endpoints);

        Self {
            auditor,
            risk,
            liquidity,
        }
    }

    /// Build the services against the real HTTP upstreams.
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let fetcher = HttpFetcher::new(
            config.http_timeout(),
            retry_policy(config, config.fetch_max_attempts),
        )?;
        let generator =
            GeminiClient::from_config(config, retry_policy(config, config.generation_max_attempts))?;

        tracing::info!(
            audit_model = %config.audit_model,
            risk_model = %config.risk_model,
            optional_sources = ?config.optional_sources,
            fetch_attempts = config.fetch_max_attempts,
            generation_attempts = config.generation_max_attempts,
            "Analysis services configured"
        );

        Ok(Self::new(config, Arc::new(fetcher), Arc::new(generator)))
    }
}

fn generation_params(config: &AppConfig, model: &str) -> GenerationParams {
    GenerationParams::new(
        model,
        config.generation_temperature,
        config.generation_max_output_tokens,
    )
}

fn retry_policy(config: &AppConfig, max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(
        max_attempts,
        Duration::from_millis(config.retry_initial_backoff_ms),
        Duration::from_millis(config.retry_max_backoff_ms),
    )
}
