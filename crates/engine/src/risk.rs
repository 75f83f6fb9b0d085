//! Token risk aggregator.
//!
//! Fetches contract audit, token metrics and sentiment concurrently, waits for
//! all three, applies the source policy, then asks the model for a risk report
//! and merges everything into one response.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value, json};

use assure_common::error::AppError;
use assure_common::types::{AnalysisRequest, Chain, ChainAddress, SourceKind, TokenRiskReport};
use assure_upstream::fetcher::Fetcher;
use assure_upstream::generator::{GenerationParams, TextGenerator};
use assure_upstream::sources::SourceEndpoints;

use crate::dataset::SourcePolicy;
use crate::extractor::{PayloadShape, extract};
use crate::merger::{AnalysisResult, merge};
use crate::prompt::PromptBuilder;

/// Request body for a token risk analysis.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRiskRequest {
    pub token_name: String,
    pub token_address: String,
    pub smart_contract_address: String,
    /// Chain of `token_address`; the configured default when omitted
    #[serde(default)]
    pub chain_id: Option<String>,
}

/// A risk request whose subjects passed their format checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRiskRequest {
    pub token_name: String,
    pub token: ChainAddress,
    pub contract: ChainAddress,
}

impl TokenRiskRequest {
    /// Check every subject before anything is fetched. The token lives on
    /// `chain_id` (or `default_chain`); the contract is always Ethereum.
    pub fn validate(&self, default_chain: Chain) -> Result<ValidatedRiskRequest, AppError> {
        let chain = Chain::resolve(self.chain_id.as_deref(), default_chain)?;

        AnalysisRequest::token_name(chain, &self.token_name)?;
        let token = AnalysisRequest::address(chain, &self.token_address)?;
        let contract = AnalysisRequest::address(Chain::Ethereum, &self.smart_contract_address)?;

        Ok(ValidatedRiskRequest {
            token_name: self.token_name.trim().to_string(),
            token: token.require_address()?.clone(),
            contract: contract.require_address()?.clone(),
        })
    }
}

pub struct TokenRiskAggregator {
    fetcher: Arc<dyn Fetcher>,
    generator: Arc<dyn TextGenerator>,
    endpoints: SourceEndpoints,
    prompts: PromptBuilder,
    params: GenerationParams,
    policy: SourcePolicy,
    default_chain: Chain,
}

impl TokenRiskAggregator {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        generator: Arc<dyn TextGenerator>,
        endpoints: SourceEndpoints,
        prompts: PromptBuilder,
        params: GenerationParams,
        policy: SourcePolicy,
        default_chain: Chain,
    ) -> Self {
        Self {
            fetcher,
            generator,
            endpoints,
            prompts,
            params,
            policy,
            default_chain,
        }
    }

    pub async fn analyze(&self, request: &TokenRiskRequest) -> Result<AnalysisResult, AppError> {
        let validated = request.validate(self.default_chain)?;

        let contract_request = self.endpoints.contract_audit(&validated.contract);
        let token_request = self.endpoints.token_metrics(&validated.token);
        let sentiment_request = self.endpoints.sentiment(&validated.token_name);

        let (contract, token, sentiment) = tokio::join!(
            self.fetcher.fetch(&contract_request),
            self.fetcher.fetch(&token_request),
            self.fetcher.fetch(&sentiment_request),
        );

        let dataset = self.policy.apply(vec![
            (SourceKind::Contract, contract),
            (SourceKind::Token, token),
            (SourceKind::Sentiment, sentiment),
        ])?;

        tracing::info!(
            token = %validated.token_name,
            sources = dataset.len(),
            failed = dataset.failures().count(),
            "Fetched token risk sources"
        );

        let prompt = self.prompts.build_token_risk(&validated.token_name, &dataset);
        let raw = self.generator.generate(prompt.as_str(), &self.params).await?;

        let mut report: TokenRiskReport =
            serde_json::from_value(extract(&raw, PayloadShape::Object)?)?;
        report.clamp_scores();

        let result = merge(token_info(&validated), &dataset, serde_json::to_value(report)?)?;

        tracing::info!(token = %validated.token_name, "Token risk analysis complete");
        Ok(result)
    }
}

fn token_info(request: &ValidatedRiskRequest) -> Map<String, Value> {
    let mut context = Map::new();
    context.insert(
        "token_info".to_string(),
        json!({
            "name": request.token_name,
            "address": request.token.as_str(),
            "contract": request.contract.as_str(),
            "chain_id": request.token.chain().to_string(),
        }),
    );
    context
}
