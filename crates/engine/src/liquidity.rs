//! Liquidity lookup: a thin pass-through to the token metrics upstream.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use assure_common::error::AppError;
use assure_common::types::{AnalysisRequest, Chain};
use assure_upstream::fetcher::Fetcher;
use assure_upstream::sources::SourceEndpoints;

/// Query string accepted by `GET /liquidity`.
#[derive(Debug, Clone, Deserialize)]
pub struct LiquidityQuery {
    pub token_address: Option<String>,
    pub chain_id: Option<String>,
}

impl LiquidityQuery {
    pub fn validate(&self, default_chain: Chain) -> Result<AnalysisRequest, AppError> {
        let address = self
            .token_address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| AppError::Validation("token_address is required".to_string()))?;

        let chain = Chain::resolve(self.chain_id.as_deref(), default_chain)?;
        AnalysisRequest::address(chain, address)
    }
}

pub struct LiquidityLookup {
    fetcher: Arc<dyn Fetcher>,
    endpoints: SourceEndpoints,
}

impl LiquidityLookup {
    pub fn new(fetcher: Arc<dyn Fetcher>, endpoints: SourceEndpoints) -> Self {
        Self { fetcher, endpoints }
    }

    /// Returns the upstream payload unchanged.
    pub async fn lookup(&self, request: &AnalysisRequest) -> Result<Value, AppError> {
        let token = request.require_address()?;
        let request = self.endpoints.token_metrics(token);
        let payload = self.fetcher.fetch(&request).await?;
        tracing::debug!(token = %token, chain = %token.chain(), "Liquidity lookup complete");
        Ok(payload)
    }
}
