//! Request builders for the concrete upstreams, plus interpretation of the
//! Etherscan source-code envelope.

use serde::Serialize;
use serde_json::{Value, json};

use assure_common::config::AppConfig;
use assure_common::error::AppError;
use assure_common::types::{ChainAddress, Secret, SourceKind};

use crate::fetcher::{Credential, UpstreamRequest};

/// Upstream endpoints and the credentials they need.
#[derive(Debug, Clone)]
pub struct SourceEndpoints {
    pub etherscan_url: String,
    pub etherscan_key: Secret,
    pub liquidity_url: String,
    pub sentiment_url: String,
    pub contract_audit_url: String,
}

impl SourceEndpoints {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            etherscan_url: config.etherscan_api_url.clone(),
            etherscan_key: config.etherscan_api_key.clone(),
            liquidity_url: config.liquidity_api_url.clone(),
            sentiment_url: config.sentiment_api_url.clone(),
            contract_audit_url: config.contract_audit_url.clone(),
        }
    }

    /// Verified source code lookup by contract address.
    pub fn contract_source(&self, address: &ChainAddress) -> UpstreamRequest {
        UpstreamRequest::get(SourceKind::ContractSource, &self.etherscan_url)
            .query("module", "contract")
            .query("action", "getsourcecode")
            .query("address", address.as_str())
            .credential(Credential::Query {
                name: "apikey",
                secret: self.etherscan_key.clone(),
            })
    }

    /// Token metrics and liquidity for `address` on its chain.
    pub fn token_metrics(&self, address: &ChainAddress) -> UpstreamRequest {
        UpstreamRequest::get(SourceKind::Token, &self.liquidity_url)
            .query("token_address", address.as_str())
            .query("chain_id", address.chain().to_string())
            .header("Content-Type", "application/json")
    }

    /// Market sentiment for a coin name.
    pub fn sentiment(&self, token_name: &str) -> UpstreamRequest {
        UpstreamRequest::post(
            SourceKind::Sentiment,
            &self.sentiment_url,
            json!({ "coin": token_name }),
        )
        .header("X-Coin-Name", token_name)
    }

    /// Contract audit of a smart contract, as served by the audit service.
    pub fn contract_audit(&self, address: &ChainAddress) -> UpstreamRequest {
        UpstreamRequest::get(SourceKind::Contract, &self.contract_audit_url)
            .header("contract-address", address.as_str())
    }
}

/// Contract code and metadata ready to be audited.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractSource {
    pub address: String,
    pub name: String,
    pub source_code: String,
    pub compiler: String,
}

impl ContractSource {
    /// Source supplied directly by the caller rather than looked up.
    pub fn direct(code: impl Into<String>) -> Self {
        Self {
            address: "Not provided".to_string(),
            name: "Direct Analysis".to_string(),
            source_code: code.into(),
            compiler: "Not provided".to_string(),
        }
    }

    /// Interpret an Etherscan `getsourcecode` response.
    ///
    /// Etherscan answers 200 even for failures; `status != "1"` or an empty
    /// `SourceCode` mean there is nothing to audit.
    pub fn from_etherscan(address: &ChainAddress, payload: &Value) -> Result<Self, AppError> {
        let status = payload.get("status").and_then(Value::as_str).unwrap_or("0");
        if status != "1" {
            let message = payload
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error");
            let detail = payload.get("result").and_then(Value::as_str);
            return Err(AppError::SourceUnavailable(match detail {
                Some(detail) => format!("Etherscan API error: {} ({})", message, detail),
                None => format!("Etherscan API error: {}", message),
            }));
        }

        let entry = payload
            .get("result")
            .and_then(Value::as_array)
            .and_then(|results| results.first())
            .ok_or_else(|| AppError::Decode {
                source_name: SourceKind::ContractSource.to_string(),
                message: "missing result entry".to_string(),
            })?;

        let field = |name: &str| {
            entry
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let source_code = field("SourceCode");
        if source_code.trim().is_empty() {
            return Err(AppError::SourceUnavailable(
                "No verified source code available for this contract".to_string(),
            ));
        }

        Ok(Self {
            address: address.to_string(),
            name: field("ContractName"),
            source_code,
            compiler: field("CompilerVersion"),
        })
    }
}
