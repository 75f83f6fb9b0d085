use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

static EVM_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("valid regex"));

static BASE58_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9A-HJ-NP-Za-km-z]{32,44}$").expect("valid regex"));

/// Supported blockchain networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Solana,
}

impl Chain {
    /// Check that `raw` has this chain's address format.
    pub fn is_valid_address(&self, raw: &str) -> bool {
        match self {
            Chain::Ethereum => EVM_ADDRESS.is_match(raw),
            Chain::Solana => BASE58_ADDRESS.is_match(raw),
        }
    }

    /// Parse an optional caller-supplied chain name, falling back to `default`.
    pub fn resolve(raw: Option<&str>, default: Chain) -> Result<Chain, AppError> {
        match raw.map(str::trim) {
            Some(name) if !name.is_empty() => name.parse().map_err(AppError::Validation),
            _ => Ok(default),
        }
    }

    fn address_format(&self) -> &'static str {
        match self {
            Chain::Ethereum => "0x followed by 40 hex characters",
            Chain::Solana => "32-44 base58 characters",
        }
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Chain::Ethereum => write!(f, "ethereum"),
            Chain::Solana => write!(f, "solana"),
        }
    }
}

impl std::str::FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eth" | "ethereum" => Ok(Chain::Ethereum),
            "sol" | "solana" => Ok(Chain::Solana),
            other => Err(format!("Unsupported chain: {}", other)),
        }
    }
}

/// An on-chain address that passed its chain's format check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainAddress {
    chain: Chain,
    address: String,
}

impl ChainAddress {
    /// Validate `raw` against `chain`'s address format.
    pub fn parse(chain: Chain, raw: &str) -> Result<Self, AppError> {
        let trimmed = raw.trim();
        if !chain.is_valid_address(trimmed) {
            return Err(AppError::Validation(format!(
                "Invalid {} address format: expected {}",
                chain,
                chain.address_format()
            )));
        }
        Ok(Self {
            chain,
            address: trimmed.to_string(),
        })
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn as_str(&self) -> &str {
        &self.address
    }
}

impl std::fmt::Display for ChainAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.address)
    }
}

/// What an analysis is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Address(ChainAddress),
    TokenName(String),
    SourceText(String),
}

/// A subject that passed the format check for its kind, plus the chain it
/// belongs to. Built before any upstream is contacted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    subject: Subject,
    chain: Chain,
}

impl AnalysisRequest {
    pub fn address(chain: Chain, raw: &str) -> Result<Self, AppError> {
        Ok(ChainAddress::parse(chain, raw)?.into())
    }

    pub fn token_name(chain: Chain, raw: &str) -> Result<Self, AppError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Token name must not be empty".to_string()));
        }
        Ok(Self {
            subject: Subject::TokenName(name.to_string()),
            chain,
        })
    }

    /// Source code is only audited as Solidity, so it is tagged Ethereum.
    pub fn source_text(raw: &str) -> Result<Self, AppError> {
        if raw.trim().is_empty() {
            return Err(AppError::Validation(
                "Missing contract source code in request body".to_string(),
            ));
        }
        Ok(Self {
            subject: Subject::SourceText(raw.to_string()),
            chain: Chain::Ethereum,
        })
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    /// The address subject, or a validation error naming what was expected.
    pub fn require_address(&self) -> Result<&ChainAddress, AppError> {
        match &self.subject {
            Subject::Address(address) => Ok(address),
            _ => Err(AppError::Validation(
                "Expected a token or contract address".to_string(),
            )),
        }
    }
}

impl From<ChainAddress> for AnalysisRequest {
    fn from(address: ChainAddress) -> Self {
        Self {
            chain: address.chain(),
            subject: Subject::Address(address),
        }
    }
}

/// A credential resolved at start-up. Never printed.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret([redacted])")
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[redacted]")
    }
}

/// Upstream data sources feeding an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Contract audit of the token's smart contract
    Contract,
    /// Token metrics / liquidity data
    Token,
    /// Market sentiment
    Sentiment,
    /// Verified contract source code
    ContractSource,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Contract => "contract",
            SourceKind::Token => "token",
            SourceKind::Sentiment => "sentiment",
            SourceKind::ContractSource => "contract_source",
        }
    }

    /// Key under which this source's raw payload appears in a merged result.
    pub fn result_key(&self) -> &'static str {
        match self {
            SourceKind::Contract => "contractAnalysis",
            SourceKind::Token => "tokenData",
            SourceKind::Sentiment => "sentimentAnalysis",
            SourceKind::ContractSource => "contractSource",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contract" => Ok(SourceKind::Contract),
            "token" => Ok(SourceKind::Token),
            "sentiment" => Ok(SourceKind::Sentiment),
            "contract_source" => Ok(SourceKind::ContractSource),
            other => Err(format!("Unknown source: {}", other)),
        }
    }
}

/// Vulnerability severity levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    #[default]
    Informational,
}

impl From<String> for Severity {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "medium" => Severity::Medium,
            "low" => Severity::Low,
            _ => Severity::Informational,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::High => write!(f, "high"),
            Severity::Medium => write!(f, "medium"),
            Severity::Low => write!(f, "low"),
            Severity::Informational => write!(f, "informational"),
        }
    }
}

/// A single finding in a contract audit.
///
/// `id` and `lineNumber` are kept as the model wrote them: numbers, strings
/// such as `"VULN-1"` or ranges such as `"45-50"` all pass through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vulnerability {
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub line_number: serde_json::Value,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub recommendation: String,
}

/// Contract audit as returned to callers:
/// `{ vulnerabilities, overallScore, summary }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractAuditReport {
    #[serde(default)]
    pub vulnerabilities: Vec<Vulnerability>,
    pub overall_score: f64,
    #[serde(default)]
    pub summary: String,
}

impl ContractAuditReport {
    pub fn clamp_scores(&mut self) {
        self.overall_score = clamp_score("overallScore", self.overall_score);
    }
}

/// Risk score for one category (e.g. "Liquidity Risk").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskCategory {
    #[serde(default)]
    pub category: String,
    pub risk: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub icon_color: String,
    #[serde(default)]
    pub action: String,
}

/// One month of the risk trend chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "Risk")]
    pub risk: f64,
    #[serde(rename = "Average")]
    pub average: f64,
}

/// Generated part of a token risk analysis.
///
/// Fields the model adds beyond the requested schema are kept in `extra` so the
/// merger can see (and reject) anything that would shadow fetched data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRiskReport {
    #[serde(default)]
    pub risk_data: Vec<RiskCategory>,
    #[serde(default)]
    pub insights_list: Vec<Insight>,
    #[serde(default)]
    pub chart_data: Vec<ChartPoint>,
    #[serde(default)]
    pub risk_config: serde_json::Value,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TokenRiskReport {
    pub fn clamp_scores(&mut self) {
        for entry in &mut self.risk_data {
            entry.risk = clamp_score("riskData.risk", entry.risk);
        }
        for point in &mut self.chart_data {
            point.risk = clamp_score("chartData.Risk", point.risk);
            point.average = clamp_score("chartData.Average", point.average);
        }
    }
}

/// Clamp a score into `[0, 100]`, logging when the model produced something outside.
pub fn clamp_score(field: &str, value: f64) -> f64 {
    let clamped = value.clamp(0.0, 100.0);
    if clamped != value {
        tracing::warn!(field, value, clamped, "Score out of range, clamped");
    }
    clamped
}
