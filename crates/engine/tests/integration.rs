//! End-to-end tests for the analysis services.
//!
//! Upstreams are replaced by the in-memory doubles from `assure_upstream::mock`,
//! so these run without network access:
//!
//! ```bash
//! cargo test -p assure-engine --test integration
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::json;

use assure_common::config::AppConfig;
use assure_common::error::AppError;
use assure_common::types::{AnalysisRequest, Chain, ChainAddress, Secret, Severity, SourceKind};
use assure_engine::merger::UNAVAILABLE_SOURCES_KEY;
use assure_engine::risk::TokenRiskRequest;
use assure_engine::services::Services;
use assure_upstream::mock::{MockFetcher, MockGenerator, MockReply};

// ============================================================
// Shared helpers
// ============================================================

const CONTRACT: &str = "0x36A500F731e2FFA29207499EFb29326b671000AC";
const BONK: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";

fn test_config() -> AppConfig {
    AppConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        etherscan_api_url: "http://etherscan.test/api".to_string(),
        etherscan_api_key: Secret::new("etherscan-test-key"),
        liquidity_api_url: "http://liquidity.test/get_token".to_string(),
        sentiment_api_url: "http://sentiment.test/analyze".to_string(),
        contract_audit_url: "http://audit.test/analyze-contract".to_string(),
        gemini_api_url: "http://gemini.test/v1beta".to_string(),
        gemini_api_key: Secret::new("gemini-test-key"),
        audit_model: "gemini-1.5-flash".to_string(),
        risk_model: "gemini-1.5-pro".to_string(),
        generation_temperature: 0.2,
        generation_max_output_tokens: 8192,
        default_chain: Chain::Solana,
        http_timeout_secs: 5,
        prompt_source_budget: 30_000,
        fetch_max_attempts: 1,
        generation_max_attempts: 1,
        retry_initial_backoff_ms: 10,
        retry_max_backoff_ms: 50,
        optional_sources: BTreeSet::new(),
    }
}

fn etherscan_payload() -> serde_json::Value {
    json!({
        "status": "1",
        "message": "OK",
        "result": [{
            "SourceCode": "pragma solidity ^0.8.0;\ncontract Vault { function withdraw() external {} }",
            "ContractName": "Vault",
            "CompilerVersion": "v0.8.19+commit.7dd6d404"
        }]
    })
}

const FENCED_AUDIT: &str = r#"Here is the audit you asked for:
```json
{
  "vulnerabilities": [
    {
      "id": 1,
      "name": "Reentrancy",
      "description": "withdraw sends ether before updating balances",
      "severity": "High",
      "lineNumber": 2,
      "code": "function withdraw() external {}",
      "recommendation": "Apply checks-effects-interactions"
    }
  ],
  "overallScore": 72,
  "summary": "One high severity issue"
}
```"#;

const RISK_REPORT: &str = r##"```json
{
  "riskData": [
    {"category": "Contract Risk", "risk": 35},
    {"category": "Liquidity Risk", "risk": 140},
    {"category": "Market Sentiment", "risk": 40},
    {"category": "Developer Activity", "risk": 50},
    {"category": "Community Trust", "risk": 20}
  ],
  "insightsList": [
    {
      "title": "Deep liquidity",
      "description": "Most liquidity sits in two pools",
      "icon": "Activity",
      "iconColor": "text-green-500",
      "action": "View pools"
    }
  ],
  "chartData": [{"name": "Jan", "Risk": 40, "Average": 50}],
  "riskConfig": {
    "Risk": {"label": "Project Risk", "color": "#ef4444"},
    "Average": {"label": "Industry Average", "color": "#3b82f6"}
  }
}
```"##;

fn risk_request() -> TokenRiskRequest {
    TokenRiskRequest {
        token_name: "Bonk".to_string(),
        token_address: BONK.to_string(),
        smart_contract_address: CONTRACT.to_string(),
        chain_id: None,
    }
}

fn all_sources_fetcher() -> MockFetcher {
    MockFetcher::new()
        .with_json(
            SourceKind::Contract,
            json!({"overallScore": 30, "vulnerabilities": []}),
        )
        .with_json(SourceKind::Token, json!({"liquidity": 1500000, "holders": 5400}))
        .with_json(SourceKind::Sentiment, json!({"sentiment": "bullish", "score": 0.7}))
}

// ============================================================
// Contract audit
// ============================================================

#[tokio::test]
async fn test_audit_address_end_to_end() {
    let fetcher = Arc::new(
        MockFetcher::new().with_json(SourceKind::ContractSource, etherscan_payload()),
    );
    let generator = Arc::new(MockGenerator::responding(FENCED_AUDIT));
    let services = Services::new(&test_config(), fetcher.clone(), generator.clone());

    let address = ChainAddress::parse(Chain::Ethereum, CONTRACT).unwrap();
    let report = services.auditor.audit_address(&address).await.unwrap();

    assert!((0.0..=100.0).contains(&report.overall_score));
    assert_eq!(report.vulnerabilities.len(), 1);
    assert_eq!(report.vulnerabilities[0].severity, Severity::High);

    assert_eq!(fetcher.call_count(), 1);
    assert_eq!(generator.call_count(), 1);
    let prompt = &generator.prompts()[0];
    assert!(prompt.contains("Contract name: Vault"));
    assert!(prompt.contains(CONTRACT));
    assert!(!prompt.contains("etherscan-test-key"));
}

#[tokio::test]
async fn test_audit_prose_response_fails_extraction() {
    let fetcher = Arc::new(
        MockFetcher::new().with_json(SourceKind::ContractSource, etherscan_payload()),
    );
    let generator = Arc::new(MockGenerator::responding(
        "I could not find any problems with this contract.",
    ));
    let services = Services::new(&test_config(), fetcher, generator);

    let address = ChainAddress::parse(Chain::Ethereum, CONTRACT).unwrap();
    let err = services.auditor.audit_address(&address).await.unwrap_err();
    assert!(matches!(err, AppError::NoStructuredPayloadFound));
}

#[tokio::test]
async fn test_audit_unverified_contract_skips_generation() {
    let fetcher = Arc::new(MockFetcher::new().with_json(
        SourceKind::ContractSource,
        json!({"status": "1", "message": "OK", "result": [{"SourceCode": ""}]}),
    ));
    let generator = Arc::new(MockGenerator::responding(FENCED_AUDIT));
    let services = Services::new(&test_config(), fetcher, generator.clone());

    let address = ChainAddress::parse(Chain::Ethereum, CONTRACT).unwrap();
    let err = services.auditor.audit_address(&address).await.unwrap_err();
    assert!(matches!(err, AppError::SourceUnavailable(_)));
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn test_audit_source_requires_code() {
    let fetcher = Arc::new(MockFetcher::new());
    let generator = Arc::new(MockGenerator::responding(FENCED_AUDIT));
    let services = Services::new(&test_config(), fetcher.clone(), generator.clone());

    let err = services.auditor.audit_source("  \n").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(fetcher.call_count(), 0);
    assert_eq!(generator.call_count(), 0);

    let report = services
        .auditor
        .audit_source("contract A {}")
        .await
        .unwrap();
    assert_eq!(report.overall_score, 72.0);
    assert_eq!(fetcher.call_count(), 0);
    assert!(generator.prompts()[0].contains("Contract name: Direct Analysis"));
}

#[tokio::test]
async fn test_audit_token_resolves_known_name() {
    let fetcher = Arc::new(
        MockFetcher::new().with_json(SourceKind::ContractSource, etherscan_payload()),
    );
    let generator = Arc::new(MockGenerator::responding(FENCED_AUDIT));
    let services = Services::new(&test_config(), fetcher.clone(), generator);

    services.auditor.audit_token("LINK").await.unwrap();
    let requests = fetcher.requests();
    assert!(requests[0].query.contains(&(
        "address".to_string(),
        "0x514910771AF9Ca656af840dff83E8264EcF986CA".to_string()
    )));

    let err = services.auditor.audit_token("notacoin").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(fetcher.call_count(), 1);
}

#[tokio::test]
async fn test_audit_dispatches_on_subject() {
    let fetcher = Arc::new(
        MockFetcher::new().with_json(SourceKind::ContractSource, etherscan_payload()),
    );
    let generator = Arc::new(MockGenerator::responding(FENCED_AUDIT));
    let services = Services::new(&test_config(), fetcher.clone(), generator.clone());

    let by_address = AnalysisRequest::address(Chain::Ethereum, CONTRACT).unwrap();
    services.auditor.audit(&by_address).await.unwrap();
    assert_eq!(fetcher.call_count(), 1);

    let by_name = AnalysisRequest::token_name(Chain::Ethereum, "LINK").unwrap();
    services.auditor.audit(&by_name).await.unwrap();
    assert_eq!(fetcher.call_count(), 2);

    let by_source = AnalysisRequest::source_text("contract A {}").unwrap();
    services.auditor.audit(&by_source).await.unwrap();
    assert_eq!(fetcher.call_count(), 2);
    assert_eq!(generator.call_count(), 3);

    // Etherscan only serves Ethereum contracts.
    let solana = AnalysisRequest::address(Chain::Solana, BONK).unwrap();
    let err = services.auditor.audit(&solana).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(fetcher.call_count(), 2);
    assert_eq!(generator.call_count(), 3);
}

// ============================================================
// Token risk
// ============================================================

#[tokio::test]
async fn test_risk_analysis_merges_sources_and_report() {
    let fetcher = Arc::new(all_sources_fetcher());
    let generator = Arc::new(MockGenerator::responding(RISK_REPORT));
    let services = Services::new(&test_config(), fetcher.clone(), generator.clone());

    let result = services.risk.analyze(&risk_request()).await.unwrap();

    assert_eq!(fetcher.call_count(), 3);
    assert_eq!(fetcher.calls_for(SourceKind::Sentiment), 1);
    assert_eq!(generator.call_count(), 1);

    assert_eq!(result["token_info"]["address"], BONK);
    assert_eq!(result["token_info"]["contract"], CONTRACT);
    assert_eq!(result["tokenData"]["holders"], 5400);
    assert_eq!(result["sentimentAnalysis"]["sentiment"], "bullish");
    assert_eq!(result["contractAnalysis"]["overallScore"], 30);
    assert_eq!(result["riskData"].as_array().unwrap().len(), 5);
    // 140 is out of range and clamped
    assert_eq!(result["riskData"][1]["risk"], 100.0);
    assert_eq!(result["chartData"][0]["Risk"], 40.0);
    assert!(!result.contains_key(UNAVAILABLE_SOURCES_KEY));
}

#[tokio::test]
async fn test_risk_analysis_aborts_when_mandatory_source_fails() {
    let fetcher = Arc::new(all_sources_fetcher().with_status(
        SourceKind::Sentiment,
        503,
        "sentiment offline",
    ));
    let generator = Arc::new(MockGenerator::responding(RISK_REPORT));
    let services = Services::new(&test_config(), fetcher.clone(), generator.clone());

    let err = services.risk.analyze(&risk_request()).await.unwrap_err();
    assert_eq!(err.upstream_status(), Some(503));
    // All three fetches still ran; generation never did
    assert_eq!(fetcher.call_count(), 3);
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn test_risk_analysis_degrades_on_optional_source() {
    let mut config = test_config();
    config.optional_sources = BTreeSet::from([SourceKind::Sentiment]);

    let fetcher = Arc::new(
        all_sources_fetcher().with_reply(SourceKind::Sentiment, MockReply::Unreachable),
    );
    let generator = Arc::new(MockGenerator::responding(RISK_REPORT));
    let services = Services::new(&config, fetcher, generator.clone());

    let result = services.risk.analyze(&risk_request()).await.unwrap();

    assert!(!result.contains_key("sentimentAnalysis"));
    assert_eq!(result[UNAVAILABLE_SOURCES_KEY][0]["source"], "sentiment");
    assert!(generator.prompts()[0].contains("Sentiment Analysis: unavailable ("));
}

#[tokio::test]
async fn test_risk_analysis_rejects_bad_address_without_fetching() {
    let fetcher = Arc::new(all_sources_fetcher());
    let generator = Arc::new(MockGenerator::responding(RISK_REPORT));
    let services = Services::new(&test_config(), fetcher.clone(), generator.clone());

    let mut request = risk_request();
    request.smart_contract_address = "not-an-address".to_string();

    let err = services.risk.analyze(&request).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(fetcher.call_count(), 0);
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn test_risk_analysis_generation_failure() {
    let fetcher = Arc::new(all_sources_fetcher());
    let generator = Arc::new(MockGenerator::failing());
    let services = Services::new(&test_config(), fetcher, generator);

    let err = services.risk.analyze(&risk_request()).await.unwrap_err();
    assert!(matches!(err, AppError::Generation(_)));
}

// ============================================================
// Liquidity
// ============================================================

#[tokio::test]
async fn test_liquidity_uses_token_chain() {
    let fetcher = Arc::new(
        MockFetcher::new().with_json(SourceKind::Token, json!({"liquidity": 42})),
    );
    let generator = Arc::new(MockGenerator::failing());
    let services = Services::new(&test_config(), fetcher.clone(), generator.clone());

    let token = AnalysisRequest::address(Chain::Solana, BONK).unwrap();
    let payload = services.liquidity.lookup(&token).await.unwrap();

    assert_eq!(payload, json!({"liquidity": 42}));
    assert!(fetcher.requests()[0]
        .query
        .contains(&("chain_id".to_string(), "solana".to_string())));
    assert_eq!(generator.call_count(), 0);
}
