//! Contract audit service.
//!
//! Pipeline per request:
//! 1. Fetch verified source from Etherscan (skipped for directly supplied code)
//! 2. Build the audit prompt
//! 3. Request generation
//! 4. Extract the JSON object and type it as a `ContractAuditReport`
//! 5. Clamp scores into range

use std::sync::Arc;

use assure_common::error::AppError;
use assure_common::types::{
    AnalysisRequest, Chain, ChainAddress, ContractAuditReport, Subject,
};
use assure_upstream::fetcher::Fetcher;
use assure_upstream::generator::{GenerationParams, TextGenerator};
use assure_upstream::sources::{ContractSource, SourceEndpoints};

use crate::extractor::{PayloadShape, extract};
use crate::prompt::PromptBuilder;
use crate::registry::TokenRegistry;

pub struct ContractAuditor {
    fetcher: Arc<dyn Fetcher>,
    generator: Arc<dyn TextGenerator>,
    endpoints: SourceEndpoints,
    prompts: PromptBuilder,
    params: GenerationParams,
    registry: TokenRegistry,
}

impl ContractAuditor {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        generator: Arc<dyn TextGenerator>,
        endpoints: SourceEndpoints,
        prompts: PromptBuilder,
        params: GenerationParams,
    ) -> Self {
        Self {
            fetcher,
            generator,
            endpoints,
            prompts,
            params,
            registry: TokenRegistry::new(),
        }
    }

    /// Audit whatever `request` names: a deployed contract, a well-known token
    /// or source code supplied by the caller.
    pub async fn audit(
        &self,
        request: &AnalysisRequest,
    ) -> Result<ContractAuditReport, AppError> {
        match request.subject() {
            Subject::Address(address) => self.audit_address(address).await,
            Subject::TokenName(name) => self.audit_token(name).await,
            Subject::SourceText(code) => self.audit_source(code).await,
        }
    }

    /// Audit the verified source deployed at `address`.
    pub async fn audit_address(
        &self,
        address: &ChainAddress,
    ) -> Result<ContractAuditReport, AppError> {
        if address.chain() != Chain::Ethereum {
            return Err(AppError::Validation(format!(
                "Contract audits need an Ethereum address, got a {} one",
                address.chain()
            )));
        }
        let request = self.endpoints.contract_source(address);
        let payload = self.fetcher.fetch(&request).await?;
        let source = ContractSource::from_etherscan(address, &payload)?;

        tracing::info!(
            address = %address,
            contract = %source.name,
            source_chars = source.source_code.len(),
            "Fetched verified contract source"
        );

        self.audit_contract(&source).await
    }

    /// Audit source code supplied by the caller.
    pub async fn audit_source(&self, code: &str) -> Result<ContractAuditReport, AppError> {
        AnalysisRequest::source_text(code)?;
        self.audit_contract(&ContractSource::direct(code)).await
    }

    /// Resolve a well-known token name to its contract and audit it.
    pub async fn audit_token(&self, token_name: &str) -> Result<ContractAuditReport, AppError> {
        let address = self.registry.resolve(token_name)?;
        self.audit_address(&address).await
    }

    async fn audit_contract(
        &self,
        source: &ContractSource,
    ) -> Result<ContractAuditReport, AppError> {
        let prompt = self.prompts.build_contract_audit(source);
        let raw = self.generator.generate(prompt.as_str(), &self.params).await?;
        let report = parse_audit(&raw)?;

        tracing::info!(
            contract = %source.name,
            findings = report.vulnerabilities.len(),
            overall_score = report.overall_score,
            "Contract audit complete"
        );
        Ok(report)
    }
}

/// Turn raw model text into a typed, range-checked audit report.
pub fn parse_audit(raw: &str) -> Result<ContractAuditReport, AppError> {
    let payload = extract(raw, PayloadShape::Object)?;
    let mut report: ContractAuditReport = serde_json::from_value(payload)?;
    report.clamp_scores();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use assure_common::types::Severity;

    use super::*;

    #[test]
    fn test_parse_audit_from_fenced_response() {
        let raw = r#"```json
{
  "vulnerabilities": [
    {
      "id": 1,
      "name": "Unchecked call",
      "description": "Return value of low-level call ignored",
      "severity": "Medium",
      "lineNumber": 88,
      "code": "target.call(data);",
      "recommendation": "Check the returned success flag"
    }
  ],
  "overallScore": 55,
  "summary": "Moderate risk"
}
```"#;
        let report = parse_audit(raw).unwrap();
        assert_eq!(report.vulnerabilities.len(), 1);
        assert_eq!(report.vulnerabilities[0].severity, Severity::Medium);
        assert_eq!(report.vulnerabilities[0].line_number, 88);
        assert_eq!(report.overall_score, 55.0);
    }

    #[test]
    fn test_parse_audit_keeps_free_form_locations() {
        let raw = r#"{
  "vulnerabilities": [
    {"id": "VULN-1", "name": "Reentrancy", "severity": "high", "lineNumber": "45-50"},
    {"id": 2, "name": "Floating pragma", "severity": "low", "lineNumber": 42.0}
  ],
  "overallScore": 64,
  "summary": "Two findings"
}"#;
        let report = parse_audit(raw).unwrap();
        assert_eq!(report.vulnerabilities[0].id, "VULN-1");
        assert_eq!(report.vulnerabilities[0].line_number, "45-50");
        assert_eq!(report.vulnerabilities[1].line_number, 42.0);
        assert_eq!(report.overall_score, 64.0);
    }

    #[test]
    fn test_parse_audit_clamps_out_of_range_score() {
        let report = parse_audit(r#"{"vulnerabilities": [], "overallScore": -12, "summary": ""}"#)
            .unwrap();
        assert_eq!(report.overall_score, 0.0);
    }

    #[test]
    fn test_parse_audit_rejects_non_numeric_score() {
        let err = parse_audit(r#"{"vulnerabilities": [], "overallScore": "high"}"#).unwrap_err();
        assert!(matches!(err, AppError::MalformedPayload(_)));
    }

    #[test]
    fn test_parse_audit_without_json() {
        let err = parse_audit("The contract looks fine to me.").unwrap_err();
        assert!(matches!(err, AppError::NoStructuredPayloadFound));
    }
}
