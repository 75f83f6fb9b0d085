//! Prompt builder: turns fetched data plus an output schema into one
//! deterministic instruction text.

use std::borrow::Cow;

use assure_common::types::SourceKind;
use assure_upstream::sources::ContractSource;

use crate::dataset::{FetchedDataset, SourceOutcome};
use crate::extractor::PayloadShape;

/// Appended to any embedded text cut at the character budget.
pub const TRUNCATION_MARKER: &str = "... [truncated for length]";

/// Default budget for embedded upstream text, in characters.
pub const DEFAULT_SOURCE_BUDGET: usize = 30_000;

const CONTRACT_AUDIT_SCHEMA: &str = r#"{
  "vulnerabilities": [
    {
      "id": number,
      "name": string,
      "description": string,
      "severity": "critical" | "high" | "medium" | "low" | "informational",
      "lineNumber": number,
      "code": string,
      "recommendation": string
    }
  ],
  "overallScore": number (0-100, where 100 is extremely risky),
  "summary": string
}"#;

const TOKEN_RISK_SCHEMA: &str = r##"{
  "riskData": [
    { "category": "Contract Risk", "risk": 0-100 },
    { "category": "Liquidity Risk", "risk": 0-100 },
    { "category": "Market Sentiment", "risk": 0-100 },
    { "category": "Developer Activity", "risk": 0-100 },
    { "category": "Community Trust", "risk": 0-100 }
  ],
  "insightsList": [
    {
      "title": "Example Insight 1",
      "description": "Detailed description of the insight",
      "icon": "IconName",
      "iconColor": "text-color-class",
      "action": "Action Label"
    }
  ],
  "chartData": [
    { "name": "Month1", "Risk": 0-100, "Average": 0-100 }
  ],
  "riskConfig": {
    "Risk": { "label": "Project Risk", "color": "#ef4444" },
    "Average": { "label": "Industry Average", "color": "#3b82f6" }
  }
}"##;

const TOKEN_RISK_GUIDANCE: &str = "Ensure the risk values are realistic and based on the provided data. \
Provide 4-5 insights that are specific and actionable, with icons from: FileSearch, Activity, \
TrendingDown, BarChart3, ShieldAlert, Users, Code, Lock. Icon colors should be: text-red-500 for \
high risk, text-amber-500 for medium risk, text-green-500 for low risk. Include 6 months of chart data.";

/// Description of the JSON the model must answer with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSchema {
    pub shape: PayloadShape,
    pub description: Cow<'static, str>,
    pub guidance: Cow<'static, str>,
}

impl OutputSchema {
    pub fn contract_audit() -> Self {
        Self {
            shape: PayloadShape::Object,
            description: Cow::Borrowed(CONTRACT_AUDIT_SCHEMA),
            guidance: Cow::Borrowed(
                "Respond with the JSON object only. Use an empty vulnerabilities list if nothing is found.",
            ),
        }
    }

    pub fn token_risk() -> Self {
        Self {
            shape: PayloadShape::Object,
            description: Cow::Borrowed(TOKEN_RISK_SCHEMA),
            guidance: Cow::Borrowed(TOKEN_RISK_GUIDANCE),
        }
    }
}

/// Immutable prompt text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisPrompt(String);

impl AnalysisPrompt {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for AnalysisPrompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptBuilder {
    source_budget: usize,
}

impl PromptBuilder {
    pub fn new(source_budget: usize) -> Self {
        Self { source_budget }
    }

    /// Cut `text` to the character budget, marking the cut.
    pub fn truncate<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match text.char_indices().nth(self.source_budget) {
            Some((cut, _)) => Cow::Owned(format!("{}{}", &text[..cut], TRUNCATION_MARKER)),
            None => Cow::Borrowed(text),
        }
    }

    /// General form: instruction, every dataset entry, then the schema.
    pub fn build(
        &self,
        instruction: &str,
        dataset: &FetchedDataset,
        schema: &OutputSchema,
    ) -> AnalysisPrompt {
        let mut text = String::new();
        text.push_str(instruction.trim());
        text.push_str("\n\n");

        for (kind, outcome) in dataset.iter() {
            match outcome {
                SourceOutcome::Fetched(value) => {
                    let serialized = value.to_string();
                    text.push_str(&format!("{}: {}\n", label(kind), self.truncate(&serialized)));
                }
                SourceOutcome::Failed { reason } => {
                    text.push_str(&format!("{}: unavailable ({})\n", label(kind), reason));
                }
            }
        }

        push_schema(&mut text, schema);
        AnalysisPrompt(text)
    }

    pub fn build_contract_audit(&self, source: &ContractSource) -> AnalysisPrompt {
        let code = self.truncate(&source.source_code);
        // Escaped as a JSON string so quotes and newlines in the code cannot
        // break out of the surrounding instruction.
        let escaped = serde_json::Value::String(code.into_owned()).to_string();

        let mut text = String::new();
        text.push_str(
            "Analyze this Ethereum smart contract and identify potential security vulnerabilities.\n",
        );
        text.push_str(&format!("Contract name: {}\n", source.name));
        text.push_str(&format!("Contract address: {}\n", source.address));
        text.push_str(&format!("Compiler: {}\n\n", source.compiler));
        text.push_str(&format!("Contract source code: {}\n", escaped));

        push_schema(&mut text, &OutputSchema::contract_audit());
        AnalysisPrompt(text)
    }

    pub fn build_token_risk(&self, token_name: &str, dataset: &FetchedDataset) -> AnalysisPrompt {
        let instruction = format!(
            "Analyze this blockchain token \"{}\" based on the following data:",
            token_name
        );
        self.build(&instruction, dataset, &OutputSchema::token_risk())
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_BUDGET)
    }
}

fn push_schema(text: &mut String, schema: &OutputSchema) {
    let shape = match schema.shape {
        PayloadShape::Object => "a JSON object",
        PayloadShape::Array => "a JSON array",
    };
    text.push_str(&format!(
        "\nReturn your analysis as {} with the following structure:\n{}\n\n{}\n",
        shape, schema.description, schema.guidance
    ));
}

fn label(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Contract => "Contract Analysis",
        SourceKind::Token => "Token Data",
        SourceKind::Sentiment => "Sentiment Analysis",
        SourceKind::ContractSource => "Contract Source",
    }
}
