//! Per-request collection of upstream payloads and the policy deciding which
//! source failures abort a request.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use assure_common::error::AppError;
use assure_common::types::SourceKind;

/// What one upstream produced for this request.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    Fetched(Value),
    Failed { reason: String },
}

/// Raw upstream payloads for one request, keyed by source.
///
/// Ordered by `SourceKind` so anything rendered from it is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedDataset {
    entries: BTreeMap<SourceKind, SourceOutcome>,
}

impl FetchedDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fetched(mut self, source: SourceKind, value: Value) -> Self {
        self.insert(source, SourceOutcome::Fetched(value));
        self
    }

    pub fn insert(&mut self, source: SourceKind, outcome: SourceOutcome) {
        self.entries.insert(source, outcome);
    }

    pub fn get(&self, source: SourceKind) -> Option<&SourceOutcome> {
        self.entries.get(&source)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SourceKind, &SourceOutcome)> {
        self.entries.iter().map(|(kind, outcome)| (*kind, outcome))
    }

    pub fn failures(&self) -> impl Iterator<Item = (SourceKind, &str)> {
        self.iter().filter_map(|(kind, outcome)| match outcome {
            SourceOutcome::Failed { reason } => Some((kind, reason.as_str())),
            SourceOutcome::Fetched(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decides, per source, whether a failed fetch aborts the request or is
/// recorded and tolerated.
///
/// The default treats every source as mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcePolicy {
    optional: BTreeSet<SourceKind>,
}

impl SourcePolicy {
    pub fn all_mandatory() -> Self {
        Self::default()
    }

    pub fn with_optional(optional: BTreeSet<SourceKind>) -> Self {
        Self { optional }
    }

    pub fn is_optional(&self, source: SourceKind) -> bool {
        self.optional.contains(&source)
    }

    /// Fold fetch results into a dataset.
    ///
    /// Returns the error of the first failed mandatory source (in source order);
    /// failed optional sources become `SourceOutcome::Failed`.
    pub fn apply(
        &self,
        results: Vec<(SourceKind, Result<Value, AppError>)>,
    ) -> Result<FetchedDataset, AppError> {
        let mut results = results;
        results.sort_by_key(|(kind, _)| *kind);

        let mut dataset = FetchedDataset::new();
        for (kind, result) in results {
            match result {
                Ok(value) => dataset.insert(kind, SourceOutcome::Fetched(value)),
                Err(e) if self.is_optional(kind) => {
                    tracing::warn!(source = %kind, error = %e, "Optional source failed, continuing without it");
                    dataset.insert(
                        kind,
                        SourceOutcome::Failed {
                            reason: e.to_string(),
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!(source = %kind, error = %e, "Mandatory source failed, aborting");
                    return Err(e);
                }
            }
        }
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn not_found(source: SourceKind) -> AppError {
        AppError::Upstream {
            source_name: source.to_string(),
            status: 404,
            body: "missing".into(),
        }
    }

    #[test]
    fn test_all_mandatory_aborts_on_any_failure() {
        let result = SourcePolicy::all_mandatory().apply(vec![
            (SourceKind::Contract, Ok(json!({"score": 80}))),
            (SourceKind::Sentiment, Err(not_found(SourceKind::Sentiment))),
            (SourceKind::Token, Ok(json!({"liquidity": 10}))),
        ]);
        assert_eq!(result.unwrap_err().upstream_status(), Some(404));
    }

    #[test]
    fn test_optional_failure_is_recorded() {
        let policy = SourcePolicy::with_optional([SourceKind::Sentiment].into_iter().collect());
        let dataset = policy
            .apply(vec![
                (SourceKind::Sentiment, Err(not_found(SourceKind::Sentiment))),
                (SourceKind::Token, Ok(json!({"liquidity": 10}))),
            ])
            .unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(
            dataset.get(SourceKind::Token),
            Some(&SourceOutcome::Fetched(json!({"liquidity": 10})))
        );
        let failures: Vec<_> = dataset.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, SourceKind::Sentiment);
        assert!(failures[0].1.contains("404"));
    }

    #[test]
    fn test_first_mandatory_failure_wins_in_source_order() {
        let result = SourcePolicy::all_mandatory().apply(vec![
            (
                SourceKind::Sentiment,
                Err(AppError::Transport {
                    source_name: "sentiment".into(),
                    message: "timeout".into(),
                }),
            ),
            (SourceKind::Contract, Err(not_found(SourceKind::Contract))),
        ]);
        assert!(matches!(
            result,
            Err(AppError::Upstream { ref source_name, .. }) if source_name == "contract"
        ));
    }
}
