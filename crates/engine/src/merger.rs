//! Result merger: one flat response object from request metadata, fetched
//! upstream payloads, and the model-derived analysis.
//!
//! Raw payloads sit under their source's stable key (`tokenData`,
//! `contractAnalysis`, ...); generated fields are spread at the top level.
//! A generated key that would shadow anything already present is an error.

use serde_json::{Map, Value, json};

use assure_common::error::AppError;

use crate::dataset::{FetchedDataset, SourceOutcome};

/// Merged response returned to the caller.
pub type AnalysisResult = Map<String, Value>;

/// Key listing optional sources that failed.
pub const UNAVAILABLE_SOURCES_KEY: &str = "unavailableSources";

/// Key used when the generated payload is not an object.
pub const NESTED_ANALYSIS_KEY: &str = "analysis";

pub fn merge(
    context: Map<String, Value>,
    dataset: &FetchedDataset,
    analysis: Value,
) -> Result<AnalysisResult, AppError> {
    let mut result = context;
    let mut unavailable = Vec::new();

    for (kind, outcome) in dataset.iter() {
        match outcome {
            SourceOutcome::Fetched(value) => {
                insert_unique(&mut result, kind.result_key(), value.clone())?;
            }
            SourceOutcome::Failed { reason } => {
                unavailable.push(json!({ "source": kind.as_str(), "reason": reason }));
            }
        }
    }

    if !unavailable.is_empty() {
        insert_unique(&mut result, UNAVAILABLE_SOURCES_KEY, Value::Array(unavailable))?;
    }

    match analysis {
        Value::Object(fields) => {
            for (key, value) in fields {
                insert_unique(&mut result, &key, value)?;
            }
        }
        other => insert_unique(&mut result, NESTED_ANALYSIS_KEY, other)?,
    }

    Ok(result)
}

fn insert_unique(result: &mut AnalysisResult, key: &str, value: Value) -> Result<(), AppError> {
    if result.contains_key(key) {
        tracing::warn!(key, "Refusing to overwrite existing field during merge");
        return Err(AppError::MergeCollision(key.to_string()));
    }
    result.insert(key.to_string(), value);
    Ok(())
}
