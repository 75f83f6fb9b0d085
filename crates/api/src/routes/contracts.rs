//! Contract audit routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use assure_common::error::AppError;
use assure_common::types::{AnalysisRequest, Chain, ContractAuditReport};

use crate::state::AppState;

const CONTRACT_ADDRESS_HEADER: &str = "contract-address";

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/analyze-contract",
            get(analyze_by_address).post(analyze_source),
        )
        .route("/analyze-contract/token/{name}", get(analyze_by_token))
}

#[derive(Debug, Deserialize)]
struct AnalyzeSourceBody {
    #[serde(default)]
    code: String,
}

/// GET /analyze-contract: Audit the verified source at the `contract-address` header.
async fn analyze_by_address(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ContractAuditReport>, AppError> {
    let value = headers.get(CONTRACT_ADDRESS_HEADER).ok_or_else(|| {
        AppError::Validation("Missing contract-address header".to_string())
    })?;
    let raw = value.to_str().map_err(|_| {
        AppError::Validation("Malformed contract-address header: not visible ASCII".to_string())
    })?;
    let request = AnalysisRequest::address(Chain::Ethereum, raw)?;

    let report = state.services.auditor.audit(&request).await?;
    Ok(Json(report))
}

/// POST /analyze-contract: Audit source code sent in the body.
async fn analyze_source(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeSourceBody>, JsonRejection>,
) -> Result<Json<ContractAuditReport>, AppError> {
    let Json(body) = body.map_err(|e| AppError::Validation(e.body_text()))?;
    let request = AnalysisRequest::source_text(&body.code)?;
    let report = state.services.auditor.audit(&request).await?;
    Ok(Json(report))
}

/// GET /analyze-contract/token/:name: Audit a well-known token by name.
async fn analyze_by_token(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ContractAuditReport>, AppError> {
    let request = AnalysisRequest::token_name(Chain::Ethereum, &name)?;
    let report = state.services.auditor.audit(&request).await?;
    Ok(Json(report))
}
