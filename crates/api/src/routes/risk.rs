//! Token risk analysis route.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};

use assure_common::error::AppError;
use assure_engine::merger::AnalysisResult;
use assure_engine::risk::TokenRiskRequest;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/risk-analysis", post(risk_analysis))
}

/// POST /risk-analysis: Aggregate contract, token and sentiment data into a risk report.
async fn risk_analysis(
    State(state): State<AppState>,
    body: Result<Json<TokenRiskRequest>, JsonRejection>,
) -> Result<Json<AnalysisResult>, AppError> {
    let Json(request) = body.map_err(|e| AppError::Validation(e.body_text()))?;
    let result = state.services.risk.analyze(&request).await?;
    Ok(Json(result))
}
