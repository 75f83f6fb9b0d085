//! Liquidity pass-through route.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};

use assure_common::error::AppError;
use assure_engine::liquidity::LiquidityQuery;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/liquidity", get(liquidity))
}

/// GET /liquidity?token_address=..&chain_id=..
async fn liquidity(
    State(state): State<AppState>,
    query: Result<Query<LiquidityQuery>, QueryRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Query(query) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    let request = query.validate(state.config.default_chain)?;
    let payload = state.services.liquidity.lookup(&request).await?;
    Ok(Json(payload))
}
