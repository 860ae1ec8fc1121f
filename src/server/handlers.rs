//! Route handlers

use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::market::{gather, stats, MarketSnapshot, ReferenceTvlMode};
use crate::valuation::{estimate_bonus, BonusEstimate, BonusInputs, CustomPointsValues, ValuationSet};
use super::error::ApiError;
use super::AppState;

// ============================================
// PROXIES
// ============================================

pub async fn arma_stats(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    stats::fetch_raw(&state.http_client, &state.config.arma_stats_url)
        .await
        .map(Json)
        .map_err(|e| ApiError::proxy("Arma", e))
}

pub async fn pulse_stats(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let url = state
        .config
        .pulse_stats_url
        .as_deref()
        .ok_or_else(|| ApiError::proxy("Pulse", "PULSE_STATS_URL is not configured"))?;

    stats::fetch_raw(&state.http_client, url)
        .await
        .map(Json)
        .map_err(|e| ApiError::proxy("Pulse", e))
}

// ============================================
// HEALTH
// ============================================

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "OK",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "environment": state.config.environment.to_string(),
    }))
}

// ============================================
// VALUATION
// ============================================

#[derive(Debug, Serialize)]
pub struct ValuationResponse {
    pub market: MarketSnapshot,
    pub valuation: ValuationSet,
}

/// One fresh fetch pass; fails only when no reference token came back
async fn fresh_valuation(state: &AppState) -> Result<(MarketSnapshot, ValuationSet), ApiError> {
    let snapshot = gather(
        state.market.as_ref(),
        &state.config.reference_tokens,
        ReferenceTvlMode::Live,
        state.config.reference_tvl_fallback,
    )
    .await;

    if !snapshot.tokens.iter().any(|t| t.snapshot.is_success()) {
        return Err(ApiError::market_data_unavailable(
            &state.config.environment,
            "no reference token data could be fetched",
        ));
    }

    let set = ValuationSet::from_snapshot(&state.program, &snapshot);
    Ok((snapshot, set))
}

pub async fn valuation(State(state): State<Arc<AppState>>) -> Result<Json<ValuationResponse>, ApiError> {
    let (market, valuation) = fresh_valuation(&state).await?;
    info!(
        "Valuation served: {} references, TVL ratio {:.4}",
        valuation.per_reference.len(),
        valuation.tvl.ratio.value()
    );
    Ok(Json(ValuationResponse { market, valuation }))
}

#[derive(Debug, Deserialize)]
pub struct PointsQuery {
    pub points: f64,
}

pub async fn points_value(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PointsQuery>,
) -> Result<Json<CustomPointsValues>, ApiError> {
    let (_, set) = fresh_valuation(&state).await?;
    Ok(Json(set.custom_points(query.points, &state.program)))
}

pub async fn bonus(
    State(state): State<Arc<AppState>>,
    Query(inputs): Query<BonusInputs>,
) -> Json<BonusEstimate> {
    Json(estimate_bonus(&inputs, &state.program))
}
