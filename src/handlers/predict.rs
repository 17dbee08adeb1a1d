//! Single-record prediction handler

use std::path::Path;

use axum::{extract::State, Json};
use serde_json::Value;

use crate::logic::features::{resolver, Table};
use crate::models::{PredictRequest, PredictResponse};
use crate::{AppError, AppResult, AppState};

/// Predict one record, by `kepid` lookup or explicit features
pub async fn predict(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> AppResult<Json<PredictResponse>> {
    let request = PredictRequest::from_json(&body)?;
    let schema = state.model.schema();

    let row = match request {
        PredictRequest::Lookup(kepid) => {
            let table = load_lookup_table(&state.config.lookup_csv_path).await?;
            resolver::from_lookup(schema, &table, kepid).map_err(|e| {
                tracing::debug!(kepid, "Lookup failed: {}", e);
                e
            })?
        }
        PredictRequest::Features(features) => resolver::from_mapping(schema, &features)?,
    };

    let probability = state.model.engine().score_row(row)?;
    tracing::debug!(probability, "Prediction served");

    Ok(Json(PredictResponse {
        probability_of_planet: probability,
    }))
}

/// Read the lookup table fresh; no caching between requests
async fn load_lookup_table(path: &Path) -> AppResult<Table> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        AppError::InternalError(format!("failed to read lookup table {}: {}", path.display(), e))
    })?;

    Table::from_bytes(&bytes)
        .map_err(|e| AppError::InternalError(format!("failed to parse lookup table: {}", e)))
}
