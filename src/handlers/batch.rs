//! Batch CSV prediction handler
//!
//! The whole upload and the whole output live in memory at once: buffer,
//! parse, score, serialize, then send.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::logic::features::{resolver, ResolveError, Table, TableError};
use crate::logic::model::{Decision, ModelArtifact};
use crate::{AppError, AppResult, AppState};

/// Multipart field carrying the file
pub const UPLOAD_FIELD: &str = "file";

pub const PROBABILITY_COLUMN: &str = "probability_of_planet";
pub const PREDICTION_COLUMN: &str = "prediction";
pub const VERDICT_COLUMN: &str = "verdict";

struct Upload {
    filename: String,
    data: Bytes,
}

/// Score every row of an uploaded CSV and send it back with results appended
pub async fn predict_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let upload = read_upload(&mut multipart).await?;

    if !upload.filename.ends_with(".csv") {
        return Err(AppError::BadRequest("File must be a CSV".to_string()));
    }

    tracing::info!("Received CSV: {} ({} bytes)", upload.filename, upload.data.len());

    let model = Arc::clone(&state.model);
    let data = upload.data;
    let output = tokio::task::spawn_blocking(move || {
        let table = match Table::from_bytes(&data) {
            Ok(table) => table,
            Err(TableError::Empty) => {
                return Err(AppError::BadRequest("CSV file is empty".to_string()))
            }
            Err(e) => return Err(AppError::BatchProcessing(e.to_string())),
        };
        score_table(&model, table)
    })
    .await
    .map_err(|e| AppError::BatchProcessing(e.to_string()))??;

    let disposition = format!("attachment; filename=predictions_{}", upload.filename);
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| AppError::BatchProcessing(format!("invalid filename: {}", e)))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/csv")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        output,
    )
        .into_response())
}

async fn read_upload(multipart: &mut Multipart) -> AppResult<Upload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::Unprocessable("Field 'file' must be a file upload".to_string()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        return Ok(Upload { filename, data });
    }

    Err(AppError::Unprocessable("Missing file upload field 'file'".to_string()))
}

/// Append probability, prediction and verdict columns; return the CSV bytes.
///
/// Only missing feature columns are a client error. Everything else that
/// fails here is reported as a processing error.
pub fn score_table(model: &ModelArtifact, mut table: Table) -> AppResult<Vec<u8>> {
    let matrix = resolver::from_batch(model.schema(), &table).map_err(|e| match e {
        ResolveError::MissingColumns(_) => AppError::from(e),
        other => AppError::BatchProcessing(other.to_string()),
    })?;

    let scores = model
        .engine()
        .score(matrix)
        .map_err(|e| AppError::BatchProcessing(e.to_string()))?;
    let decisions: Vec<Decision> = scores.into_iter().map(Decision::from_probability).collect();

    table.set_column(
        PROBABILITY_COLUMN,
        decisions.iter().map(|d| d.probability.to_string()).collect(),
    );
    table.set_column(
        PREDICTION_COLUMN,
        decisions.iter().map(|d| d.prediction.to_string()).collect(),
    );
    table.set_column(
        VERDICT_COLUMN,
        decisions.iter().map(|d| d.verdict.to_string()).collect(),
    );

    tracing::debug!(rows = table.len(), "Batch scored");
    table
        .to_csv()
        .map_err(|e| AppError::BatchProcessing(e.to_string()))
}
