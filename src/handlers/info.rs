//! Static info handlers: API index, feature listing, GET /predict help

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::models::FeaturesResponse;
use crate::AppState;

/// API index
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Exoplanet Prediction API",
        "endpoints": {
            "/predict": "POST - Predict probability of a planet",
            "/predict-csv": "POST - Predict from CSV file upload",
            "/features": "GET - Get list of required features",
            "/health": "GET - Service and model status"
        },
        "usage": "Send POST request to /predict with either 'features' dict or 'kepid' int"
    }))
}

/// Feature schema the model expects, in order
pub async fn features(State(state): State<AppState>) -> Json<FeaturesResponse> {
    Json(FeaturesResponse::new(state.model.schema()))
}

/// Usage help for callers hitting /predict with GET; always 200
pub async fn predict_usage() -> Json<Value> {
    Json(json!({
        "error": "Method Not Allowed",
        "message": "This endpoint requires a POST request",
        "usage": {
            "method": "POST",
            "content_type": "application/json",
            "examples": [
                {"kepid": 10854555},
                {"features": {"koi_period": 3.5, "koi_depth": 100, "...": "..."}}
            ]
        },
        "documentation": "GET / lists all endpoints; GET /features lists the required features"
    }))
}
