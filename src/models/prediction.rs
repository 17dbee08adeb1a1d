//! Prediction request/response model

use serde::Serialize;
use serde_json::{Map, Value};

use crate::logic::features::FeatureSchema;
use crate::AppError;

/// A validated `/predict` body
///
/// The lookup key wins when both fields are given.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictRequest {
    Lookup(i64),
    /// Raw mapping; values are read per schema name during resolution
    Features(Map<String, Value>),
}

impl PredictRequest {
    /// Validate the raw JSON body: `{features?: {name: number}, kepid?: int}`.
    ///
    /// Shape errors are 422; a body with neither field is 400. Feature values
    /// are left for the resolver, which only looks at schema names.
    pub fn from_json(body: &Value) -> Result<Self, AppError> {
        let obj = body
            .as_object()
            .ok_or_else(|| AppError::Unprocessable("Request body must be a JSON object".to_string()))?;

        let kepid = match obj.get("kepid") {
            None | Some(Value::Null) => None,
            Some(v) => Some(parse_kepid(v)?),
        };

        let features = match obj.get("features") {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map.clone()),
            Some(_) => {
                return Err(AppError::Unprocessable(
                    "features must be an object mapping feature name to number".to_string(),
                ))
            }
        };

        match (kepid, features) {
            (Some(kepid), _) => Ok(PredictRequest::Lookup(kepid)),
            (None, Some(features)) => Ok(PredictRequest::Features(features)),
            (None, None) => Err(AppError::BadRequest("Provide features or kepid".to_string())),
        }
    }
}

fn parse_kepid(value: &Value) -> Result<i64, AppError> {
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    parsed.ok_or_else(|| AppError::Unprocessable("kepid must be an integer".to_string()))
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub probability_of_planet: f64,
}

#[derive(Debug, Serialize)]
pub struct FeaturesResponse {
    pub features: FeatureSchema,
    pub count: usize,
    pub description: &'static str,
}

impl FeaturesResponse {
    pub fn new(schema: &FeatureSchema) -> Self {
        Self {
            features: schema.clone(),
            count: schema.len(),
            description: "List of all features required for prediction",
        }
    }
}
