//! Predictor facade: health report and the validate → build → infer → shape
//! pipeline behind `/predict`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app_state::AppState;
use crate::errors::{ServeError, ServeResult};
use crate::input_validator::{build_matrix, PredictionRequest};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub n_features: usize,
    pub features_example: Vec<String>,
}

/// Probability payload: the positive-class column for binary models,
/// whole rows otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Probabilities {
    Positive(Vec<f64>),
    PerClass(Vec<Vec<f64>>),
}

impl Probabilities {
    pub fn len(&self) -> usize {
        match self {
            Probabilities::Positive(p) => p.len(),
            Probabilities::PerClass(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub predictions: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Probabilities>,
}

pub fn health(state: &AppState) -> HealthResponse {
    HealthResponse {
        status: "ok".to_string(),
        n_features: state.schema.len(),
        features_example: state.schema.preview(state.features_preview).to_vec(),
    }
}

pub fn predict(state: &AppState, request: &PredictionRequest) -> ServeResult<PredictionResponse> {
    let matrix = build_matrix(&state.schema, request)?;

    let predictions = state.model.predict(&matrix).inspect_err(|e| {
        tracing::error!(model = state.model.kind(), error = %e, "inference failed");
    })?;
    if predictions.len() != matrix.len() {
        return Err(ServeError::inference(format!(
            "model returned {} predictions for {} rows",
            predictions.len(),
            matrix.len()
        )));
    }

    let probabilities = if state.model.supports_proba() {
        match state.model.predict_proba(&matrix) {
            Ok(proba) => shape_probabilities(proba, matrix.len()),
            Err(e) => {
                tracing::warn!(error = %e, "probability estimation failed; omitting probabilities");
                None
            }
        }
    } else {
        None
    };

    Ok(PredictionResponse {
        predictions,
        probabilities,
    })
}

/// Keep only column 1 of a two-column matrix; pass anything else through.
/// A row count that disagrees with the input is treated as a failure.
pub fn shape_probabilities(proba: Vec<Vec<f64>>, rows: usize) -> Option<Probabilities> {
    if proba.len() != rows {
        tracing::warn!(
            expected = rows,
            actual = proba.len(),
            "probability row count mismatch; omitting probabilities"
        );
        return None;
    }

    if proba.iter().all(|row| row.len() == 2) {
        Some(Probabilities::Positive(
            proba.into_iter().map(|row| row[1]).collect(),
        ))
    } else {
        Some(Probabilities::PerClass(proba))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_binary_matrix_keeps_positive_column() {
        let shaped = shape_probabilities(vec![vec![0.8, 0.2], vec![0.1, 0.9]], 2).unwrap();
        assert_eq!(shaped, Probabilities::Positive(vec![0.2, 0.9]));
    }

    #[test]
    fn test_other_shapes_pass_through() {
        let rows = vec![vec![0.2, 0.3, 0.5]];
        let shaped = shape_probabilities(rows.clone(), 1).unwrap();
        assert_eq!(shaped, Probabilities::PerClass(rows));

        let ragged = vec![vec![0.4, 0.6], vec![1.0]];
        let shaped = shape_probabilities(ragged.clone(), 2).unwrap();
        assert_eq!(shaped, Probabilities::PerClass(ragged));
    }

    #[test]
    fn test_row_count_mismatch_is_dropped() {
        assert!(shape_probabilities(vec![vec![0.5, 0.5]], 2).is_none());
    }

    #[test]
    fn test_response_serialization() {
        let without = PredictionResponse {
            predictions: vec![json!(1)],
            probabilities: None,
        };
        assert_eq!(serde_json::to_value(&without).unwrap(), json!({"predictions": [1]}));

        let with = PredictionResponse {
            predictions: vec![json!("yes"), json!("no")],
            probabilities: Some(Probabilities::Positive(vec![0.75, 0.25])),
        };
        assert_eq!(
            serde_json::to_value(&with).unwrap(),
            json!({"predictions": ["yes", "no"], "probabilities": [0.75, 0.25]})
        );
    }
}
