//! The model capability and artifact loading.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ServeError, ServeResult};
use crate::feature_schema::FeatureSchema;
use crate::input_validator::InputMatrix;
use crate::linear_model::LogisticModel;
use crate::onnx_model::OnnxClassifier;

/// A fitted classifier.
///
/// Implementations are shared across concurrent requests and must be safe to
/// call from several threads at once.
pub trait Classifier: Send + Sync {
    /// Short name used in logs.
    fn kind(&self) -> &'static str;

    /// Number of input columns the model was fit on, when known.
    fn n_features(&self) -> Option<usize> {
        None
    }

    /// One label per input row, in row order.
    fn predict(&self, input: &InputMatrix) -> ServeResult<Vec<Value>>;

    /// Whether [`Classifier::predict_proba`] is available.
    fn supports_proba(&self) -> bool {
        false
    }

    /// One probability row per input row, one column per class.
    fn predict_proba(&self, _input: &InputMatrix) -> ServeResult<Vec<Vec<f64>>> {
        Err(ServeError::inference(format!(
            "{} does not support probability estimation",
            self.kind()
        )))
    }
}

/// Artifact format of the model file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    /// Pick from the file extension.
    #[default]
    Auto,
    /// JSON logistic-regression weights.
    Logistic,
    /// ONNX classifier graph.
    Onnx,
}

/// A concrete artifact format, after `Auto` has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Logistic,
    Onnx,
}

impl ModelFormat {
    /// Resolve `Auto` against a path.
    pub fn detect(self, path: &Path) -> ServeResult<ArtifactKind> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match (self, extension.as_deref()) {
            (ModelFormat::Logistic, _) | (ModelFormat::Auto, Some("json")) => {
                Ok(ArtifactKind::Logistic)
            }
            (ModelFormat::Onnx, _) | (ModelFormat::Auto, Some("onnx")) => Ok(ArtifactKind::Onnx),
            (ModelFormat::Auto, _) => Err(ServeError::model_load(
                path.display().to_string(),
                "cannot infer the model format from the file extension; set model_format",
            )),
        }
    }
}

/// Load a model artifact for the given schema.
pub fn load_model(
    path: &Path,
    format: ModelFormat,
    schema: &FeatureSchema,
) -> ServeResult<Arc<dyn Classifier>> {
    let model: Arc<dyn Classifier> = match format.detect(path)? {
        ArtifactKind::Logistic => Arc::new(LogisticModel::from_path(path, schema)?),
        ArtifactKind::Onnx => Arc::new(OnnxClassifier::load(path, schema.len())?),
    };
    tracing::info!(
        path = %path.display(),
        kind = model.kind(),
        probabilities = model.supports_proba(),
        "model loaded"
    );
    Ok(model)
}

/// Numeric view of a scalar cell: numbers, booleans and numeric strings.
pub fn scalar_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
