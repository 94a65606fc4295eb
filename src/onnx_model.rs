//! ONNX classifier backed by tract.
//!
//! Expects the layout produced by common tabular exporters: a single float
//! input of shape `[batch, n_features]`, output 0 holding the predicted label
//! and, when present, output 1 holding class probabilities as a plain float
//! tensor (exporters must not wrap it in a sequence of maps). The graph is
//! pinned to a batch of one and evaluated row by row.

use std::path::Path;

use serde_json::Value;
use tract_onnx::prelude::*;

use crate::errors::{ServeError, ServeResult};
use crate::input_validator::InputMatrix;
use crate::model::{scalar_to_f64, Classifier};

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

pub struct OnnxClassifier {
    plan: OnnxPlan,
    n_features: usize,
    has_proba: bool,
}

fn inference_error(e: TractError) -> ServeError {
    ServeError::inference(format!("{e:#}"))
}

impl OnnxClassifier {
    pub fn load<P: AsRef<Path>>(path: P, n_features: usize) -> ServeResult<Self> {
        let path = path.as_ref();
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| {
                model.with_input_fact(
                    0,
                    InferenceFact::dt_shape(f32::datum_type(), tvec!(1, n_features)),
                )
            })
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| ServeError::model_load(path.display().to_string(), format!("{e:#}")))?;

        let has_proba = plan.model().outputs.len() > 1;
        Ok(Self {
            plan,
            n_features,
            has_proba,
        })
    }

    fn run_row(&self, row: &[Value]) -> ServeResult<TVec<TValue>> {
        let values = row
            .iter()
            .enumerate()
            .map(|(column, value)| {
                scalar_to_f64(value).map(|v| v as f32).ok_or_else(|| {
                    ServeError::inference(format!(
                        "column {column} expects a numeric value, got {value}"
                    ))
                })
            })
            .collect::<ServeResult<Vec<f32>>>()?;

        let tensor = Tensor::from_shape(&[1, self.n_features], &values).map_err(inference_error)?;
        self.plan.run(tvec!(tensor.into())).map_err(inference_error)
    }

    fn check_width(&self, input: &InputMatrix) -> ServeResult<()> {
        if input.width() != self.n_features {
            return Err(ServeError::inference(format!(
                "input has {} columns, model expects {}",
                input.width(),
                self.n_features
            )));
        }
        Ok(())
    }
}

fn first<T: Datum>(tensor: &Tensor) -> ServeResult<Option<&T>> {
    Ok(tensor.as_slice::<T>().map_err(inference_error)?.first())
}

fn label_of(tensor: &Tensor) -> ServeResult<Value> {
    let label = match tensor.datum_type() {
        DatumType::I64 => first::<i64>(tensor)?.map(|v| Value::from(*v)),
        DatumType::I32 => first::<i32>(tensor)?.map(|v| Value::from(*v)),
        DatumType::Bool => first::<bool>(tensor)?.map(|v| Value::Bool(*v)),
        DatumType::String => first::<String>(tensor)?.map(|v| Value::String(v.clone())),
        DatumType::F32 => first::<f32>(tensor)?
            .and_then(|v| serde_json::Number::from_f64(*v as f64))
            .map(Value::Number),
        DatumType::F64 => first::<f64>(tensor)?
            .and_then(|v| serde_json::Number::from_f64(*v))
            .map(Value::Number),
        other => {
            return Err(ServeError::inference(format!(
                "unsupported label tensor type {other:?}"
            )))
        }
    };
    label.ok_or_else(|| ServeError::inference("model returned an empty label tensor"))
}

impl Classifier for OnnxClassifier {
    fn kind(&self) -> &'static str {
        "onnx"
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.n_features)
    }

    fn predict(&self, input: &InputMatrix) -> ServeResult<Vec<Value>> {
        self.check_width(input)?;
        input
            .rows()
            .iter()
            .map(|row| {
                let outputs = self.run_row(row)?;
                let labels = outputs
                    .first()
                    .ok_or_else(|| ServeError::inference("model produced no outputs"))?;
                label_of(labels)
            })
            .collect()
    }

    fn supports_proba(&self) -> bool {
        self.has_proba
    }

    fn predict_proba(&self, input: &InputMatrix) -> ServeResult<Vec<Vec<f64>>> {
        if !self.has_proba {
            return Err(ServeError::inference("model has no probability output"));
        }
        self.check_width(input)?;
        input
            .rows()
            .iter()
            .map(|row| {
                let outputs = self.run_row(row)?;
                let probabilities = outputs[1].cast_to::<f64>().map_err(inference_error)?;
                Ok(probabilities
                    .as_slice::<f64>()
                    .map_err(inference_error)?
                    .to_vec())
            })
            .collect()
    }
}
