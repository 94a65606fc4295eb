use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ServeError, ServeResult};
use crate::feature_schema::FeatureSchema;
use crate::input_validator::InputMatrix;
use crate::model::{scalar_to_f64, Classifier};

/// Weights of a fitted logistic-regression classifier.
///
/// Binary models carry one coefficient row and one intercept; multi-class
/// models carry one of each per class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticWeights {
    #[serde(default = "default_classes")]
    pub classes: Vec<Value>,
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
    /// Column names the weights were fit on, when recorded.
    #[serde(default)]
    pub features: Option<Vec<String>>,
    /// Feature name -> category -> numeric code.
    #[serde(default)]
    pub categories: HashMap<String, HashMap<String, f64>>,
}

fn default_classes() -> Vec<Value> {
    vec![Value::from(0), Value::from(1)]
}

/// Logistic scoring over schema-ordered rows.
pub struct LogisticModel {
    weights: LogisticWeights,
    columns: Vec<String>,
    encoders: Vec<Option<HashMap<String, f64>>>,
}

impl LogisticModel {
    pub fn new(weights: LogisticWeights, schema: &FeatureSchema) -> Result<Self, String> {
        let n_classes = weights.classes.len();
        if n_classes < 2 {
            return Err(format!("need at least 2 classes, got {n_classes}"));
        }

        let expected_rows = if n_classes == 2 { 1 } else { n_classes };
        if weights.coef.len() != expected_rows || weights.intercept.len() != expected_rows {
            return Err(format!(
                "{n_classes} classes need {expected_rows} coefficient row(s) and intercept(s), \
                 got {} and {}",
                weights.coef.len(),
                weights.intercept.len()
            ));
        }

        if let Some(bad) = weights.coef.iter().find(|row| row.len() != schema.len()) {
            return Err(format!(
                "coefficient row has {} weights but the feature schema has {} names",
                bad.len(),
                schema.len()
            ));
        }

        if let Some(fitted) = &weights.features {
            if fitted.as_slice() != schema.names() {
                return Err("model feature names differ from the feature schema".to_string());
            }
        }

        let mut encoders = vec![None; schema.len()];
        for (name, table) in &weights.categories {
            let column = schema
                .position(name)
                .ok_or_else(|| format!("category table for unknown feature '{name}'"))?;
            encoders[column] = Some(table.clone());
        }

        Ok(Self {
            weights,
            columns: schema.names().to_vec(),
            encoders,
        })
    }

    pub fn from_path<P: AsRef<Path>>(path: P, schema: &FeatureSchema) -> ServeResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServeError::io(format!("reading {}", path.display()), e))?;
        let weights: LogisticWeights = serde_json::from_str(&content)
            .map_err(|e| ServeError::model_load(path.display().to_string(), e.to_string()))?;
        Self::new(weights, schema)
            .map_err(|message| ServeError::model_load(path.display().to_string(), message))
    }

    pub fn weights(&self) -> &LogisticWeights {
        &self.weights
    }

    fn encode(&self, column: usize, value: &Value) -> ServeResult<f64> {
        if let (Some(table), Value::String(s)) = (&self.encoders[column], value) {
            return table.get(s).copied().ok_or_else(|| {
                ServeError::inference(format!(
                    "feature '{}' has unknown category {value}",
                    self.columns[column]
                ))
            });
        }
        scalar_to_f64(value).ok_or_else(|| {
            ServeError::inference(format!(
                "feature '{}' expects a numeric value, got {value}",
                self.columns[column]
            ))
        })
    }

    /// Linear decision values, one per coefficient row.
    fn decision(&self, row: &[Value]) -> ServeResult<Vec<f64>> {
        let x = row
            .iter()
            .enumerate()
            .map(|(column, value)| self.encode(column, value))
            .collect::<ServeResult<Vec<f64>>>()?;

        Ok(self
            .weights
            .coef
            .iter()
            .zip(&self.weights.intercept)
            .map(|(w, b)| b + w.iter().zip(&x).map(|(w, x)| w * x).sum::<f64>())
            .collect())
    }

    fn check_width(&self, input: &InputMatrix) -> ServeResult<()> {
        if input.width() != self.columns.len() {
            return Err(ServeError::inference(format!(
                "input has {} columns, model expects {}",
                input.width(),
                self.columns.len()
            )));
        }
        Ok(())
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

fn argmax(scores: &[f64]) -> usize {
    scores
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &s)| {
            if s > best.1 {
                (i, s)
            } else {
                best
            }
        })
        .0
}

impl Classifier for LogisticModel {
    fn kind(&self) -> &'static str {
        "logistic_regression"
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.columns.len())
    }

    fn predict(&self, input: &InputMatrix) -> ServeResult<Vec<Value>> {
        self.check_width(input)?;
        let classes = &self.weights.classes;
        input
            .rows()
            .iter()
            .map(|row| {
                let scores = self.decision(row)?;
                let index = match scores.as_slice() {
                    [z] => usize::from(*z > 0.0),
                    many => argmax(many),
                };
                Ok(classes[index].clone())
            })
            .collect()
    }

    fn supports_proba(&self) -> bool {
        true
    }

    fn predict_proba(&self, input: &InputMatrix) -> ServeResult<Vec<Vec<f64>>> {
        self.check_width(input)?;
        input
            .rows()
            .iter()
            .map(|row| {
                let scores = self.decision(row)?;
                Ok(match scores.as_slice() {
                    [z] => {
                        let p = sigmoid(*z);
                        vec![1.0 - p, p]
                    }
                    many => softmax(many),
                })
            })
            .collect()
    }
}
