//! Library root for the `tabserve` crate

// Core error handling
pub mod api_errors;
pub mod errors;

// Feature schema & request translation
pub mod feature_schema;
pub mod input_validator;

// Model capability
pub mod linear_model;
pub mod model;
pub mod onnx_model;

// Serving
pub mod app_state;
pub mod predictor;
pub mod web;

// Configuration & CLI
pub mod cli;
pub mod config;
pub mod payload;

pub use app_state::AppState;
pub use errors::{ServeError, ServeResult};
pub use feature_schema::FeatureSchema;
pub use input_validator::{InputMatrix, PredictionRequest};
pub use model::Classifier;
pub use predictor::{HealthResponse, PredictionResponse, Probabilities};
