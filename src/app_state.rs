use std::sync::Arc;

use crate::{
    config::ServeConfig,
    errors::{ServeError, ServeResult},
    feature_schema::FeatureSchema,
    model::{load_model, Classifier},
};

/// Everything a request needs, built once at startup and never mutated.
pub struct AppState {
    pub schema: FeatureSchema,
    pub model: Arc<dyn Classifier>,
    pub features_preview: usize,
}

impl AppState {
    pub fn new(
        schema: FeatureSchema,
        model: Arc<dyn Classifier>,
        features_preview: usize,
    ) -> ServeResult<Self> {
        if let Some(width) = model.n_features() {
            if width != schema.len() {
                return Err(ServeError::model_load(
                    model.kind(),
                    format!(
                        "model expects {width} features but the feature schema has {}",
                        schema.len()
                    ),
                ));
            }
        }

        Ok(Self {
            schema,
            model,
            features_preview,
        })
    }

    /// Resolve the feature schema, then load the model against it.
    pub fn from_config(config: &ServeConfig) -> ServeResult<Self> {
        let schema = FeatureSchema::from_path(&config.features_path)?;
        let model = load_model(&config.model_path, config.model_format, &schema)?;
        Self::new(schema, model, config.features_preview)
    }
}
