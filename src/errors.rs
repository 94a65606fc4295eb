//! Error handling for the serving layer
//!
//! Startup errors (schema, model, configuration) abort the process; request
//! errors are converted to HTTP responses in [`crate::api_errors`].

use thiserror::Error;

/// Guidance returned when a request body has neither usable key.
pub const REQUEST_SHAPE_MESSAGE: &str =
    "Provide 'features' (dict) or 'instances' (list of dicts).";

/// Main error type for schema resolution, request translation and inference.
#[derive(Error, Debug)]
pub enum ServeError {
    #[error("Unrecognized feature list format: {message}")]
    SchemaFormat { message: String },

    #[error("{message}")]
    BadRequest { message: String },

    #[error("Missing required features: {}", quoted_list(.missing))]
    MissingFeatures { missing: Vec<String> },

    #[error("Prediction failed: {message}")]
    Inference { message: String },

    #[error("Model load failed for {path}: {message}")]
    ModelLoad { path: String, message: String },

    #[error("I/O operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result alias used across the crate.
pub type ServeResult<T> = Result<T, ServeError>;

impl ServeError {
    pub fn schema_format(message: impl Into<String>) -> Self {
        Self::SchemaFormat {
            message: message.into(),
        }
    }

    /// The fixed request-shape rejection.
    pub fn bad_request() -> Self {
        Self::BadRequest {
            message: REQUEST_SHAPE_MESSAGE.to_string(),
        }
    }

    pub fn missing_features(missing: Vec<String>) -> Self {
        Self::MissingFeatures { missing }
    }

    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference {
            message: message.into(),
        }
    }

    pub fn model_load(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModelLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    /// True for errors caused by the caller's payload.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServeError::BadRequest { .. } | ServeError::MissingFeatures { .. }
        )
    }
}

/// Render names as `['a', 'b']`, the form clients already match on.
pub fn quoted_list(names: &[String]) -> String {
    let quoted: Vec<String> = names.iter().map(|name| quote_name(name)).collect();
    format!("[{}]", quoted.join(", "))
}

fn quote_name(name: &str) -> String {
    let quote = if name.contains('\'') && !name.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(name.len() + 2);
    out.push(quote);
    for c in name.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}
