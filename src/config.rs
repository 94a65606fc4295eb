//! Runtime configuration.
//!
//! Layers, lowest to highest: built-in defaults, `tabserve.toml` (or the file
//! passed with `--config`), `TABSERVE_*` environment variables, CLI flags.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::model::ModelFormat;

pub const DEFAULT_CONFIG_FILE: &str = "tabserve.toml";
pub const ENV_PREFIX: &str = "TABSERVE_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServeConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub features_path: PathBuf,
    pub model_format: ModelFormat,
    /// How many feature names `/health` shows.
    pub features_preview: usize,
    /// Fallback tracing filter when `RUST_LOG` is unset.
    pub log_filter: String,
    pub cors_permissive: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            model_path: PathBuf::from("model.json"),
            features_path: PathBuf::from("model_features.json"),
            model_format: ModelFormat::Auto,
            features_preview: 5,
            log_filter: "info".to_string(),
            cors_permissive: false,
        }
    }
}

/// CLI-level overrides; unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features_path: Option<PathBuf>,
}

impl ServeConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("host cannot be empty".into());
        }
        if self.model_path.as_os_str().is_empty() {
            return Err("model_path cannot be empty".into());
        }
        if self.features_path.as_os_str().is_empty() {
            return Err("features_path cannot be empty".into());
        }
        if self.features_preview == 0 {
            return Err("features_preview must be at least 1".into());
        }
        Ok(())
    }
}

/// The layered provider stack, before CLI overrides.
pub fn layered(config_file: Option<&Path>) -> Figment {
    let file = config_file.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    Figment::from(Serialized::defaults(ServeConfig::default()))
        .merge(Toml::file(file))
        .merge(Env::prefixed(ENV_PREFIX))
}

pub fn load_config(
    config_file: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<ServeConfig, figment::Error> {
    let config: ServeConfig = layered(config_file)
        .merge(Serialized::defaults(overrides))
        .extract()?;

    config.validate().map_err(figment::Error::from)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
    }

    #[test]
    fn test_validation_rejects_empty_values() {
        let config = ServeConfig {
            features_preview: 0,
            ..ServeConfig::default()
        };
        assert!(config.validate().unwrap_err().contains("features_preview"));

        let config = ServeConfig {
            model_path: PathBuf::new(),
            ..ServeConfig::default()
        };
        assert!(config.validate().unwrap_err().contains("model_path"));
    }
}
