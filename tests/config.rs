use std::path::PathBuf;

use figment::Jail;
use tabserve::config::{load_config, ConfigOverrides, ServeConfig};
use tabserve::model::ModelFormat;

#[test]
fn defaults_load_without_file_or_env() {
    Jail::expect_with(|_jail| {
        let config = load_config(None, &ConfigOverrides::default())?;
        assert_eq!(config, ServeConfig::default());
        assert_eq!(config.port, 5000);
        assert_eq!(config.features_path, PathBuf::from("model_features.json"));
        Ok(())
    });
}

#[test]
fn toml_file_then_env_then_flags() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "tabserve.toml",
            r#"
                port = 6000
                model_path = "churn.onnx"
                model_format = "onnx"
                features_preview = 3
            "#,
        )?;
        jail.set_env("TABSERVE_PORT", "7000");
        jail.set_env("TABSERVE_CORS_PERMISSIVE", "true");

        let config = load_config(None, &ConfigOverrides::default())?;
        assert_eq!(config.port, 7000);
        assert_eq!(config.model_path, PathBuf::from("churn.onnx"));
        assert_eq!(config.model_format, ModelFormat::Onnx);
        assert_eq!(config.features_preview, 3);
        assert!(config.cors_permissive);

        let overrides = ConfigOverrides {
            port: Some(8080),
            features_path: Some(PathBuf::from("cols.json")),
            ..ConfigOverrides::default()
        };
        let config = load_config(None, &overrides)?;
        assert_eq!(config.port, 8080);
        assert_eq!(config.features_path, PathBuf::from("cols.json"));
        assert_eq!(config.model_path, PathBuf::from("churn.onnx"));
        Ok(())
    });
}

#[test]
fn explicit_config_file_is_used() {
    Jail::expect_with(|jail| {
        jail.create_dir("serving")?;
        jail.create_file("serving/prod.toml", "host = \"127.0.0.1\"")?;
        let config = load_config(
            Some(PathBuf::from("serving/prod.toml").as_path()),
            &ConfigOverrides::default(),
        )?;
        assert_eq!(config.bind_address(), "127.0.0.1:5000");
        Ok(())
    });
}

#[test]
fn invalid_values_fail_fast() {
    Jail::expect_with(|jail| {
        jail.set_env("TABSERVE_MODEL_FORMAT", "pickle");
        assert!(load_config(None, &ConfigOverrides::default()).is_err());
        Ok(())
    });

    Jail::expect_with(|jail| {
        jail.set_env("TABSERVE_FEATURES_PREVIEW", "0");
        let err = load_config(None, &ConfigOverrides::default()).unwrap_err();
        assert!(err.to_string().contains("features_preview"));
        Ok(())
    });
}
