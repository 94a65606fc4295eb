use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::config::{load_config, ConfigOverrides};
use crate::feature_schema::FeatureSchema;
use crate::payload::write_payloads;

/// Top-level CLI interface
#[derive(Parser)]
#[command(
    name = "tabserve",
    version,
    about = "Serve a pre-trained tabular classifier over HTTP"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve /health and /predict
    Serve {
        /// Configuration file (defaults to ./tabserve.toml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Host/IP to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to bind
        #[arg(long)]
        port: Option<u16>,
        /// Model artifact
        #[arg(long)]
        model: Option<PathBuf>,
        /// Feature list artifact
        #[arg(long)]
        features: Option<PathBuf>,
    },

    /// Resolve a feature artifact and print the canonical feature order
    Features {
        #[arg(short, long, default_value = "model_features.json")]
        features: PathBuf,
    },

    /// Write sample single-row and batch request bodies
    MakePayload {
        #[arg(short, long, default_value = "model_features.json")]
        features: PathBuf,
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
}

/// Install the global tracing subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub fn dispatch(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve {
            config,
            host,
            port,
            model,
            features,
        } => {
            let overrides = ConfigOverrides {
                host,
                port,
                model_path: model,
                features_path: features,
            };
            let config = load_config(config.as_deref(), &overrides)
                .context("failed to load configuration")?;
            init_logging(&config.log_filter);

            let state = AppState::from_config(&config).context("startup failed")?;
            tracing::info!(
                n_features = state.schema.len(),
                model = state.model.kind(),
                "serving state ready"
            );

            let mut app = crate::web::build_router(Arc::new(state));
            if config.cors_permissive {
                app = app.layer(CorsLayer::permissive());
            }

            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to build Tokio runtime")?;

            let addr = config.bind_address();
            rt.block_on(async move {
                let listener = tokio::net::TcpListener::bind(&addr)
                    .await
                    .with_context(|| format!("failed to bind {addr}"))?;
                tracing::info!("HTTP server listening on http://{addr}");
                axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown_signal())
                    .await
                    .context("server error")
            })
        }
        Commands::Features { features } => {
            init_logging("warn");
            let schema = FeatureSchema::from_path(&features)
                .with_context(|| format!("cannot resolve {}", features.display()))?;
            println!("{} features", schema.len());
            for name in schema.names() {
                println!("{name}");
            }
            Ok(())
        }
        Commands::MakePayload { features, out_dir } => {
            init_logging("warn");
            let schema = FeatureSchema::from_path(&features)
                .with_context(|| format!("cannot resolve {}", features.display()))?;
            println!("Detected {} features.", schema.len());
            let (single, batch) = write_payloads(&schema, &out_dir)?;
            println!("Wrote {} and {}", single.display(), batch.display());
            println!("Replace the 0 placeholders of categorical features before sending.");
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received, draining connections");
}
