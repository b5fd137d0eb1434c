//! s3-exporter -- Prometheus exporter for S3 bucket listings.
//!
//! Probes are stateless: every scrape lists the requested bucket from
//! scratch. SIGTERM/SIGINT stop accepting connections and give in-flight
//! probes `server.shutdown_timeout` seconds to finish.

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use s3_exporter::config::{Config, LoggingConfig};

/// Command-line arguments for the exporter.
#[derive(Parser, Debug)]
#[command(
    name = "s3_exporter",
    version,
    about = "Export metrics for S3 bucket listings"
)]
struct Cli {
    /// Path to the YAML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<String>,

    /// Override the bind address (host:port).
    #[arg(short, long)]
    bind: Option<String>,

    /// Bucket to probe when the request names none.
    #[arg(long)]
    bucket: Option<String>,

    /// Comma-separated prefixes to probe when the request names none.
    #[arg(long)]
    prefixes: Option<String>,

    /// Storage class to filter on when the request names none.
    #[arg(long)]
    storage_class: Option<String>,

    /// Custom S3-compatible endpoint URL.
    #[arg(long)]
    endpoint_url: Option<String>,

    /// Use path-style bucket addressing.
    #[arg(long)]
    force_path_style: bool,

    /// Count every object version instead of current objects only.
    #[arg(long)]
    list_object_versions: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the file configuration.
    fn apply(&self, config: &mut Config) {
        if let Some(bucket) = &self.bucket {
            config.s3.bucket = bucket.clone();
        }
        if let Some(prefixes) = &self.prefixes {
            config.s3.prefixes = prefixes.clone();
        }
        if let Some(storage_class) = &self.storage_class {
            config.s3.storage_class = storage_class.clone();
        }
        if let Some(endpoint_url) = &self.endpoint_url {
            config.s3.endpoint_url = endpoint_url.clone();
        }
        if self.force_path_style {
            config.s3.force_path_style = true;
        }
        if self.list_object_versions {
            config.s3.list_object_versions = true;
        }
    }
}

/// Initialize tracing. `RUST_LOG` takes precedence over `logging.level`.
fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    match logging.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer.json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => s3_exporter::config::load_config(path)?,
        None => Config::default(),
    };
    cli.apply(&mut config);
    config.validate()?;

    init_logging(&config.logging);
    if let Some(path) = &cli.config {
        info!("Loaded configuration from {}", path);
    }

    let bind_addr = cli
        .bind
        .clone()
        .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));

    if config.observability.metrics {
        s3_exporter::metrics::init_metrics()?;
        s3_exporter::metrics::describe_metrics();
        info!("Prometheus metrics initialized");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        bucket = %config.s3.bucket,
        prefixes = %config.s3.prefixes,
        storage_class = %config.s3.storage_class,
        list_object_versions = config.s3.list_object_versions,
        "Starting s3_exporter"
    );

    let client = s3_exporter::storage::aws::AwsListingClient::new(&config.s3).await?;
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout);

    let state = Arc::new(s3_exporter::AppState {
        config,
        client: Arc::new(client),
    });

    let app = s3_exporter::server::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on {}", bind_addr);

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .into_future();

    // Once a signal arrives, in-flight probes get `shutdown_timeout` to finish.
    let deadline = async {
        shutdown_signal().await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        result = server => result?,
        _ = deadline => {
            warn!(
                "Shutdown timeout of {:?} elapsed, exiting with requests in flight",
                shutdown_timeout
            );
        }
    }

    info!("s3_exporter shut down");

    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C), then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        },
    }
}
