//! Configuration loading and types for the exporter.
//!
//! Configuration is read from a YAML file and deserialized into the
//! [`Config`] struct.  Every section is optional; a missing file section
//! falls back to its defaults, and command-line flags are applied on top
//! by the binary.

use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Endpoint paths.
    #[serde(default)]
    pub web: WebConfig,

    /// Object storage connection and probe defaults.
    #[serde(default)]
    pub s3: S3Config,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Observability settings (process metrics).
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind host address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Paths the exporter serves.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Path under which to expose process metrics.
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,

    /// Path under which to expose the probe endpoint.
    #[serde(default = "default_probe_path")]
    pub probe_path: String,

    /// Path under which to expose service discovery.
    #[serde(default = "default_discovery_path")]
    pub discovery_path: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            metrics_path: default_metrics_path(),
            probe_path: default_probe_path(),
            discovery_path: default_discovery_path(),
        }
    }
}

/// S3 connection settings and static probe defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    /// AWS region.
    #[serde(default = "default_region")]
    pub region: String,

    /// Custom S3-compatible endpoint (e.g. MinIO, Ceph). Empty uses AWS.
    #[serde(default)]
    pub endpoint_url: String,

    /// Force path-style URL addressing.
    #[serde(default)]
    pub force_path_style: bool,

    /// Explicit access key (falls back to env/credential chain).
    #[serde(default)]
    pub access_key_id: String,

    /// Explicit secret key (falls back to env/credential chain).
    #[serde(default)]
    pub secret_access_key: String,

    /// Count every object version instead of current objects only.
    #[serde(default)]
    pub list_object_versions: bool,

    /// Bucket probed when the request names none.
    #[serde(default)]
    pub bucket: String,

    /// Comma-separated prefixes probed when the request names none.
    #[serde(default)]
    pub prefixes: String,

    /// Storage class filter applied when the request names none.
    #[serde(default)]
    pub storage_class: String,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint_url: String::new(),
            force_path_style: false,
            access_key_id: String::new(),
            secret_access_key: String::new(),
            list_object_versions: false,
            bucket: String::new(),
            prefixes: String::new(),
            storage_class: String::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: text or json.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Enable process metrics collection and the metrics endpoint.
    #[serde(default = "default_true")]
    pub metrics: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { metrics: true }
    }
}

// -- Defaults ----------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9340
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_probe_path() -> String {
    "/probe".to_string()
}

fn default_discovery_path() -> String {
    "/discovery".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

// -- Validation --------------------------------------------------------------

/// Fixed liveness route, always served.
pub const HEALTH_PATH: &str = "/health";

impl Config {
    /// Reject configurations the server cannot route or log with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let paths = [
            ("web.metrics_path", &self.web.metrics_path),
            ("web.probe_path", &self.web.probe_path),
            ("web.discovery_path", &self.web.discovery_path),
        ];
        for (name, path) in paths {
            if !path.starts_with('/') || path.len() < 2 {
                anyhow::bail!("{name} must start with '/' and name a resource, got '{path}'");
            }
            if path.contains([':', '*', '{', '}']) {
                anyhow::bail!("{name} must be a literal path, got '{path}'");
            }
            if path.trim_end_matches('/') == HEALTH_PATH {
                anyhow::bail!("{name} clashes with the built-in {HEALTH_PATH} route");
            }
        }
        for (i, (a_name, a)) in paths.iter().enumerate() {
            for (b_name, b) in &paths[i + 1..] {
                if a == b {
                    anyhow::bail!("{a_name} and {b_name} must differ, both are '{a}'");
                }
            }
        }

        match self.logging.format.as_str() {
            "text" | "json" => {}
            other => anyhow::bail!("logging.format must be 'text' or 'json', got '{other}'"),
        }

        Ok(())
    }
}

// -- Loader ------------------------------------------------------------------

/// Load and parse configuration from a YAML file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let config: Config = serde_yaml::from_str(&contents)?;
    Ok(config)
}

// -- Tests -------------------------------------------------------------------
