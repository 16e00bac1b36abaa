//! Configuration management for the Vaidya model server.
//!
//! Configuration is layered, later sources overriding earlier ones:
//! 1. Default configuration (embedded in binary)
//! 2. System-wide configuration file (`/etc/vaidya/config.toml`)
//! 3. User-specified configuration file (`--config`)
//! 4. Environment variables (prefixed with `VAIDYA_`, nested keys joined by `__`)
//! 5. Command-line arguments
//!
//! # Environment Variables
//!
//! - `VAIDYA_SERVER__PORT` - Listen port
//! - `VAIDYA_MODELS__DIR` - Directory holding the model artifacts
//! - `VAIDYA_STORAGE__CONNECTION` - DuckDB file for the prediction log
//! - `VAIDYA_LOGGING__LEVEL` - Default log level

use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");
const SYSTEM_CONFIG: &str = "/etc/vaidya/config.toml";

/// Command-line overrides shared by every subcommand
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Listen host
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Directory holding the model artifacts
    #[arg(long, value_name = "DIR")]
    pub models_dir: Option<PathBuf>,

    /// Prediction log engine (duckdb, memory)
    #[arg(long)]
    pub storage_engine: Option<String>,

    /// Prediction log connection string
    #[arg(long)]
    pub storage_connection: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Largest accepted image upload; 0 removes the limit
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// `*` allows any origin
    #[serde(default = "default_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: default_origins(),
            max_age: default_cors_max_age(),
        }
    }
}

/// Model artifact locations
///
/// Relative file names are resolved against `dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub dir: PathBuf,
    pub tabular_model: PathBuf,
    pub model_info: PathBuf,
    pub image_model: PathBuf,
    #[serde(default = "default_true")]
    pub preload_image_model: bool,
}

impl ModelsConfig {
    pub fn tabular_model_path(&self) -> PathBuf {
        self.dir.join(&self.tabular_model)
    }

    pub fn model_info_path(&self) -> PathBuf {
        self.dir.join(&self.model_info)
    }

    pub fn image_model_path(&self) -> PathBuf {
        self.dir.join(&self.image_model)
    }
}

/// Prediction log backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `duckdb` or `memory`
    pub engine: String,
    /// DuckDB file path, or `:memory:`
    #[serde(default)]
    pub connection: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Full `EnvFilter` directive, takes precedence over `level`
    #[serde(default)]
    pub filter: Option<String>,
    /// Also write logs to this file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            filter: None,
            file: None,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from all sources
    pub fn load(args: &ConfigArgs) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::with_name(SYSTEM_CONFIG).required(false));

        if let Some(path) = &args.config {
            builder = builder.add_source(config::File::from(path.as_path()));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("VAIDYA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: ServiceConfig = builder.build()?.try_deserialize()?;
        config.apply_args(args);
        Ok(config)
    }

    fn apply_args(&mut self, args: &ConfigArgs) {
        if let Some(host) = &args.host {
            self.server.host = host.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(dir) = &args.models_dir {
            self.models.dir = dir.clone();
        }
        if let Some(engine) = &args.storage_engine {
            self.storage.engine = engine.clone();
        }
        if let Some(connection) = &args.storage_connection {
            self.storage.connection = connection.clone();
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    60
}

fn default_max_upload_bytes() -> usize {
    64 * 1024 * 1024
}

fn default_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_cors_max_age() -> u64 {
    3600
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_defaults() {
        let config = ServiceConfig::load(&ConfigArgs::default()).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.storage.engine, "duckdb");
        assert!(config.models.preload_image_model);
        assert_eq!(
            config.models.tabular_model_path(),
            PathBuf::from("models/diabetes_model.onnx")
        );
        assert_eq!(config.models.model_info_path(), PathBuf::from("models/model_info.json"));
        assert!(config.server.cors.enabled);
        assert_eq!(config.server.max_upload_bytes, 64 * 1024 * 1024);
    }

    #[test]
    fn test_user_file_and_args_override() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nport = 9100\n[storage]\nengine = \"memory\"\n[models]\ndir = \"/srv/models\""
        )
        .unwrap();

        let args = ConfigArgs {
            config: Some(file.path().to_path_buf()),
            host: Some("0.0.0.0".into()),
            log_level: Some("debug".into()),
            ..Default::default()
        };
        let config = ServiceConfig::load(&args).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.engine, "memory");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.models.image_model_path(),
            PathBuf::from("/srv/models/image_model.onnx")
        );
        assert_eq!(config.listen_addr(), "0.0.0.0:9100");
    }

    #[test]
    fn test_absolute_artifact_path_wins() {
        let models = ModelsConfig {
            dir: PathBuf::from("models"),
            tabular_model: PathBuf::from("/opt/diabetes.onnx"),
            model_info: PathBuf::from("info.json"),
            image_model: PathBuf::from("image_model.onnx"),
            preload_image_model: false,
        };
        assert_eq!(models.tabular_model_path(), PathBuf::from("/opt/diabetes.onnx"));
    }
}
