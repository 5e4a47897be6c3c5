use crate::InjectionMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const CONFIG_FILE_NAME: &str = ".pulsegraph.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for PulseGraph
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PulseGraphConfig {
    /// Directory walking
    #[serde(default)]
    pub walker: WalkerConfig,

    /// Default paths used when the CLI does not receive them
    #[serde(default)]
    pub defaults: DefaultPaths,

    /// Source rewriting settings
    #[serde(default)]
    pub instrumentation: InstrumentationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalkerConfig {
    /// Directory names never descended into
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<String>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            skip_dirs: default_skip_dirs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultPaths {
    #[serde(default)]
    pub source: Option<PathBuf>,
    #[serde(default)]
    pub traces: Option<PathBuf>,
    #[serde(default)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstrumentationConfig {
    #[serde(default)]
    pub mode: InjectionMode,

    /// Invocation names annotated as `db_call` events
    #[serde(default = "default_db_calls")]
    pub db_calls: Vec<String>,

    /// Invocation names annotated as `external_api_call` events
    #[serde(default = "default_http_calls")]
    pub http_calls: Vec<String>,
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            mode: InjectionMode::default(),
            db_calls: default_db_calls(),
            http_calls: default_http_calls(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "pretty", "json", "compact"
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

pub fn default_skip_dirs() -> Vec<String> {
    ["node_modules", ".git", "dist", "target", "build"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn default_db_calls() -> Vec<String> {
    ["save", "saveAll", "findById", "findAll", "deleteById", "executeQuery", "executeUpdate"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn default_http_calls() -> Vec<String> {
    ["getForObject", "getForEntity", "postForObject", "postForEntity", "exchange", "send"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

/// Configuration manager with layered sources
pub struct ConfigManager {
    config: PulseGraphConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (.pulsegraph.toml)
    /// 3. Sensible defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_dotenv();
        let (config, config_path) = Self::load_config_file()?;
        Self::finish(config, config_path)
    }

    /// Load an explicit config file; a missing file is an error here.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        Self::load_dotenv();
        let config = Self::read_toml_file(path)?;
        Self::finish(config, Some(path.to_path_buf()))
    }

    fn finish(config: PulseGraphConfig, config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;

        match config_path {
            Some(ref path) => info!("Config file: {}", path.display()),
            None => debug!("No config file found, using defaults"),
        }
        debug!("Skip dirs: {:?}", config.walker.skip_dirs);

        Ok(Self {
            config,
            config_path,
        })
    }

    fn load_dotenv() {
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warn!("Failed to load .env file: {}", e);
            }
        }
    }

    /// Search order:
    /// 1. ./.pulsegraph.toml (current directory)
    /// 2. ~/.pulsegraph/config.toml (user config)
    /// 3. Use defaults
    fn load_config_file() -> Result<(PulseGraphConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(CONFIG_FILE_NAME);
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".pulsegraph").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        Ok((PulseGraphConfig::default(), None))
    }

    fn read_toml_file(path: &Path) -> Result<PulseGraphConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        let config: PulseGraphConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(config)
    }

    fn apply_env_overrides(mut config: PulseGraphConfig) -> PulseGraphConfig {
        if let Ok(dirs) = std::env::var("PULSEGRAPH_SKIP_DIRS") {
            config.walker.skip_dirs = dirs
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(source) = std::env::var("PULSEGRAPH_SOURCE") {
            config.defaults.source = Some(PathBuf::from(source));
        }
        if let Ok(traces) = std::env::var("PULSEGRAPH_TRACES") {
            config.defaults.traces = Some(PathBuf::from(traces));
        }
        if let Ok(output) = std::env::var("PULSEGRAPH_OUTPUT") {
            config.defaults.output = Some(PathBuf::from(output));
        }
        if let Ok(mode) = std::env::var("PULSEGRAPH_INJECTION_MODE") {
            match mode.parse() {
                Ok(mode) => config.instrumentation.mode = mode,
                Err(e) => warn!("Ignoring PULSEGRAPH_INJECTION_MODE: {}", e),
            }
        }
        if let Ok(level) = std::env::var("PULSEGRAPH_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("PULSEGRAPH_LOG_FORMAT") {
            config.logging.format = format;
        }

        config
    }

    fn validate_config(config: &PulseGraphConfig) -> Result<(), ConfigError> {
        match config.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    other
                )))
            }
        }

        match config.logging.format.as_str() {
            "pretty" | "json" | "compact" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {}. Must be one of: pretty, json, compact",
                    other
                )))
            }
        }

        if config.walker.skip_dirs.iter().any(|d| d.contains('/') || d.contains('\\')) {
            return Err(ConfigError::ValidationError(
                "walker.skip_dirs entries must be bare directory names".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &PulseGraphConfig {
        &self.config
    }

    /// Get the path to the config file that was loaded, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Create a default config file
    pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        let config = PulseGraphConfig::default();
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        }

        std::fs::write(path, toml_str).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PulseGraphConfig::default();
        assert_eq!(config.walker.skip_dirs, vec!["node_modules", ".git", "dist", "target", "build"]);
        assert_eq!(config.instrumentation.mode, InjectionMode::Intrusive);
        assert!(config.instrumentation.db_calls.contains(&"findById".to_string()));
        assert!(config.instrumentation.http_calls.contains(&"postForObject".to_string()));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_validation() {
        let config = PulseGraphConfig::default();
        assert!(ConfigManager::validate_config(&config).is_ok());

        let mut bad_level = config.clone();
        bad_level.logging.level = "loud".to_string();
        assert!(ConfigManager::validate_config(&bad_level).is_err());

        let mut bad_dirs = config.clone();
        bad_dirs.walker.skip_dirs.push("a/b".to_string());
        assert!(ConfigManager::validate_config(&bad_dirs).is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: PulseGraphConfig = toml::from_str(
            r#"
            [walker]
            skip_dirs = ["out"]

            [instrumentation]
            mode = "sidecar"
            "#,
        )
        .unwrap();
        assert_eq!(config.walker.skip_dirs, vec!["out"]);
        assert_eq!(config.instrumentation.mode, InjectionMode::Sidecar);
        assert_eq!(config.instrumentation.db_calls, default_db_calls());
        assert_eq!(config.logging, LoggingConfig::default());
    }
}
