//! Configuration loader
//!
//! This module provides the ConfigLoader which is responsible for loading
//! configuration from .env files and environment variables.

use std::collections::BTreeMap;
use std::path::Path;

use super::dto::{
    FeatureFlagConfig, FlagContextDto, ImageConfig, KubernetesSettings, LauncherConfigDto,
    LogFormat, LoggingConfig, TimeoutConfig, WorkerGroupConfig, WorkerGroupsConfig,
};
use super::error::{ConfigError, Result};
use super::validator::validate_launcher_config;

/// Configuration loader
///
/// This loader handles loading configuration from:
/// 1. .env file (optional, highest priority)
/// 2. Environment variables
///
/// # Example
///
/// ```ignore
/// use launcher_shared::config::ConfigLoader;
/// use std::path::PathBuf;
///
/// let loader = ConfigLoader::new(Some(PathBuf::from(".env")));
/// let config = loader.load_launcher_config()?;
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Optional path to .env file
    env_file_path: Option<std::path::PathBuf>,
}

impl ConfigLoader {
    /// Create a new ConfigLoader
    ///
    /// # Arguments
    ///
    /// * `env_file_path` - Optional path to .env file. If provided, the file
    ///                     will be loaded before reading environment variables.
    pub fn new(env_file_path: Option<std::path::PathBuf>) -> Self {
        Self { env_file_path }
    }

    /// Load launcher configuration
    ///
    /// # Returns
    ///
    /// `Ok(LauncherConfigDto)` if configuration is valid and complete
    /// `Err(ConfigError)` if required configuration is missing or invalid
    pub fn load_launcher_config(&self) -> Result<LauncherConfigDto> {
        if let Some(path) = &self.env_file_path {
            self.load_env_file(path)?;
        }

        let config = LauncherConfigDto::from_env()?;

        validate_launcher_config(&config)?;

        Ok(config)
    }

    fn load_env_file(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(ConfigError::EnvFileNotFound {
                path: path.to_path_buf(),
            });
        }

        dotenv::from_path(path).map_err(|e| ConfigError::EnvFileLoad {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }
}

impl Default for ConfigLoader {
    /// Create a ConfigLoader without .env file support
    fn default() -> Self {
        Self::new(None)
    }
}

// ============================================================================
// Implementation: LauncherConfigDto::from_env
// ============================================================================

impl LauncherConfigDto {
    /// Build launcher configuration from environment variables
    ///
    /// Fails with `ConfigError::MissingRequired` if any required variable is
    /// not set, with `ConfigError::InvalidValue` if a value cannot be parsed
    /// and with `ConfigError::MalformedEntry` for a bad `k=v` list.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            kubernetes: KubernetesSettings::from_env()?,
            images: ImageConfig::from_env()?,
            groups: WorkerGroupsConfig::from_env()?,
            timeouts: TimeoutConfig::from_env()?,
            flags: FeatureFlagConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }
}

impl KubernetesSettings {
    /// # Optional Variables
    ///
    /// - `LAUNCHER_K8S_NAMESPACE`: Default "default"
    /// - `LAUNCHER_K8S_KUBECONFIG`
    /// - `LAUNCHER_K8S_CONTEXT`
    /// - `LAUNCHER_K8S_SERVICE_ACCOUNT`
    /// - `LAUNCHER_K8S_IMAGE_PULL_SECRETS`: comma separated
    pub fn from_env() -> Result<Self> {
        let namespace =
            std::env::var("LAUNCHER_K8S_NAMESPACE").unwrap_or_else(|_| "default".to_string());

        let image_pull_secrets = std::env::var("LAUNCHER_K8S_IMAGE_PULL_SECRETS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            namespace,
            kubeconfig_path: std::env::var("LAUNCHER_K8S_KUBECONFIG").ok().map(Into::into),
            context: std::env::var("LAUNCHER_K8S_CONTEXT").ok(),
            service_account: std::env::var("LAUNCHER_K8S_SERVICE_ACCOUNT").ok(),
            image_pull_secrets,
        })
    }
}

impl ImageConfig {
    /// # Required Variables
    ///
    /// - `LAUNCHER_ORCHESTRATOR_IMAGE`
    /// - `LAUNCHER_SIDECAR_IMAGE`
    /// - `LAUNCHER_INIT_IMAGE`
    ///
    /// # Optional Variables
    ///
    /// - `LAUNCHER_IMAGE_PULL_POLICY`: Default "IfNotPresent"
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            orchestrator_image: required_var("LAUNCHER_ORCHESTRATOR_IMAGE")?,
            sidecar_image: required_var("LAUNCHER_SIDECAR_IMAGE")?,
            init_image: required_var("LAUNCHER_INIT_IMAGE")?,
            pull_policy: std::env::var("LAUNCHER_IMAGE_PULL_POLICY")
                .unwrap_or_else(|_| "IfNotPresent".to_string()),
        })
    }
}

impl WorkerGroupsConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            replication: WorkerGroupConfig::from_env("REPLICATION")?,
            check: WorkerGroupConfig::from_env("CHECK")?,
            discover: WorkerGroupConfig::from_env("DISCOVER")?,
            spec: WorkerGroupConfig::from_env("SPEC")?,
        })
    }
}

impl WorkerGroupConfig {
    /// Reads `LAUNCHER_<GROUP>_NODE_SELECTORS`, `LAUNCHER_<GROUP>_ISOLATED_NODE_SELECTORS`
    /// and `LAUNCHER_<GROUP>_ANNOTATIONS`.
    pub fn from_env(group: &str) -> Result<Self> {
        let selectors_var = format!("LAUNCHER_{group}_NODE_SELECTORS");
        let isolated_var = format!("LAUNCHER_{group}_ISOLATED_NODE_SELECTORS");
        let annotations_var = format!("LAUNCHER_{group}_ANNOTATIONS");

        let node_selectors = match std::env::var(&selectors_var) {
            Ok(raw) => parse_key_value_list(&selectors_var, &raw)?,
            Err(_) => BTreeMap::new(),
        };

        let isolated_node_selectors = match std::env::var(&isolated_var) {
            Ok(raw) => Some(parse_key_value_list(&isolated_var, &raw)?),
            Err(_) => None,
        };

        let annotations = match std::env::var(&annotations_var) {
            Ok(raw) => parse_key_value_list(&annotations_var, &raw)?,
            Err(_) => BTreeMap::new(),
        };

        Ok(Self {
            node_selectors,
            isolated_node_selectors,
            annotations,
        })
    }
}

impl TimeoutConfig {
    /// # Optional Variables
    ///
    /// - `LAUNCHER_ORCHESTRATOR_STARTUP_TIMEOUT_SECS`: Default 120
    /// - `LAUNCHER_POD_INIT_TIMEOUT_SECS`: Default 900
    /// - `LAUNCHER_FULL_POD_TIMEOUT_SECS`: Default 360
    /// - `LAUNCHER_TIMEOUT_SLACK_SECS`: Default 5
    pub fn from_env() -> Result<Self> {
        let defaults = TimeoutConfig::default();
        Ok(Self {
            orchestrator_startup_secs: parse_var_or(
                "LAUNCHER_ORCHESTRATOR_STARTUP_TIMEOUT_SECS",
                defaults.orchestrator_startup_secs,
            )?,
            pod_init_secs: parse_var_or("LAUNCHER_POD_INIT_TIMEOUT_SECS", defaults.pod_init_secs)?,
            full_pod_secs: parse_var_or("LAUNCHER_FULL_POD_TIMEOUT_SECS", defaults.full_pod_secs)?,
            slack_secs: parse_var_or("LAUNCHER_TIMEOUT_SLACK_SECS", defaults.slack_secs)?,
        })
    }
}

impl FeatureFlagConfig {
    /// # Optional Variables
    ///
    /// - `LAUNCHER_FEATURE_FLAGS`: `flag-key=value,...`
    /// - `LAUNCHER_FLAG_CONTEXTS`: `kind=key,...`
    pub fn from_env() -> Result<Self> {
        let values = match std::env::var("LAUNCHER_FEATURE_FLAGS") {
            Ok(raw) => parse_key_value_list("LAUNCHER_FEATURE_FLAGS", &raw)?,
            Err(_) => BTreeMap::new(),
        };

        // Contexts keep their order and may repeat a kind
        let contexts = match std::env::var("LAUNCHER_FLAG_CONTEXTS") {
            Ok(raw) => parse_pairs("LAUNCHER_FLAG_CONTEXTS", &raw)?
                .into_iter()
                .map(|(kind, key)| FlagContextDto { kind, key })
                .collect(),
            Err(_) => Vec::new(),
        };

        Ok(Self { values, contexts })
    }
}

impl LoggingConfig {
    /// # Optional Variables
    ///
    /// - `RUST_LOG`: Log level (default: "info")
    /// - `LAUNCHER_LOG_FORMAT`: "text" or "json" (default: "text")
    pub fn from_env() -> Result<Self> {
        let level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let format = match std::env::var("LAUNCHER_LOG_FORMAT")
            .unwrap_or_else(|_| "text".to_string())
            .to_lowercase()
            .as_str()
        {
            "text" => LogFormat::Text,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::InvalidValue {
                    var: "LAUNCHER_LOG_FORMAT".to_string(),
                    value: other.to_string(),
                    expected: "text or json",
                });
            }
        };

        Ok(Self { level, format })
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn required_var(var: &str) -> Result<String> {
    std::env::var(var).map_err(|_| ConfigError::MissingRequired {
        var: var.to_string(),
    })
}

fn parse_var_or<T>(var: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
{
    match std::env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            var: var.to_string(),
            value: raw,
            expected: std::any::type_name::<T>(),
        }),
        Err(_) => Ok(default),
    }
}

fn parse_pairs(var: &str, raw: &str) -> Result<Vec<(String, String)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((k, v)) if !k.trim().is_empty() => {
                Ok((k.trim().to_string(), v.trim().to_string()))
            }
            _ => Err(ConfigError::MalformedEntry {
                var: var.to_string(),
                entry: entry.to_string(),
            }),
        })
        .collect()
}

/// Parse a `key=value,key=value` list. Empty entries are skipped; an entry
/// without `=` or with an empty key is an error. Later keys win.
pub fn parse_key_value_list(var: &str, raw: &str) -> Result<BTreeMap<String, String>> {
    Ok(parse_pairs(var, raw)?.into_iter().collect())
}

// ============================================================================
// Tests
// ============================================================================
