//! Configuration module for the workload launcher
//!
//! Centralized configuration loading, validation, and DTOs for the launcher.
//!
//! # Architecture
//!
//! 1. **Single Source of Truth**: configuration is loaded once at startup
//! 2. **Fail Fast**: errors are reported immediately, no silent fallbacks
//! 3. **DTO Pattern**: configuration is immutable and passed via dependency injection
//! 4. **Env File Priority**: `.env` file > environment variables > error
//!
//! # Usage
//!
//! ```ignore
//! use launcher_shared::config::ConfigLoader;
//! use std::path::PathBuf;
//!
//! let loader = ConfigLoader::new(Some(PathBuf::from(".env")));
//! let config = loader.load_launcher_config()?;
//! println!("Pods go to namespace: {}", config.kubernetes.namespace);
//! ```
//!
//! # Environment Variables
//!
//! ## Required Variables
//!
//! - `LAUNCHER_ORCHESTRATOR_IMAGE`: replication orchestrator image
//! - `LAUNCHER_SIDECAR_IMAGE`: connector sidecar image
//! - `LAUNCHER_INIT_IMAGE`: workload init container image
//!
//! ## Optional Variables
//!
//! - `LAUNCHER_K8S_NAMESPACE`: namespace for pods (default: "default")
//! - `LAUNCHER_<GROUP>_NODE_SELECTORS`: `k=v,k=v` per worker group
//! - `LAUNCHER_FULL_POD_TIMEOUT_SECS`: connector full pod timeout (default: 360)
//! - `LAUNCHER_FEATURE_FLAGS`: static flag values `key=value,...`
//! - `RUST_LOG`: log level (default: "info")

pub mod dto;
pub mod error;
pub mod loader;
pub mod validator;

pub use dto::{
    FeatureFlagConfig, FlagContextDto, ImageConfig, KubernetesSettings, LauncherConfigDto,
    LogFormat, LoggingConfig, TimeoutConfig, WorkerGroupConfig, WorkerGroupsConfig,
};
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, parse_key_value_list};
pub use validator::{validate_group_config, validate_launcher_config, validate_timeouts};
