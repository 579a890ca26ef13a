//! Configuration Data Transfer Objects (DTOs)
//!
//! Immutable configuration DTOs used throughout the launcher. They are loaded
//! once at startup and handed to the services that need them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Launcher Configuration DTOs
// ============================================================================

/// Configuration DTO for the workload launcher
///
/// # Example
///
/// ```ignore
/// use launcher_shared::config::LauncherConfigDto;
///
/// let config = LauncherConfigDto::from_env()?;
/// println!("Orchestrator image: {}", config.images.orchestrator_image);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LauncherConfigDto {
    /// Cluster connection settings
    pub kubernetes: KubernetesSettings,

    /// Images used by the pods the launcher builds
    pub images: ImageConfig,

    /// Placement and annotation policy per worker group
    pub groups: WorkerGroupsConfig,

    /// Per-phase wait budgets
    pub timeouts: TimeoutConfig,

    /// Static feature flag values and ambient flag contexts
    pub flags: FeatureFlagConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Kubernetes connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KubernetesSettings {
    /// Namespace where pods are created
    pub namespace: String,

    /// Path to kubeconfig file (None = in-cluster / inferred config)
    pub kubeconfig_path: Option<PathBuf>,

    /// Kubeconfig context to use (None = current-context)
    pub context: Option<String>,

    /// Service account for launched pods
    pub service_account: Option<String>,

    /// Image pull secrets for private registries
    pub image_pull_secrets: Vec<String>,
}

/// Images for the launcher-owned containers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Replication orchestrator image
    pub orchestrator_image: String,

    /// Connector sidecar image (check/discover/spec pods)
    pub sidecar_image: String,

    /// Init container image
    pub init_image: String,

    /// Image pull policy for every container
    pub pull_policy: String,
}

/// Placement policy for one group of pods
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerGroupConfig {
    /// Normal node selectors
    pub node_selectors: BTreeMap<String, String>,

    /// Node selectors for non-certified (custom) connector images
    pub isolated_node_selectors: Option<BTreeMap<String, String>>,

    /// Annotations applied to every pod of the group
    pub annotations: BTreeMap<String, String>,
}

/// All the worker groups known to the launcher
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerGroupsConfig {
    pub replication: WorkerGroupConfig,
    pub check: WorkerGroupConfig,
    pub discover: WorkerGroupConfig,
    pub spec: WorkerGroupConfig,
}

/// Per-phase timeout budgets (seconds)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Orchestrator main container ready-or-terminal
    /// Default: 120
    pub orchestrator_startup_secs: u64,

    /// Init containers complete / start
    /// Default: 900
    pub pod_init_secs: u64,

    /// Full pod timeout for connector containers
    /// Default: 360
    pub full_pod_secs: u64,

    /// Slack added to the full pod timeout to absorb clock skew
    /// Default: 5
    pub slack_secs: u64,
}

impl TimeoutConfig {
    pub fn orchestrator_startup(&self) -> Duration {
        Duration::from_secs(self.orchestrator_startup_secs)
    }

    pub fn pod_init(&self) -> Duration {
        Duration::from_secs(self.pod_init_secs)
    }

    /// Full pod timeout plus the fixed slack
    pub fn connector_startup(&self) -> Duration {
        Duration::from_secs(self.full_pod_secs + self.slack_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            orchestrator_startup_secs: 120,
            pod_init_secs: 900,
            full_pod_secs: 360,
            slack_secs: 5,
        }
    }
}

/// One ambient feature flag context, e.g. `dataplane=us-east`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagContextDto {
    pub kind: String,
    pub key: String,
}

/// Static feature flag configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureFlagConfig {
    /// Raw flag values keyed by flag key
    pub values: BTreeMap<String, String>,

    /// Contexts appended to every flag evaluation scope
    pub contexts: Vec<FlagContextDto>,
}

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFormat {
    Text,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level / filter directive (trace, debug, info, warn, error)
    pub level: String,

    /// Line format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}
