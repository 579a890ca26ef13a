//! Workloads Bounded Context
//!
//! Describe una unidad de trabajo a lanzar en el cluster: sync/reset completo
//! o una operación de conector (check/discover/spec).

pub mod payloads;

pub use payloads::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Tipo de workload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkloadKind {
    Sync,
    Reset,
    Check,
    Discover,
    Spec,
}

impl WorkloadKind {
    /// Sync and reset run the replication pods; the rest run a connector pod.
    pub fn is_replication(&self) -> bool {
        matches!(self, Self::Sync | Self::Reset)
    }

    /// Name used in log lines and error messages ("check", "discover", ...)
    pub fn operation_name(&self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Reset => "reset",
            Self::Check => "check",
            Self::Discover => "discover",
            Self::Spec => "spec",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync => write!(f, "SYNC"),
            Self::Reset => write!(f, "RESET"),
            Self::Check => write!(f, "CHECK"),
            Self::Discover => write!(f, "DISCOVER"),
            Self::Spec => write!(f, "SPEC"),
        }
    }
}

/// Prioridad del workload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkloadPriority {
    #[default]
    Default,
    High,
}

/// Descripción inmutable de un workload
///
/// One request is built per launch call; nothing here is mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadRequest {
    /// Opaque id, may be too long to use as a label value
    pub workload_id: String,
    /// Workloads sharing a mutex key are mutually exclusive on the cluster
    #[serde(default)]
    pub mutex_key: Option<String>,
    /// Pass-through labels added to every pod
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Idempotency / duplicate-launch detection id
    #[serde(default)]
    pub auto_id: Option<Uuid>,
    pub log_path: String,
    #[serde(default)]
    pub priority: WorkloadPriority,
    pub payload: WorkloadPayload,
}

impl WorkloadRequest {
    pub fn kind(&self) -> WorkloadKind {
        self.payload.kind()
    }

    /// Whether any connector image of the request is non-certified
    pub fn uses_custom_connector(&self) -> bool {
        self.payload.uses_custom_connector()
    }

    pub fn workspace_id(&self) -> Uuid {
        self.payload.workspace_id()
    }

    pub fn connection_id(&self) -> Option<Uuid> {
        self.payload.connection_id()
    }

    pub fn job_run_config(&self) -> &JobRunConfig {
        self.payload.job_run_config()
    }
}

/// Contenido específico de cada tipo de workload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "input", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkloadPayload {
    Replication(ReplicationInput),
    Check(CheckConnectionInput),
    Discover(DiscoverCatalogInput),
    Spec(SpecInput),
}

impl WorkloadPayload {
    pub fn kind(&self) -> WorkloadKind {
        match self {
            Self::Replication(input) if input.is_reset => WorkloadKind::Reset,
            Self::Replication(_) => WorkloadKind::Sync,
            Self::Check(_) => WorkloadKind::Check,
            Self::Discover(_) => WorkloadKind::Discover,
            Self::Spec(_) => WorkloadKind::Spec,
        }
    }

    pub fn uses_custom_connector(&self) -> bool {
        match self {
            Self::Replication(input) => input.uses_custom_connector(),
            Self::Check(input) => input.launcher_config.is_custom_connector,
            Self::Discover(input) => input.launcher_config.is_custom_connector,
            Self::Spec(input) => input.launcher_config.is_custom_connector,
        }
    }

    pub fn workspace_id(&self) -> Uuid {
        match self {
            Self::Replication(input) => input.workspace_id,
            Self::Check(input) => input.launcher_config.workspace_id,
            Self::Discover(input) => input.launcher_config.workspace_id,
            Self::Spec(input) => input.launcher_config.workspace_id,
        }
    }

    pub fn connection_id(&self) -> Option<Uuid> {
        match self {
            Self::Replication(input) => Some(input.connection_id),
            Self::Check(input) => input.launcher_config.connection_id,
            Self::Discover(input) => input.launcher_config.connection_id,
            Self::Spec(input) => input.launcher_config.connection_id,
        }
    }

    pub fn job_run_config(&self) -> &JobRunConfig {
        match self {
            Self::Replication(input) => &input.job_run_config,
            Self::Check(input) => &input.job_run_config,
            Self::Discover(input) => &input.job_run_config,
            Self::Spec(input) => &input.job_run_config,
        }
    }
}
