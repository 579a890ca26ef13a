// Payloads de cada tipo de workload

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::pods::ResourceRequirements;

/// Identifica el job y el intento al que pertenece un workload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRunConfig {
    pub job_id: String,
    pub attempt_id: i64,
}

impl JobRunConfig {
    pub fn new(job_id: impl Into<String>, attempt_id: i64) -> Self {
        Self {
            job_id: job_id.into(),
            attempt_id,
        }
    }
}

/// Configuración de lanzamiento de un conector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationLauncherConfig {
    pub job_id: String,
    pub attempt_id: i64,
    pub workspace_id: Uuid,
    #[serde(default)]
    pub connection_id: Option<Uuid>,
    pub docker_image: String,
    /// Non-certified connector image
    #[serde(default)]
    pub is_custom_connector: bool,
    #[serde(default)]
    pub additional_environment: BTreeMap<String, String>,
}

/// Resource requirements per replication role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResourceRequirements {
    #[serde(default)]
    pub orchestrator: Option<ResourceRequirements>,
    #[serde(default)]
    pub source: Option<ResourceRequirements>,
    #[serde(default)]
    pub destination: Option<ResourceRequirements>,
}

/// Input de una replicación (sync o reset)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationInput {
    pub workspace_id: Uuid,
    pub connection_id: Uuid,
    pub job_run_config: JobRunConfig,
    #[serde(default)]
    pub is_reset: bool,
    pub source_launcher_config: IntegrationLauncherConfig,
    pub destination_launcher_config: IntegrationLauncherConfig,
    #[serde(default)]
    pub sync_resource_requirements: SyncResourceRequirements,
}

impl ReplicationInput {
    pub fn uses_custom_connector(&self) -> bool {
        self.source_launcher_config.is_custom_connector
            || self.destination_launcher_config.is_custom_connector
    }

    pub fn orchestrator_resource_reqs(&self) -> Option<&ResourceRequirements> {
        self.sync_resource_requirements.orchestrator.as_ref()
    }

    pub fn source_resource_reqs(&self) -> Option<&ResourceRequirements> {
        self.sync_resource_requirements.source.as_ref()
    }

    pub fn destination_resource_reqs(&self) -> Option<&ResourceRequirements> {
        self.sync_resource_requirements.destination.as_ref()
    }
}

/// Lado del conector que se valida en un check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorType {
    Source,
    Destination,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckConnectionInput {
    pub job_run_config: JobRunConfig,
    pub launcher_config: IntegrationLauncherConfig,
    pub actor_type: ActorType,
    pub connection_configuration: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverCatalogInput {
    pub job_run_config: JobRunConfig,
    pub launcher_config: IntegrationLauncherConfig,
    pub connection_configuration: serde_json::Value,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub config_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecInput {
    pub job_run_config: JobRunConfig,
    pub launcher_config: IntegrationLauncherConfig,
}

/// Operación que ejecuta el sidecar de un pod de conector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SidecarOperationType {
    Check,
    Discover,
    Spec,
}

/// Documento que lee el sidecar del pod de conector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidecarInput {
    pub check_connection_input: Option<CheckConnectionInput>,
    pub discover_catalog_input: Option<DiscoverCatalogInput>,
    pub workload_id: String,
    pub integration_launcher_config: IntegrationLauncherConfig,
    pub operation_type: SidecarOperationType,
    pub log_path: String,
}
