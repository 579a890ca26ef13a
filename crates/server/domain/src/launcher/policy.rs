// Políticas externas: etiquetas, nombres de pod y variables de entorno
//
// The launcher treats the values produced here as opaque strings.

use std::collections::BTreeMap;
use uuid::Uuid;

use crate::pods::EnvVar;
use crate::workloads::{IntegrationLauncherConfig, ReplicationInput};

/// Names of the base environment markers
pub mod env_names {
    pub const OPERATION_TYPE: &str = "OPERATION_TYPE";
    pub const WORKLOAD_ID: &str = "WORKLOAD_ID";
    pub const JOB_ID: &str = "JOB_ID";
    pub const ATTEMPT_ID: &str = "ATTEMPT_ID";
    pub const MONO_POD: &str = "MONO_POD";
    /// JSON label map the orchestrator stamps on the source pod it starts
    pub const SOURCE_LABELS: &str = "SOURCE_LABELS";
    /// JSON label map the orchestrator stamps on the destination pod it starts
    pub const DESTINATION_LABELS: &str = "DESTINATION_LABELS";
}

pub type Labels = BTreeMap<String, String>;

/// Label naming policy
pub trait PodLabeler: Send + Sync {
    /// Labels every pod of a launch carries. `workload_id` is omitted for
    /// connector pods.
    fn get_shared_labels(
        &self,
        workload_id: Option<&str>,
        mutex_key: Option<&str>,
        passthrough: &Labels,
        auto_id: Option<Uuid>,
    ) -> Labels;

    fn get_mutex_labels(&self, mutex_key: &str) -> Labels;

    fn get_auto_id_labels(&self, auto_id: Uuid) -> Labels;

    fn get_orchestrator_labels(&self) -> Labels;

    fn get_source_labels(&self) -> Labels;

    fn get_destination_labels(&self) -> Labels;

    fn get_replication_labels(
        &self,
        orchestrator_image: &str,
        source_image: &str,
        destination_image: &str,
    ) -> Labels;

    fn get_check_labels(&self, image: &str) -> Labels;

    fn get_discover_labels(&self, image: &str) -> Labels;

    fn get_spec_labels(&self, image: &str) -> Labels;
}

/// Pod name generation
pub trait PodNameGenerator: Send + Sync {
    fn orchestrator_pod_name(&self, job_id: &str, attempt_id: i64) -> String;

    fn replication_pod_name(&self, job_id: &str, attempt_id: i64) -> String;

    fn check_pod_name(&self, image: &str, job_id: &str, attempt_id: i64) -> String;

    fn discover_pod_name(&self, image: &str, job_id: &str, attempt_id: i64) -> String;

    fn spec_pod_name(&self, image: &str, job_id: &str, attempt_id: i64) -> String;
}

/// Role-specific runtime variables appended after the base markers
pub trait RuntimeEnvVarFactory: Send + Sync {
    fn orchestrator_env_vars(&self, input: &ReplicationInput, workload_id: &str) -> Vec<EnvVar>;

    fn replication_connector_env_vars(&self, config: &IntegrationLauncherConfig) -> Vec<EnvVar>;

    fn check_connector_env_vars(
        &self,
        config: &IntegrationLauncherConfig,
        workload_id: &str,
    ) -> Vec<EnvVar>;

    fn discover_connector_env_vars(
        &self,
        config: &IntegrationLauncherConfig,
        workload_id: &str,
    ) -> Vec<EnvVar>;

    fn spec_connector_env_vars(
        &self,
        config: &IntegrationLauncherConfig,
        workload_id: &str,
    ) -> Vec<EnvVar>;
}
