// Fakes y fixtures compartidos por los tests del módulo launch

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use launcher_server_domain::launcher::{
    BoolFlag, FeatureFlagClient, FlagScope, IntFlag, Labels, PodLabeler, PodLauncher,
    PodLauncherError, PodNameGenerator, RuntimeEnvVarFactory, StringFlag,
};
use launcher_server_domain::pods::{
    EnvVar, LabelSelector, PodHandle, PodSpecification, PodTarget, ResourceRequirements,
};
use launcher_server_domain::workloads::{
    ActorType, CheckConnectionInput, DiscoverCatalogInput, IntegrationLauncherConfig,
    JobRunConfig, ReplicationInput, SpecInput, SyncResourceRequirements, WorkloadPayload,
    WorkloadPriority, WorkloadRequest,
};
use launcher_shared::config::WorkerGroupConfig;
use uuid::Uuid;

use super::spec_builder::{SpecBuilder, SpecBuilderConfig};

pub fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// ============================================================================
// Feature flags
// ============================================================================

#[derive(Debug, Default)]
pub struct StubFlags {
    bools: HashMap<&'static str, bool>,
    ints: HashMap<&'static str, i64>,
    strings: HashMap<&'static str, String>,
    evaluations: AtomicUsize,
}

impl StubFlags {
    pub fn with_bool(mut self, key: &'static str, value: bool) -> Self {
        self.bools.insert(key, value);
        self
    }

    pub fn with_int(mut self, key: &'static str, value: i64) -> Self {
        self.ints.insert(key, value);
        self
    }

    pub fn with_string(mut self, key: &'static str, value: &str) -> Self {
        self.strings.insert(key, value.to_string());
        self
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }
}

impl FeatureFlagClient for StubFlags {
    fn bool_variation(&self, flag: &BoolFlag, _scope: &FlagScope) -> bool {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        self.bools.get(flag.key).copied().unwrap_or(flag.default)
    }

    fn int_variation(&self, flag: &IntFlag, _scope: &FlagScope) -> i64 {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        self.ints.get(flag.key).copied().unwrap_or(flag.default)
    }

    fn string_variation(&self, flag: &StringFlag, _scope: &FlagScope) -> String {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        self.strings
            .get(flag.key)
            .cloned()
            .unwrap_or_else(|| flag.default.to_string())
    }
}

// ============================================================================
// Label / name / env policies
// ============================================================================

pub struct FakeLabeler;

impl FakeLabeler {
    pub const WORKLOAD_ID_KEY: &'static str = "workload_id";

    fn role(role: &str) -> Labels {
        labels(&[("role", role)])
    }
}

impl PodLabeler for FakeLabeler {
    fn get_shared_labels(
        &self,
        workload_id: Option<&str>,
        mutex_key: Option<&str>,
        passthrough: &Labels,
        auto_id: Option<Uuid>,
    ) -> Labels {
        let mut shared = passthrough.clone();
        if let Some(id) = workload_id {
            shared.insert(Self::WORKLOAD_ID_KEY.to_string(), id.to_string());
        }
        if let Some(key) = mutex_key {
            shared.extend(self.get_mutex_labels(key));
        }
        if let Some(id) = auto_id {
            shared.extend(self.get_auto_id_labels(id));
        }
        shared
    }

    fn get_mutex_labels(&self, mutex_key: &str) -> Labels {
        labels(&[("mutex_key", mutex_key)])
    }

    fn get_auto_id_labels(&self, auto_id: Uuid) -> Labels {
        labels(&[("auto_id", &auto_id.to_string())])
    }

    fn get_orchestrator_labels(&self) -> Labels {
        Self::role("orchestrator")
    }

    fn get_source_labels(&self) -> Labels {
        Self::role("source")
    }

    fn get_destination_labels(&self) -> Labels {
        Self::role("destination")
    }

    fn get_replication_labels(
        &self,
        orchestrator_image: &str,
        source_image: &str,
        destination_image: &str,
    ) -> Labels {
        let mut labels = Self::role("replication");
        labels.insert(
            "images".to_string(),
            format!("{}|{}|{}", orchestrator_image, source_image, destination_image),
        );
        labels
    }

    fn get_check_labels(&self, _image: &str) -> Labels {
        Self::role("check")
    }

    fn get_discover_labels(&self, _image: &str) -> Labels {
        Self::role("discover")
    }

    fn get_spec_labels(&self, _image: &str) -> Labels {
        Self::role("spec")
    }
}

pub struct FakeNames;

fn image_slug(image: &str) -> String {
    image.replace([':', '.', '/'], "-")
}

impl PodNameGenerator for FakeNames {
    fn orchestrator_pod_name(&self, job_id: &str, attempt_id: i64) -> String {
        format!("orchestrator-repl-job-{}-attempt-{}", job_id, attempt_id)
    }

    fn replication_pod_name(&self, job_id: &str, attempt_id: i64) -> String {
        format!("replication-job-{}-attempt-{}", job_id, attempt_id)
    }

    fn check_pod_name(&self, image: &str, job_id: &str, attempt_id: i64) -> String {
        format!("check-{}-{}-{}", image_slug(image), job_id, attempt_id)
    }

    fn discover_pod_name(&self, image: &str, job_id: &str, attempt_id: i64) -> String {
        format!("discover-{}-{}-{}", image_slug(image), job_id, attempt_id)
    }

    fn spec_pod_name(&self, image: &str, job_id: &str, attempt_id: i64) -> String {
        format!("spec-{}-{}-{}", image_slug(image), job_id, attempt_id)
    }
}

pub struct FakeEnvFactory;

impl FakeEnvFactory {
    pub const ORCHESTRATOR_VAR: &'static str = "ORCHESTRATOR_RUNTIME";
    pub const CONNECTOR_VAR: &'static str = "CONNECTOR_IMAGE";
    pub const CHECK_VAR: &'static str = "CHECK_RUNTIME";
}

impl RuntimeEnvVarFactory for FakeEnvFactory {
    fn orchestrator_env_vars(&self, _input: &ReplicationInput, _workload_id: &str) -> Vec<EnvVar> {
        vec![EnvVar::new(Self::ORCHESTRATOR_VAR, "orchestrator")]
    }

    fn replication_connector_env_vars(&self, config: &IntegrationLauncherConfig) -> Vec<EnvVar> {
        vec![EnvVar::new(Self::CONNECTOR_VAR, config.docker_image.clone())]
    }

    fn check_connector_env_vars(
        &self,
        _config: &IntegrationLauncherConfig,
        _workload_id: &str,
    ) -> Vec<EnvVar> {
        vec![EnvVar::new(Self::CHECK_VAR, "check")]
    }

    fn discover_connector_env_vars(
        &self,
        _config: &IntegrationLauncherConfig,
        _workload_id: &str,
    ) -> Vec<EnvVar> {
        vec![EnvVar::new("DISCOVER_RUNTIME", "discover")]
    }

    fn spec_connector_env_vars(
        &self,
        _config: &IntegrationLauncherConfig,
        _workload_id: &str,
    ) -> Vec<EnvVar> {
        vec![EnvVar::new("SPEC_RUNTIME", "spec")]
    }
}

fn group(pool: &str, isolated: Option<&str>) -> WorkerGroupConfig {
    WorkerGroupConfig {
        node_selectors: labels(&[("pool", pool)]),
        isolated_node_selectors: isolated.map(|p| labels(&[("pool", p)])),
        annotations: labels(&[("owner", pool)]),
    }
}

pub fn spec_builder_config() -> SpecBuilderConfig {
    SpecBuilderConfig {
        orchestrator_image: "orchestrator:1.0".to_string(),
        sidecar_image: "sidecar:1.0".to_string(),
        image_pull_policy: "IfNotPresent".to_string(),
        replication: group("replication", Some("replication-isolated")),
        check: group("check", Some("check-isolated")),
        discover: group("discover", None),
        spec: group("spec", Some("spec-isolated")),
    }
}

pub fn spec_builder() -> SpecBuilder {
    SpecBuilder::new(
        spec_builder_config(),
        Arc::new(FakeLabeler),
        Arc::new(FakeNames),
        Arc::new(FakeEnvFactory),
    )
}

// ============================================================================
// Requests
// ============================================================================

fn launcher_config(image: &str, custom: bool) -> IntegrationLauncherConfig {
    IntegrationLauncherConfig {
        job_id: "415".to_string(),
        attempt_id: 7,
        workspace_id: Uuid::nil(),
        connection_id: None,
        docker_image: image.to_string(),
        is_custom_connector: custom,
        additional_environment: BTreeMap::new(),
    }
}

pub fn replication_input(is_reset: bool) -> ReplicationInput {
    ReplicationInput {
        workspace_id: Uuid::new_v4(),
        connection_id: Uuid::new_v4(),
        job_run_config: JobRunConfig::new("415", 7),
        is_reset,
        source_launcher_config: launcher_config("source-faker:1.0", false),
        destination_launcher_config: launcher_config("destination-e2e:1.0", false),
        sync_resource_requirements: SyncResourceRequirements::default(),
    }
}

fn request(payload: WorkloadPayload) -> WorkloadRequest {
    WorkloadRequest {
        workload_id: "415_7_sync_0123456789abcdef".to_string(),
        mutex_key: Some("m1".to_string()),
        labels: labels(&[("team", "data")]),
        auto_id: Some(Uuid::new_v4()),
        log_path: "/workspace/415/7/logs.log".to_string(),
        priority: WorkloadPriority::Default,
        payload,
    }
}

pub fn replication_request(is_reset: bool) -> WorkloadRequest {
    let mut input = replication_input(is_reset);
    input.sync_resource_requirements.source = Some(ResourceRequirements {
        cpu_request: Some("500m".to_string()),
        ..Default::default()
    });
    request(WorkloadPayload::Replication(input))
}

pub fn check_request(priority: WorkloadPriority, custom: bool) -> WorkloadRequest {
    let mut request = request(WorkloadPayload::Check(CheckConnectionInput {
        job_run_config: JobRunConfig::new("415", 7),
        launcher_config: launcher_config("source-faker:1.0", custom),
        actor_type: ActorType::Source,
        connection_configuration: serde_json::json!({ "api_key": "secret" }),
    }));
    request.priority = priority;
    request
}

pub fn discover_request(priority: WorkloadPriority, custom: bool) -> WorkloadRequest {
    let mut request = request(WorkloadPayload::Discover(DiscoverCatalogInput {
        job_run_config: JobRunConfig::new("415", 7),
        launcher_config: launcher_config("source-faker:1.0", custom),
        connection_configuration: serde_json::json!({ "host": "db" }),
        source_id: Some("source-1".to_string()),
        config_hash: None,
    }));
    request.priority = priority;
    request
}

pub fn spec_request() -> WorkloadRequest {
    request(WorkloadPayload::Spec(SpecInput {
        job_run_config: JobRunConfig::new("415", 7),
        launcher_config: launcher_config("source-faker:1.0", false),
    }))
}

// ============================================================================
// Pod launcher
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(String),
    DeleteActive(LabelSelector),
    PodsRunning(LabelSelector),
    WaitInitComplete(String, Duration),
    WaitInitStartup(String, Duration),
    WaitReady(PodTarget, Duration),
    Copy(String, Vec<String>),
}

/// Records every call; `fail_when` picks the call that errors out
#[derive(Default)]
pub struct ScriptedPodLauncher {
    calls: Mutex<Vec<Call>>,
    fail_when: Option<fn(&Call) -> bool>,
    running: bool,
    deleted: Vec<PodHandle>,
}

impl ScriptedPodLauncher {
    pub fn failing_when(predicate: fn(&Call) -> bool) -> Self {
        Self {
            fail_when: Some(predicate),
            ..Default::default()
        }
    }

    pub fn with_running(mut self, running: bool) -> Self {
        self.running = running;
        self
    }

    pub fn with_deleted(mut self, names: &[&str]) -> Self {
        self.deleted = names
            .iter()
            .map(|name| PodHandle {
                name: name.to_string(),
                namespace: "jobs".to_string(),
                uid: None,
            })
            .collect();
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) -> Result<(), PodLauncherError> {
        let fail = self.fail_when.is_some_and(|predicate| predicate(&call));
        let error = match &call {
            Call::WaitInitComplete(..) | Call::WaitInitStartup(..) | Call::WaitReady(..) => {
                PodLauncherError::Timeout {
                    condition: "scripted".to_string(),
                    target: format!("{:?}", call),
                    timeout: Duration::from_secs(1),
                }
            }
            _ => PodLauncherError::api("scripted failure"),
        };
        self.calls.lock().unwrap().push(call);
        if fail { Err(error) } else { Ok(()) }
    }
}

#[async_trait]
impl PodLauncher for ScriptedPodLauncher {
    async fn create(&self, spec: &PodSpecification) -> Result<PodHandle, PodLauncherError> {
        self.record(Call::Create(spec.name.clone()))?;
        Ok(PodHandle {
            name: spec.name.clone(),
            namespace: "jobs".to_string(),
            uid: Some(Uuid::new_v4().to_string()),
        })
    }

    async fn delete_active_pods(
        &self,
        selector: &LabelSelector,
    ) -> Result<Vec<PodHandle>, PodLauncherError> {
        self.record(Call::DeleteActive(selector.clone()))?;
        Ok(self.deleted.clone())
    }

    async fn pods_running(&self, selector: &LabelSelector) -> Result<bool, PodLauncherError> {
        self.record(Call::PodsRunning(selector.clone()))?;
        Ok(self.running)
    }

    async fn wait_for_init_complete(
        &self,
        pod: &PodHandle,
        timeout: Duration,
    ) -> Result<(), PodLauncherError> {
        self.record(Call::WaitInitComplete(pod.name.clone(), timeout))
    }

    async fn wait_for_init_startup(
        &self,
        pod: &PodHandle,
        timeout: Duration,
    ) -> Result<(), PodLauncherError> {
        self.record(Call::WaitInitStartup(pod.name.clone(), timeout))
    }

    async fn wait_for_ready_or_terminal(
        &self,
        target: &PodTarget,
        timeout: Duration,
    ) -> Result<(), PodLauncherError> {
        self.record(Call::WaitReady(target.clone(), timeout))
    }

    async fn copy_files(
        &self,
        pod: &PodHandle,
        files: &BTreeMap<String, String>,
    ) -> Result<(), PodLauncherError> {
        self.record(Call::Copy(pod.name.clone(), files.keys().cloned().collect()))
    }
}
