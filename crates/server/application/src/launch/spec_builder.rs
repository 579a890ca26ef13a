//! Spec Builder
//!
//! Translates a [`WorkloadRequest`] into concrete pod specifications. Pure: the
//! labeling, naming and runtime env policies are injected, and no cluster I/O
//! happens here.

use std::collections::BTreeMap;
use std::sync::Arc;

use launcher_server_domain::launcher::{
    Labels, PodLabeler, PodNameGenerator, RuntimeEnvVarFactory, env_names,
};
use launcher_server_domain::pods::{
    ContainerSpec, EnvVar, InitStrategy, LabelSelector, PodSpecification, PodType,
    ResourceRequirements, Topology, files,
};
use launcher_server_domain::shared_kernel::SpecBuildError;
use launcher_server_domain::workloads::{
    CheckConnectionInput, DiscoverCatalogInput, IntegrationLauncherConfig, JobRunConfig,
    ReplicationInput, SidecarInput, SidecarOperationType, SpecInput, WorkloadKind,
    WorkloadPayload, WorkloadPriority, WorkloadRequest,
};
use launcher_shared::config::WorkerGroupConfig;
use serde::Serialize;

use super::flags::LaunchFlags;

pub const ORCHESTRATOR_CONTAINER: &str = "orchestrator";
pub const SOURCE_CONTAINER: &str = "source";
pub const DESTINATION_CONTAINER: &str = "destination";
pub const MAIN_CONTAINER: &str = "main";
pub const SIDECAR_CONTAINER: &str = "connector-sidecar";

/// Images and per-group placement policy
#[derive(Debug, Clone)]
pub struct SpecBuilderConfig {
    pub orchestrator_image: String,
    pub sidecar_image: String,
    pub image_pull_policy: String,
    pub replication: WorkerGroupConfig,
    pub check: WorkerGroupConfig,
    pub discover: WorkerGroupConfig,
    pub spec: WorkerGroupConfig,
}

impl SpecBuilderConfig {
    pub fn new(orchestrator_image: impl Into<String>, sidecar_image: impl Into<String>) -> Self {
        Self {
            orchestrator_image: orchestrator_image.into(),
            sidecar_image: sidecar_image.into(),
            image_pull_policy: "IfNotPresent".to_string(),
            replication: WorkerGroupConfig::default(),
            check: WorkerGroupConfig::default(),
            discover: WorkerGroupConfig::default(),
            spec: WorkerGroupConfig::default(),
        }
    }
}

/// Pods to create for a sync / reset workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchPlan {
    /// The orchestrator pod plus the selectors of the connector pods it
    /// creates itself
    Triplet {
        orchestrator: PodSpecification,
        source: LabelSelector,
        destination: LabelSelector,
    },
    Mono { pod: PodSpecification },
}

impl LaunchPlan {
    pub fn topology(&self) -> Topology {
        match self {
            Self::Triplet { .. } => Topology::Triplet,
            Self::Mono { .. } => Topology::Mono,
        }
    }

    /// The single pod the launcher creates itself
    pub fn primary(&self) -> &PodSpecification {
        match self {
            Self::Triplet { orchestrator, .. } => orchestrator,
            Self::Mono { pod } => pod,
        }
    }
}

enum ConnectorPayload<'a> {
    Check(&'a CheckConnectionInput),
    Discover(&'a DiscoverCatalogInput),
    Spec(&'a SpecInput),
}

/// Everything that differs between check, discover and spec pods
struct ConnectorCapability<'a> {
    kind: WorkloadKind,
    launcher_config: &'a IntegrationLauncherConfig,
    job_run_config: &'a JobRunConfig,
    group: &'a WorkerGroupConfig,
    role_labels: Labels,
    pod_name: String,
    runtime_env: Vec<EnvVar>,
    payload: ConnectorPayload<'a>,
}

impl ConnectorPayload<'_> {
    fn sidecar_input(
        &self,
        request: &WorkloadRequest,
        launcher_config: &IntegrationLauncherConfig,
    ) -> SidecarInput {
        let (check, discover, operation_type) = match self {
            Self::Check(input) => (Some((*input).clone()), None, SidecarOperationType::Check),
            Self::Discover(input) => (None, Some((*input).clone()), SidecarOperationType::Discover),
            Self::Spec(_) => (None, None, SidecarOperationType::Spec),
        };

        SidecarInput {
            check_connection_input: check,
            discover_catalog_input: discover,
            workload_id: request.workload_id.clone(),
            integration_launcher_config: launcher_config.clone(),
            operation_type,
            log_path: request.log_path.clone(),
        }
    }

    /// Well-known files copied into the pod under the copy strategy
    fn file_map(
        &self,
        request: &WorkloadRequest,
        launcher_config: &IntegrationLauncherConfig,
    ) -> Result<BTreeMap<String, String>, SpecBuildError> {
        let mut file_map = BTreeMap::new();

        let connection_configuration = match self {
            Self::Check(input) => Some(&input.connection_configuration),
            Self::Discover(input) => Some(&input.connection_configuration),
            Self::Spec(_) => None,
        };
        if let Some(config) = connection_configuration {
            file_map.insert(
                files::CONNECTION_CONFIGURATION.to_string(),
                serialize(files::CONNECTION_CONFIGURATION, config)?,
            );
        }

        file_map.insert(
            files::SIDECAR_INPUT.to_string(),
            serialize(
                files::SIDECAR_INPUT,
                &self.sidecar_input(request, launcher_config),
            )?,
        );

        Ok(file_map)
    }
}

fn serialize<T: Serialize>(file: &str, value: &T) -> Result<String, SpecBuildError> {
    serde_json::to_string(value).map_err(|source| SpecBuildError::Serialization {
        file: file.to_string(),
        source,
    })
}

/// Role labels extended by the shared labels; shared values win.
pub fn merge_labels(role: Labels, shared: &Labels) -> Labels {
    let mut labels = role;
    labels.extend(shared.iter().map(|(k, v)| (k.clone(), v.clone())));
    labels
}

/// Operation marker, workload id, job id and attempt id, in that order
pub fn base_env(kind: WorkloadKind, workload_id: &str, job_run_config: &JobRunConfig) -> Vec<EnvVar> {
    vec![
        EnvVar::new(env_names::OPERATION_TYPE, kind.to_string()),
        EnvVar::new(env_names::WORKLOAD_ID, workload_id),
        EnvVar::new(env_names::JOB_ID, job_run_config.job_id.clone()),
        EnvVar::new(env_names::ATTEMPT_ID, job_run_config.attempt_id.to_string()),
    ]
}

pub struct SpecBuilder {
    config: SpecBuilderConfig,
    labeler: Arc<dyn PodLabeler>,
    names: Arc<dyn PodNameGenerator>,
    env_factory: Arc<dyn RuntimeEnvVarFactory>,
}

impl std::fmt::Debug for SpecBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl SpecBuilder {
    pub fn new(
        config: SpecBuilderConfig,
        labeler: Arc<dyn PodLabeler>,
        names: Arc<dyn PodNameGenerator>,
        env_factory: Arc<dyn RuntimeEnvVarFactory>,
    ) -> Self {
        Self {
            config,
            labeler,
            names,
            env_factory,
        }
    }

    /// Labels every pod of the launch carries. Connector pods omit the
    /// workload id.
    pub fn shared_labels(&self, request: &WorkloadRequest) -> Labels {
        let workload_id = request
            .kind()
            .is_replication()
            .then_some(request.workload_id.as_str());

        self.labeler.get_shared_labels(
            workload_id,
            request.mutex_key.as_deref(),
            &request.labels,
            request.auto_id,
        )
    }

    /// Node selector routing for one pod group
    pub fn node_selectors(
        &self,
        group: &WorkerGroupConfig,
        kind: WorkloadKind,
        priority: WorkloadPriority,
        custom_connector: bool,
    ) -> BTreeMap<String, String> {
        if custom_connector {
            return group
                .isolated_node_selectors
                .clone()
                .unwrap_or_else(|| group.node_selectors.clone());
        }

        match kind {
            WorkloadKind::Check | WorkloadKind::Discover
                if priority == WorkloadPriority::Default =>
            {
                self.config.replication.node_selectors.clone()
            }
            _ => group.node_selectors.clone(),
        }
    }

    pub fn build_replication_plan(
        &self,
        request: &WorkloadRequest,
        input: &ReplicationInput,
        topology: Topology,
        flags: &LaunchFlags,
    ) -> Result<LaunchPlan, SpecBuildError> {
        let kind = request.kind();
        let job = &input.job_run_config;
        let shared = self.shared_labels(request);
        let group = &self.config.replication;
        let node_selectors =
            self.node_selectors(group, kind, request.priority, input.uses_custom_connector());
        let orchestrator_image = flags
            .orchestrator_dev_image
            .clone()
            .unwrap_or_else(|| self.config.orchestrator_image.clone());

        let mut orchestrator_env = base_env(kind, &request.workload_id, job);
        orchestrator_env.extend(
            self.env_factory
                .orchestrator_env_vars(input, &request.workload_id),
        );

        let orchestrator_container = ContainerSpec {
            name: ORCHESTRATOR_CONTAINER.to_string(),
            image: orchestrator_image.clone(),
            image_pull_policy: self.config.image_pull_policy.clone(),
            resources: input.orchestrator_resource_reqs().cloned(),
            env: orchestrator_env,
        };

        match topology {
            Topology::Triplet => {
                let source_labels = merge_labels(self.labeler.get_source_labels(), &shared);
                let destination_labels =
                    merge_labels(self.labeler.get_destination_labels(), &shared);

                let mut orchestrator_container = orchestrator_container;
                orchestrator_container.env.push(EnvVar::new(
                    env_names::SOURCE_LABELS,
                    serialize(env_names::SOURCE_LABELS, &source_labels)?,
                ));
                orchestrator_container.env.push(EnvVar::new(
                    env_names::DESTINATION_LABELS,
                    serialize(env_names::DESTINATION_LABELS, &destination_labels)?,
                ));

                let orchestrator = PodSpecification {
                    name: self.names.orchestrator_pod_name(&job.job_id, job.attempt_id),
                    pod_type: PodType::Orchestrator,
                    labels: merge_labels(self.labeler.get_orchestrator_labels(), &shared),
                    node_selectors,
                    annotations: group.annotations.clone(),
                    containers: vec![orchestrator_container],
                    init_strategy: InitStrategy::SelfFetch,
                    file_map: BTreeMap::new(),
                };

                Ok(LaunchPlan::Triplet {
                    orchestrator,
                    source: LabelSelector::new(source_labels),
                    destination: LabelSelector::new(destination_labels),
                })
            }
            Topology::Mono => {
                let mut orchestrator_container = orchestrator_container;
                orchestrator_container
                    .env
                    .insert(0, EnvVar::new(env_names::MONO_POD, "true"));

                let role_labels = self.labeler.get_replication_labels(
                    &orchestrator_image,
                    &input.source_launcher_config.docker_image,
                    &input.destination_launcher_config.docker_image,
                );

                let pod = PodSpecification {
                    name: self.names.replication_pod_name(&job.job_id, job.attempt_id),
                    pod_type: PodType::Replication,
                    labels: merge_labels(role_labels, &shared),
                    node_selectors,
                    annotations: group.annotations.clone(),
                    containers: vec![
                        orchestrator_container,
                        self.connector_container(
                            SOURCE_CONTAINER,
                            &input.source_launcher_config,
                            input.source_resource_reqs(),
                        ),
                        self.connector_container(
                            DESTINATION_CONTAINER,
                            &input.destination_launcher_config,
                            input.destination_resource_reqs(),
                        ),
                    ],
                    init_strategy: InitStrategy::SelfFetch,
                    file_map: BTreeMap::new(),
                };

                Ok(LaunchPlan::Mono { pod })
            }
        }
    }

    fn connector_container(
        &self,
        name: &str,
        config: &IntegrationLauncherConfig,
        resources: Option<&ResourceRequirements>,
    ) -> ContainerSpec {
        ContainerSpec {
            name: name.to_string(),
            image: config.docker_image.clone(),
            image_pull_policy: self.config.image_pull_policy.clone(),
            resources: resources.cloned(),
            env: self.env_factory.replication_connector_env_vars(config),
        }
    }

    fn connector_capability<'a>(
        &'a self,
        request: &'a WorkloadRequest,
    ) -> Result<ConnectorCapability<'a>, SpecBuildError> {
        let workload_id = request.workload_id.as_str();

        let (kind, launcher_config, group, payload) = match &request.payload {
            WorkloadPayload::Check(input) => (
                WorkloadKind::Check,
                &input.launcher_config,
                &self.config.check,
                ConnectorPayload::Check(input),
            ),
            WorkloadPayload::Discover(input) => (
                WorkloadKind::Discover,
                &input.launcher_config,
                &self.config.discover,
                ConnectorPayload::Discover(input),
            ),
            WorkloadPayload::Spec(input) => (
                WorkloadKind::Spec,
                &input.launcher_config,
                &self.config.spec,
                ConnectorPayload::Spec(input),
            ),
            WorkloadPayload::Replication(_) => {
                return Err(SpecBuildError::UnexpectedPayload {
                    workload_id: workload_id.to_string(),
                    expected: "connector",
                });
            }
        };

        let job_run_config = request.job_run_config();
        let image = launcher_config.docker_image.as_str();
        let job_id = job_run_config.job_id.as_str();
        let attempt_id = job_run_config.attempt_id;

        let (role_labels, pod_name, runtime_env) = match kind {
            WorkloadKind::Check => (
                self.labeler.get_check_labels(image),
                self.names.check_pod_name(image, job_id, attempt_id),
                self.env_factory
                    .check_connector_env_vars(launcher_config, workload_id),
            ),
            WorkloadKind::Discover => (
                self.labeler.get_discover_labels(image),
                self.names.discover_pod_name(image, job_id, attempt_id),
                self.env_factory
                    .discover_connector_env_vars(launcher_config, workload_id),
            ),
            _ => (
                self.labeler.get_spec_labels(image),
                self.names.spec_pod_name(image, job_id, attempt_id),
                self.env_factory
                    .spec_connector_env_vars(launcher_config, workload_id),
            ),
        };

        Ok(ConnectorCapability {
            kind,
            launcher_config,
            job_run_config,
            group,
            role_labels,
            pod_name,
            runtime_env,
            payload,
        })
    }

    /// Connector pod (main container plus sidecar) for check, discover and
    /// spec. The file map is only filled when the init container does not
    /// fetch its own input.
    pub fn build_connector_pod(
        &self,
        request: &WorkloadRequest,
        flags: &LaunchFlags,
    ) -> Result<PodSpecification, SpecBuildError> {
        let capability = self.connector_capability(request)?;

        let (init_strategy, file_map) = if flags.fetching_init {
            (InitStrategy::SelfFetch, BTreeMap::new())
        } else {
            (
                InitStrategy::CopyFiles,
                capability
                    .payload
                    .file_map(request, capability.launcher_config)?,
            )
        };

        let base = base_env(capability.kind, &request.workload_id, capability.job_run_config);
        let mut main_env = base.clone();
        main_env.extend(capability.runtime_env);

        let main = ContainerSpec {
            name: MAIN_CONTAINER.to_string(),
            image: capability.launcher_config.docker_image.clone(),
            image_pull_policy: self.config.image_pull_policy.clone(),
            resources: None,
            env: main_env,
        };
        let sidecar = ContainerSpec {
            name: SIDECAR_CONTAINER.to_string(),
            image: self.config.sidecar_image.clone(),
            image_pull_policy: self.config.image_pull_policy.clone(),
            resources: None,
            env: base,
        };

        let shared = self.shared_labels(request);

        Ok(PodSpecification {
            name: capability.pod_name,
            pod_type: PodType::Connector,
            labels: merge_labels(capability.role_labels, &shared),
            node_selectors: self.node_selectors(
                capability.group,
                capability.kind,
                request.priority,
                capability.launcher_config.is_custom_connector,
            ),
            annotations: capability.group.annotations.clone(),
            containers: vec![main, sidecar],
            init_strategy,
            file_map,
        })
    }
}
