//! Launch Orchestrator
//!
//! Owns the launch sequencing: resolves flags once, picks the topology, builds
//! the specs, creates the pods and waits through the init and main phases.
//! The first failure aborts the launch and is returned as a [`LaunchError`];
//! nothing is retried and nothing already created is cleaned up here.

use std::sync::Arc;
use std::time::{Duration, Instant};

use launcher_server_domain::launcher::{
    FeatureFlagClient, FlagContext, PodLabeler, PodLauncher, PodLauncherError,
};
use launcher_server_domain::pods::{
    LabelSelector, PodHandle, PodSpecification, PodTarget, PodType,
};
use launcher_server_domain::shared_kernel::{BoxError, KubeCommandType, LaunchError};
use launcher_server_domain::workloads::{WorkloadKind, WorkloadPayload, WorkloadRequest};
use launcher_shared::config::TimeoutConfig;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use super::flags::{LaunchFlags, launch_scope};
use super::spec_builder::{LaunchPlan, SpecBuilder};
use super::topology::TopologySelector;

/// Per-phase wait budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchTimeouts {
    /// Orchestrator main container ready-or-terminal
    pub orchestrator_startup: Duration,
    /// Init containers complete / started
    pub pod_init: Duration,
    /// Connector main container ready-or-terminal (full pod timeout + slack)
    pub connector_startup: Duration,
}

impl Default for LaunchTimeouts {
    fn default() -> Self {
        Self::from_config(&TimeoutConfig::default())
    }
}

impl LaunchTimeouts {
    pub fn from_config(config: &TimeoutConfig) -> Self {
        Self {
            orchestrator_startup: config.orchestrator_startup(),
            pod_init: config.pod_init(),
            connector_startup: config.connector_startup(),
        }
    }
}

pub struct LaunchOrchestrator {
    pod_launcher: Arc<dyn PodLauncher>,
    spec_builder: SpecBuilder,
    labeler: Arc<dyn PodLabeler>,
    feature_flags: Arc<dyn FeatureFlagClient>,
    /// Appended to every flag evaluation scope
    flag_contexts: Vec<FlagContext>,
    timeouts: LaunchTimeouts,
}

impl std::fmt::Debug for LaunchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaunchOrchestrator")
            .field("spec_builder", &self.spec_builder)
            .field("flag_contexts", &self.flag_contexts)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

/// Builds the error and logs it once at the point of failure
fn launch_error(
    message: String,
    source: impl Into<BoxError>,
    command: KubeCommandType,
    pod_type: PodType,
    pod_name: Option<&str>,
) -> LaunchError {
    let mut err = LaunchError::new(message, source, command).with_pod_type(pod_type);
    if let Some(name) = pod_name {
        err = err.with_pod_name(name);
    }

    error!(
        command = %err.command,
        pod_type = %pod_type,
        pod = pod_name.unwrap_or("-"),
        error = %err.source,
        "{}",
        err.message
    );
    err
}

impl LaunchOrchestrator {
    pub fn new(
        pod_launcher: Arc<dyn PodLauncher>,
        spec_builder: SpecBuilder,
        labeler: Arc<dyn PodLabeler>,
        feature_flags: Arc<dyn FeatureFlagClient>,
    ) -> Self {
        Self {
            pod_launcher,
            spec_builder,
            labeler,
            feature_flags,
            flag_contexts: Vec::new(),
            timeouts: LaunchTimeouts::default(),
        }
    }

    pub fn with_flag_contexts(mut self, contexts: Vec<FlagContext>) -> Self {
        self.flag_contexts = contexts;
        self
    }

    pub fn with_timeouts(mut self, timeouts: LaunchTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn timeouts(&self) -> &LaunchTimeouts {
        &self.timeouts
    }

    /// Launch every pod the workload needs and wait until they are ready or
    /// terminal.
    #[instrument(
        skip(self, request),
        fields(
            workload_id = %request.workload_id,
            kind = %request.kind(),
            job_id = %request.job_run_config().job_id,
            custom_connector = request.uses_custom_connector(),
        )
    )]
    pub async fn launch(&self, request: &WorkloadRequest) -> Result<(), LaunchError> {
        let scope = launch_scope(request, &self.flag_contexts);
        let flags = LaunchFlags::resolve(self.feature_flags.as_ref(), &scope);

        match &request.payload {
            WorkloadPayload::Replication(input) => {
                let topology = TopologySelector::select(input, &flags);
                let plan = self
                    .spec_builder
                    .build_replication_plan(request, input, topology, &flags)
                    .map_err(|e| {
                        launch_error(
                            format!("Failed to build {:?} pod spec", topology),
                            e,
                            KubeCommandType::Create,
                            PodType::Orchestrator,
                            None,
                        )
                    })?;

                self.launch_replication(request.kind(), plan).await
            }
            _ => {
                let spec = self
                    .spec_builder
                    .build_connector_pod(request, &flags)
                    .map_err(|e| {
                        launch_error(
                            format!("Failed to build {} pod spec", request.kind().operation_name()),
                            e,
                            KubeCommandType::Create,
                            PodType::Connector,
                            None,
                        )
                    })?;

                self.launch_connector(request, spec, flags.fetching_init)
                    .await
            }
        }
    }

    async fn create_pod(&self, spec: &PodSpecification) -> Result<PodHandle, LaunchError> {
        let handle = self.pod_launcher.create(spec).await.map_err(|e| {
            launch_error(
                format!("Failed to create pod {}", spec.name),
                e,
                KubeCommandType::Create,
                spec.pod_type,
                Some(&spec.name),
            )
        })?;

        info!(pod = %handle, pod_type = %spec.pod_type, "Pod created");
        Ok(handle)
    }

    async fn wait_init_complete(
        &self,
        pod: &PodHandle,
        pod_type: PodType,
    ) -> Result<(), LaunchError> {
        self.pod_launcher
            .wait_for_init_complete(pod, self.timeouts.pod_init)
            .await
            .map_err(|e| {
                launch_error(
                    format!("{} pod failed to complete initialization", pod_type),
                    e,
                    KubeCommandType::WaitInit,
                    pod_type,
                    Some(&pod.name),
                )
            })
    }

    async fn wait_ready(
        &self,
        target: PodTarget,
        pod_type: PodType,
        timeout: Duration,
    ) -> Result<(), LaunchError> {
        let pod_name = match &target {
            PodTarget::Pod(handle) => Some(handle.name.clone()),
            PodTarget::Labels(_) => None,
        };

        self.pod_launcher
            .wait_for_ready_or_terminal(&target, timeout)
            .await
            .map_err(|e| {
                launch_error(
                    format!("{} pod failed to start within {:?}", pod_type, timeout),
                    e,
                    KubeCommandType::WaitMain,
                    pod_type,
                    pod_name.as_deref(),
                )
            })?;

        debug!(target = %target, pod_type = %pod_type, "Pod ready or terminal");
        Ok(())
    }

    /// Sync / reset sequencing. Both plans create one pod and wait for its
    /// init containers; only the triplet goes on to wait for the orchestrator
    /// and then destination before source.
    async fn launch_replication(
        &self,
        kind: WorkloadKind,
        plan: LaunchPlan,
    ) -> Result<(), LaunchError> {
        let primary = plan.primary();
        let handle = self.create_pod(primary).await?;
        self.wait_init_complete(&handle, primary.pod_type).await?;

        let LaunchPlan::Triplet {
            source,
            destination,
            ..
        } = plan
        else {
            info!(pod = %handle, "Mono pod initialized");
            return Ok(());
        };

        self.wait_ready(
            PodTarget::Pod(handle.clone()),
            PodType::Orchestrator,
            self.timeouts.orchestrator_startup,
        )
        .await?;

        // The orchestrator starts the destination first
        self.wait_ready(
            PodTarget::Labels(destination),
            PodType::Destination,
            self.timeouts.connector_startup,
        )
        .await?;

        if kind == WorkloadKind::Reset {
            debug!("Reset workload, no source pod to wait for");
            return Ok(());
        }

        self.wait_ready(
            PodTarget::Labels(source),
            PodType::Source,
            self.timeouts.connector_startup,
        )
        .await?;

        info!(pod = %handle, "Replication pods ready");
        Ok(())
    }

    async fn launch_connector(
        &self,
        request: &WorkloadRequest,
        spec: PodSpecification,
        fetching_init: bool,
    ) -> Result<(), LaunchError> {
        let started = Instant::now();
        let operation = request.kind().operation_name();

        let handle = self.create_pod(&spec).await?;

        if fetching_init {
            self.wait_init_complete(&handle, PodType::Connector).await?;
        } else {
            self.pod_launcher
                .wait_for_init_startup(&handle, self.timeouts.pod_init)
                .await
                .map_err(|e| {
                    launch_error(
                        format!("{} pod init container failed to start", operation),
                        e,
                        KubeCommandType::WaitInit,
                        PodType::Connector,
                        Some(&handle.name),
                    )
                })?;

            self.pod_launcher
                .copy_files(&handle, &spec.file_map)
                .await
                .map_err(|e| {
                    launch_error(
                        format!("Failed to copy {} input files", operation),
                        e,
                        KubeCommandType::Copy,
                        PodType::Connector,
                        Some(&handle.name),
                    )
                })?;
        }

        self.wait_ready(
            PodTarget::Pod(handle.clone()),
            PodType::Connector,
            self.timeouts.connector_startup,
        )
        .await?;

        info!(
            pod = %handle,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "{} pod launched",
            operation
        );
        Ok(())
    }

    /// Delete every active pod labeled with the mutex key. Returns whether
    /// anything was deleted.
    #[instrument(skip(self))]
    pub async fn evict_mutex_pods(&self, mutex_key: &str) -> Result<bool, LaunchError> {
        let selector = LabelSelector::new(self.labeler.get_mutex_labels(mutex_key));

        let deleted = self
            .pod_launcher
            .delete_active_pods(&selector)
            .await
            .map_err(|e| {
                let err = LaunchError::new(
                    format!("Failed to delete pods for mutex key {}", mutex_key),
                    e,
                    KubeCommandType::Delete,
                );
                error!(
                    command = %err.command,
                    selector = %selector,
                    error = %err.source,
                    "{}",
                    err.message
                );
                err
            })?;

        if !deleted.is_empty() {
            info!(
                mutex_key = mutex_key,
                count = deleted.len(),
                "Evicted pods sharing mutex key"
            );
        }
        Ok(!deleted.is_empty())
    }

    /// Whether pods labeled with the auto id are pending or running
    #[instrument(skip(self))]
    pub async fn pods_exist_for_auto_id(&self, auto_id: Uuid) -> Result<bool, PodLauncherError> {
        let selector = LabelSelector::new(self.labeler.get_auto_id_labels(auto_id));
        self.pod_launcher.pods_running(&selector).await
    }
}
