//! Launch scenarios against the in-memory cluster with the default policies

use std::collections::BTreeMap;
use std::sync::Arc;

use launcher_server_application::launch::{
    LaunchOrchestrator, SpecBuilder, SpecBuilderConfig, merge_labels,
};
use launcher_server_domain::launcher::{
    CONNECTOR_SIDECAR_FETCHES_INPUT_FROM_INIT, PodLabeler, PodLauncherError, REPLICATION_MONO_POD,
    REPLICATION_MONO_POD_MEMORY_TOLERANCE,
};
use launcher_server_domain::pods::{PodType, ResourceRequirements, files};
use launcher_server_domain::shared_kernel::KubeCommandType;
use launcher_server_domain::workloads::{
    ActorType, CheckConnectionInput, IntegrationLauncherConfig, JobRunConfig, ReplicationInput,
    SyncResourceRequirements, WorkloadPayload, WorkloadPriority, WorkloadRequest,
};
use launcher_server_infrastructure::policy::{
    DefaultPodLabeler, DefaultPodNameGenerator, DefaultRuntimeEnvVarFactory,
    StaticFeatureFlagClient,
};
use launcher_server_infrastructure::testing::{
    InMemoryPodLauncher, LauncherCall, Operation, SimulatedPod,
};
use rstest::rstest;
use uuid::Uuid;

const JOB_ID: &str = "415";
const ATTEMPT: i64 = 7;

fn launcher_config(image: &str, workspace_id: Uuid, connection_id: Uuid) -> IntegrationLauncherConfig {
    IntegrationLauncherConfig {
        job_id: JOB_ID.to_string(),
        attempt_id: ATTEMPT,
        workspace_id,
        connection_id: Some(connection_id),
        docker_image: image.to_string(),
        is_custom_connector: false,
        additional_environment: BTreeMap::new(),
    }
}

fn gib_limit() -> Option<ResourceRequirements> {
    Some(ResourceRequirements {
        memory_limit: Some("1Gi".to_string()),
        ..Default::default()
    })
}

fn replication_request(is_reset: bool, with_limits: bool) -> WorkloadRequest {
    let workspace_id = Uuid::new_v4();
    let connection_id = Uuid::new_v4();
    let sync_resource_requirements = if with_limits {
        SyncResourceRequirements {
            orchestrator: gib_limit(),
            source: gib_limit(),
            destination: gib_limit(),
        }
    } else {
        SyncResourceRequirements::default()
    };

    WorkloadRequest {
        workload_id: format!("{}_{}_{}_sync", connection_id, JOB_ID, ATTEMPT),
        mutex_key: Some("m1".to_string()),
        labels: BTreeMap::from([("team".to_string(), "data".to_string())]),
        auto_id: Some(Uuid::new_v4()),
        log_path: "/logs/415/7".to_string(),
        priority: WorkloadPriority::Default,
        payload: WorkloadPayload::Replication(ReplicationInput {
            workspace_id,
            connection_id,
            job_run_config: JobRunConfig::new(JOB_ID, ATTEMPT),
            is_reset,
            source_launcher_config: launcher_config("source-faker:1.0", workspace_id, connection_id),
            destination_launcher_config: launcher_config(
                "destination-e2e:1.0",
                workspace_id,
                connection_id,
            ),
            sync_resource_requirements,
        }),
    }
}

fn check_request() -> WorkloadRequest {
    let workspace_id = Uuid::new_v4();
    let connection_id = Uuid::new_v4();

    WorkloadRequest {
        workload_id: "check-workload".to_string(),
        mutex_key: None,
        labels: BTreeMap::new(),
        auto_id: None,
        log_path: "/logs/check".to_string(),
        priority: WorkloadPriority::High,
        payload: WorkloadPayload::Check(CheckConnectionInput {
            job_run_config: JobRunConfig::new(JOB_ID, ATTEMPT),
            launcher_config: launcher_config("source-faker:1.0", workspace_id, connection_id),
            actor_type: ActorType::Source,
            connection_configuration: serde_json::json!({"host": "db", "port": 5432}),
        }),
    }
}

struct Harness {
    cluster: Arc<InMemoryPodLauncher>,
    builder_labels: Arc<DefaultPodLabeler>,
    orchestrator: LaunchOrchestrator,
}

fn harness(cluster: InMemoryPodLauncher, flags: &[(&str, &str)]) -> Harness {
    let cluster = Arc::new(cluster);
    let labeler = Arc::new(DefaultPodLabeler::new());
    let flags = StaticFeatureFlagClient::new(
        flags
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    );

    let spec_builder = SpecBuilder::new(
        SpecBuilderConfig::new("orchestrator:1.0", "sidecar:1.0"),
        labeler.clone(),
        Arc::new(DefaultPodNameGenerator::new()),
        Arc::new(DefaultRuntimeEnvVarFactory::new()),
    );
    let orchestrator =
        LaunchOrchestrator::new(cluster.clone(), spec_builder, labeler.clone(), Arc::new(flags));

    Harness {
        cluster,
        builder_labels: labeler,
        orchestrator,
    }
}

impl Harness {
    /// Labels the orchestrator gives to a replication connector pod
    fn connector_labels(&self, request: &WorkloadRequest, role: PodType) -> BTreeMap<String, String> {
        let shared = self.builder_labels.get_shared_labels(
            Some(&request.workload_id),
            request.mutex_key.as_deref(),
            &request.labels,
            request.auto_id,
        );
        let role_labels = match role {
            PodType::Source => self.builder_labels.get_source_labels(),
            _ => self.builder_labels.get_destination_labels(),
        };
        merge_labels(role_labels, &shared)
    }

    fn seed_connector(&self, request: &WorkloadRequest, role: PodType) {
        let name = format!("{}-pod", role).to_lowercase();
        self.cluster
            .seed(SimulatedPod::external(name, self.connector_labels(request, role)));
    }
}

fn orchestrator_name() -> String {
    format!("orchestrator-repl-job-{}-attempt-{}", JOB_ID, ATTEMPT)
}

#[tokio::test]
async fn triplet_waits_destination_then_source() {
    let h = harness(InMemoryPodLauncher::new("jobs"), &[]);
    let request = replication_request(false, false);
    h.seed_connector(&request, PodType::Destination);
    h.seed_connector(&request, PodType::Source);

    h.orchestrator.launch(&request).await.unwrap();

    let calls = h.cluster.calls();
    assert_eq!(calls.len(), 5);
    assert_eq!(
        calls[0],
        LauncherCall::Create {
            name: orchestrator_name(),
            pod_type: PodType::Orchestrator,
        }
    );
    assert_eq!(calls[1], LauncherCall::WaitInitComplete(orchestrator_name()));
    assert_eq!(calls[2], LauncherCall::WaitReady(orchestrator_name()));
    assert!(matches!(&calls[3], LauncherCall::WaitReady(q) if q.contains("component=destination")));
    assert!(matches!(&calls[4], LauncherCall::WaitReady(q) if q.contains("component=source")));
}

#[tokio::test]
async fn triplet_destination_timeout_never_waits_for_source() {
    let h = harness(InMemoryPodLauncher::new("jobs"), &[]);
    let request = replication_request(false, false);
    h.seed_connector(&request, PodType::Source);

    let err = h.orchestrator.launch(&request).await.unwrap_err();

    assert_eq!(err.command, KubeCommandType::WaitMain);
    assert_eq!(err.pod_type, Some(PodType::Destination));
    assert!(err.pod_name.is_none());

    let calls = h.cluster.calls();
    assert_eq!(calls.len(), 4);
    assert!(
        !calls
            .iter()
            .any(|c| matches!(c, LauncherCall::WaitReady(q) if q.contains("component=source")))
    );
    // Nothing created is cleaned up
    assert!(h.cluster.pod(&orchestrator_name()).is_some());
}

#[tokio::test]
async fn reset_only_waits_for_destination() {
    let h = harness(InMemoryPodLauncher::new("jobs"), &[]);
    let request = replication_request(true, false);
    h.seed_connector(&request, PodType::Destination);

    h.orchestrator.launch(&request).await.unwrap();

    assert_eq!(h.cluster.calls().len(), 4);
    let orchestrator = h.cluster.pod(&orchestrator_name()).unwrap().spec.unwrap();
    assert_eq!(
        orchestrator.containers[0]
            .env
            .iter()
            .find(|v| v.name == "OPERATION_TYPE")
            .map(|v| v.value.as_str()),
        Some("RESET")
    );
}

#[tokio::test]
async fn mono_pod_env_order_and_single_wait() {
    let h = harness(
        InMemoryPodLauncher::new("jobs"),
        &[
            (REPLICATION_MONO_POD.key, "true"),
            (REPLICATION_MONO_POD_MEMORY_TOLERANCE.key, "4"),
        ],
    );
    let request = replication_request(false, true);

    h.orchestrator.launch(&request).await.unwrap();

    let calls = h.cluster.calls();
    let name = format!("replication-job-{}-attempt-{}", JOB_ID, ATTEMPT);
    assert_eq!(
        calls,
        vec![
            LauncherCall::Create {
                name: name.clone(),
                pod_type: PodType::Replication,
            },
            LauncherCall::WaitInitComplete(name.clone()),
        ]
    );

    let spec = h.cluster.pod(&name).unwrap().spec.unwrap();
    let orchestrator = spec.container("orchestrator").unwrap();
    let names: Vec<&str> = orchestrator.env.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(
        &names[..6],
        &[
            "MONO_POD",
            "OPERATION_TYPE",
            "WORKLOAD_ID",
            "JOB_ID",
            "ATTEMPT_ID",
            "WORKSPACE_ID"
        ]
    );
    assert_eq!(orchestrator.env[0].value, "true");
    assert_eq!(orchestrator.env[1].value, "SYNC");
    assert_eq!(spec.containers.len(), 3);
}

#[tokio::test]
async fn mono_pod_over_tolerance_falls_back_to_triplet() {
    let h = harness(
        InMemoryPodLauncher::new("jobs"),
        &[
            (REPLICATION_MONO_POD.key, "true"),
            (REPLICATION_MONO_POD_MEMORY_TOLERANCE.key, "2"),
        ],
    );
    let request = replication_request(false, true);
    h.seed_connector(&request, PodType::Destination);
    h.seed_connector(&request, PodType::Source);

    h.orchestrator.launch(&request).await.unwrap();

    assert!(matches!(
        &h.cluster.calls()[0],
        LauncherCall::Create { pod_type: PodType::Orchestrator, .. }
    ));
}

#[tokio::test]
async fn connector_copy_path_uploads_inputs() {
    let h = harness(InMemoryPodLauncher::new("jobs"), &[]);
    let request = check_request();

    h.orchestrator.launch(&request).await.unwrap();

    let calls = h.cluster.calls();
    assert_eq!(calls.len(), 4);
    let LauncherCall::Create { name, pod_type } = &calls[0] else {
        panic!("expected create, got {:?}", calls[0]);
    };
    assert_eq!(*pod_type, PodType::Connector);
    assert_eq!(calls[1], LauncherCall::WaitInitStartup(name.clone()));
    assert_eq!(
        calls[2],
        LauncherCall::CopyFiles {
            pod: name.clone(),
            files: vec![
                files::CONNECTION_CONFIGURATION.to_string(),
                files::SIDECAR_INPUT.to_string()
            ],
        }
    );
    assert_eq!(calls[3], LauncherCall::WaitReady(name.clone()));

    let pod = h.cluster.pod(name).unwrap();
    let sidecar: serde_json::Value =
        serde_json::from_str(&pod.files[files::SIDECAR_INPUT]).unwrap();
    assert_eq!(sidecar["workloadId"], "check-workload");
    assert_eq!(sidecar["operationType"], "CHECK");
    let config: serde_json::Value =
        serde_json::from_str(&pod.files[files::CONNECTION_CONFIGURATION]).unwrap();
    assert_eq!(config["port"], 5432);
}

#[tokio::test]
async fn connector_fetching_init_never_copies() {
    let h = harness(
        InMemoryPodLauncher::new("jobs"),
        &[(CONNECTOR_SIDECAR_FETCHES_INPUT_FROM_INIT.key, "true")],
    );

    h.orchestrator.launch(&check_request()).await.unwrap();

    let calls = h.cluster.calls();
    assert_eq!(calls.len(), 3);
    assert!(matches!(calls[1], LauncherCall::WaitInitComplete(_)));
    assert!(!calls.iter().any(|c| matches!(c, LauncherCall::CopyFiles { .. })));
}

#[rstest]
#[case(Operation::Create, KubeCommandType::Create)]
#[case(Operation::WaitInitStartup, KubeCommandType::WaitInit)]
#[case(Operation::CopyFiles, KubeCommandType::Copy)]
#[case(Operation::WaitReady, KubeCommandType::WaitMain)]
#[tokio::test]
async fn connector_failures_are_classified(
    #[case] operation: Operation,
    #[case] expected: KubeCommandType,
) {
    let cluster = InMemoryPodLauncher::new("jobs").fail_on(
        operation,
        None,
        PodLauncherError::api("boom"),
    );
    let h = harness(cluster, &[]);

    let err = h.orchestrator.launch(&check_request()).await.unwrap_err();

    assert_eq!(err.command, expected);
    assert_eq!(err.pod_type, Some(PodType::Connector));
    assert_eq!(err.source.to_string(), PodLauncherError::api("boom").to_string());
}

#[tokio::test]
async fn evict_mutex_pods_deletes_only_labeled_pods() {
    let labeler = DefaultPodLabeler::new();
    let cluster = InMemoryPodLauncher::new("jobs")
        .with_pod(SimulatedPod::external("a", labeler.get_mutex_labels("m1")))
        .with_pod(SimulatedPod::external("b", labeler.get_mutex_labels("m1")))
        .with_pod(SimulatedPod::external("c", labeler.get_mutex_labels("m2")));
    let h = harness(cluster, &[]);

    assert!(h.orchestrator.evict_mutex_pods("m1").await.unwrap());

    let remaining: Vec<String> = h.cluster.pods().into_iter().map(|p| p.name).collect();
    assert_eq!(remaining, vec!["c".to_string()]);

    assert!(!h.orchestrator.evict_mutex_pods("m1").await.unwrap());
}

#[tokio::test]
async fn evict_failure_is_delete_error() {
    let cluster = InMemoryPodLauncher::new("jobs").fail_on(
        Operation::DeleteActive,
        None,
        PodLauncherError::api("forbidden"),
    );
    let h = harness(cluster, &[]);

    let err = h.orchestrator.evict_mutex_pods("m1").await.unwrap_err();
    assert_eq!(err.command, KubeCommandType::Delete);
}

#[tokio::test]
async fn pods_exist_for_auto_id_after_launch() {
    let h = harness(InMemoryPodLauncher::new("jobs"), &[]);
    let request = replication_request(false, false);
    let auto_id = request.auto_id.unwrap();

    assert!(!h.orchestrator.pods_exist_for_auto_id(auto_id).await.unwrap());

    // The orchestrator pod is created before the destination wait fails
    let _ = h.orchestrator.launch(&request).await;

    assert!(h.orchestrator.pods_exist_for_auto_id(auto_id).await.unwrap());
    assert!(!h.orchestrator.pods_exist_for_auto_id(Uuid::new_v4()).await.unwrap());
}
