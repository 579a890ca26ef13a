//! Startup - configuration, logging and dependency wiring

use anyhow::Context;
use launcher_server_application::launch::{
    LaunchOrchestrator, LaunchTimeouts, SpecBuilder, SpecBuilderConfig,
};
use launcher_server_infrastructure::observability::init_tracing;
use launcher_server_infrastructure::policy::{
    DefaultPodLabeler, DefaultPodNameGenerator, DefaultRuntimeEnvVarFactory,
    StaticFeatureFlagClient, flag_contexts,
};
use launcher_server_infrastructure::providers::{KubePodLauncher, KubernetesConfig};
use launcher_shared::config::{ConfigLoader, LauncherConfigDto};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

pub const SERVICE_NAME: &str = "workload-launcher";

pub fn load_config(env_file: Option<PathBuf>) -> anyhow::Result<LauncherConfigDto> {
    ConfigLoader::new(env_file)
        .load_launcher_config()
        .context("Failed to load launcher configuration")
}

pub fn setup_logging(config: &LauncherConfigDto) {
    let result = init_tracing(SERVICE_NAME, &config.logging);
    for error in &result.errors {
        // Subscriber may be missing, stderr is the only sink left
        eprintln!("warning: {}", error);
    }
}

pub fn spec_builder_config(config: &LauncherConfigDto) -> SpecBuilderConfig {
    SpecBuilderConfig {
        orchestrator_image: config.images.orchestrator_image.clone(),
        sidecar_image: config.images.sidecar_image.clone(),
        image_pull_policy: config.images.pull_policy.clone(),
        replication: config.groups.replication.clone(),
        check: config.groups.check.clone(),
        discover: config.groups.discover.clone(),
        spec: config.groups.spec.clone(),
    }
}

pub async fn build_orchestrator(config: &LauncherConfigDto) -> anyhow::Result<LaunchOrchestrator> {
    let kube_config = KubernetesConfig::from_settings(&config.kubernetes, &config.images)
        .context("Invalid Kubernetes configuration")?;
    let namespace = kube_config.namespace.clone();
    let pod_launcher = KubePodLauncher::new(kube_config)
        .await
        .context("Failed to connect to Kubernetes")?;

    let labeler = Arc::new(DefaultPodLabeler::new());
    let spec_builder = SpecBuilder::new(
        spec_builder_config(config),
        labeler.clone(),
        Arc::new(DefaultPodNameGenerator::new()),
        Arc::new(DefaultRuntimeEnvVarFactory::new()),
    );

    if config.flags.values.is_empty() {
        warn!("No feature flags configured, every flag uses its default");
    }
    let feature_flags = Arc::new(StaticFeatureFlagClient::from_config(&config.flags));
    let timeouts = LaunchTimeouts::from_config(&config.timeouts);

    let orchestrator =
        LaunchOrchestrator::new(Arc::new(pod_launcher), spec_builder, labeler, feature_flags)
            .with_flag_contexts(flag_contexts(&config.flags.contexts))
            .with_timeouts(timeouts);

    info!(
        namespace = %namespace,
        orchestrator_image = %config.images.orchestrator_image,
        timeouts = ?orchestrator.timeouts(),
        "Launcher ready"
    );

    Ok(orchestrator)
}
