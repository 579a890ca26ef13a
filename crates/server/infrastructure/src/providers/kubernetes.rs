//! Kubernetes Pod Launcher Implementation
//!
//! Production implementation of `PodLauncher` on top of kube-rs: pod
//! create/delete, phase waits bounded by `tokio::time::timeout`, and file
//! injection through `exec` into the `init` container.

use async_trait::async_trait;
use futures::TryStreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::{
    Client, Config,
    api::{Api, AttachParams, DeleteParams, ListParams, PostParams},
    runtime::{WatchStreamExt, wait::await_condition, watcher},
};
use std::collections::BTreeMap;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use launcher_server_domain::launcher::{PodLauncher, PodLauncherError};
use launcher_server_domain::pods::{
    LabelSelector, PodHandle, PodSpecification, PodTarget, files,
};
use launcher_shared::config::{ConfigError, ImageConfig, KubernetesSettings};

use super::pod_spec_factory::{INIT_CONTAINER, PodSpecFactory, PodSpecFactoryConfig};

type Result<T> = std::result::Result<T, PodLauncherError>;

// ============================================================================
// Configuration Types
// ============================================================================

#[derive(Debug, Clone)]
pub struct KubernetesConfig {
    /// Namespace where pods are created
    pub namespace: String,
    /// Path to kubeconfig file (None = in-cluster / inferred config)
    pub kubeconfig_path: Option<String>,
    /// Kubeconfig context to use (None = current-context)
    pub context: Option<String>,
    /// Pod materialisation settings
    pub pod_factory: PodSpecFactoryConfig,
}

impl Default for KubernetesConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            kubeconfig_path: None,
            context: None,
            pod_factory: PodSpecFactoryConfig::default(),
        }
    }
}

/// Builder for KubernetesConfig
pub struct KubernetesConfigBuilder {
    config: KubernetesConfig,
}

impl KubernetesConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: KubernetesConfig::default(),
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = namespace.into();
        self
    }

    pub fn kubeconfig_path(mut self, path: impl Into<String>) -> Self {
        self.config.kubeconfig_path = Some(path.into());
        self
    }

    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.config.context = Some(context.into());
        self
    }

    pub fn service_account(mut self, sa: impl Into<String>) -> Self {
        self.config.pod_factory.service_account = Some(sa.into());
        self
    }

    pub fn add_image_pull_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.pod_factory.image_pull_secrets.push(secret.into());
        self
    }

    pub fn init_image(mut self, image: impl Into<String>) -> Self {
        self.config.pod_factory.init_image = image.into();
        self
    }

    pub fn image_pull_policy(mut self, policy: impl Into<String>) -> Self {
        self.config.pod_factory.init_image_pull_policy = policy.into();
        self
    }

    pub fn build(self) -> std::result::Result<KubernetesConfig, ConfigError> {
        self.validate()?;
        Ok(self.config)
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.config.namespace.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Kubernetes namespace cannot be empty".to_string(),
            ));
        }
        if self.config.pod_factory.init_image.trim().is_empty() {
            return Err(ConfigError::Validation(
                "init image cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for KubernetesConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl KubernetesConfig {
    pub fn builder() -> KubernetesConfigBuilder {
        KubernetesConfigBuilder::new()
    }

    /// Build from the loaded launcher settings
    pub fn from_settings(
        settings: &KubernetesSettings,
        images: &ImageConfig,
    ) -> std::result::Result<Self, ConfigError> {
        let mut builder = Self::builder()
            .namespace(settings.namespace.clone())
            .init_image(images.init_image.clone())
            .image_pull_policy(images.pull_policy.clone());

        if let Some(path) = &settings.kubeconfig_path {
            builder = builder.kubeconfig_path(path.to_string_lossy());
        }
        if let Some(context) = &settings.context {
            builder = builder.context(context.clone());
        }
        if let Some(sa) = &settings.service_account {
            builder = builder.service_account(sa.clone());
        }
        for secret in &settings.image_pull_secrets {
            builder = builder.add_image_pull_secret(secret.clone());
        }

        builder.build()
    }
}

// ============================================================================
// Pod conditions
// ============================================================================

fn phase(pod: &Pod) -> Option<&str> {
    pod.status.as_ref().and_then(|s| s.phase.as_deref())
}

/// Every init container has started, or the pod already left Pending
pub fn is_init_started(pod: Option<&Pod>) -> bool {
    let Some(pod) = pod else { return false };
    if matches!(phase(pod), Some("Running" | "Succeeded" | "Failed")) {
        return true;
    }

    let statuses = pod
        .status
        .as_ref()
        .and_then(|s| s.init_container_statuses.as_ref());

    match statuses {
        Some(statuses) if !statuses.is_empty() => statuses.iter().all(|s| {
            s.state
                .as_ref()
                .is_some_and(|state| state.running.is_some() || state.terminated.is_some())
        }),
        _ => false,
    }
}

/// Every init container terminated, or the pod reached Running or a terminal phase
pub fn is_init_complete(pod: Option<&Pod>) -> bool {
    let Some(pod) = pod else { return false };
    if matches!(phase(pod), Some("Running" | "Succeeded" | "Failed")) {
        return true;
    }

    let statuses = pod
        .status
        .as_ref()
        .and_then(|s| s.init_container_statuses.as_ref());

    match statuses {
        Some(statuses) if !statuses.is_empty() => statuses.iter().all(|s| {
            s.state
                .as_ref()
                .is_some_and(|state| state.terminated.is_some())
        }),
        _ => false,
    }
}

/// Ready condition true, or the pod reached a terminal phase
pub fn is_ready_or_terminal(pod: Option<&Pod>) -> bool {
    let Some(pod) = pod else { return false };
    if matches!(phase(pod), Some("Succeeded" | "Failed")) {
        return true;
    }

    pod.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        })
}

fn is_active(pod: &Pod) -> bool {
    matches!(phase(pod), Some("Pending" | "Running"))
}

// ============================================================================
// Kubernetes Pod Launcher
// ============================================================================

#[derive(Clone)]
pub struct KubePodLauncher {
    client: Client,
    config: KubernetesConfig,
    factory: PodSpecFactory,
}

impl std::fmt::Debug for KubePodLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubePodLauncher")
            .field("config", &self.config)
            .finish()
    }
}

impl KubePodLauncher {
    pub async fn new(config: KubernetesConfig) -> Result<Self> {
        let client = Self::create_client(&config).await?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: KubernetesConfig) -> Self {
        let factory = PodSpecFactory::new(Some(config.pod_factory.clone()));
        Self {
            client,
            config,
            factory,
        }
    }

    async fn create_client(config: &KubernetesConfig) -> Result<Client> {
        let kube_config = match &config.kubeconfig_path {
            Some(path) => {
                let options = kube::config::KubeConfigOptions {
                    context: config.context.clone(),
                    cluster: None,
                    user: None,
                };
                let kubeconfig = kube::config::Kubeconfig::read_from(path).map_err(|e| {
                    PodLauncherError::api(format!(
                        "Failed to read kubeconfig from {}: {}",
                        path, e
                    ))
                })?;
                Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .map_err(|e| {
                        PodLauncherError::api(format!(
                            "Failed to create Kubernetes config: {}",
                            e
                        ))
                    })?
            }
            None => Config::infer().await.map_err(|e| {
                PodLauncherError::api(format!("Failed to infer Kubernetes config: {}", e))
            })?,
        };

        Client::try_from(kube_config).map_err(|e| {
            PodLauncherError::api(format!("Failed to create Kubernetes client: {}", e))
        })
    }

    fn pods(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), &self.config.namespace)
    }

    async fn list(&self, selector: &LabelSelector) -> Result<Vec<Pod>> {
        let lp = ListParams::default().labels(&selector.to_query());
        let list = self.pods().list(&lp).await.map_err(|e| {
            PodLauncherError::api(format!("Failed to list pods {}: {}", selector, e))
        })?;
        Ok(list.items)
    }

    /// Bound `wait` by `timeout`; an elapsed timeout is an error
    async fn bounded<F>(&self, condition: &str, target: String, timeout: Duration, wait: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        let started = Instant::now();
        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => {
                debug!(
                    "{} on {} satisfied after {:?}",
                    condition,
                    target,
                    started.elapsed()
                );
                result
            }
            Err(_) => Err(PodLauncherError::Timeout {
                condition: condition.to_string(),
                target,
                timeout,
            }),
        }
    }

    async fn await_pod(
        &self,
        name: &str,
        condition: &str,
        timeout: Duration,
        cond: fn(Option<&Pod>) -> bool,
    ) -> Result<()> {
        let wait = async {
            match await_condition(self.pods(), name, cond).await {
                Ok(Some(_)) => Ok(()),
                Ok(None) => Err(PodLauncherError::NotFound {
                    target: name.to_string(),
                }),
                Err(e) => Err(PodLauncherError::api(format!(
                    "Watch on pod {} failed: {}",
                    name, e
                ))),
            }
        };
        self.bounded(condition, format!("pod {}", name), timeout, wait)
            .await
    }

    /// First pod matching the selector that is ready or terminal
    async fn await_labels(&self, selector: &LabelSelector, timeout: Duration) -> Result<()> {
        let wait = async {
            let config = watcher::Config::default().labels(&selector.to_query());
            let stream = watcher(self.pods(), config)
                .default_backoff()
                .applied_objects();
            let mut stream = std::pin::pin!(stream);

            while let Some(pod) = stream.try_next().await.map_err(|e| {
                PodLauncherError::api(format!("Watch on pods {} failed: {}", selector, e))
            })? {
                if is_ready_or_terminal(Some(&pod)) {
                    debug!(
                        "Pod {} matching {} is ready or terminal",
                        pod.metadata.name.as_deref().unwrap_or("<unnamed>"),
                        selector
                    );
                    return Ok(());
                }
            }

            Err(PodLauncherError::NotFound {
                target: selector.to_string(),
            })
        };

        self.bounded(
            "ready-or-terminal",
            format!("pods matching {}", selector),
            timeout,
            wait,
        )
        .await
    }

    async fn copy_file(&self, pod: &PodHandle, file: &str, content: &str) -> Result<()> {
        let copy_error = |message: String| PodLauncherError::Copy {
            pod: pod.name.clone(),
            file: file.to_string(),
            message,
        };

        let command = format!("cat > {}/{}", files::CONFIG_DIR, file);
        let params = AttachParams::default()
            .container(INIT_CONTAINER)
            .stdin(true)
            .stdout(false)
            .stderr(true);

        let mut attached = self
            .pods()
            .exec(&pod.name, vec!["sh", "-c", command.as_str()], &params)
            .await
            .map_err(|e| copy_error(format!("exec failed: {}", e)))?;

        let mut stdin = attached
            .stdin()
            .ok_or_else(|| copy_error("stdin not attached".to_string()))?;
        stdin
            .write_all(content.as_bytes())
            .await
            .map_err(|e| copy_error(format!("write failed: {}", e)))?;
        stdin
            .shutdown()
            .await
            .map_err(|e| copy_error(format!("close failed: {}", e)))?;
        drop(stdin);

        let status = match attached.take_status() {
            Some(status) => status.await,
            None => None,
        };
        attached
            .join()
            .await
            .map_err(|e| copy_error(format!("exec did not finish: {}", e)))?;

        match status {
            Some(status) if status.status.as_deref() == Some("Failure") => Err(copy_error(
                status.message.unwrap_or_else(|| "command failed".to_string()),
            )),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl PodLauncher for KubePodLauncher {
    async fn create(&self, spec: &PodSpecification) -> Result<PodHandle> {
        info!("Creating pod {} ({})", spec.name, spec.pod_type);

        let pod = self.factory.build_pod(spec, &self.config.namespace);
        let created = self
            .pods()
            .create(&PostParams::default(), &pod)
            .await
            .map_err(|e| {
                PodLauncherError::api(format!("Failed to create pod {}: {}", spec.name, e))
            })?;

        let handle = PodHandle {
            name: created.metadata.name.unwrap_or_else(|| spec.name.clone()),
            namespace: self.config.namespace.clone(),
            uid: created.metadata.uid,
        };
        info!(
            "Pod {} created (uid: {})",
            handle,
            handle.uid.as_deref().unwrap_or("-")
        );
        Ok(handle)
    }

    async fn delete_active_pods(&self, selector: &LabelSelector) -> Result<Vec<PodHandle>> {
        let pods = self.list(selector).await?;
        let api = self.pods();
        let mut deleted = Vec::new();

        for pod in pods {
            if pod.metadata.deletion_timestamp.is_some() {
                continue;
            }
            let Some(name) = pod.metadata.name else {
                continue;
            };

            match api.delete(&name, &DeleteParams::default()).await {
                Ok(_) => {
                    info!("Pod {} deleted", name);
                    deleted.push(PodHandle {
                        name,
                        namespace: self.config.namespace.clone(),
                        uid: pod.metadata.uid,
                    });
                }
                Err(kube::Error::Api(ae)) if ae.code == 404 => {
                    debug!("Pod {} already deleted", name);
                }
                Err(e) => {
                    return Err(PodLauncherError::api(format!(
                        "Failed to delete pod {}: {}",
                        name, e
                    )));
                }
            }
        }

        Ok(deleted)
    }

    async fn pods_running(&self, selector: &LabelSelector) -> Result<bool> {
        Ok(self.list(selector).await?.iter().any(is_active))
    }

    async fn wait_for_init_complete(&self, pod: &PodHandle, timeout: Duration) -> Result<()> {
        self.await_pod(&pod.name, "init-complete", timeout, is_init_complete)
            .await
    }

    async fn wait_for_init_startup(&self, pod: &PodHandle, timeout: Duration) -> Result<()> {
        self.await_pod(&pod.name, "init-startup", timeout, is_init_started)
            .await
    }

    async fn wait_for_ready_or_terminal(
        &self,
        target: &PodTarget,
        timeout: Duration,
    ) -> Result<()> {
        match target {
            PodTarget::Pod(handle) => {
                self.await_pod(&handle.name, "ready-or-terminal", timeout, is_ready_or_terminal)
                    .await
            }
            PodTarget::Labels(selector) => self.await_labels(selector, timeout).await,
        }
    }

    async fn copy_files(&self, pod: &PodHandle, file_map: &BTreeMap<String, String>) -> Result<()> {
        for (file, content) in file_map {
            debug!("Copying {} ({} bytes) into {}", file, content.len(), pod);
            self.copy_file(pod, file, content).await?;
        }

        if let Err(e) = self.copy_file(pod, files::FINISHED_UPLOADING, "").await {
            warn!("Failed to write upload marker into {}: {}", pod, e);
            return Err(e);
        }

        info!("Copied {} files into {}", file_map.len(), pod);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{
        ContainerState, ContainerStateRunning, ContainerStateTerminated, ContainerStateWaiting,
        ContainerStatus, PodCondition, PodStatus,
    };

    fn init_status(state: ContainerState) -> ContainerStatus {
        ContainerStatus {
            name: INIT_CONTAINER.to_string(),
            state: Some(state),
            ..Default::default()
        }
    }

    fn pod(phase: &str, init: Option<ContainerState>, ready: bool) -> Pod {
        Pod {
            status: Some(PodStatus {
                phase: Some(phase.to_string()),
                init_container_statuses: init.map(|s| vec![init_status(s)]),
                conditions: Some(vec![PodCondition {
                    type_: "Ready".to_string(),
                    status: if ready { "True" } else { "False" }.to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn waiting() -> ContainerState {
        ContainerState {
            waiting: Some(ContainerStateWaiting::default()),
            ..Default::default()
        }
    }

    fn running() -> ContainerState {
        ContainerState {
            running: Some(ContainerStateRunning::default()),
            ..Default::default()
        }
    }

    fn terminated() -> ContainerState {
        ContainerState {
            terminated: Some(ContainerStateTerminated::default()),
            ..Default::default()
        }
    }

    #[test]
    fn test_kubernetes_config_default() {
        let config = KubernetesConfig::default();
        assert_eq!(config.namespace, "default");
        assert!(config.kubeconfig_path.is_none());
    }

    #[test]
    fn test_builder_rejects_empty_namespace() {
        assert!(KubernetesConfig::builder().namespace(" ").build().is_err());

        let config = KubernetesConfig::builder()
            .namespace("jobs")
            .service_account("launcher")
            .add_image_pull_secret("registry")
            .build()
            .unwrap();
        assert_eq!(config.namespace, "jobs");
        assert_eq!(config.pod_factory.service_account.as_deref(), Some("launcher"));
        assert_eq!(config.pod_factory.image_pull_secrets, vec!["registry"]);
    }

    #[test]
    fn test_from_settings() {
        let settings = KubernetesSettings {
            namespace: "jobs".to_string(),
            kubeconfig_path: Some("/tmp/kubeconfig".into()),
            context: Some("kind".to_string()),
            service_account: None,
            image_pull_secrets: vec![],
        };
        let images = ImageConfig {
            orchestrator_image: "orchestrator:1.0".to_string(),
            sidecar_image: "sidecar:1.0".to_string(),
            init_image: "init:1.0".to_string(),
            pull_policy: "Always".to_string(),
        };

        let config = KubernetesConfig::from_settings(&settings, &images).unwrap();

        assert_eq!(config.kubeconfig_path.as_deref(), Some("/tmp/kubeconfig"));
        assert_eq!(config.context.as_deref(), Some("kind"));
        assert_eq!(config.pod_factory.init_image, "init:1.0");
        assert_eq!(config.pod_factory.init_image_pull_policy, "Always");
    }

    #[test]
    fn test_init_started() {
        assert!(!is_init_started(None));
        assert!(!is_init_started(Some(&pod("Pending", None, false))));
        assert!(!is_init_started(Some(&pod("Pending", Some(waiting()), false))));
        assert!(is_init_started(Some(&pod("Pending", Some(running()), false))));
        assert!(is_init_started(Some(&pod("Pending", Some(terminated()), false))));
        assert!(is_init_started(Some(&pod("Running", None, false))));
    }

    #[test]
    fn test_init_complete() {
        assert!(!is_init_complete(Some(&pod("Pending", Some(running()), false))));
        assert!(is_init_complete(Some(&pod("Pending", Some(terminated()), false))));
        assert!(is_init_complete(Some(&pod("Running", Some(running()), false))));
        assert!(is_init_complete(Some(&pod("Failed", None, false))));
    }

    #[test]
    fn test_ready_or_terminal() {
        assert!(!is_ready_or_terminal(None));
        assert!(!is_ready_or_terminal(Some(&pod("Running", None, false))));
        assert!(is_ready_or_terminal(Some(&pod("Running", None, true))));
        assert!(is_ready_or_terminal(Some(&pod("Succeeded", None, false))));
        assert!(is_ready_or_terminal(Some(&pod("Failed", None, false))));
    }

    #[test]
    fn test_active_phases() {
        assert!(is_active(&pod("Pending", None, false)));
        assert!(is_active(&pod("Running", None, false)));
        assert!(!is_active(&pod("Succeeded", None, false)));
    }
}
