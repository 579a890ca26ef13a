//! In-memory pod launcher
//!
//! Simulates a single namespace indexed by labels. Waits resolve immediately:
//! a wait on pods that do not exist fails with `Timeout` instead of sleeping,
//! which keeps orchestrator scenarios deterministic.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use launcher_server_domain::launcher::{PodLauncher, PodLauncherError};
use launcher_server_domain::pods::{
    LabelSelector, PodHandle, PodSpecification, PodTarget, PodType,
};

type Result<T> = std::result::Result<T, PodLauncherError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl SimulatedPhase {
    fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedPod {
    pub name: String,
    pub pod_type: Option<PodType>,
    pub labels: BTreeMap<String, String>,
    pub phase: SimulatedPhase,
    pub terminating: bool,
    pub spec: Option<PodSpecification>,
    pub files: BTreeMap<String, String>,
}

impl SimulatedPod {
    /// Pod created outside the launcher, e.g. a connector started by the
    /// orchestrator
    pub fn external(name: impl Into<String>, labels: BTreeMap<String, String>) -> Self {
        Self {
            name: name.into(),
            pod_type: None,
            labels,
            phase: SimulatedPhase::Running,
            terminating: false,
            spec: None,
            files: BTreeMap::new(),
        }
    }

    pub fn with_phase(mut self, phase: SimulatedPhase) -> Self {
        self.phase = phase;
        self
    }

    pub fn terminating(mut self) -> Self {
        self.terminating = true;
        self
    }
}

/// Recorded port invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LauncherCall {
    Create { name: String, pod_type: PodType },
    DeleteActive(String),
    PodsRunning(String),
    WaitInitComplete(String),
    WaitInitStartup(String),
    WaitReady(String),
    CopyFiles { pod: String, files: Vec<String> },
}

impl LauncherCall {
    fn target(&self) -> &str {
        match self {
            Self::Create { name, .. } => name,
            Self::DeleteActive(t)
            | Self::PodsRunning(t)
            | Self::WaitInitComplete(t)
            | Self::WaitInitStartup(t)
            | Self::WaitReady(t) => t,
            Self::CopyFiles { pod, .. } => pod,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    DeleteActive,
    PodsRunning,
    WaitInitComplete,
    WaitInitStartup,
    WaitReady,
    CopyFiles,
}

impl Operation {
    fn of(call: &LauncherCall) -> Self {
        match call {
            LauncherCall::Create { .. } => Self::Create,
            LauncherCall::DeleteActive(_) => Self::DeleteActive,
            LauncherCall::PodsRunning(_) => Self::PodsRunning,
            LauncherCall::WaitInitComplete(_) => Self::WaitInitComplete,
            LauncherCall::WaitInitStartup(_) => Self::WaitInitStartup,
            LauncherCall::WaitReady(_) => Self::WaitReady,
            LauncherCall::CopyFiles { .. } => Self::CopyFiles,
        }
    }
}

#[derive(Debug, Clone)]
struct Failure {
    operation: Operation,
    /// Substring of the call target; None matches every target
    target: Option<String>,
    error: PodLauncherError,
}

#[derive(Debug, Default)]
struct State {
    pods: BTreeMap<String, SimulatedPod>,
    calls: Vec<LauncherCall>,
    failures: Vec<Failure>,
}

#[derive(Debug)]
pub struct InMemoryPodLauncher {
    namespace: String,
    fresh_phase: SimulatedPhase,
    state: Mutex<State>,
}

impl Default for InMemoryPodLauncher {
    fn default() -> Self {
        Self::new("default")
    }
}

impl InMemoryPodLauncher {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            fresh_phase: SimulatedPhase::Running,
            state: Mutex::new(State::default()),
        }
    }

    /// Phase given to pods created through the port
    pub fn with_created_phase(mut self, phase: SimulatedPhase) -> Self {
        self.fresh_phase = phase;
        self
    }

    pub fn with_pod(self, pod: SimulatedPod) -> Self {
        self.seed(pod);
        self
    }

    pub fn seed(&self, pod: SimulatedPod) {
        self.lock().pods.insert(pod.name.clone(), pod);
    }

    /// Fail `operation` whenever its target contains `target`
    pub fn fail_on(self, operation: Operation, target: Option<&str>, error: PodLauncherError) -> Self {
        self.lock().failures.push(Failure {
            operation,
            target: target.map(str::to_string),
            error,
        });
        self
    }

    pub fn calls(&self) -> Vec<LauncherCall> {
        self.lock().calls.clone()
    }

    pub fn pods(&self) -> Vec<SimulatedPod> {
        self.lock().pods.values().cloned().collect()
    }

    pub fn pod(&self, name: &str) -> Option<SimulatedPod> {
        self.lock().pods.get(name).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned lock only means another test thread panicked
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn handle(&self, name: &str) -> PodHandle {
        PodHandle {
            name: name.to_string(),
            namespace: self.namespace.clone(),
            uid: Some(format!("uid-{}", name)),
        }
    }

    /// Records the call and returns the scripted failure, if any
    fn record(&self, state: &mut State, call: LauncherCall) -> Result<()> {
        let operation = Operation::of(&call);
        let scripted = state
            .failures
            .iter()
            .find(|f| {
                f.operation == operation
                    && f.target
                        .as_deref()
                        .is_none_or(|t| call.target().contains(t))
            })
            .map(|f| f.error.clone());
        state.calls.push(call);
        scripted.map_or(Ok(()), Err)
    }

    fn timeout(condition: &str, target: String, timeout: Duration) -> PodLauncherError {
        PodLauncherError::Timeout {
            condition: condition.to_string(),
            target,
            timeout,
        }
    }
}

#[async_trait]
impl PodLauncher for InMemoryPodLauncher {
    async fn create(&self, spec: &PodSpecification) -> Result<PodHandle> {
        let mut state = self.lock();
        self.record(
            &mut state,
            LauncherCall::Create {
                name: spec.name.clone(),
                pod_type: spec.pod_type,
            },
        )?;

        if state.pods.contains_key(&spec.name) {
            return Err(PodLauncherError::api(format!(
                "pods \"{}\" already exists",
                spec.name
            )));
        }

        state.pods.insert(
            spec.name.clone(),
            SimulatedPod {
                name: spec.name.clone(),
                pod_type: Some(spec.pod_type),
                labels: spec.labels.clone(),
                phase: self.fresh_phase,
                terminating: false,
                spec: Some(spec.clone()),
                files: BTreeMap::new(),
            },
        );
        Ok(self.handle(&spec.name))
    }

    async fn delete_active_pods(&self, selector: &LabelSelector) -> Result<Vec<PodHandle>> {
        let mut state = self.lock();
        self.record(&mut state, LauncherCall::DeleteActive(selector.to_query()))?;

        let doomed: Vec<String> = state
            .pods
            .values()
            .filter(|p| !p.terminating && selector.matches(&p.labels))
            .map(|p| p.name.clone())
            .collect();

        for name in &doomed {
            state.pods.remove(name);
        }
        Ok(doomed.iter().map(|name| self.handle(name)).collect())
    }

    async fn pods_running(&self, selector: &LabelSelector) -> Result<bool> {
        let mut state = self.lock();
        self.record(&mut state, LauncherCall::PodsRunning(selector.to_query()))?;

        Ok(state
            .pods
            .values()
            .any(|p| selector.matches(&p.labels) && p.phase.is_active()))
    }

    async fn wait_for_init_complete(&self, pod: &PodHandle, timeout: Duration) -> Result<()> {
        let mut state = self.lock();
        self.record(&mut state, LauncherCall::WaitInitComplete(pod.name.clone()))?;

        if state.pods.contains_key(&pod.name) {
            Ok(())
        } else {
            Err(Self::timeout("init-complete", pod.to_string(), timeout))
        }
    }

    async fn wait_for_init_startup(&self, pod: &PodHandle, timeout: Duration) -> Result<()> {
        let mut state = self.lock();
        self.record(&mut state, LauncherCall::WaitInitStartup(pod.name.clone()))?;

        if state.pods.contains_key(&pod.name) {
            Ok(())
        } else {
            Err(Self::timeout("init-startup", pod.to_string(), timeout))
        }
    }

    async fn wait_for_ready_or_terminal(
        &self,
        target: &PodTarget,
        timeout: Duration,
    ) -> Result<()> {
        let mut state = self.lock();
        let key = match target {
            PodTarget::Pod(handle) => handle.name.clone(),
            PodTarget::Labels(selector) => selector.to_query(),
        };
        self.record(&mut state, LauncherCall::WaitReady(key))?;

        let found = match target {
            PodTarget::Pod(handle) => state.pods.contains_key(&handle.name),
            PodTarget::Labels(selector) => {
                state.pods.values().any(|p| selector.matches(&p.labels))
            }
        };

        if found {
            Ok(())
        } else {
            Err(Self::timeout("ready-or-terminal", target.to_string(), timeout))
        }
    }

    async fn copy_files(&self, pod: &PodHandle, files: &BTreeMap<String, String>) -> Result<()> {
        let mut state = self.lock();
        self.record(
            &mut state,
            LauncherCall::CopyFiles {
                pod: pod.name.clone(),
                files: files.keys().cloned().collect(),
            },
        )?;

        let stored = state
            .pods
            .get_mut(&pod.name)
            .ok_or_else(|| PodLauncherError::NotFound {
                target: pod.to_string(),
            })?;
        stored.files.extend(files.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use launcher_server_domain::pods::InitStrategy;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn spec(name: &str) -> PodSpecification {
        PodSpecification {
            name: name.to_string(),
            pod_type: PodType::Connector,
            labels: labels(&[("mutex_key", "m1")]),
            node_selectors: BTreeMap::new(),
            annotations: BTreeMap::new(),
            containers: vec![],
            init_strategy: InitStrategy::CopyFiles,
            file_map: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_create_then_duplicate_fails() {
        let launcher = InMemoryPodLauncher::new("jobs");
        let handle = launcher.create(&spec("check-1")).await.unwrap();

        assert_eq!(handle.to_string(), "jobs/check-1");
        assert!(launcher.create(&spec("check-1")).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_skips_terminating_pods() {
        let launcher = InMemoryPodLauncher::default()
            .with_pod(SimulatedPod::external("a", labels(&[("mutex_key", "m1")])))
            .with_pod(SimulatedPod::external("b", labels(&[("mutex_key", "m1")])).terminating())
            .with_pod(SimulatedPod::external("c", labels(&[("mutex_key", "m2")])));

        let deleted = launcher
            .delete_active_pods(&LabelSelector::single("mutex_key", "m1"))
            .await
            .unwrap();

        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].name, "a");
        assert_eq!(launcher.pods().len(), 2);
    }

    #[tokio::test]
    async fn test_pods_running_ignores_finished_pods() {
        let launcher = InMemoryPodLauncher::default().with_pod(
            SimulatedPod::external("done", labels(&[("auto_id", "x")]))
                .with_phase(SimulatedPhase::Succeeded),
        );
        let selector = LabelSelector::single("auto_id", "x");

        assert!(!launcher.pods_running(&selector).await.unwrap());

        launcher.seed(SimulatedPod::external("live", labels(&[("auto_id", "x")])));
        assert!(launcher.pods_running(&selector).await.unwrap());
    }

    #[tokio::test]
    async fn test_label_wait_times_out_without_match() {
        let launcher = InMemoryPodLauncher::default();
        let target = PodTarget::Labels(LabelSelector::single("component", "destination"));

        let err = launcher
            .wait_for_ready_or_terminal(&target, Duration::from_secs(3))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_scripted_failure_matches_target() {
        let launcher = InMemoryPodLauncher::default().fail_on(
            Operation::Create,
            Some("orchestrator"),
            PodLauncherError::api("admission denied"),
        );

        assert!(launcher.create(&spec("check-1")).await.is_ok());
        assert!(launcher.create(&spec("orchestrator-1")).await.is_err());
        assert_eq!(launcher.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_copy_files_stores_content() {
        let launcher = InMemoryPodLauncher::default();
        let handle = launcher.create(&spec("check-1")).await.unwrap();
        let files = BTreeMap::from([("sidecarInput.json".to_string(), "{}".to_string())]);

        launcher.copy_files(&handle, &files).await.unwrap();

        assert_eq!(launcher.pod("check-1").unwrap().files, files);
    }
}
