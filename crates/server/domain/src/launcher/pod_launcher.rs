// PodLauncher Trait - Abstracción sobre las operaciones de pods del cluster
//
// Create/delete, blocking waits on pod phases and file injection. Every wait
// is bounded by the timeout the caller passes; an elapsed timeout is an error,
// never a silent return.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::pods::{LabelSelector, PodHandle, PodSpecification, PodTarget};

/// Errores de las operaciones con pods
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PodLauncherError {
    #[error("Timed out after {timeout:?} waiting for {condition} on {target}")]
    Timeout {
        condition: String,
        target: String,
        timeout: Duration,
    },

    #[error("Kubernetes API error: {message}")]
    Api { message: String },

    #[error("Failed to copy {file} into {pod}: {message}")]
    Copy {
        pod: String,
        file: String,
        message: String,
    },

    #[error("Pod not found: {target}")]
    NotFound { target: String },
}

impl PodLauncherError {
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, PodLauncherError>;

/// Operaciones de pods consumidas por el orquestador de launches
#[async_trait]
pub trait PodLauncher: Send + Sync {
    /// Create the pod and return its handle
    async fn create(&self, spec: &PodSpecification) -> Result<PodHandle>;

    /// Delete every matching pod that is not already terminating
    async fn delete_active_pods(&self, selector: &LabelSelector) -> Result<Vec<PodHandle>>;

    /// Whether any matching pod is pending or running
    async fn pods_running(&self, selector: &LabelSelector) -> Result<bool>;

    /// Every init container has terminated
    async fn wait_for_init_complete(&self, pod: &PodHandle, timeout: Duration) -> Result<()>;

    /// Every init container has at least started
    async fn wait_for_init_startup(&self, pod: &PodHandle, timeout: Duration) -> Result<()>;

    /// Main container ready, or the pod reached a terminal phase
    async fn wait_for_ready_or_terminal(&self, target: &PodTarget, timeout: Duration)
    -> Result<()>;

    /// Write every file into the pod's shared config volume
    async fn copy_files(&self, pod: &PodHandle, files: &BTreeMap<String, String>) -> Result<()>;
}
