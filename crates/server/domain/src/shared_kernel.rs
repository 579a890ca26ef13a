// Errores compartidos del launcher

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pods::PodType;

/// Fase del launch en la que falló la operación con el cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KubeCommandType {
    Create,
    WaitInit,
    WaitMain,
    Copy,
    Delete,
}

impl fmt::Display for KubeCommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "CREATE"),
            Self::WaitInit => write!(f, "WAIT_INIT"),
            Self::WaitMain => write!(f, "WAIT_MAIN"),
            Self::Copy => write!(f, "COPY"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error tipado de un launch
///
/// Never retried internally. Carries the underlying cause plus the pod role
/// and name when they are known.
#[derive(thiserror::Error, Debug)]
#[error("{message} [command={command}]")]
pub struct LaunchError {
    pub message: String,
    #[source]
    pub source: BoxError,
    pub command: KubeCommandType,
    pub pod_type: Option<PodType>,
    pub pod_name: Option<String>,
}

impl LaunchError {
    pub fn new(
        message: impl Into<String>,
        source: impl Into<BoxError>,
        command: KubeCommandType,
    ) -> Self {
        Self {
            message: message.into(),
            source: source.into(),
            command,
            pod_type: None,
            pod_name: None,
        }
    }

    pub fn with_pod_type(mut self, pod_type: PodType) -> Self {
        self.pod_type = Some(pod_type);
        self
    }

    pub fn with_pod_name(mut self, pod_name: impl Into<String>) -> Self {
        self.pod_name = Some(pod_name.into());
        self
    }
}

/// Error al construir una especificación de pod
#[derive(thiserror::Error, Debug)]
pub enum SpecBuildError {
    #[error("Failed to serialize {file}: {source}")]
    Serialization {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Workload {workload_id} is not a {expected} workload")]
    UnexpectedPayload {
        workload_id: String,
        expected: &'static str,
    },
}
