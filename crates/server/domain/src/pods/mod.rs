//! Pods Bounded Context
//!
//! Especificaciones de pod ya resueltas, handles devueltos por el cluster y
//! los selectores por etiqueta que usa el launcher para localizarlos.

pub mod resources;

pub use resources::{QuantityParseError, ResourceRequirements, parse_quantity};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Well-known files injected into connector pods
pub mod files {
    pub const CONNECTION_CONFIGURATION: &str = "connectionConfiguration.json";
    pub const SIDECAR_INPUT: &str = "sidecarInput.json";
    /// Marker written once every file has been uploaded
    pub const FINISHED_UPLOADING: &str = "FINISHED_UPLOADING";
    /// Shared volume mount path
    pub const CONFIG_DIR: &str = "/config";
}

/// Rol de un pod dentro de un launch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PodType {
    Orchestrator,
    Source,
    Destination,
    /// Mono pod running the three replication roles
    Replication,
    /// Check / discover / spec pod with sidecar
    Connector,
}

impl fmt::Display for PodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Orchestrator => write!(f, "ORCHESTRATOR"),
            Self::Source => write!(f, "SOURCE"),
            Self::Destination => write!(f, "DESTINATION"),
            Self::Replication => write!(f, "REPLICATION"),
            Self::Connector => write!(f, "CONNECTOR"),
        }
    }
}

/// Execution shape of a sync/reset workload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Topology {
    /// Orchestrator pod plus source and destination connector pods
    Triplet,
    /// A single pod running all three roles as sibling containers
    Mono,
}

/// How a pod's init container obtains its input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitStrategy {
    /// The init container fetches its own payload
    SelfFetch,
    /// The launcher copies the file map in after init starts
    CopyFiles,
}

/// Variable de entorno (el orden importa)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Contenedor dentro de una especificación de pod
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub image_pull_policy: String,
    pub resources: Option<ResourceRequirements>,
    pub env: Vec<EnvVar>,
}

/// Especificación de pod lista para crear
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodSpecification {
    pub name: String,
    pub pod_type: PodType,
    pub labels: BTreeMap<String, String>,
    pub node_selectors: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub containers: Vec<ContainerSpec>,
    pub init_strategy: InitStrategy,
    /// File name -> serialized content; empty under `SelfFetch`
    pub file_map: BTreeMap<String, String>,
}

impl PodSpecification {
    pub fn container(&self, name: &str) -> Option<&ContainerSpec> {
        self.containers.iter().find(|c| c.name == name)
    }

    /// Label selector matching every label of this spec
    pub fn selector(&self) -> LabelSelector {
        LabelSelector::new(self.labels.clone())
    }
}

/// Handle de un pod creado en el cluster
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PodHandle {
    pub name: String,
    pub namespace: String,
    pub uid: Option<String>,
}

impl fmt::Display for PodHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Equality-based label selector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSelector {
    pub labels: BTreeMap<String, String>,
}

impl LabelSelector {
    pub fn new(labels: BTreeMap<String, String>) -> Self {
        Self { labels }
    }

    pub fn single(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(key.into(), value.into());
        Self { labels }
    }

    /// Every selector label is present with the same value
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.labels
            .iter()
            .all(|(k, v)| labels.get(k).is_some_and(|actual| actual == v))
    }

    /// `k1=v1,k2=v2` as accepted by the Kubernetes list API
    pub fn to_query(&self) -> String {
        self.labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_query())
    }
}

/// Target of a ready-or-terminal wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PodTarget {
    Pod(PodHandle),
    Labels(LabelSelector),
}

impl fmt::Display for PodTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pod(handle) => write!(f, "pod {}", handle),
            Self::Labels(selector) => write!(f, "pods matching {}", selector),
        }
    }
}
