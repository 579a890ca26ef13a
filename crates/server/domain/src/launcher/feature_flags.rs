//! Feature flags consumidos por el launcher
//!
//! Flags are typed constants carrying their key and default. Evaluation is
//! always scoped by a [`FlagScope`]; callers resolve every flag they need once
//! per launch.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One evaluation context
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlagContext {
    Workspace(Uuid),
    Connection(Uuid),
    /// Ambient context such as a dataplane group or cluster name
    Other { kind: String, key: String },
}

impl FlagContext {
    pub fn kind(&self) -> &str {
        match self {
            Self::Workspace(_) => "workspace",
            Self::Connection(_) => "connection",
            Self::Other { kind, .. } => kind,
        }
    }

    pub fn key(&self) -> String {
        match self {
            Self::Workspace(id) | Self::Connection(id) => id.to_string(),
            Self::Other { key, .. } => key.clone(),
        }
    }
}

impl fmt::Display for FlagContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.key())
    }
}

/// Composite (multi-context) evaluation scope
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlagScope {
    pub contexts: Vec<FlagContext>,
}

impl FlagScope {
    pub fn new(contexts: Vec<FlagContext>) -> Self {
        Self { contexts }
    }

    pub fn with(mut self, context: FlagContext) -> Self {
        self.contexts.push(context);
        self
    }
}

impl fmt::Display for FlagScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.contexts.iter().map(|c| c.to_string()).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoolFlag {
    pub key: &'static str,
    pub default: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntFlag {
    pub key: &'static str,
    pub default: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringFlag {
    pub key: &'static str,
    pub default: &'static str,
}

/// Init container of connector pods fetches its own payload
pub const CONNECTOR_SIDECAR_FETCHES_INPUT_FROM_INIT: BoolFlag = BoolFlag {
    key: "connector-sidecar-fetches-input-from-init",
    default: false,
};

pub const REPLICATION_MONO_POD: BoolFlag = BoolFlag {
    key: "replication-mono-pod",
    default: false,
};

/// Maximum memory footprint (GiB) eligible for the mono pod
pub const REPLICATION_MONO_POD_MEMORY_TOLERANCE: IntFlag = IntFlag {
    key: "replication-mono-pod-memory-tolerance",
    default: 0,
};

/// Non-empty value replaces the orchestrator image
pub const CONTAINER_ORCHESTRATOR_DEV_IMAGE: StringFlag = StringFlag {
    key: "container-orchestrator-dev-image",
    default: "",
};

/// Feature flag evaluation service
pub trait FeatureFlagClient: Send + Sync {
    fn bool_variation(&self, flag: &BoolFlag, scope: &FlagScope) -> bool;

    fn int_variation(&self, flag: &IntFlag, scope: &FlagScope) -> i64;

    fn string_variation(&self, flag: &StringFlag, scope: &FlagScope) -> String;
}
