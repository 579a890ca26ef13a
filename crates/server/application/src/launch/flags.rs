//! Per-launch feature flag snapshot
//!
//! Every flag a launch depends on is resolved exactly once, against one
//! scope, before any spec is built. The snapshot is then passed by reference
//! to each step so spec construction and post-create branching never observe
//! different values.

use launcher_server_domain::launcher::{
    CONNECTOR_SIDECAR_FETCHES_INPUT_FROM_INIT, CONTAINER_ORCHESTRATOR_DEV_IMAGE,
    FeatureFlagClient, FlagContext, FlagScope, REPLICATION_MONO_POD,
    REPLICATION_MONO_POD_MEMORY_TOLERANCE,
};
use launcher_server_domain::workloads::WorkloadRequest;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchFlags {
    /// Connector init container fetches its own payload
    pub fetching_init: bool,
    pub mono_pod: bool,
    /// GiB
    pub mono_pod_memory_tolerance: i64,
    pub orchestrator_dev_image: Option<String>,
}

impl LaunchFlags {
    pub fn resolve(client: &dyn FeatureFlagClient, scope: &FlagScope) -> Self {
        let dev_image = client.string_variation(&CONTAINER_ORCHESTRATOR_DEV_IMAGE, scope);

        let flags = Self {
            fetching_init: client.bool_variation(&CONNECTOR_SIDECAR_FETCHES_INPUT_FROM_INIT, scope),
            mono_pod: client.bool_variation(&REPLICATION_MONO_POD, scope),
            mono_pod_memory_tolerance: client
                .int_variation(&REPLICATION_MONO_POD_MEMORY_TOLERANCE, scope),
            orchestrator_dev_image: Some(dev_image).filter(|image| !image.trim().is_empty()),
        };

        debug!(scope = %scope, ?flags, "Resolved launch flags");
        flags
    }
}

/// Workspace, connection (when the payload has one), then ambient contexts
pub fn launch_scope(request: &WorkloadRequest, ambient: &[FlagContext]) -> FlagScope {
    let mut contexts = vec![FlagContext::Workspace(request.workspace_id())];
    if let Some(connection_id) = request.connection_id() {
        contexts.push(FlagContext::Connection(connection_id));
    }
    contexts.extend(ambient.iter().cloned());
    FlagScope::new(contexts)
}
