// Topology selection for sync / reset workloads

use launcher_server_domain::pods::Topology;
use launcher_server_domain::workloads::ReplicationInput;
use tracing::debug;

use super::flags::LaunchFlags;

const BYTES_PER_GIB: i64 = 1024 * 1024 * 1024;

/// Chooses between the mono pod and the triplet
pub struct TopologySelector;

impl TopologySelector {
    /// Sum of source, destination and orchestrator memory limits in bytes,
    /// saturating at `i64::MAX`
    pub fn memory_limit_total(input: &ReplicationInput) -> i64 {
        [
            input.source_resource_reqs(),
            input.destination_resource_reqs(),
            input.orchestrator_resource_reqs(),
        ]
        .into_iter()
        .flatten()
        .map(|reqs| reqs.memory_limit_bytes())
        .fold(0i64, i64::saturating_add)
    }

    /// Whole GiB by integer division. Non-positive values pass through.
    pub fn to_gigabytes(bytes: i64) -> i64 {
        if bytes > 0 { bytes / BYTES_PER_GIB } else { bytes }
    }

    /// A non-positive footprint (no limit configured) always fits.
    pub fn fits_tolerance(total_bytes: i64, tolerance_gib: i64) -> bool {
        total_bytes <= 0 || Self::to_gigabytes(total_bytes) <= tolerance_gib
    }

    pub fn select(input: &ReplicationInput, flags: &LaunchFlags) -> Topology {
        let total = Self::memory_limit_total(input);
        let fits = Self::fits_tolerance(total, flags.mono_pod_memory_tolerance);

        let topology = if flags.mono_pod && fits {
            Topology::Mono
        } else {
            Topology::Triplet
        };

        debug!(
            memory_limit_bytes = total,
            memory_limit_gib = Self::to_gigabytes(total),
            tolerance_gib = flags.mono_pod_memory_tolerance,
            mono_pod_flag = flags.mono_pod,
            ?topology,
            "Selected replication topology"
        );
        topology
    }
}
