//! Label policy
//!
//! Keys are fixed; values are sanitized to the Kubernetes label value
//! grammar (63 chars, alphanumeric at both ends, `-_.` inside).

use launcher_server_domain::launcher::{Labels, PodLabeler};
use uuid::Uuid;

pub mod label_keys {
    pub const WORKLOAD_ID: &str = "workload_id";
    pub const MUTEX_KEY: &str = "mutex_key";
    pub const AUTO_ID: &str = "auto_id";
    pub const COMPONENT: &str = "component";
    pub const JOB_TYPE: &str = "job_type";
    pub const ORCHESTRATOR_IMAGE: &str = "orchestrator_image";
    pub const SOURCE_IMAGE: &str = "source_image";
    pub const DESTINATION_IMAGE: &str = "destination_image";
    pub const CONNECTOR_IMAGE: &str = "connector_image";
    pub const MANAGED_BY: &str = "app.kubernetes.io/managed-by";
}

const MAX_LABEL_VALUE: usize = 63;
const MANAGED_BY_VALUE: &str = "workload-launcher";
const DIGEST_LEN: usize = 8;

/// Maps `raw` onto the label value grammar. Values that had to be
/// rewritten carry an `-<fnv1a>` digest of the raw input so that distinct
/// keys stay distinct selectors.
pub fn sanitize_label_value(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();

    let trimmed = replaced.trim_matches(|c: char| !c.is_ascii_alphanumeric());
    if trimmed == raw && raw.len() <= MAX_LABEL_VALUE {
        return trimmed.to_string();
    }

    let digest = format!("{:08x}", fnv1a(raw.as_bytes()));
    let head: String = trimmed
        .chars()
        .take(MAX_LABEL_VALUE - DIGEST_LEN - 1)
        .collect();
    let head = head.trim_end_matches(|c: char| !c.is_ascii_alphanumeric());
    if head.is_empty() {
        digest
    } else {
        format!("{}-{}", head, digest)
    }
}

// Stable across toolchains, unlike `DefaultHasher`.
fn fnv1a(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0x811c_9dc5u32, |hash, b| {
        (hash ^ u32::from(*b)).wrapping_mul(0x0100_0193)
    })
}

fn labels<const N: usize>(pairs: [(&str, String); N]) -> Labels {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), sanitize_label_value(&v)))
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct DefaultPodLabeler;

impl DefaultPodLabeler {
    pub fn new() -> Self {
        Self
    }

    fn connector_labels(job_type: &str, image: &str) -> Labels {
        labels([
            (label_keys::JOB_TYPE, job_type.to_string()),
            (label_keys::CONNECTOR_IMAGE, image.to_string()),
        ])
    }
}

impl PodLabeler for DefaultPodLabeler {
    fn get_shared_labels(
        &self,
        workload_id: Option<&str>,
        mutex_key: Option<&str>,
        passthrough: &Labels,
        auto_id: Option<Uuid>,
    ) -> Labels {
        let mut shared = passthrough.clone();
        shared.insert(
            label_keys::MANAGED_BY.to_string(),
            MANAGED_BY_VALUE.to_string(),
        );
        if let Some(id) = workload_id {
            shared.insert(label_keys::WORKLOAD_ID.to_string(), sanitize_label_value(id));
        }
        if let Some(key) = mutex_key {
            shared.extend(self.get_mutex_labels(key));
        }
        if let Some(id) = auto_id {
            shared.extend(self.get_auto_id_labels(id));
        }
        shared
    }

    fn get_mutex_labels(&self, mutex_key: &str) -> Labels {
        labels([(label_keys::MUTEX_KEY, mutex_key.to_string())])
    }

    fn get_auto_id_labels(&self, auto_id: Uuid) -> Labels {
        labels([(label_keys::AUTO_ID, auto_id.to_string())])
    }

    fn get_orchestrator_labels(&self) -> Labels {
        labels([(label_keys::COMPONENT, "replication-orchestrator".to_string())])
    }

    fn get_source_labels(&self) -> Labels {
        labels([(label_keys::COMPONENT, "source".to_string())])
    }

    fn get_destination_labels(&self) -> Labels {
        labels([(label_keys::COMPONENT, "destination".to_string())])
    }

    fn get_replication_labels(
        &self,
        orchestrator_image: &str,
        source_image: &str,
        destination_image: &str,
    ) -> Labels {
        labels([
            (label_keys::COMPONENT, "replication".to_string()),
            (label_keys::ORCHESTRATOR_IMAGE, orchestrator_image.to_string()),
            (label_keys::SOURCE_IMAGE, source_image.to_string()),
            (label_keys::DESTINATION_IMAGE, destination_image.to_string()),
        ])
    }

    fn get_check_labels(&self, image: &str) -> Labels {
        Self::connector_labels("check", image)
    }

    fn get_discover_labels(&self, image: &str) -> Labels {
        Self::connector_labels("discover", image)
    }

    fn get_spec_labels(&self, image: &str) -> Labels {
        Self::connector_labels("spec", image)
    }
}
