//! Pod name generation
//!
//! Names are DNS-1123 labels. Replication names are deterministic per
//! attempt; connector names carry a random suffix.

use launcher_server_domain::launcher::PodNameGenerator;
use uuid::Uuid;

const MAX_POD_NAME: usize = 63;
const SUFFIX_LEN: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct DefaultPodNameGenerator;

impl DefaultPodNameGenerator {
    pub fn new() -> Self {
        Self
    }

    /// `registry/org/source-faker:1.0` -> `source-faker`
    fn image_short_name(image: &str) -> String {
        let last = image.rsplit('/').next().unwrap_or(image);
        let name = last.split([':', '@']).next().unwrap_or(last);
        dns_label(name)
    }

    fn connector_name(&self, image: &str, job_type: &str, job_id: &str, attempt_id: i64) -> String {
        let suffix: String = Uuid::new_v4().simple().to_string()[..SUFFIX_LEN].to_string();
        let tail = format!("-{}-{}-{}-{}", job_type, dns_label(job_id), attempt_id, suffix);
        let budget = MAX_POD_NAME.saturating_sub(tail.len());
        let mut head = Self::image_short_name(image);
        head.truncate(budget);
        let head = head.trim_end_matches('-');
        format!("{}{}", head, tail).trim_start_matches('-').to_string()
    }
}

fn dns_label(raw: &str) -> String {
    let lowered: String = raw
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    lowered.trim_matches('-').to_string()
}

impl PodNameGenerator for DefaultPodNameGenerator {
    fn orchestrator_pod_name(&self, job_id: &str, attempt_id: i64) -> String {
        format!("orchestrator-repl-job-{}-attempt-{}", dns_label(job_id), attempt_id)
    }

    fn replication_pod_name(&self, job_id: &str, attempt_id: i64) -> String {
        format!("replication-job-{}-attempt-{}", dns_label(job_id), attempt_id)
    }

    fn check_pod_name(&self, image: &str, job_id: &str, attempt_id: i64) -> String {
        self.connector_name(image, "check", job_id, attempt_id)
    }

    fn discover_pod_name(&self, image: &str, job_id: &str, attempt_id: i64) -> String {
        self.connector_name(image, "discover", job_id, attempt_id)
    }

    fn spec_pod_name(&self, image: &str, job_id: &str, attempt_id: i64) -> String {
        self.connector_name(image, "spec", job_id, attempt_id)
    }
}
