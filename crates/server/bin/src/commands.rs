//! Subcommand handlers

use anyhow::Context;
use launcher_server_application::launch::LaunchOrchestrator;
use launcher_server_domain::workloads::WorkloadRequest;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

pub fn read_request(path: &Path) -> anyhow::Result<WorkloadRequest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Invalid workload request in {}", path.display()))
}

pub async fn launch(orchestrator: &LaunchOrchestrator, path: &Path) -> anyhow::Result<()> {
    let request = read_request(path)?;
    let workload_id = request.workload_id.clone();

    orchestrator
        .launch(&request)
        .await
        .with_context(|| format!("Launch of workload {} failed", workload_id))?;

    info!(workload_id = %workload_id, "Workload launched");
    println!("launched {}", workload_id);
    Ok(())
}

pub async fn evict(orchestrator: &LaunchOrchestrator, mutex_key: &str) -> anyhow::Result<()> {
    let deleted = orchestrator.evict_mutex_pods(mutex_key).await?;
    println!("{}", if deleted { "evicted" } else { "nothing to evict" });
    Ok(())
}

pub async fn exists(orchestrator: &LaunchOrchestrator, auto_id: Uuid) -> anyhow::Result<()> {
    let running = orchestrator
        .pods_exist_for_auto_id(auto_id)
        .await
        .with_context(|| format!("Failed to list pods for auto id {}", auto_id))?;
    println!("{}", running);
    Ok(())
}
