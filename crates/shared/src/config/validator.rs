//! Configuration validation
//!
//! This module provides validation logic for configuration DTOs.

use super::dto::{LauncherConfigDto, TimeoutConfig, WorkerGroupConfig};
use super::error::{ConfigError, Result};

/// Validate timeout budgets
///
/// Every phase budget must be strictly positive; the slack may be zero.
pub fn validate_timeouts(timeouts: &TimeoutConfig) -> Result<()> {
    let budgets = [
        ("orchestrator_startup_secs", timeouts.orchestrator_startup_secs),
        ("pod_init_secs", timeouts.pod_init_secs),
        ("full_pod_secs", timeouts.full_pod_secs),
    ];

    for (name, value) in budgets {
        if value == 0 {
            return Err(ConfigError::Validation(format!(
                "{} must be greater than 0",
                name
            )));
        }
    }

    Ok(())
}

/// Validate one worker group
///
/// Selector and annotation keys must be non-empty.
pub fn validate_group_config(group_name: &str, group: &WorkerGroupConfig) -> Result<()> {
    let isolated = group.isolated_node_selectors.iter().flat_map(|s| s.keys());
    let keys = group
        .node_selectors
        .keys()
        .chain(isolated)
        .chain(group.annotations.keys());

    for key in keys {
        if key.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{} group contains an empty selector or annotation key",
                group_name
            )));
        }
    }

    Ok(())
}

/// Validate complete launcher configuration
pub fn validate_launcher_config(config: &LauncherConfigDto) -> Result<()> {
    if config.kubernetes.namespace.trim().is_empty() {
        return Err(ConfigError::Validation(
            "Kubernetes namespace cannot be empty".to_string(),
        ));
    }

    let images = [
        ("orchestrator_image", &config.images.orchestrator_image),
        ("sidecar_image", &config.images.sidecar_image),
        ("init_image", &config.images.init_image),
    ];
    for (name, image) in images {
        if image.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    validate_timeouts(&config.timeouts)?;

    validate_group_config("replication", &config.groups.replication)?;
    validate_group_config("check", &config.groups.check)?;
    validate_group_config("discover", &config.groups.discover)?;
    validate_group_config("spec", &config.groups.spec)?;

    Ok(())
}
