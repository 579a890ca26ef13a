//! Runtime environment for launched containers

use launcher_server_domain::launcher::RuntimeEnvVarFactory;
use launcher_server_domain::pods::EnvVar;
use launcher_server_domain::workloads::{IntegrationLauncherConfig, ReplicationInput};

pub mod env_keys {
    pub const WORKSPACE_ID: &str = "WORKSPACE_ID";
    pub const CONNECTION_ID: &str = "CONNECTION_ID";
    pub const IS_RESET: &str = "IS_RESET";
    pub const SOURCE_IMAGE: &str = "SOURCE_IMAGE";
    pub const DESTINATION_IMAGE: &str = "DESTINATION_IMAGE";
    pub const CONNECTOR_IMAGE: &str = "CONNECTOR_IMAGE";
    pub const USE_CUSTOM_CONNECTOR: &str = "USE_CUSTOM_CONNECTOR";
}

#[derive(Debug, Clone, Default)]
pub struct DefaultRuntimeEnvVarFactory {
    /// Appended to every container after the role variables
    extra: Vec<EnvVar>,
}

impl DefaultRuntimeEnvVarFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extra(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push(EnvVar::new(name, value));
        self
    }

    fn connector_vars(&self, config: &IntegrationLauncherConfig) -> Vec<EnvVar> {
        let mut vars = vec![
            EnvVar::new(env_keys::WORKSPACE_ID, config.workspace_id.to_string()),
            EnvVar::new(env_keys::CONNECTOR_IMAGE, config.docker_image.clone()),
            EnvVar::new(
                env_keys::USE_CUSTOM_CONNECTOR,
                config.is_custom_connector.to_string(),
            ),
        ];
        if let Some(connection_id) = config.connection_id {
            vars.push(EnvVar::new(env_keys::CONNECTION_ID, connection_id.to_string()));
        }
        vars.extend(
            config
                .additional_environment
                .iter()
                .map(|(k, v)| EnvVar::new(k.clone(), v.clone())),
        );
        vars.extend(self.extra.iter().cloned());
        vars
    }
}

impl RuntimeEnvVarFactory for DefaultRuntimeEnvVarFactory {
    fn orchestrator_env_vars(&self, input: &ReplicationInput, _workload_id: &str) -> Vec<EnvVar> {
        let mut vars = vec![
            EnvVar::new(env_keys::WORKSPACE_ID, input.workspace_id.to_string()),
            EnvVar::new(env_keys::CONNECTION_ID, input.connection_id.to_string()),
            EnvVar::new(env_keys::IS_RESET, input.is_reset.to_string()),
            EnvVar::new(
                env_keys::SOURCE_IMAGE,
                input.source_launcher_config.docker_image.clone(),
            ),
            EnvVar::new(
                env_keys::DESTINATION_IMAGE,
                input.destination_launcher_config.docker_image.clone(),
            ),
        ];
        vars.extend(self.extra.iter().cloned());
        vars
    }

    fn replication_connector_env_vars(&self, config: &IntegrationLauncherConfig) -> Vec<EnvVar> {
        self.connector_vars(config)
    }

    fn check_connector_env_vars(
        &self,
        config: &IntegrationLauncherConfig,
        _workload_id: &str,
    ) -> Vec<EnvVar> {
        self.connector_vars(config)
    }

    fn discover_connector_env_vars(
        &self,
        config: &IntegrationLauncherConfig,
        _workload_id: &str,
    ) -> Vec<EnvVar> {
        self.connector_vars(config)
    }

    fn spec_connector_env_vars(
        &self,
        config: &IntegrationLauncherConfig,
        _workload_id: &str,
    ) -> Vec<EnvVar> {
        self.connector_vars(config)
    }
}
