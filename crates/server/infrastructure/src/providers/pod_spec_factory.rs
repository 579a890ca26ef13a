//! PodSpec Factory
//!
//! Componente dedicado para materializar una `PodSpecification` del dominio
//! en un `Pod` de Kubernetes.
//!
//! Responsabilidades:
//! - Construir los containers (init + containers de la especificación)
//! - Montar el volumen compartido `config` en todos los containers
//! - Traducir recursos, node selectors y annotations
//! - Construir security context e image pull secrets

use k8s_openapi::api::core::v1::{
    Container, EmptyDirVolumeSource, EnvVar, LocalObjectReference, Pod, PodSpec,
    ResourceRequirements as K8sResourceRequirements, SecurityContext, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

use launcher_server_domain::launcher::env_names;
use launcher_server_domain::pods::{
    ContainerSpec, InitStrategy, PodSpecification, ResourceRequirements, files,
};

pub const INIT_CONTAINER: &str = "init";
pub const CONFIG_VOLUME: &str = "config";

/// Configuración base para construcción de Pods
#[derive(Debug, Clone)]
pub struct PodSpecFactoryConfig {
    /// Image of the `init` container
    pub init_image: String,
    /// Pull policy of the `init` container
    pub init_image_pull_policy: String,
    /// Service account name
    pub service_account: Option<String>,
    /// Image pull secrets
    pub image_pull_secrets: Vec<String>,
    /// Run containers as this non-root user (None = no security context)
    pub run_as_user: Option<i64>,
}

impl Default for PodSpecFactoryConfig {
    fn default() -> Self {
        Self {
            init_image: "workload-init-container:latest".to_string(),
            init_image_pull_policy: "IfNotPresent".to_string(),
            service_account: None,
            image_pull_secrets: vec![],
            run_as_user: Some(1000),
        }
    }
}

/// PodSpecFactory - Factory para construcción de Pods de Kubernetes
#[derive(Debug, Clone)]
pub struct PodSpecFactory {
    config: PodSpecFactoryConfig,
}

impl PodSpecFactory {
    pub fn new(config: Option<PodSpecFactoryConfig>) -> Self {
        Self {
            config: config.unwrap_or_default(),
        }
    }

    /// Construir un Pod completo desde una PodSpecification
    pub fn build_pod(&self, spec: &PodSpecification, namespace: &str) -> Pod {
        let security_context = self.build_security_context();

        let containers: Vec<Container> = spec
            .containers
            .iter()
            .map(|c| self.build_container(c, security_context.clone()))
            .collect();

        let init_container = self.build_init_container(spec, security_context);

        let metadata = ObjectMeta {
            name: Some(spec.name.clone()),
            namespace: Some(namespace.to_string()),
            labels: Some(spec.labels.clone()),
            annotations: (!spec.annotations.is_empty()).then(|| spec.annotations.clone()),
            ..Default::default()
        };

        Pod {
            metadata,
            spec: Some(PodSpec {
                containers,
                init_containers: Some(vec![init_container]),
                restart_policy: Some("Never".to_string()),
                service_account_name: self.config.service_account.clone(),
                node_selector: (!spec.node_selectors.is_empty())
                    .then(|| spec.node_selectors.clone()),
                volumes: Some(vec![Volume {
                    name: CONFIG_VOLUME.to_string(),
                    empty_dir: Some(EmptyDirVolumeSource::default()),
                    ..Default::default()
                }]),
                image_pull_secrets: self.build_image_pull_secrets(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn config_mount() -> VolumeMount {
        VolumeMount {
            name: CONFIG_VOLUME.to_string(),
            mount_path: files::CONFIG_DIR.to_string(),
            ..Default::default()
        }
    }

    fn build_env_vars(vars: &[launcher_server_domain::pods::EnvVar]) -> Vec<EnvVar> {
        vars.iter()
            .map(|v| EnvVar {
                name: v.name.clone(),
                value: Some(v.value.clone()),
                ..Default::default()
            })
            .collect()
    }

    /// Requests/limits, or `None` when nothing is set
    pub fn build_resources(reqs: Option<&ResourceRequirements>) -> Option<K8sResourceRequirements> {
        let reqs = reqs.filter(|r| !r.is_empty())?;

        let pairs = |cpu: &Option<String>, memory: &Option<String>| {
            let mut map = BTreeMap::new();
            if let Some(cpu) = cpu {
                map.insert("cpu".to_string(), Quantity(cpu.clone()));
            }
            if let Some(memory) = memory {
                map.insert("memory".to_string(), Quantity(memory.clone()));
            }
            (!map.is_empty()).then_some(map)
        };

        Some(K8sResourceRequirements {
            claims: None,
            requests: pairs(&reqs.cpu_request, &reqs.memory_request),
            limits: pairs(&reqs.cpu_limit, &reqs.memory_limit),
        })
    }

    fn build_container(
        &self,
        spec: &ContainerSpec,
        security_context: Option<SecurityContext>,
    ) -> Container {
        Container {
            name: spec.name.clone(),
            image: Some(spec.image.clone()),
            image_pull_policy: Some(spec.image_pull_policy.clone()),
            env: Some(Self::build_env_vars(&spec.env)),
            resources: Self::build_resources(spec.resources.as_ref()),
            volume_mounts: Some(vec![Self::config_mount()]),
            security_context,
            ..Default::default()
        }
    }

    /// Self-fetch: the init image pulls the payload for `WORKLOAD_ID`.
    /// Copy: the init container blocks until the upload marker exists.
    fn build_init_container(
        &self,
        spec: &PodSpecification,
        security_context: Option<SecurityContext>,
    ) -> Container {
        let mut container = Container {
            name: INIT_CONTAINER.to_string(),
            image: Some(self.config.init_image.clone()),
            image_pull_policy: Some(self.config.init_image_pull_policy.clone()),
            volume_mounts: Some(vec![Self::config_mount()]),
            security_context,
            ..Default::default()
        };

        match spec.init_strategy {
            InitStrategy::SelfFetch => {
                let markers: Vec<_> = spec
                    .containers
                    .first()
                    .map(|c| {
                        c.env
                            .iter()
                            .filter(|v| {
                                [env_names::WORKLOAD_ID, env_names::OPERATION_TYPE]
                                    .contains(&v.name.as_str())
                            })
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default();
                container.env = Some(Self::build_env_vars(&markers));
            }
            InitStrategy::CopyFiles => {
                container.command = Some(vec!["sh".to_string(), "-c".to_string()]);
                container.args = Some(vec![format!(
                    "i=0; until [ -f {dir}/{marker} ]; do i=$((i+1)); sleep 0.1; done; echo \"uploaded after $i polls\"",
                    dir = files::CONFIG_DIR,
                    marker = files::FINISHED_UPLOADING
                )]);
            }
        }

        container
    }

    fn build_security_context(&self) -> Option<SecurityContext> {
        self.config.run_as_user.map(|uid| SecurityContext {
            run_as_non_root: Some(true),
            run_as_user: Some(uid),
            run_as_group: Some(uid),
            allow_privilege_escalation: Some(false),
            ..Default::default()
        })
    }

    fn build_image_pull_secrets(&self) -> Option<Vec<LocalObjectReference>> {
        if self.config.image_pull_secrets.is_empty() {
            None
        } else {
            Some(
                self.config
                    .image_pull_secrets
                    .iter()
                    .map(|s| LocalObjectReference { name: s.clone() })
                    .collect(),
            )
        }
    }
}
