//! Pod Launcher Implementations
//!
//! kube-rs backed `PodLauncher` plus the conversion from a resolved
//! `PodSpecification` into a `k8s_openapi` Pod.

pub mod kubernetes;
pub mod pod_spec_factory;

pub use kubernetes::{
    KubePodLauncher, KubernetesConfig, KubernetesConfigBuilder, is_init_complete,
    is_init_started, is_ready_or_terminal,
};
pub use pod_spec_factory::{
    CONFIG_VOLUME, INIT_CONTAINER, PodSpecFactory, PodSpecFactoryConfig,
};
