// Workload Launcher - Infrastructure Layer
// Implementaciones concretas de los puertos del dominio

// Kubernetes
pub mod providers;

// Políticas por defecto (labels, nombres, env, flags)
pub mod policy;

pub mod observability;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use observability::{TracingResult, init_tracing};
pub use policy::{
    DefaultPodLabeler, DefaultPodNameGenerator, DefaultRuntimeEnvVarFactory,
    StaticFeatureFlagClient, flag_contexts,
};
pub use providers::{KubePodLauncher, KubernetesConfig, PodSpecFactory, PodSpecFactoryConfig};
