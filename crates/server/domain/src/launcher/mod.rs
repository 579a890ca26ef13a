//! Puertos del launcher
//!
//! Traits for every collaborator the launch orchestration consumes. The
//! infrastructure crate provides the Kubernetes and static implementations.

pub mod feature_flags;
pub mod pod_launcher;
pub mod policy;

pub use feature_flags::*;
pub use pod_launcher::{PodLauncher, PodLauncherError};
pub use policy::{Labels, PodLabeler, PodNameGenerator, RuntimeEnvVarFactory, env_names};
