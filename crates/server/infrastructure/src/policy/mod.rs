//! Default policy adapters
//!
//! Label naming, pod naming, runtime environment and static feature flags.
//! The orchestrator only sees these through the domain ports.

pub mod env;
pub mod flags;
pub mod labels;
pub mod names;

pub use env::DefaultRuntimeEnvVarFactory;
pub use flags::{StaticFeatureFlagClient, flag_contexts};
pub use labels::{DefaultPodLabeler, label_keys, sanitize_label_value};
pub use names::DefaultPodNameGenerator;
