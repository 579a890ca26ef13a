//! Launch Bounded Context
//!
//! Workload-to-pod translation and launch sequencing.

pub mod flags;
pub mod orchestrator;
pub mod spec_builder;
pub mod topology;

#[cfg(test)]
pub(crate) mod test_support;

pub use flags::{LaunchFlags, launch_scope};
pub use orchestrator::{LaunchOrchestrator, LaunchTimeouts};
pub use spec_builder::{LaunchPlan, SpecBuilder, SpecBuilderConfig, base_env, merge_labels};
pub use topology::TopologySelector;
