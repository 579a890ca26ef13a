//! Observability Module - structured logging for the launcher
//!
//! Installs the global `tracing` subscriber from [`LoggingConfig`] so the
//! orchestrator spans (`launch`, `evict_mutex_pods`) carry workload fields
//! through every pod operation.
//!
//! [`LoggingConfig`]: launcher_shared::config::LoggingConfig

pub mod tracing;

pub use tracing::{TracingResult, build_filter, init_tracing};
