// Workload Launcher - Domain Layer
// Bounded Contexts:
// - shared_kernel: Errores compartidos y tipos de comando
// - workloads: WorkloadRequest y sus payloads
// - pods: PodSpecification, handles, selectores y recursos
// - launcher: Puertos hacia el cluster, feature flags y políticas

pub mod shared_kernel;

// Bounded Contexts
pub mod launcher;
pub mod pods;
pub mod workloads;

pub use shared_kernel::*;

pub use launcher::*;
pub use pods::*;
pub use workloads::*;
