// Workload Launcher - Application Layer
// Casos de uso del launcher: construcción de specs, selección de topología y
// secuenciación de launches

pub mod launch;

pub use launch::*;
