// Systemd integration module

pub mod client;
pub mod models;
pub mod probe;
pub mod resilience;


pub use client::DbusProbe;
pub use models::{parse_unit_list, MonitoredUnit, ServiceScope, StatusSnapshot, UNKNOWN_RESULT};
pub use probe::{StatusProbe, SystemctlProbe};
pub use resilience::ConnectionManager;

#[cfg(test)]
pub use probe::MockStatusProbe;
