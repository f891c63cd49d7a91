// Unitwatch - systemd unit health notifier
// Library root

pub mod config;
pub mod error;
pub mod monitor;
pub mod notify;
pub mod systemd;
pub mod version;

// Test modules (only compiled during tests)
#[cfg(test)]
mod config_tests;
