// Post-boot quiet period

use std::path::Path;

/// Kernel uptime source on Linux
pub const PROC_UPTIME: &str = "/proc/uptime";

/// Returns true while notifications must be held back after boot
pub fn in_grace(uptime_secs: u64, grace_secs: u64) -> bool {
    uptime_secs < grace_secs
}

/// Whole seconds from the first field of `/proc/uptime` ("350735.47 234388.90")
pub fn parse_uptime(contents: &str) -> Option<u64> {
    let first = contents.split_whitespace().next()?;
    let whole = first.split('.').next()?;
    whole.parse().ok()
}

/// Read the system uptime, or None if the source is unavailable
pub fn read_uptime(path: &Path) -> Option<u64> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let uptime = parse_uptime(&contents);
            if uptime.is_none() {
                tracing::warn!("Unrecognised uptime format in {:?}: {:?}", path, contents.trim());
            }
            uptime
        }
        Err(e) => {
            tracing::warn!("Failed to read uptime from {:?}: {}", path, e);
            None
        }
    }
}
