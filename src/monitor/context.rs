// Per-run snapshot of clocks and policy

use crate::config::Config;
use crate::monitor::grace::{self, PROC_UPTIME};
use chrono::{DateTime, Local, Utc};
use std::path::Path;

/// Everything one run needs that is not per-unit. Clocks are read once.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub host: String,
    pub now_utc: DateTime<Utc>,
    pub now_local: DateTime<Local>,
    pub uptime_secs: u64,
    /// Minimum spacing between reminders; <= 0 disables them
    pub coalesce_secs: i64,
    pub grace_secs: u64,
    /// Classify only; neither notify nor persist
    pub dry_run: bool,
}

impl RunContext {
    /// Capture clocks and policy for a run
    pub fn capture(config: &Config, dry_run: bool) -> Self {
        let uptime_secs = grace::read_uptime(Path::new(PROC_UPTIME)).unwrap_or_else(|| {
            // Without an uptime reading, assume boot noise is over rather than drop alerts
            tracing::warn!("Uptime unknown; treating startup grace as elapsed");
            u64::MAX
        });

        let now_utc = Utc::now();
        Self {
            host: config.host_label(),
            now_utc,
            now_local: now_utc.with_timezone(&Local),
            uptime_secs,
            coalesce_secs: config.coalesce_secs,
            grace_secs: config.startup_grace_secs,
            dry_run,
        }
    }

    /// Current wall-clock time in epoch seconds
    pub fn now_epoch(&self) -> i64 {
        self.now_utc.timestamp()
    }

    pub fn in_grace(&self) -> bool {
        grace::in_grace(self.uptime_secs, self.grace_secs)
    }
}
