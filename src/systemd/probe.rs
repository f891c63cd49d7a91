// Status probing through systemctl

use crate::error::ProbeError;
use crate::systemd::{MonitoredUnit, StatusSnapshot};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::process::Command;

/// Source of unit status snapshots
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusProbe: Send + Sync {
    /// Query the supervisor for the unit's (active, sub, result) triple
    async fn probe(&self, unit: &MonitoredUnit) -> Result<StatusSnapshot, ProbeError>;
}

/// Probe that shells out to `systemctl show`
#[derive(Debug, Clone)]
pub struct SystemctlProbe {
    program: PathBuf,
}

impl Default for SystemctlProbe {
    fn default() -> Self {
        Self::new("systemctl")
    }
}

impl SystemctlProbe {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments for one `systemctl show` call, scope flags included
    pub fn build_args(unit: &MonitoredUnit) -> Result<Vec<String>, ProbeError> {
        let mut args = Vec::new();

        if let MonitoredUnit::User { owner, .. } = unit {
            let owner = owner.as_deref().ok_or_else(|| ProbeError::MissingOwner { unit: unit.id() })?;
            args.push("--user".to_string());
            args.push(format!("--machine={}@", owner));
        }

        args.extend([
            "show".to_string(),
            unit.name().to_string(),
            "--property=ActiveState".to_string(),
            "--property=SubState".to_string(),
            "--property=Result".to_string(),
            "--no-pager".to_string(),
        ]);

        Ok(args)
    }
}

#[async_trait]
impl StatusProbe for SystemctlProbe {
    async fn probe(&self, unit: &MonitoredUnit) -> Result<StatusSnapshot, ProbeError> {
        let args = Self::build_args(unit)?;

        let output = Command::new(&self.program)
            .args(&args)
            .env("SYSTEMD_PAGER", "")
            .output()
            .await
            .map_err(|e| ProbeError::Query {
                unit: unit.id(),
                message: format!("Failed to run {}: {}", self.program.display(), e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProbeError::Query {
                unit: unit.id(),
                message: format!("{} exited with {}: {}", self.program.display(), output.status, stderr.trim()),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        tracing::debug!("systemctl show {}: {:?}", unit, stdout.trim());

        snapshot_from_show(unit, &stdout)
    }
}

/// Parse `Key=Value` lines as printed by `systemctl show`
pub fn parse_show_output(output: &str) -> HashMap<String, String> {
    output
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// Turn `systemctl show` output into a snapshot; `Result` may legitimately be missing
pub fn snapshot_from_show(unit: &MonitoredUnit, output: &str) -> Result<StatusSnapshot, ProbeError> {
    let mut props = parse_show_output(output);

    let mut required = |property: &'static str| {
        props
            .remove(property)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ProbeError::MissingProperty {
                unit: unit.id(),
                property,
            })
    };

    let active_state = required("ActiveState")?;
    let sub_state = required("SubState")?;

    Ok(StatusSnapshot::new(active_state, sub_state, props.remove("Result")))
}
