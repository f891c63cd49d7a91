// One run: lock, resolve units, evaluate each in order

use crate::error::{Result, UnitwatchError};
use crate::monitor::evaluator::{Delivery, StateEvaluator, UnitReport};
use crate::monitor::lock::RunLock;
use crate::monitor::state::StateStore;
use crate::monitor::RunContext;
use crate::notify::Notifier;
use crate::systemd::{parse_unit_list, MonitoredUnit, StatusProbe};
use std::path::PathBuf;

/// A unit that could not be evaluated this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFailure {
    pub unit: String,
    pub message: String,
}

/// Summary of a completed pass over the unit list
#[derive(Debug, Default)]
pub struct RunReport {
    pub evaluated: Vec<UnitReport>,
    pub probe_failures: Vec<UnitFailure>,
    pub state_failures: Vec<UnitFailure>,
}

impl RunReport {
    fn count(&self, pred: impl Fn(&Delivery) -> bool) -> usize {
        self.evaluated.iter().filter(|r| pred(&r.delivery)).count()
    }

    pub fn sent(&self) -> usize {
        self.count(|d| *d == Delivery::Sent)
    }

    pub fn suppressed(&self) -> usize {
        self.count(|d| *d == Delivery::SuppressedByGrace)
    }

    pub fn failed_deliveries(&self) -> usize {
        self.count(|d| matches!(d, Delivery::Failed(_)))
    }

    /// One-line summary for the log
    pub fn summary(&self) -> String {
        format!(
            "{} evaluated, {} sent, {} suppressed, {} delivery failures, {} probe failures, {} state failures",
            self.evaluated.len(),
            self.sent(),
            self.suppressed(),
            self.failed_deliveries(),
            self.probe_failures.len(),
            self.state_failures.len()
        )
    }
}

/// How a run ended, when it did not fail
#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunReport),
    /// Another run holds the lock; nothing was touched
    Contended,
}

/// Pick the unit set: a non-empty override list replaces the configured list
pub fn resolve_units(configured: &[String], overrides: &[String], owner: Option<&str>) -> Result<Vec<MonitoredUnit>> {
    let (source, entries) = if overrides.iter().any(|o| !o.trim().is_empty()) {
        ("command line", overrides)
    } else {
        ("configuration", configured)
    };

    let units = parse_unit_list(entries, owner);
    if units.is_empty() {
        return Err(UnitwatchError::Config(format!("No valid units in {}", source)).into());
    }

    tracing::debug!("Monitoring {} unit(s) from {}", units.len(), source);
    Ok(units)
}

/// Serialized pass over the unit list
pub struct RunCoordinator {
    probe: Box<dyn StatusProbe>,
    notifier: Box<dyn Notifier>,
    store: Box<dyn StateStore>,
    lock_path: PathBuf,
}

impl RunCoordinator {
    pub fn new(
        probe: Box<dyn StatusProbe>,
        notifier: Box<dyn Notifier>,
        store: Box<dyn StateStore>,
        lock_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            probe,
            notifier,
            store,
            lock_path: lock_path.into(),
        }
    }

    /// Persisted records, for inspection after a run
    pub fn store(&self) -> &dyn StateStore {
        self.store.as_ref()
    }

    /// Take the host lock and evaluate every unit.
    ///
    /// Per-unit probe, state and delivery failures are logged and recorded in the
    /// report; only lock-file failures surface as errors.
    pub async fn run(&mut self, units: &[MonitoredUnit], ctx: &RunContext) -> Result<RunOutcome> {
        let Some(lock) = RunLock::try_acquire(&self.lock_path)? else {
            tracing::info!("Another run holds {:?}; exiting", self.lock_path);
            return Ok(RunOutcome::Contended);
        };
        tracing::debug!("Acquired run lock {:?}", lock.path());

        let report = self.evaluate_all(units, ctx).await;
        tracing::info!("Run complete: {}", report.summary());

        drop(lock);
        Ok(RunOutcome::Completed(report))
    }

    /// Evaluate units in order without touching the lock
    pub async fn evaluate_all(&mut self, units: &[MonitoredUnit], ctx: &RunContext) -> RunReport {
        let evaluator = StateEvaluator::new(ctx);
        let mut report = RunReport::default();

        for unit in units {
            let snapshot = match self.probe.probe(unit).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    if e.is_configuration() {
                        tracing::error!("Skipping {}: {}", unit, e);
                    } else {
                        tracing::error!("Probe failed for {}: {}", unit, e);
                    }
                    report.probe_failures.push(UnitFailure {
                        unit: unit.id(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            match evaluator
                .evaluate(unit, &snapshot, self.store.as_mut(), self.notifier.as_ref())
                .await
            {
                Ok(unit_report) => report.evaluated.push(unit_report),
                Err(e) => {
                    tracing::error!("State update failed for {}: {}", unit, e);
                    report.state_failures.push(UnitFailure {
                        unit: unit.id(),
                        message: e.to_string(),
                    });
                }
            }
        }

        report
    }
}
