// Per-unit state machine: change detection, reminders, grace suppression

use crate::error::StateError;
use crate::monitor::state::{StateStore, UnitRecord};
use crate::monitor::RunContext;
use crate::notify::{Alert, NotificationKind, Notifier, OutgoingMessage};
use crate::systemd::{MonitoredUnit, StatusSnapshot};

/// How the new snapshot relates to the stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Composite differs from the stored one (or the unit is new)
    Transition { healthy: bool },
    /// Same composite, unhealthy, and the coalesce interval has elapsed
    Reminder,
    /// Same composite, nothing to say
    Unchanged,
}

/// Outcome of the pure decision step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub classification: Classification,
    pub notification: Option<NotificationKind>,
    /// Record to persist, if anything changed
    pub next_record: Option<UnitRecord>,
}

/// Decide what to do for one unit. Transitions always win over reminders.
pub fn decide(record: &UnitRecord, snapshot: &StatusSnapshot, now_epoch: i64, coalesce_secs: i64) -> Decision {
    let composite = snapshot.composite();
    let healthy = snapshot.is_healthy();

    if composite != record.last_composite {
        let kind = if healthy {
            NotificationKind::Recovered
        } else {
            NotificationKind::Down
        };
        return Decision {
            classification: Classification::Transition { healthy },
            notification: Some(kind),
            next_record: Some(UnitRecord {
                last_composite: composite,
                last_notification_epoch: now_epoch,
            }),
        };
    }

    if reminder_due(record, healthy, now_epoch, coalesce_secs) {
        return Decision {
            classification: Classification::Reminder,
            notification: Some(NotificationKind::StillProblematic),
            next_record: Some(UnitRecord {
                last_composite: record.last_composite.clone(),
                last_notification_epoch: now_epoch,
            }),
        };
    }

    Decision {
        classification: Classification::Unchanged,
        notification: None,
        next_record: None,
    }
}

/// Reminders only nag about units that stay unhealthy, at most once per interval
pub fn reminder_due(record: &UnitRecord, healthy: bool, now_epoch: i64, coalesce_secs: i64) -> bool {
    !healthy
        && coalesce_secs > 0
        && now_epoch.saturating_sub(record.last_notification_epoch) >= coalesce_secs
}

/// What happened to a decided notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// No notification was called for
    NotNeeded,
    Sent,
    /// Held back by the startup grace window; state advanced anyway
    SuppressedByGrace,
    /// Transport or API failure; logged and dropped
    Failed(String),
    DryRun,
}

/// Per-unit result of one evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub unit: String,
    pub composite: String,
    pub classification: Classification,
    pub notification: Option<NotificationKind>,
    pub delivery: Delivery,
    /// False when a needed write did not happen (dry run or store failure)
    pub persisted: bool,
}

/// Combines a snapshot with the stored record and acts on the decision
pub struct StateEvaluator<'a> {
    ctx: &'a RunContext,
}

impl<'a> StateEvaluator<'a> {
    pub fn new(ctx: &'a RunContext) -> Self {
        Self { ctx }
    }

    /// Evaluate one unit whose snapshot was already obtained.
    ///
    /// A notification suppressed by the grace window updates the record exactly
    /// like a sent one. Delivery failures never prevent the record update.
    pub async fn evaluate(
        &self,
        unit: &MonitoredUnit,
        snapshot: &StatusSnapshot,
        store: &mut dyn StateStore,
        notifier: &dyn Notifier,
    ) -> Result<UnitReport, StateError> {
        let record = store.load(unit)?;
        let decision = decide(&record, snapshot, self.ctx.now_epoch(), self.ctx.coalesce_secs);
        let composite = snapshot.composite();

        let delivery = match decision.notification {
            None => Delivery::NotNeeded,
            Some(kind) => self.deliver(kind, unit, &composite, notifier).await,
        };

        let mut persisted = decision.next_record.is_none();
        if let Some(next) = &decision.next_record {
            if self.ctx.dry_run {
                tracing::info!("[dry-run] would persist {} for {}", next.last_composite, unit);
            } else {
                if let Err(e) = store.save(unit, next) {
                    if delivery == Delivery::Sent {
                        tracing::error!(
                            "{} for {} was sent but its record was not written; it will repeat next run",
                            decision.notification.map_or("Alert", |k| k.label()),
                            unit
                        );
                    }
                    return Err(e);
                }
                persisted = true;
            }
        }

        Ok(UnitReport {
            unit: unit.id(),
            composite,
            classification: decision.classification,
            notification: decision.notification,
            delivery,
            persisted,
        })
    }

    async fn deliver(
        &self,
        kind: NotificationKind,
        unit: &MonitoredUnit,
        composite: &str,
        notifier: &dyn Notifier,
    ) -> Delivery {
        if self.ctx.in_grace() {
            tracing::info!(
                "{} {} ({}) suppressed: uptime {}s within {}s startup grace",
                kind,
                unit,
                composite,
                self.ctx.uptime_secs,
                self.ctx.grace_secs
            );
            return Delivery::SuppressedByGrace;
        }

        if self.ctx.dry_run {
            tracing::info!("[dry-run] would send {} for {} ({})", kind, unit, composite);
            return Delivery::DryRun;
        }

        let alert = Alert {
            kind,
            host: &self.ctx.host,
            unit,
            composite,
            at_utc: self.ctx.now_utc,
            at_local: self.ctx.now_local,
        };

        match notifier.send(&OutgoingMessage::from(&alert)).await {
            Ok(()) => {
                tracing::info!("Sent {} for {} ({})", kind, unit, composite);
                Delivery::Sent
            }
            Err(e) => {
                tracing::warn!("Failed to send {} for {}: {}", kind, unit, e);
                Delivery::Failed(e.to_string())
            }
        }
    }
}
