// Alert kinds and message rendering

use crate::systemd::MonitoredUnit;
use chrono::{DateTime, Local, Utc};
use std::fmt;

/// Kind of notification a decision produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Down,
    Recovered,
    StillProblematic,
}

impl NotificationKind {
    pub fn label(&self) -> &'static str {
        match self {
            NotificationKind::Down => "DOWN",
            NotificationKind::Recovered => "RECOVERED",
            NotificationKind::StillProblematic => "STILL PROBLEMATIC",
        }
    }

    /// Marker shown in front of the headline
    pub fn icon(&self) -> &'static str {
        match self {
            NotificationKind::Down => "🔴",
            NotificationKind::Recovered => "🟢",
            NotificationKind::StillProblematic => "🟠",
        }
    }

    /// Whether operators should be paged audibly for this kind
    pub fn is_urgent(&self) -> bool {
        matches!(self, NotificationKind::Down)
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything that goes into one notification
#[derive(Debug, Clone)]
pub struct Alert<'a> {
    pub kind: NotificationKind,
    pub host: &'a str,
    pub unit: &'a MonitoredUnit,
    pub composite: &'a str,
    pub at_utc: DateTime<Utc>,
    pub at_local: DateTime<Local>,
}

impl Alert<'_> {
    /// Render as Telegram HTML
    pub fn render(&self) -> String {
        let mut text = format!(
            "{} <b>{}</b> on <b>{}</b>\n\
             Unit: <code>{}</code>\n\
             Status: <code>{}</code>\n\
             Time: {} UTC ({})",
            self.kind.icon(),
            self.kind.label(),
            escape_html(self.host),
            escape_html(&self.unit.id()),
            escape_html(self.composite),
            self.at_utc.format("%Y-%m-%d %H:%M:%S"),
            self.at_local.format("%Y-%m-%d %H:%M:%S %Z"),
        );

        if self.kind == NotificationKind::Down {
            text.push_str("\n\nDiagnostics:");
            for command in diagnostic_commands(self.unit) {
                text.push_str(&format!("\n<code>{}</code>", escape_html(&command)));
            }
        }

        text
    }
}

/// Commands an operator can paste to investigate a failed unit
pub fn diagnostic_commands(unit: &MonitoredUnit) -> Vec<String> {
    let name = unit.name();
    match unit {
        MonitoredUnit::System { .. } => vec![
            format!("systemctl status {}", name),
            format!("journalctl -u {} -n 50 --no-pager", name),
        ],
        MonitoredUnit::User { owner, .. } => {
            let owner = owner.as_deref().unwrap_or("$USER");
            vec![
                format!("systemctl --user -M {}@ status {}", owner, name),
                format!("journalctl --user-unit {} -n 50 --no-pager", name),
            ]
        }
    }
}

/// Message used by `--test-notify`
pub fn render_test_message(host: &str, at_utc: DateTime<Utc>) -> String {
    format!(
        "✅ <b>unitwatch</b> test message from <b>{}</b>\nTime: {} UTC",
        escape_html(host),
        at_utc.format("%Y-%m-%d %H:%M:%S"),
    )
}

/// Escape the three characters Telegram's HTML mode treats as markup
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
