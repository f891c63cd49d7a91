// Monitored unit and status data models

use std::collections::HashSet;
use std::fmt;

/// Prefix marking a unit that lives in a user's service manager
pub const USER_SCOPE_PREFIX: &str = "user:";

/// Fallback for units whose type does not expose a `Result` property
pub const UNKNOWN_RESULT: &str = "unknown";

const MAX_UNIT_NAME_LEN: usize = 256;

/// ServiceScope represents whether a unit is managed by the system or a user manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceScope {
    /// System-level unit (PID 1)
    System,
    /// User-level unit (per-user `systemd --user` instance)
    User,
}

impl ServiceScope {
    /// Get display label for the scope
    pub fn label(&self) -> &'static str {
        match self {
            ServiceScope::System => "system",
            ServiceScope::User => "user",
        }
    }
}

/// A unit named in configuration or on the command line
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MonitoredUnit {
    System { name: String },
    User { name: String, owner: Option<String> },
}

impl MonitoredUnit {
    /// Build a unit from one raw identifier (`nginx.service`, `user:syncthing.service`)
    pub fn parse(raw: &str, owner: Option<&str>) -> Option<Self> {
        let raw = raw.trim();
        let (scoped, name) = match raw.strip_prefix(USER_SCOPE_PREFIX) {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        if !is_valid_unit_name(name) {
            return None;
        }

        let name = name.to_string();
        Some(if scoped {
            MonitoredUnit::User {
                name,
                owner: owner.filter(|o| !o.trim().is_empty()).map(|o| o.trim().to_string()),
            }
        } else {
            MonitoredUnit::System { name }
        })
    }

    /// Unscoped unit name as the supervisor knows it
    pub fn name(&self) -> &str {
        match self {
            MonitoredUnit::System { name } | MonitoredUnit::User { name, .. } => name,
        }
    }

    pub fn scope(&self) -> ServiceScope {
        match self {
            MonitoredUnit::System { .. } => ServiceScope::System,
            MonitoredUnit::User { .. } => ServiceScope::User,
        }
    }

    /// Owning user for user-scoped units
    pub fn owner(&self) -> Option<&str> {
        match self {
            MonitoredUnit::System { .. } => None,
            MonitoredUnit::User { owner, .. } => owner.as_deref(),
        }
    }

    /// Raw identifier including the scope prefix; this is the unit's identity
    pub fn id(&self) -> String {
        match self {
            MonitoredUnit::System { name } => name.clone(),
            MonitoredUnit::User { name, .. } => format!("{}{}", USER_SCOPE_PREFIX, name),
        }
    }

    /// Relative path naming the persisted record. User units live under `user/`,
    /// which no system unit name can reach.
    pub fn state_key(&self) -> String {
        match self {
            MonitoredUnit::System { name } => name.clone(),
            MonitoredUnit::User { name, .. } => format!("user/{}", name),
        }
    }
}

impl fmt::Display for MonitoredUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

/// Unit names systemd would accept, minus anything that could escape a path
fn is_valid_unit_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_UNIT_NAME_LEN
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '.' | '@' | '-' | '\\'))
}

/// Parse configured entries or CLI arguments into an ordered, de-duplicated unit list.
///
/// Every entry may hold several identifiers separated by whitespace or commas.
/// Malformed identifiers and repeats are skipped with a warning.
pub fn parse_unit_list<I, S>(entries: I, owner: Option<&str>) -> Vec<MonitoredUnit>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut units = Vec::new();
    let mut seen = HashSet::new();

    for entry in entries {
        for token in entry
            .as_ref()
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
        {
            let Some(unit) = MonitoredUnit::parse(token, owner) else {
                tracing::warn!("Ignoring malformed unit entry '{}'", token.escape_debug());
                continue;
            };

            if !seen.insert(unit.id()) {
                tracing::warn!("Unit '{}' listed more than once; evaluating it once", unit);
                continue;
            }

            units.push(unit);
        }
    }

    units
}

/// Snapshot of one unit's state as reported by the supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub active_state: String,
    pub sub_state: String,
    pub result: String,
}

impl StatusSnapshot {
    pub fn new(
        active_state: impl Into<String>,
        sub_state: impl Into<String>,
        result: Option<String>,
    ) -> Self {
        Self {
            active_state: active_state.into(),
            sub_state: sub_state.into(),
            result: result
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| UNKNOWN_RESULT.to_string()),
        }
    }

    /// Canonical comparison key: `active/sub/result`
    pub fn composite(&self) -> String {
        format!("{}/{}/{}", self.active_state, self.sub_state, self.result)
    }

    /// Returns true if the unit is currently active
    pub fn is_healthy(&self) -> bool {
        self.active_state == "active"
    }
}
