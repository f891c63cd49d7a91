// Persisted per-unit state

use crate::error::StateError;
use crate::systemd::MonitoredUnit;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// What the last evaluation of a unit left behind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRecord {
    /// Composite status observed by the last evaluation; empty on first sight
    #[serde(default)]
    pub last_composite: String,
    /// Epoch seconds of the last (sent or suppressed) notification; 0 if never
    #[serde(default)]
    pub last_notification_epoch: i64,
}

impl UnitRecord {
    /// Returns true if the unit has never been evaluated
    pub fn is_unseen(&self) -> bool {
        self.last_composite.is_empty()
    }
}

/// Key-value store of unit records, keyed by unit identity
pub trait StateStore: Send {
    /// Load a record; a unit that was never stored yields the empty record
    fn load(&self, unit: &MonitoredUnit) -> Result<UnitRecord, StateError>;

    fn save(&mut self, unit: &MonitoredUnit, record: &UnitRecord) -> Result<(), StateError>;
}

/// One JSON file per unit under a state directory
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for a unit: `<dir>/<name>.json` or `<dir>/user/<name>.json`
    pub fn record_path(&self, unit: &MonitoredUnit) -> PathBuf {
        self.dir.join(format!("{}.json", unit.state_key()))
    }
}

impl StateStore for FileStateStore {
    fn load(&self, unit: &MonitoredUnit) -> Result<UnitRecord, StateError> {
        let path = self.record_path(unit);

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(UnitRecord::default()),
            Err(source) => return Err(StateError::Io { path, source }),
        };

        match serde_json::from_str(&contents) {
            Ok(record) => Ok(record),
            Err(e) => {
                // Treat as unseen so a damaged file cannot silence the unit forever
                tracing::warn!("Discarding unreadable state {:?} for {}: {}", path, unit, e);
                Ok(UnitRecord::default())
            }
        }
    }

    fn save(&mut self, unit: &MonitoredUnit, record: &UnitRecord) -> Result<(), StateError> {
        let path = self.record_path(unit);

        let parent = path.parent().unwrap_or(self.dir.as_path()).to_path_buf();
        std::fs::create_dir_all(&parent).map_err(|source| StateError::Io { path: parent, source })?;

        let json = serde_json::to_string_pretty(record).map_err(|e| StateError::Encode {
            path: path.clone(),
            message: e.to_string(),
        })?;

        // Write beside the target, then rename over it
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|source| StateError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &path).map_err(|source| StateError::Io { path, source })?;

        Ok(())
    }
}

/// In-memory arena of records, for dry runs and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    records: HashMap<String, UnitRecord>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a record by raw unit identifier
    pub fn get(&self, unit_id: &str) -> Option<&UnitRecord> {
        self.records.get(unit_id)
    }

    pub fn insert(&mut self, unit_id: impl Into<String>, record: UnitRecord) {
        self.records.insert(unit_id.into(), record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, unit: &MonitoredUnit) -> Result<UnitRecord, StateError> {
        Ok(self.records.get(&unit.id()).cloned().unwrap_or_default())
    }

    fn save(&mut self, unit: &MonitoredUnit, record: &UnitRecord) -> Result<(), StateError> {
        self.records.insert(unit.id(), record.clone());
        Ok(())
    }
}
