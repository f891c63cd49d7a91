// Configuration management

use crate::error::{Result, UnitwatchError};
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable overriding `telegram.bot_token`
pub const ENV_BOT_TOKEN: &str = "UNITWATCH_BOT_TOKEN";
/// Environment variable overriding `telegram.chat_id`
pub const ENV_CHAT_ID: &str = "UNITWATCH_CHAT_ID";

/// Which StatusProbe implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeBackend {
    #[default]
    Systemctl,
    Dbus,
}

/// Unit list as written in YAML: a sequence, or one separated string
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum UnitList {
    Many(Vec<String>),
    Joined(String),
}

impl Default for UnitList {
    fn default() -> Self {
        UnitList::Many(Vec::new())
    }
}

impl UnitList {
    /// Raw entries, still to be split and validated
    pub fn entries(&self) -> Vec<String> {
        match self {
            UnitList::Many(list) => list.clone(),
            UnitList::Joined(joined) => vec![joined.clone()],
        }
    }

    pub fn is_blank(&self) -> bool {
        self.entries().iter().all(|e| e.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_base: String,
    pub timeout_secs: u64,
    /// Deliver RECOVERED and reminder messages without sound
    pub silent: bool,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: "https://api.telegram.org".to_string(),
            timeout_secs: 10,
            silent: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub units: UnitList,
    /// Owning user for `user:` units
    pub user: Option<String>,
    pub coalesce_secs: i64,
    pub startup_grace_secs: u64,
    /// Host label override; defaults to the system hostname
    pub hostname: Option<String>,
    pub state_dir: PathBuf,
    pub lock_file: PathBuf,
    pub probe_backend: ProbeBackend,
    pub systemctl_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig::default(),
            units: UnitList::default(),
            user: None,
            coalesce_secs: 300,
            startup_grace_secs: 60,
            hostname: None,
            state_dir: PathBuf::from("/var/lib/unitwatch"),
            lock_file: PathBuf::from("/run/lock/unitwatch.lock"),
            probe_backend: ProbeBackend::Systemctl,
            systemctl_path: PathBuf::from("systemctl"),
        }
    }
}

impl Config {
    /// Default config path: /etc/unitwatch/config.yaml for root, ~/.config/unitwatch/config.yaml otherwise
    pub fn default_path() -> Result<PathBuf> {
        if nix::unistd::geteuid().is_root() {
            return Ok(PathBuf::from("/etc/unitwatch/config.yaml"));
        }

        let config_dir = dirs::config_dir()
            .ok_or_else(|| UnitwatchError::Config("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("unitwatch").join("config.yaml"))
    }

    /// Load config from path; a missing file is a configuration error
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };

        if !config_path.exists() {
            return Err(UnitwatchError::Config(format!("Config file {:?} not found", config_path)).into());
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let mut config: Config = serde_yaml::from_str(&contents)
            .map_err(|e| UnitwatchError::Config(format!("Invalid config {:?}: {}", config_path, e)))?;
        config.apply_env();
        Ok(config)
    }

    /// Let credentials come from the environment instead of the file
    pub fn apply_env(&mut self) {
        if let Some(token) = non_empty_env(ENV_BOT_TOKEN) {
            self.telegram.bot_token = token;
        }
        if let Some(chat_id) = non_empty_env(ENV_CHAT_ID) {
            self.telegram.chat_id = chat_id;
        }
    }

    /// Check required settings. The unit list is optional when the command line supplies one.
    pub fn validate(&self, has_override_units: bool) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(UnitwatchError::Config("telegram.bot_token is not set".to_string()).into());
        }
        if self.telegram.chat_id.trim().is_empty() {
            return Err(UnitwatchError::Config("telegram.chat_id is not set".to_string()).into());
        }
        if !has_override_units && self.units.is_blank() {
            return Err(UnitwatchError::Config("units list is empty".to_string()).into());
        }
        Ok(())
    }

    /// Host label used in messages
    pub fn host_label(&self) -> String {
        if let Some(label) = self.hostname.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
            return label.to_string();
        }

        nix::unistd::gethostname()
            .ok()
            .and_then(|h| h.into_string().ok())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "unknown-host".to_string())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
