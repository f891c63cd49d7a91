#[cfg(test)]
mod tests {
    use crate::config::*;
    use crate::error::{Result, UnitwatchError};
    use serial_test::serial;

    fn write_config(dir: &tempfile::TempDir, yaml: &str) -> std::path::PathBuf {
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, yaml).unwrap();
        path
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.coalesce_secs, 300);
        assert_eq!(config.startup_grace_secs, 60);
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
        assert_eq!(config.telegram.timeout_secs, 10);
        assert!(!config.telegram.silent);
        assert_eq!(config.probe_backend, ProbeBackend::Systemctl);
        assert!(config.units.is_blank());
        assert!(config.user.is_none());
        assert!(config.hostname.is_none());
    }

    #[test]
    #[serial]
    fn test_config_load_list_units() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_config(
            &dir,
            r#"
telegram:
  bot_token: "123:abc"
  chat_id: "-10042"
units:
  - nginx.service
  - user:syncthing.service
user: alice
coalesce_secs: 600
probe_backend: dbus
"#,
        );

        let config = Config::load(Some(path))?;
        assert_eq!(config.telegram.bot_token, "123:abc");
        assert_eq!(config.telegram.chat_id, "-10042");
        assert_eq!(config.units.entries(), vec!["nginx.service", "user:syncthing.service"]);
        assert_eq!(config.user.as_deref(), Some("alice"));
        assert_eq!(config.coalesce_secs, 600);
        // Unset keys keep their defaults
        assert_eq!(config.startup_grace_secs, 60);
        assert_eq!(config.probe_backend, ProbeBackend::Dbus);
        Ok(())
    }

    #[test]
    fn test_config_joined_unit_string() {
        let config: Config = serde_yaml::from_str("units: \"nginx.service sshd.service, cron.service\"").unwrap();
        assert_eq!(
            config.units,
            UnitList::Joined("nginx.service sshd.service, cron.service".to_string())
        );
        assert!(!config.units.is_blank());
    }

    #[test]
    fn test_config_load_missing_is_error() {
        let err = Config::load(Some("/nonexistent/unitwatch/config.yaml".into())).unwrap_err();
        assert!(matches!(err.downcast_ref::<UnitwatchError>(), Some(UnitwatchError::Config(_))));
    }

    #[test]
    fn test_config_load_invalid_yaml_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "coalesce_secs: [not, a, number]\n");
        let err = Config::load(Some(path)).unwrap_err();
        assert!(err.to_string().contains("Invalid config"));
    }

    #[test]
    fn test_validate_requires_credentials() {
        let mut config = Config {
            units: UnitList::Many(vec!["nginx.service".to_string()]),
            ..Config::default()
        };
        assert!(config.validate(false).is_err());

        config.telegram.bot_token = "123:abc".to_string();
        assert!(config.validate(false).unwrap_err().to_string().contains("chat_id"));

        config.telegram.chat_id = "42".to_string();
        assert!(config.validate(false).is_ok());
    }

    #[test]
    fn test_validate_unit_list_optional_with_override() {
        let mut config = Config::default();
        config.telegram.bot_token = "123:abc".to_string();
        config.telegram.chat_id = "42".to_string();

        let err = config.validate(false).unwrap_err();
        assert!(err.to_string().contains("units"));
        assert!(config.validate(true).is_ok());
    }

    #[test]
    #[serial]
    fn test_env_overrides_credentials() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_config(
            &dir,
            "telegram:\n  bot_token: from-file\n  chat_id: \"1\"\nunits: [a.service]\n",
        );

        std::env::set_var(ENV_BOT_TOKEN, "from-env");
        std::env::set_var(ENV_CHAT_ID, "  ");
        let loaded = Config::load(Some(path));
        std::env::remove_var(ENV_BOT_TOKEN);
        std::env::remove_var(ENV_CHAT_ID);

        let config = loaded?;
        assert_eq!(config.telegram.bot_token, "from-env");
        // Blank variables do not clobber the file
        assert_eq!(config.telegram.chat_id, "1");
        Ok(())
    }

    #[test]
    fn test_host_label_override() {
        let config = Config {
            hostname: Some("  web-01 ".to_string()),
            ..Config::default()
        };
        assert_eq!(config.host_label(), "web-01");

        let config = Config {
            hostname: Some(String::new()),
            ..Config::default()
        };
        assert!(!config.host_label().is_empty());
    }
}
