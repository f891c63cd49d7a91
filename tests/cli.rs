use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use std::path::{Path, PathBuf};

fn unitwatch() -> Command {
    let mut cmd = Command::cargo_bin("unitwatch").unwrap();
    cmd.env_remove("UNITWATCH_BOT_TOKEN").env_remove("UNITWATCH_CHAT_ID");
    cmd
}

/// Write a config whose notifications go to a port nobody listens on
fn write_config(dir: &Path, systemctl: &Path) -> PathBuf {
    let dead_port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let path = dir.join("config.yaml");
    let yaml = format!(
        "telegram:\n  bot_token: \"123:abc\"\n  chat_id: \"42\"\n  api_base: \"http://127.0.0.1:{}\"\n  timeout_secs: 2\n\
         units: [nginx.service]\n\
         startup_grace_secs: 0\n\
         state_dir: {:?}\n\
         lock_file: {:?}\n\
         systemctl_path: {:?}\n",
        dead_port,
        dir.join("state"),
        dir.join("unitwatch.lock"),
        systemctl
    );
    std::fs::write(&path, yaml).unwrap();
    path
}

#[cfg(unix)]
fn fake_systemctl(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("systemctl");
    std::fs::write(
        &path,
        "#!/bin/sh\nprintf 'ActiveState=failed\\nSubState=dead\\nResult=exit-code\\n'\n",
    )
    .unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[test]
#[serial]
fn version_flag_prints_version() {
    unitwatch()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("unitwatch v"));
}

#[test]
#[serial]
fn missing_config_is_fatal() {
    unitwatch()
        .args(["--config", "/nonexistent/unitwatch.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
#[serial]
fn missing_credentials_are_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "units: [nginx.service]\n").unwrap();

    unitwatch()
        .arg("--config")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("bot_token"));
}

#[test]
#[serial]
fn probe_failures_do_not_change_exit_status() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), Path::new("/nonexistent/systemctl"));

    unitwatch()
        .arg("--config")
        .arg(&config)
        .args(["a.service", "b.service"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Probe failed for a.service"));

    assert!(!dir.path().join("state").exists());
}

#[cfg(unix)]
#[test]
#[serial]
fn delivery_failure_is_swallowed_and_state_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let systemctl = fake_systemctl(dir.path());
    let config = write_config(dir.path(), &systemctl);

    unitwatch()
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stderr(predicate::str::contains("Failed to send DOWN for nginx.service"));

    let record = std::fs::read_to_string(dir.path().join("state").join("nginx.service.json")).unwrap();
    assert!(record.contains("failed/dead/exit-code"));
}

#[cfg(unix)]
#[test]
#[serial]
fn dry_run_leaves_no_state() {
    let dir = tempfile::tempdir().unwrap();
    let systemctl = fake_systemctl(dir.path());
    let config = write_config(dir.path(), &systemctl);

    unitwatch()
        .arg("--config")
        .arg(&config)
        .arg("--dry-run")
        .assert()
        .success()
        .stderr(predicate::str::contains("[dry-run] would send DOWN"));

    assert!(!dir.path().join("state").exists());
}
