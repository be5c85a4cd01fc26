use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn server_flag_writes_the_config_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    Command::cargo_bin("vidtube-tui")
        .expect("binary")
        .env("XDG_CONFIG_HOME", dir.path())
        .args(["--server", "https://tube.example.com/"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Server saved to"));

    let saved = std::fs::read_to_string(dir.path().join("vidtube").join("config.yaml"))
        .expect("read saved config");
    assert!(
        saved.contains("https://tube.example.com"),
        "config was: {saved}"
    );
}

#[test]
fn server_flag_requires_a_value() {
    Command::cargo_bin("vidtube-tui")
        .expect("binary")
        .arg("--server")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--server requires a URL"));
}
