use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_help_command() {
    let mut cmd = Command::cargo_bin("tunecapsule").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Keep your music close"))
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("classify"))
        .stdout(predicate::str::contains("season"));
}

#[test]
fn test_version_command() {
    let mut cmd = Command::cargo_bin("tunecapsule").unwrap();
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_completions_command() {
    let mut cmd = Command::cargo_bin("tunecapsule").unwrap();
    cmd.arg("completions").arg("bash");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("_tunecapsule"));
}

#[test]
fn test_classify_requires_albums() {
    let mut cmd = Command::cargo_bin("tunecapsule").unwrap();
    cmd.arg("classify").arg("A");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("ALBUMS"));
}

#[test]
fn test_db_init_creates_schema() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("tunecapsule.db");

    let mut cmd = Command::cargo_bin("tunecapsule").unwrap();
    cmd.env("TUNECAPSULE_DB_PATH", &db_path)
        .env("TUNECAPSULE_CONFIG_DIR", dir.path())
        .arg("db")
        .arg("init");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Database initialized"));
    assert!(db_path.exists());
}

#[test]
fn test_db_init_refuses_overwrite_without_force() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("tunecapsule.db");
    std::fs::write(&db_path, b"").unwrap();

    let mut cmd = Command::cargo_bin("tunecapsule").unwrap();
    cmd.env("TUNECAPSULE_DB_PATH", &db_path)
        .env("TUNECAPSULE_CONFIG_DIR", dir.path())
        .arg("db")
        .arg("init");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--force"));
}

#[test]
fn test_season_update_numbered_looks_up_stored_season() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("tunecapsule.db");

    let mut init = Command::cargo_bin("tunecapsule").unwrap();
    init.env("TUNECAPSULE_DB_PATH", &db_path)
        .env("TUNECAPSULE_CONFIG_DIR", dir.path())
        .arg("db")
        .arg("init");
    init.assert().success();

    // The query parses; with nothing stored the lookup itself fails.
    let mut cmd = Command::cargo_bin("tunecapsule").unwrap();
    cmd.env("TUNECAPSULE_DB_PATH", &db_path)
        .env("TUNECAPSULE_CONFIG_DIR", dir.path())
        .args(["season", "update", "2020", "3"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("No stored season matches: 2020 3"))
        .stderr(predicate::str::contains("unsupported season query").not());
}

#[test]
fn test_whoami_without_login() {
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = Command::cargo_bin("tunecapsule").unwrap();
    cmd.env("TUNECAPSULE_CONFIG_DIR", dir.path()).arg("whoami");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No Spotify account is connected"));
}

#[test]
fn test_config_init_and_show() {
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = Command::cargo_bin("tunecapsule").unwrap();
    cmd.env("TUNECAPSULE_CONFIG_DIR", dir.path())
        .arg("config")
        .arg("init");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Configuration initialized"))
        .stdout(predicate::str::contains("ideal_length"));

    let mut cmd = Command::cargo_bin("tunecapsule").unwrap();
    cmd.env("TUNECAPSULE_CONFIG_DIR", dir.path())
        .arg("config")
        .arg("show");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("api.spotify.com"))
        .stdout(predicate::str::contains("[seasons]"));
}
