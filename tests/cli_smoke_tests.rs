use std::{fs, path::Path};

use assert_cmd::Command;
use predicates::str::contains;
use serde_json::{json, Value};
use tempfile::TempDir;

fn seed_table(home: &Path, table: &str, count: usize) {
    let remote = home.join("remote");
    fs::create_dir_all(&remote).unwrap();
    let rows: Vec<Value> = (1..=count).map(|id| json!({ "id": id })).collect();
    fs::write(
        remote.join(format!("{table}.json")),
        serde_json::to_string(&rows).unwrap(),
    )
    .unwrap();
}

fn table_len(home: &Path, table: &str) -> usize {
    let data = fs::read_to_string(home.join("remote").join(format!("{table}.json"))).unwrap();
    serde_json::from_str::<Vec<Value>>(&data).unwrap().len()
}

fn cli(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("schoolsync_cli").unwrap();
    cmd.env("SCHOOLSYNC_HOME", home.path())
        .env("SCHOOLSYNC_RUNTIME", "desktop")
        .env("SCHOOLSYNC_CLI_SCRIPT", "1")
        .env("NO_COLOR", "1")
        .env("RUST_LOG", "off");
    cmd
}

#[test]
fn help_lists_commands() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .arg("help")
        .assert()
        .success()
        .stdout(contains("toggle-auto-save"))
        .stdout(contains("load-auto"));
}

#[test]
fn startup_writes_the_auto_backup() {
    let home = TempDir::new().unwrap();
    seed_table(home.path(), "students", 5);

    cli(&home)
        .arg("status")
        .assert()
        .success()
        .stdout(contains("Backend        : filesystem"))
        .stdout(contains("Local backup is synchronized with the remote store"))
        .stdout(contains("Archives       : 1"));

    assert!(home.path().join("backups").join("auto-backup.json").exists());
}

#[test]
fn script_mode_runs_save_and_sync() {
    let home = TempDir::new().unwrap();
    let files = TempDir::new().unwrap();
    let target = files.path().join("manual.json");
    seed_table(home.path(), "students", 2);
    let input = format!("save \"{}\"\nsync\nexit\n", target.display());

    cli(&home)
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("Backup saved to"))
        .stdout(contains("Local backup is synchronized with the remote store"));

    let saved: Value = serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(saved["tables"]["students"].as_array().unwrap().len(), 2);
    assert_eq!(saved["version"], "1.0.0");
}

#[test]
fn sync_reports_changed_tables() {
    let home = TempDir::new().unwrap();
    seed_table(home.path(), "students", 5);
    let input = "toggle-auto-save off\nauto-save\n# a sixth student enrols\n";
    cli(&home).write_stdin(input).assert().success();

    seed_table(home.path(), "students", 6);
    cli(&home)
        .arg("sync")
        .assert()
        .success()
        .stdout(contains("students: 5 → 6"));
}

#[test]
fn restore_from_path_replaces_remote_rows_and_reloads() {
    let home = TempDir::new().unwrap();
    let files = TempDir::new().unwrap();
    seed_table(home.path(), "students", 3);
    let backup = files.path().join("backup.json");
    cli(&home)
        .arg("save")
        .arg(&backup)
        .assert()
        .success();

    seed_table(home.path(), "students", 1);
    cli(&home)
        .arg("restore")
        .arg(&backup)
        .assert()
        .success()
        .stdout(contains("Restored 3 rows"))
        .stdout(contains("Application state reloaded."));

    assert_eq!(table_len(home.path(), "students"), 3);
}

#[test]
fn restore_without_a_path_is_cancelled() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .write_stdin("restore\n")
        .assert()
        .success()
        .stdout(contains("Restore cancelled"));
}

#[test]
fn toggle_auto_save_persists_preference() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["toggle-auto-save", "off"])
        .assert()
        .success()
        .stdout(contains("Auto-save disabled"));

    let prefs: Value = serde_json::from_str(
        &fs::read_to_string(home.path().join("config").join("preferences.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(prefs["auto_save_enabled"], false);

    cli(&home)
        .arg("status")
        .assert()
        .success()
        .stdout(contains("Auto-save      : off"));
}

#[test]
fn invalid_toggle_argument_fails() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["toggle-auto-save", "maybe"])
        .assert()
        .failure()
        .stderr(contains("Expected `on` or `off`"));
}

#[test]
fn unknown_command_gets_a_suggestion() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .write_stdin("restroe\n")
        .assert()
        .success()
        .stdout(contains("Unknown command `restroe`"))
        .stdout(contains("Suggestion: `restore`?"));
}

#[test]
fn load_auto_prints_row_counts() {
    let home = TempDir::new().unwrap();
    seed_table(home.path(), "teachers", 4);
    cli(&home)
        .write_stdin("load-auto\nwatch 0\n")
        .assert()
        .success()
        .stdout(contains("Auto-backup from"))
        .stdout(contains("teachers"))
        .stdout(contains("Stopped watching"));
}
