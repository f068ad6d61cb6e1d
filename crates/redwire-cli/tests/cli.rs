//! CLI command integration tests.
//! Each test uses a temp directory via REDWIRE_DATA_DIR for full isolation.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn redwire_cmd(data_dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("redwire").unwrap();
    cmd.env("REDWIRE_DATA_DIR", data_dir.path());
    cmd
}

fn stats(dir: &TempDir, world: &str) -> String {
    let output = redwire_cmd(dir)
        .args(["stats", "--world", world])
        .output()
        .unwrap();
    assert!(output.status.success());
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn extract_stat_value(output: &str, prefix: &str) -> String {
    output
        .lines()
        .find(|l| l.starts_with(prefix))
        .unwrap_or_else(|| panic!("stat line starting with '{prefix}' not found in output:\n{output}"))
        .split_whitespace()
        .last()
        .unwrap()
        .to_string()
}

fn place_pair(dir: &TempDir, world: &str) {
    for pos in ["1,2,1", "3,2,3"] {
        redwire_cmd(dir)
            .args(["place", pos, "--world", world])
            .assert()
            .success();
    }
    redwire_cmd(dir)
        .args(["connect", "1,2,1", "3,2,3", "--world", world])
        .assert()
        .success()
        .stdout(predicate::str::contains("connected 1,2,1 <-> 3,2,3"));
}

#[test]
fn stats_fresh_world() {
    let dir = TempDir::new().unwrap();
    redwire_cmd(&dir)
        .args(["stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("world:       default"))
        .stdout(predicate::str::contains("chains:      0"))
        .stdout(predicate::str::contains("connections: 0"));
}

#[test]
fn place_connect_then_stats() {
    let dir = TempDir::new().unwrap();
    place_pair(&dir, "w");

    let out = stats(&dir, "w");
    assert_eq!(extract_stat_value(&out, "chains:"), "2");
    assert_eq!(extract_stat_value(&out, "connections:"), "1");
}

#[test]
fn place_twice_fails() {
    let dir = TempDir::new().unwrap();
    redwire_cmd(&dir).args(["place", "0,0,0"]).assert().success();
    redwire_cmd(&dir)
        .args(["place", "0,0,0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn negative_coordinates_accepted() {
    let dir = TempDir::new().unwrap();
    redwire_cmd(&dir)
        .args(["place", "-5,64,-12"])
        .assert()
        .success()
        .stdout(predicate::str::contains("placed chain at -5,64,-12"));
}

#[test]
fn connect_too_far_reports_reason() {
    let dir = TempDir::new().unwrap();
    for pos in ["0,0,0", "30,0,0"] {
        redwire_cmd(&dir).args(["place", pos]).assert().success();
    }
    redwire_cmd(&dir)
        .args(["connect", "0,0,0", "30,0,0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("30.0 blocks apart"));

    let out = stats(&dir, "default");
    assert_eq!(extract_stat_value(&out, "connections:"), "0");
}

#[test]
fn connect_missing_chain_fails() {
    let dir = TempDir::new().unwrap();
    redwire_cmd(&dir).args(["place", "0,0,0"]).assert().success();
    redwire_cmd(&dir)
        .args(["connect", "0,0,0", "1,0,0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no chain at 1,0,0"));
}

#[test]
fn connection_cap_from_config_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("redwire.toml"),
        "max_connections_per_chain = 1\n",
    )
    .unwrap();
    for pos in ["0,0,0", "1,0,0", "2,0,0"] {
        redwire_cmd(&dir).args(["place", pos]).assert().success();
    }
    redwire_cmd(&dir)
        .args(["connect", "0,0,0", "1,0,0"])
        .assert()
        .success();
    redwire_cmd(&dir)
        .args(["connect", "0,0,0", "2,0,0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already has 1 connections"));
}

#[test]
fn invalid_config_file_fails() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("redwire.toml"), "update_interval_ticks = 0\n").unwrap();
    redwire_cmd(&dir)
        .args(["stats"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("update_interval_ticks"));
}

#[test]
fn power_relays_over_connection() {
    let dir = TempDir::new().unwrap();
    place_pair(&dir, "w");
    redwire_cmd(&dir)
        .args(["power", "1,3,1", "15", "--world", "w"])
        .assert()
        .success();

    redwire_cmd(&dir)
        .args(["tick", "--world", "w"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3,2,3 0 -> 15"))
        .stdout(predicate::str::contains("now at tick 1"));

    let out = stats(&dir, "w");
    assert_eq!(extract_stat_value(&out, "powered:"), "2");
}

#[test]
fn power_off_clears_after_loss_delay() {
    let dir = TempDir::new().unwrap();
    place_pair(&dir, "w");
    redwire_cmd(&dir)
        .args(["power", "1,3,1", "15", "--world", "w"])
        .assert()
        .success();
    redwire_cmd(&dir).args(["tick", "--world", "w"]).assert().success();
    redwire_cmd(&dir)
        .args(["power", "1,3,1", "0", "--world", "w"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed source"));

    redwire_cmd(&dir)
        .args(["tick", "2", "--world", "w"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1,2,1 15 -> 0"));

    let out = stats(&dir, "w");
    assert_eq!(extract_stat_value(&out, "powered:"), "0");
}

#[test]
fn show_reports_loss_countdown() {
    let dir = TempDir::new().unwrap();
    place_pair(&dir, "w");
    redwire_cmd(&dir)
        .args(["power", "1,3,1", "15", "--world", "w"])
        .assert()
        .success();
    redwire_cmd(&dir).args(["tick", "--world", "w"]).assert().success();
    redwire_cmd(&dir)
        .args(["power", "1,3,1", "0", "--world", "w"])
        .assert()
        .success();
    redwire_cmd(&dir).args(["tick", "--world", "w"]).assert().success();

    redwire_cmd(&dir)
        .args(["show", "--world", "w"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(clears in 1)"));
}

#[test]
fn power_level_out_of_range() {
    let dir = TempDir::new().unwrap();
    redwire_cmd(&dir)
        .args(["power", "0,0,0", "16"])
        .assert()
        .failure();
}

#[test]
fn remove_drops_connections() {
    let dir = TempDir::new().unwrap();
    place_pair(&dir, "w");
    redwire_cmd(&dir)
        .args(["remove", "1,2,1", "--world", "w"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 connections dropped"));

    let out = stats(&dir, "w");
    assert_eq!(extract_stat_value(&out, "chains:"), "1");
    assert_eq!(extract_stat_value(&out, "connections:"), "0");
}

#[test]
fn disconnect_is_idempotent() {
    let dir = TempDir::new().unwrap();
    place_pair(&dir, "w");
    redwire_cmd(&dir)
        .args(["disconnect", "3,2,3", "1,2,1", "--world", "w"])
        .assert()
        .success()
        .stdout(predicate::str::contains("disconnected"));
    redwire_cmd(&dir)
        .args(["disconnect", "3,2,3", "1,2,1", "--world", "w"])
        .assert()
        .success()
        .stdout(predicate::str::contains("were not connected"));
}

#[test]
fn show_lists_chains_and_cables() {
    let dir = TempDir::new().unwrap();
    place_pair(&dir, "w");
    redwire_cmd(&dir)
        .args(["show", "--world", "w"])
        .assert()
        .success()
        .stdout(predicate::str::contains("chain 1,2,1"))
        .stdout(predicate::str::contains("cable 1,2,1 -> 3,2,3"));
}

#[test]
fn show_json_is_export() {
    let dir = TempDir::new().unwrap();
    place_pair(&dir, "w");
    let output = redwire_cmd(&dir)
        .args(["show", "--json", "--world", "w"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["version"], 1);
    assert_eq!(json["nodes"].as_array().unwrap().len(), 2);
}

#[test]
fn export_import_roundtrip() {
    let dir = TempDir::new().unwrap();
    place_pair(&dir, "a");
    redwire_cmd(&dir).args(["tick", "3", "--world", "a"]).assert().success();

    let path = dir.path().join("export.json");
    redwire_cmd(&dir)
        .args(["export", "--world", "a"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("exported to"));

    redwire_cmd(&dir)
        .args(["import", "--world", "b"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("chains=2, connections=1, tick=3"));

    let a = stats(&dir, "a");
    let b = stats(&dir, "b");
    assert_eq!(
        extract_stat_value(&a, "connections:"),
        extract_stat_value(&b, "connections:")
    );
    assert_eq!(extract_stat_value(&b, "tick:"), "3");
}

#[test]
fn import_warns_when_world_config_differs() {
    let dir = TempDir::new().unwrap();
    for pos in ["0,0,0", "1,0,0", "2,0,0"] {
        redwire_cmd(&dir)
            .args(["place", pos, "--world", "a"])
            .assert()
            .success();
    }
    for peer in ["1,0,0", "2,0,0"] {
        redwire_cmd(&dir)
            .args(["connect", "0,0,0", peer, "--world", "a"])
            .assert()
            .success();
    }
    let path = dir.path().join("export.json");
    redwire_cmd(&dir)
        .args(["export", "--world", "a"])
        .arg(&path)
        .assert()
        .success();

    std::fs::write(
        dir.path().join("redwire.toml"),
        "max_connections_per_chain = 1\n",
    )
    .unwrap();
    redwire_cmd(&dir)
        .args(["import", "--world", "b"])
        .arg(&path)
        .assert()
        .success()
        .stderr(predicate::str::contains("the world config applies"))
        .stdout(predicate::str::contains("connections=1"));
}

#[test]
fn import_invalid_file_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "{ not json").unwrap();
    redwire_cmd(&dir)
        .arg("import")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to import JSON"));
}

#[test]
fn worlds_are_isolated() {
    let dir = TempDir::new().unwrap();
    place_pair(&dir, "one");
    let out = stats(&dir, "two");
    assert_eq!(extract_stat_value(&out, "chains:"), "0");
}

#[test]
fn worlds_lists_saved_worlds() {
    let dir = TempDir::new().unwrap();
    redwire_cmd(&dir)
        .arg("worlds")
        .assert()
        .success()
        .stdout(predicate::str::contains("(no worlds)"));

    place_pair(&dir, "beta");
    place_pair(&dir, "alpha");
    redwire_cmd(&dir)
        .arg("worlds")
        .assert()
        .success()
        .stdout(predicate::eq("alpha\nbeta\n"));
}

#[test]
fn run_with_tick_limit() {
    let dir = TempDir::new().unwrap();
    place_pair(&dir, "w");
    redwire_cmd(&dir)
        .args(["run", "--ticks", "5", "--tps", "200", "--world", "w"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stopped at tick 5 after 5 ticks"));
    assert!(!dir.path().join("run-w.pid").exists());
}

#[test]
fn missing_required_args() {
    let dir = TempDir::new().unwrap();
    redwire_cmd(&dir).arg("connect").assert().failure();
    redwire_cmd(&dir).args(["place", "1,2"]).assert().failure();
}
