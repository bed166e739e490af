//! 命令行端到端测试

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn cli() -> Command {
    Command::cargo_bin("robotside-cli").unwrap()
}

#[test]
fn test_config_init_and_show() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("robot.toml");

    cli()
        .args(["config", "init"])
        .arg(&path)
        .assert()
        .success();
    assert!(fs::read_to_string(&path).unwrap().contains("[runner]"));

    cli()
        .args(["config", "show", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("frequency_hz = 10.0"));

    cli().args(["config", "init"]).arg(&path).assert().failure();
}

#[test]
fn test_animations_listing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("robot.anim");
    fs::write(
        &path,
        "// greetings\nWave() {\n  SetMotor(0.5, 0.0);\n  Wait(200);\n  SetMotor(0.0, 0.0);\n}\nBeep() { PlayAudio(beep); }\n",
    )
    .unwrap();

    cli()
        .arg("animations")
        .arg(&path)
        .arg("--detail")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 animation(s)"))
        .stdout(predicate::str::contains("Wave"))
        .stdout(predicate::str::contains("Wait(200)"));
}

#[test]
fn test_animations_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.anim");
    fs::write(&path, "Wave() { SetMotor(0.5; }").unwrap();

    cli().arg("animations").arg(&path).assert().failure();
}

#[test]
fn test_simulate_json_output() {
    cli()
        .args(["simulate", "--goal", "1,0", "--cycles", "200", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"state\":\"RUNNING_NAVIGATION\""))
        .stdout(predicate::str::contains("Completed"));
}
