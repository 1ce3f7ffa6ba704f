//! Set and settings command integration tests.

use predicates::prelude::*;
use serde_json::Value;
use serial_test::serial;

use super::common::TestEnv;

#[test]
#[serial]
fn set_persists_and_lists() {
  let env = TestEnv::from_fixture("chain.json");

  env
    .kiln_cmd()
    .args(["set", "cc", "gcc"])
    .assert()
    .success()
    .stdout(predicate::str::contains("cc = \"gcc\""));
  env.kiln_cmd().args(["set", "opt", "2"]).assert().success();

  let output = env.kiln_cmd().args(["settings", "--json"]).output().unwrap();
  let entries: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(entries.len(), 2);
  assert_eq!(entries[0]["name"], "cc");
  assert_eq!(entries[0]["value"], "gcc");
  assert_eq!(entries[1]["value"], 2);
  assert!(entries[0]["changed"].as_i64().unwrap() > 0);
}

#[test]
#[serial]
fn setting_same_value_is_a_no_op() {
  let env = TestEnv::from_fixture("chain.json");
  env.kiln_cmd().args(["set", "cc", "gcc"]).assert().success();

  env
    .kiln_cmd()
    .args(["set", "cc", "gcc"])
    .assert()
    .success()
    .stdout(predicate::str::contains("already"));
}

#[test]
#[serial]
fn settings_path_from_environment() {
  let env = TestEnv::from_fixture("chain.json");
  let custom = env.path("state/custom.json");

  env
    .kiln_cmd()
    .env("KILN_SETTINGS", &custom)
    .args(["set", "cc", "clang"])
    .assert()
    .success();

  assert!(custom.exists());
  assert!(!env.path(".kiln-settings.json").exists());
}

#[test]
#[serial]
fn set_warns_when_description_defines_setting() {
  let env = TestEnv::from_fixture("manifest_settings.json");

  env
    .kiln_cmd()
    .args(["set", "mode", "release"])
    .assert()
    .success()
    .stderr(predicate::str::contains("the next build will restore that value"));
}

#[cfg(unix)]
#[test]
#[serial]
fn changed_setting_rebuilds_and_same_value_does_not() {
  let env = TestEnv::from_fixture("settings_command.json");

  env.kiln_cmd().args(["set", "mode", "debug"]).assert().success();
  env.touch_later("unrelated.txt", "");
  assert_eq!(env.build_trace("out.txt", &[]), vec![vec!["out.txt".to_string()]]);
  assert_eq!(env.read_file("out.txt"), "debug");

  env.kiln_cmd().args(["set", "mode", "debug"]).assert().success();
  assert!(env.build_trace("out.txt", &[]).is_empty());

  env.touch_later("unrelated.txt", "");
  env.kiln_cmd().args(["set", "mode", "release"]).assert().success();
  env.touch_later("unrelated.txt", "");
  assert_eq!(env.build_trace("out.txt", &[]), vec![vec!["out.txt".to_string()]]);
  assert_eq!(env.read_file("out.txt"), "release");
}

#[cfg(unix)]
#[test]
#[serial]
fn undefined_setting_fails_build() {
  let env = TestEnv::from_fixture("settings_command.json");

  env
    .kiln_cmd()
    .args(["build", "out.txt"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("no setting named mode"));
}
