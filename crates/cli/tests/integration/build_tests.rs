//! Build command integration tests.

use predicates::prelude::*;
use serial_test::serial;

use super::common::{TestEnv, trace};

#[test]
#[serial]
fn build_chain_from_existing_source() {
  let env = TestEnv::from_fixture("chain.json");
  env.write_file("main.c", "int main() {}");

  assert_eq!(env.build_trace("app", &[]), trace(&[&["main.o"], &["app"]]));
  assert!(env.path("main.o").exists());
  assert!(env.path("app").exists());
}

#[test]
#[serial]
fn second_build_is_up_to_date() {
  let env = TestEnv::from_fixture("chain.json");
  env.write_file("main.c", "int main() {}");
  env.kiln_cmd().args(["build", "app"]).assert().success();

  env
    .kiln_cmd()
    .args(["build", "app"])
    .assert()
    .success()
    .stdout(predicate::str::contains("app is up to date"));
}

#[test]
#[serial]
fn touched_source_rebuilds_dependents() {
  let env = TestEnv::from_fixture("chain.json");
  env.write_file("main.c", "int main() {}");
  env.kiln_cmd().args(["build", "app"]).assert().success();

  env.touch_later("main.c", "int main() { return 1; }");
  assert_eq!(env.build_trace("app", &[]), trace(&[&["main.o"], &["app"]]));
}

#[test]
#[serial]
fn touched_intermediate_rebuilds_only_above_it() {
  let env = TestEnv::from_fixture("chain.json");
  env.write_file("main.c", "int main() {}");
  env.kiln_cmd().args(["build", "app"]).assert().success();

  env.touch_later("main.o", "object");
  assert_eq!(env.build_trace("app", &[]), trace(&[&["app"]]));
}

#[test]
#[serial]
fn diamond_levels_sequential_and_parallel_agree() {
  let sequential = TestEnv::from_fixture("diamond.json");
  let parallel = TestEnv::from_fixture("diamond.json");
  let expected = trace(&[&["d.txt"], &["b.txt", "c.txt"], &["all"]]);

  assert_eq!(sequential.build_trace("all", &["--jobs", "1"]), expected);
  assert_eq!(parallel.build_trace("all", &["--jobs", "4"]), expected);
}

#[test]
#[serial]
fn phony_target_always_runs() {
  let env = TestEnv::from_fixture("diamond.json");
  env.kiln_cmd().args(["build", "all"]).assert().success();

  assert_eq!(env.build_trace("all", &[]), trace(&[&["all"]]));
}

#[test]
#[serial]
fn multi_target_rule_appears_in_one_group() {
  let env = TestEnv::from_fixture("multi.json");

  assert_eq!(
    env.build_trace("a.txt", &[]),
    trace(&[&["c.txt", "d.txt"], &["b.txt"], &["a.txt"]])
  );
  assert!(env.path("c.txt").exists());
  assert!(env.path("d.txt").exists());
}

#[test]
#[serial]
fn cycle_is_reported() {
  let env = TestEnv::from_fixture("cycle.json");

  env
    .kiln_cmd()
    .args(["build", "a"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("cyclic dependency detected for a: a -> b -> c -> a"));
}

#[test]
#[serial]
fn dot_graph_written_with_build() {
  let env = TestEnv::from_fixture("chain.json");
  env.write_file("main.c", "int main() {}");

  env
    .kiln_cmd()
    .args(["build", "app", "--dot", "out/build.dot"])
    .assert()
    .success();

  let dot = env.read_file("out/build.dot");
  assert!(dot.starts_with("digraph build_tree {"));
  assert!(dot.contains("[label=\"main.o\"]"));
}

#[cfg(unix)]
#[test]
#[serial]
fn failed_command_stops_the_build() {
  let env = TestEnv::from_fixture("failing.json");

  env
    .kiln_cmd()
    .args(["build", "all"])
    .assert()
    .failure()
    .stdout(predicate::str::contains("ok.txt"))
    .stderr(predicate::str::contains("Build of all failed"))
    .stderr(predicate::str::contains("exit code Some(7)"));

  assert!(env.path("ok.txt").exists());
}

#[cfg(unix)]
#[test]
#[serial]
fn manifest_settings_reach_commands() {
  let env = TestEnv::from_fixture("manifest_settings.json");

  env.kiln_cmd().args(["build", "out.txt"]).assert().success();
  assert_eq!(env.read_file("out.txt"), "debug");
}
