//! Settings invalidation against file timestamps.

use kiln_lib::BuildError;

use super::common::Workspace;

fn chain_with_settings(ws: &mut Workspace) {
  ws.file("a.txt", &["b.txt"]);
  ws.file("b.txt", &[]);
  ws.engine.add_setting("a.txt", "a").unwrap();
  ws.engine.add_setting("b.txt", "b").unwrap();
}

#[test]
fn settings_older_than_outputs() {
  let mut ws = Workspace::new();
  ws.set("b", "b");
  ws.set("a", "a");
  ws.touch("b.txt");
  ws.touch("a.txt");
  chain_with_settings(&mut ws);

  assert!(ws.build("a.txt").unwrap().is_empty());
}

#[test]
fn bottom_setting_newer() {
  let mut ws = Workspace::new();
  ws.set("a", "a");
  ws.touch("b.txt");
  ws.touch("a.txt");
  ws.set("b", "b");
  chain_with_settings(&mut ws);

  assert_eq!(ws.build("a.txt").unwrap(), vec![vec!["b.txt"], vec!["a.txt"]]);
}

#[test]
fn top_setting_newer() {
  let mut ws = Workspace::new();
  ws.set("b", "b");
  ws.touch("b.txt");
  ws.touch("a.txt");
  ws.set("a", "a");
  chain_with_settings(&mut ws);

  assert_eq!(ws.build("a.txt").unwrap(), vec![vec!["a.txt"]]);
}

#[test]
fn top_setting_changed() {
  let mut ws = Workspace::new();
  ws.set("b", "b");
  ws.set("a", "a");
  ws.touch("b.txt");
  ws.touch("a.txt");
  ws.set("a", "changed");
  chain_with_settings(&mut ws);

  assert_eq!(ws.build("a.txt").unwrap(), vec![vec!["a.txt"]]);
}

#[test]
fn top_setting_reset_to_same_value() {
  let mut ws = Workspace::new();
  ws.set("b", "b");
  ws.set("a", "a");
  ws.touch("b.txt");
  ws.touch("a.txt");
  ws.set("a", "a");
  chain_with_settings(&mut ws);

  assert!(ws.build("a.txt").unwrap().is_empty());
}

#[test]
fn missing_setting() {
  let mut ws = Workspace::new();
  ws.set("a", "a");
  chain_with_settings(&mut ws);

  assert!(matches!(ws.build("a.txt"), Err(BuildError::NoSuchSetting(name)) if name == "b"));
}

#[test]
fn rebuilt_target_is_fresh_afterwards() {
  let mut ws = Workspace::new();
  ws.set("a", "a");
  ws.set("b", "b");
  chain_with_settings(&mut ws);

  assert_eq!(ws.build("a.txt").unwrap().len(), 2);
  ws.set("a", 2);
  assert_eq!(ws.build("a.txt").unwrap(), vec![vec!["a.txt"]]);
  assert!(ws.build("a.txt").unwrap().is_empty());
}
