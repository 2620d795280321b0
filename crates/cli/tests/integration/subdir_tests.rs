use predicates::prelude::*;

use super::common::TestEnv;

fn workspace() -> TestEnv {
  let env = TestEnv::from_fixture("workspace.lua");
  env.write_file(
    "core/ReMakeFile.lua",
    r#"
      remake.rule { targets = "core.txt", builder = remake.builder { action = "echo core > $@" } }
      remake.target("core.txt")
    "#,
  );
  env.write_file(
    "app/ReMakeFile.lua",
    r#"
      local cat = remake.builder { action = "cat $< > $@" }
      remake.rule { targets = "app.txt", deps = "../core/core.txt", builder = cat }
      remake.target("app.txt")
    "#,
  );
  env
}

#[test]
fn subdirectories_build_in_order() {
  let env = workspace();

  env
    .remake()
    .assert()
    .success()
    .stdout(predicate::str::contains("core"))
    .stdout(predicate::str::contains("app"));

  assert_eq!(env.read("core/core.txt"), "core\n");
  assert_eq!(env.read("app/app.txt"), "core\n");
}

#[test]
fn clean_descends_into_subdirectories() {
  let env = workspace();
  env.remake().assert().success();

  env.remake().arg("--clean").assert().success();

  assert!(!env.path("core/core.txt").exists());
  assert!(!env.path("app/app.txt").exists());
}

#[test]
fn failing_subdirectory_reports_root_cause() {
  let env = TestEnv::from_fixture("workspace.lua");
  env.write_file("core/ReMakeFile.lua", r#"remake.target("ghost")"#);
  env.write_file("app/ReMakeFile.lua", "");

  env
    .remake()
    .assert()
    .code(1)
    .stderr(predicate::str::contains("no rule to make target"))
    .stderr(predicate::str::contains("ghost"));
}
