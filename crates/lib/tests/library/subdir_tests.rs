use remake_lib::{EngineError, RunConfig};

use super::common::{Project, run};

const CHILD_SCRIPT: &str = r#"
  remake.rule { targets = "out", builder = remake.builder { action = "touch $@" } }
  remake.target("out")
"#;

#[test]
fn subdir_builds_in_its_own_directory() {
  let project = Project::new();
  project.script("lib", CHILD_SCRIPT);
  project.script(
    ".",
    r#"
      local result = remake.subdir("lib")
      assert(result.executed == 1, "child should run one rule")
      assert(remake.path.basename(result.dir) == "lib")
    "#,
  );
  let (session, output) = project.session(RunConfig::build());

  session.run(&project.root, "ReMakeFile.lua", &[]).unwrap();

  assert!(project.exists("lib/out"));
  assert!(!project.exists("out"));
  assert!(session.stack().find_completed(&project.path("lib")).is_some());
  assert_eq!(session.stack().depth(), 1);
  assert!(output.contents().contains("[+] Building ReMakeFile.lua in"), "{}", output.contents());
}

#[test]
fn script_dir_is_restored_after_subdir() {
  let project = Project::new();
  project.script("lib", CHILD_SCRIPT);
  project.script(
    ".",
    r#"
      local before = remake.dir
      remake.subdir("lib")
      assert(remake.dir == before, "remake.dir should point at the parent again")
      remake.rule { targets = "top", builder = remake.builder { action = "touch $@" } }
      remake.target("top")
    "#,
  );

  run(&project, RunConfig::build());

  assert!(project.exists("top"));
  assert!(!project.exists("lib/top"));
}

#[test]
fn child_sees_parent_rules() {
  let project = Project::new();
  project.script(
    "app",
    r#"
      local cat = remake.builder { action = "cat $< > $@" }
      remake.rule { targets = "bundle", deps = "../config.h", builder = cat }
      remake.target("bundle")
    "#,
  );
  project.script(
    ".",
    r#"
      remake.rule { targets = "config.h", builder = remake.builder { action = "touch $@" } }
      remake.subdir("app")
    "#,
  );

  run(&project, RunConfig::build());

  assert!(project.exists("config.h"));
  assert!(project.exists("app/bundle"));
}

#[test]
fn alternate_script_name() {
  let project = Project::new();
  project.file(
    "tools/Tools.lua",
    r#"
      remake.rule { targets = "tool", builder = remake.builder { action = "touch $@" } }
      remake.target("tool")
    "#,
  );
  project.script(".", r#"remake.subdir("tools", "Tools.lua")"#);

  run(&project, RunConfig::build());

  assert!(project.exists("tools/tool"));
}

#[test]
fn child_failure_keeps_its_root_cause() {
  let project = Project::new();
  project.script("broken", r#"remake.target("ghost")"#);
  project.script(".", r#"remake.subdir("broken")"#);
  let (session, _) = project.session(RunConfig::build());

  let err = session.run(&project.root, "ReMakeFile.lua", &[]).unwrap_err();

  assert!(matches!(err, EngineError::Script(_)), "{err}");
  assert!(
    matches!(err.root_cause(), EngineError::NoRuleToMakeTarget { target } if target.ends_with("ghost")),
    "{err}"
  );
  assert_eq!(session.stack().depth(), 1);
}

#[test]
fn clean_walks_into_subdirs() {
  let project = Project::new();
  project.script("lib", CHILD_SCRIPT);
  project.script(".", r#"remake.subdir("lib")"#);
  run(&project, RunConfig::build());
  assert!(project.exists("lib/out"));

  let (_, output) = run(&project, RunConfig::clean());

  assert!(!project.exists("lib/out"));
  assert!(output.contains("CLEAN"), "{output}");
}
