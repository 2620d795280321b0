use remake_lib::{EngineError, RunConfig};

use super::common::{Project, run};

const COPY_SCRIPT: &str = r#"
  local cp = remake.builder { action = "cp $^ $@" }
  remake.rule { targets = "out.txt", deps = "in.txt", builder = cp }
  remake.target("out.txt")
"#;

mod incremental {
  use super::*;

  #[test]
  fn second_run_is_up_to_date() {
    let project = Project::new();
    project.script(".", COPY_SCRIPT);
    project.file("in.txt", "v1");

    let (first, output) = run(&project, RunConfig::build());
    assert_eq!(first.executed().len(), 1);
    assert!(output.contains("[2/2] cp"), "{output}");
    assert_eq!(project.read("out.txt"), "v1");

    let (second, output) = run(&project, RunConfig::build());
    assert!(second.executed().is_empty());
    assert!(!output.contains("cp"), "{output}");
  }

  #[test]
  fn newer_dependency_triggers_rebuild() {
    let project = Project::new();
    project.script(".", COPY_SCRIPT);
    project.file("in.txt", "v1");
    run(&project, RunConfig::build());

    project.file("in.txt", "v2");
    project.bump("in.txt");
    let (context, _) = run(&project, RunConfig::build());

    assert_eq!(context.executed().len(), 1);
    assert_eq!(project.read("out.txt"), "v2");
  }

  #[test]
  fn newest_source_rebuilds_the_chain_in_order() {
    let project = Project::new();
    project.script(
      ".",
      r#"
        local cp = remake.builder { action = "cp $^ $@" }
        remake.rule { targets = "b", deps = "c", builder = cp }
        remake.rule { targets = "a", deps = "b", builder = cp }
        remake.target("a")
      "#,
    );
    project.file("c", "v1");
    project.file("b", "v1");
    project.file("a", "v1");
    project.age("c", 300);
    project.age("b", 200);
    project.age("a", 100);

    let (context, _) = run(&project, RunConfig::build());
    assert!(context.executed().is_empty());

    project.file("c", "v2");
    project.age("c", 50);
    let (context, _) = run(&project, RunConfig::build());

    let order: Vec<Vec<String>> = context
      .executed()
      .iter()
      .map(|executed| project.names(&executed.targets))
      .collect();
    assert_eq!(order, vec![vec!["b".to_string()], vec!["a".to_string()]]);
    assert_eq!(project.read("a"), "v2");
  }

  #[test]
  fn verbose_reports_skips() {
    let project = Project::new();
    project.script(".", COPY_SCRIPT);
    project.file("in.txt", "v1");
    run(&project, RunConfig::build());

    let (_, output) = run(&project, RunConfig::new(remake_lib::Mode::Build, false, true));

    assert!(output.contains("SKIP"), "{output}");
  }

  #[test]
  fn custom_check_can_veto_a_build() {
    let project = Project::new();
    project.script(
      ".",
      r#"
        local never = remake.builder {
          action = "touch $@",
          should_rebuild = function(targets, deps) return false end,
        }
        remake.rule { targets = "never", builder = never }
        remake.target("never")
      "#,
    );

    let (context, _) = run(&project, RunConfig::build());

    assert!(context.executed().is_empty());
    assert!(!project.exists("never"));
  }
}

mod modes {
  use super::*;

  #[test]
  fn dry_run_touches_nothing() {
    let project = Project::new();
    project.script(".", COPY_SCRIPT);
    project.file("in.txt", "v1");

    let (context, output) = run(&project, RunConfig::build().with_dry_run());

    assert!(output.contains("DRY-RUN"), "{output}");
    assert_eq!(context.executed().len(), 1);
    assert!(!project.exists("out.txt"));
  }

  #[test]
  fn clean_keeps_ground_dependencies() {
    let project = Project::new();
    project.script(".", COPY_SCRIPT);
    project.file("in.txt", "v1");
    run(&project, RunConfig::build());

    let (_, output) = run(&project, RunConfig::clean());

    assert!(output.contains("CLEAN"), "{output}");
    assert!(!project.exists("out.txt"));
    assert!(project.exists("in.txt"));
  }

  #[test]
  fn clean_fails_on_missing_ground_dependency() {
    let project = Project::new();
    project.script(".", COPY_SCRIPT);
    let (session, _) = project.session(RunConfig::clean());

    let err = session.run(&project.root, "ReMakeFile.lua", &[]).unwrap_err();

    assert!(matches!(err, EngineError::GroundDependencyMissingOnClean { .. }), "{err}");
  }

  #[test]
  fn rebuild_cleans_then_builds() {
    let project = Project::new();
    project.script(".", COPY_SCRIPT);
    project.file("in.txt", "v1");
    run(&project, RunConfig::build());

    let (context, output) = run(&project, RunConfig::rebuild());

    assert!(output.contains("[+] Rebuilding"), "{output}");
    assert!(output.contains("CLEAN"), "{output}");
    assert_eq!(context.executed().len(), 1);
    assert!(project.exists("out.txt"));
  }
}

mod resolution {
  use super::*;

  #[test]
  fn missing_rule_is_reported() {
    let project = Project::new();
    project.script(".", r#"remake.target("ghost")"#);
    let (session, _) = project.session(RunConfig::build());

    let err = session.run(&project.root, "ReMakeFile.lua", &[]).unwrap_err();

    assert!(matches!(err, EngineError::NoRuleToMakeTarget { .. }), "{err}");
  }

  #[test]
  fn virtual_target_builds_its_dependencies() {
    let project = Project::new();
    project.script(
      ".",
      r#"
        local touch = remake.builder { action = "touch $@" }
        remake.rule { targets = "a", builder = touch }
        remake.rule { targets = "b", builder = touch }
        remake.rule {
          targets = remake.virtual_target("all"),
          deps = { "a", "b" },
          builder = remake.builder { action = function() end, name = "all" },
        }
      "#,
    );
    let (session, _) = project.session(RunConfig::build());

    let context = session.run(&project.root, "ReMakeFile.lua", &[]).unwrap();

    assert!(project.exists("a"));
    assert!(project.exists("b"));
    assert_eq!(context.executed().len(), 3);
  }

  #[test]
  fn virtual_target_by_name() {
    let project = Project::new();
    project.script(
      ".",
      r#"
        local touch = remake.builder { action = "touch $@" }
        remake.rule { targets = "a", builder = touch }
        remake.rule { targets = "b", builder = touch }
        remake.rule { targets = remake.virtual_target("first"), deps = "a", builder = remake.builder { action = function() end } }
        remake.target("b")
      "#,
    );
    let (session, _) = project.session(RunConfig::build());

    session.run(&project.root, "ReMakeFile.lua", &["first".to_string()]).unwrap();

    assert!(project.exists("a"));
    assert!(!project.exists("b"));
  }

  #[test]
  fn pattern_rule_builds_every_match() {
    let project = Project::new();
    project.file("x.c", "x");
    project.file("y.c", "y");
    project.script(
      ".",
      r#"
        local objects = remake.pattern_rule {
          target = "*.o",
          deps = "*.c",
          builder = remake.builder { action = "cp $^ $@" },
        }
        remake.target(objects:all_targets())
      "#,
    );

    let (context, _) = run(&project, RunConfig::build());

    assert_eq!(context.executed().len(), 2);
    assert_eq!(project.read("x.o"), "x");
    assert_eq!(project.read("y.o"), "y");
  }

  #[test]
  fn pattern_rule_honors_exclusions() {
    let project = Project::new();
    project.file("x.c", "x");
    project.file("skip.c", "s");
    project.script(
      ".",
      r#"
        local objects = remake.pattern_rule {
          target = "*.o",
          deps = "*.c",
          builder = remake.builder { action = "cp $^ $@" },
          exclude = "skip.o",
        }
        remake.target(objects:all_targets())
      "#,
    );

    run(&project, RunConfig::build());

    assert!(project.exists("x.o"));
    assert!(!project.exists("skip.o"));
  }

  #[test]
  fn pattern_rule_builds_targets_in_subdirectories() {
    let project = Project::new();
    project.file("sub/x.in", "x");
    project.script(
      ".",
      r#"
        remake.pattern_rule {
          target = "*.out",
          deps = "*.in",
          builder = remake.builder { action = "cp *.in $@" },
        }
        remake.target("sub/x.out")
      "#,
    );

    let (context, _) = run(&project, RunConfig::build());

    assert_eq!(context.executed().len(), 1);
    assert_eq!(project.read("sub/x.out"), "x");
  }

  #[test]
  fn multi_target_rule_is_planned_once() {
    let project = Project::new();
    project.file("c", "c");
    project.script(
      ".",
      r#"
        remake.rule { targets = { "a", "b" }, deps = "c", builder = remake.builder { action = "touch $@" } }
        remake.target({ "a", "b" })
      "#,
    );

    let (context, _) = run(&project, RunConfig::build());

    let ruled: Vec<Vec<String>> = context
      .plan()
      .unwrap()
      .iter()
      .filter(|entry| !entry.is_ground())
      .map(|entry| project.names(&entry.targets))
      .collect();
    assert_eq!(ruled, vec![vec!["a".to_string(), "b".to_string()]]);
    assert_eq!(context.executed().len(), 1);
    assert!(project.exists("a") && project.exists("b"));
  }

  #[test]
  fn diamond_builds_shared_dependencies_once() {
    let project = Project::new();
    project.file("a1", "");
    project.file("a2", "");
    project.script(
      ".",
      r#"
        local touch = remake.builder { action = "touch $@" }
        remake.rule { targets = "d", deps = { "c", "a2", "b1" }, builder = touch }
        remake.rule { targets = "c", deps = { "b1", "b2" }, builder = touch }
        remake.rule { targets = "b1", deps = "a1", builder = touch }
        remake.rule { targets = "b2", deps = { "a1", "a2" }, builder = touch }
        remake.target("d")
      "#,
    );

    let (context, _) = run(&project, RunConfig::build());

    let plan: Vec<String> = context
      .plan()
      .unwrap()
      .iter()
      .flat_map(|entry| project.names(&entry.targets))
      .collect();
    assert_eq!(plan, vec!["a2", "a1", "b2", "b1", "c", "d"]);
    let executed: Vec<String> = context
      .executed()
      .iter()
      .flat_map(|executed| project.names(&executed.targets))
      .collect();
    assert_eq!(executed, vec!["b2", "b1", "c", "d"]);
  }

  #[test]
  fn consumer_of_a_multi_target_rule_runs_after_it() {
    let project = Project::new();
    project.script(
      ".",
      r#"
        remake.rule { targets = { "x", "y" }, builder = remake.builder { action = "touch $@" } }
        remake.rule { targets = "t", deps = "x", builder = remake.builder { action = "cp $^ $@" } }
        remake.target({ "t", "y" })
      "#,
    );

    let (context, _) = run(&project, RunConfig::build());

    let executed: Vec<Vec<String>> = context
      .executed()
      .iter()
      .map(|executed| project.names(&executed.targets))
      .collect();
    assert_eq!(executed, vec![vec!["x".to_string(), "y".to_string()], vec!["t".to_string()]]);
    assert!(project.exists("t"));
  }

  #[test]
  fn dependency_cycle_is_an_error() {
    let project = Project::new();
    project.script(
      ".",
      r#"
        local touch = remake.builder { action = "touch $@" }
        remake.rule { targets = "a", deps = "b", builder = touch }
        remake.rule { targets = "b", deps = "a", builder = touch }
        remake.target("a")
      "#,
    );
    let (session, _) = project.session(RunConfig::build());

    let err = session.run(&project.root, "ReMakeFile.lua", &[]).unwrap_err();

    assert!(matches!(err, EngineError::DependencyCycle { .. }), "{err}");
  }
}

mod actions {
  use super::*;

  #[test]
  fn lua_function_action_receives_kwargs() {
    let project = Project::new();
    project.script(
      ".",
      r#"
        local greet = remake.builder {
          name = "greet",
          action = function(deps, targets, kwargs)
            local f = assert(io.open(targets[1], "w"))
            f:write(kwargs.greeting)
            f:close()
            return "wrote " .. remake.path.basename(targets[1])
          end,
        }
        remake.rule { targets = "hello.txt", builder = greet, kwargs = { greeting = "hi" } }
        remake.target("hello.txt")
      "#,
    );

    let (_, output) = run(&project, RunConfig::build());

    assert_eq!(project.read("hello.txt"), "hi");
    assert!(output.contains("wrote hello.txt"), "{output}");
  }

  #[test]
  fn failing_command_surfaces_as_execution_failure() {
    let project = Project::new();
    project.script(
      ".",
      r#"
        remake.rule { targets = "out", builder = remake.builder { action = "false" } }
        remake.target("out")
      "#,
    );
    let (session, _) = project.session(RunConfig::build());

    let err = session.run(&project.root, "ReMakeFile.lua", &[]).unwrap_err();

    assert!(matches!(err, EngineError::ActionExecutionFailure { .. }), "{err}");
  }

  #[test]
  fn action_that_forgets_its_target_fails_postcondition() {
    let project = Project::new();
    project.script(
      ".",
      r#"
        remake.rule { targets = "out", builder = remake.builder { action = "true" } }
        remake.target("out")
      "#,
    );
    let (session, _) = project.session(RunConfig::build());

    let err = session.run(&project.root, "ReMakeFile.lua", &[]).unwrap_err();

    assert!(matches!(err, EngineError::ActionPostconditionFailure { .. }), "{err}");
  }
}
