//! Build script evaluation.
//!
//! A [`Session`] owns the Lua VM and the scope stack. Running a directory
//! pushes a scope, evaluates the directory's build script, resolves and
//! executes the requested targets, then pops the scope and hands it back.
//! Scripts can start nested sub-builds, which go through the same steps
//! before control returns to the calling script.

use std::cell::{Ref, RefCell};
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;

use mlua::prelude::*;
use tracing::{debug, info};

use crate::config::{Mode, RunConfig};
use crate::context::{Context, ScopeStack};
use crate::execute::{EngineError, ExecutedRule, build_deps, clean_deps};
use crate::lua::runtime;
use crate::path::BuildPath;
use crate::plan::{PlanEntry, generate_dependency_list};

/// State shared between the session and the Lua callbacks.
pub struct SessionState {
  pub(crate) stack: RefCell<ScopeStack>,
  pub(crate) config: RunConfig,
  pub(crate) out: RefCell<Box<dyn Write>>,
}

impl SessionState {
  pub fn new(config: RunConfig, out: Box<dyn Write>) -> Self {
    Self {
      stack: RefCell::new(ScopeStack::new()),
      config,
      out: RefCell::new(out),
    }
  }
}

pub struct Session {
  lua: Lua,
  state: Rc<SessionState>,
}

impl Session {
  /// Create a session writing progress to `out`.
  pub fn new(config: RunConfig, out: Box<dyn Write>) -> Result<Self, EngineError> {
    let state = Rc::new(SessionState::new(config, out));
    let lua = runtime::create_runtime(state.clone())?;
    Ok(Self { lua, state })
  }

  pub fn config(&self) -> &RunConfig {
    &self.state.config
  }

  pub fn stack(&self) -> Ref<'_, ScopeStack> {
    self.state.stack.borrow()
  }

  /// Evaluate `config_file` in `dir` and bring `targets` up to date.
  ///
  /// With no explicit targets the targets the script declared are used.
  /// Returns the finished scope with its plan and executed rules.
  pub fn run(&self, dir: &Path, config_file: &str, targets: &[String]) -> Result<Context, EngineError> {
    execute_directory(&self.lua, &self.state, dir, config_file, targets)
  }
}

pub(crate) fn execute_directory(
  lua: &Lua,
  state: &Rc<SessionState>,
  dir: &Path,
  config_file: &str,
  targets: &[String],
) -> Result<Context, EngineError> {
  let dir = dunce::canonicalize(dir).map_err(|source| EngineError::Io {
    path: dir.display().to_string(),
    source,
  })?;
  info!(dir = %dir.display(), script = %config_file, mode = %state.config.mode, "executing build script");

  state.stack.borrow_mut().push(&dir);
  let outcome = run_script(lua, state, &dir, config_file, targets);

  let mut stack = state.stack.borrow_mut();
  match outcome {
    Ok((plan, executed)) => {
      stack.current_mut().finish(plan, executed);
      let context = stack.pop().unwrap_or_default();
      stack.record_completed(context.clone());
      Ok(context)
    }
    Err(err) => {
      stack.pop();
      Err(err)
    }
  }
}

fn run_script(
  lua: &Lua,
  state: &Rc<SessionState>,
  dir: &Path,
  config_file: &str,
  targets: &[String],
) -> Result<(Vec<PlanEntry>, Vec<ExecutedRule>), EngineError> {
  let script = dir.join(config_file);
  if !script.is_file() {
    return Err(EngineError::Io {
      path: script.display().to_string(),
      source: io::Error::new(io::ErrorKind::NotFound, "build script not found"),
    });
  }
  runtime::load_file(lua, &script)?;

  let config = &state.config;
  let plan = {
    let stack = state.stack.borrow();
    let wanted: Vec<BuildPath> = if targets.is_empty() {
      stack.current().targets().to_vec()
    } else {
      targets.iter().map(|name| stack.resolve_name(dir, name)).collect()
    };
    generate_dependency_list(&stack, &wanted, config)?
  };

  if plan.is_empty() {
    debug!(dir = %dir.display(), "nothing to do");
    return Ok((plan, Vec::new()));
  }

  let mut out = SinkWriter(&state.out);
  writeln!(out, "[+] {} {} in {}", verb(config.mode), config_file, dir.display())?;

  let executed = match config.mode {
    Mode::Build => build_deps(&plan, config, Some(dir), &mut out)?,
    Mode::Clean => {
      clean_deps(&plan, config, &mut out)?;
      Vec::new()
    }
    Mode::Rebuild => {
      clean_deps(&plan, config, &mut out)?;
      build_deps(&plan, config, Some(dir), &mut out)?
    }
  };
  Ok((plan, executed))
}

fn verb(mode: Mode) -> &'static str {
  match mode {
    Mode::Build => "Building",
    Mode::Clean => "Cleaning",
    Mode::Rebuild => "Rebuilding",
  }
}

/// Borrows the shared sink only for the duration of each write, so actions
/// that start nested sub-builds can report through it as well.
struct SinkWriter<'a>(&'a RefCell<Box<dyn Write>>);

impl Write for SinkWriter<'_> {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self
      .0
      .try_borrow_mut()
      .map_err(|_| io::Error::other("output sink is busy"))?
      .write(buf)
  }

  fn flush(&mut self) -> io::Result<()> {
    self
      .0
      .try_borrow_mut()
      .map_err(|_| io::Error::other("output sink is busy"))?
      .flush()
  }
}
