//! The `remake` global table.
//!
//! - `remake.dir` - directory of the script being evaluated
//! - `remake.mode`, `remake.dry_run` - the run configuration
//! - `remake.path` - path manipulation utilities
//! - `remake.builders` - builtin builders (`copy`, `move`, `remove`, `mkdir`, `archive`)
//! - `remake.builder{}` - define a builder
//! - `remake.rule{}` - register a named rule
//! - `remake.pattern_rule{}` - register a pattern rule
//! - `remake.target()` - declare default targets
//! - `remake.virtual_target()` / `remake.virtual_dep()` - virtual values
//! - `remake.subdir()` - run a nested sub-build

use std::path::Path;
use std::rc::Rc;

use mlua::prelude::*;
use tracing::debug;

use super::action::{LuaAction, LuaBuilder, LuaPatternRule, LuaRebuildCheck, builder_field};
use super::convert::{Role, lua_to_kwargs, lua_to_paths, lua_to_strings, virtual_to_lua};
use super::{helpers, runtime};
use crate::action::builtin;
use crate::builder::{Action, Builder};
use crate::config::DEFAULT_CONFIG_FILE;
use crate::eval::{SessionState, execute_directory};
use crate::execute::EngineError;
use crate::path::{BuildPath, VIRTUAL_DEP_TYPE, VIRTUAL_TARGET_TYPE, absolutize};
use crate::rule::{PatternRule, RegistrationError, Rule};

/// Name of the global table.
pub const REMAKE_GLOBAL: &str = "remake";

/// Register the `remake` global table in the Lua runtime.
pub fn register_globals(lua: &Lua, state: Rc<SessionState>) -> LuaResult<()> {
  let remake = lua.create_table()?;

  remake.set("dir", state.stack.borrow().base_dir().to_string_lossy().into_owned())?;
  remake.set("mode", state.config.mode.as_str())?;
  remake.set("dry_run", state.config.dry_run)?;

  let path = helpers::path::create_path_helpers(lua, state.clone())?;
  remake.set("path", path)?;

  let builders = lua.create_table()?;
  for name in builtin::BUILTIN_NAMES {
    if let Some(builder) = builtin::by_name(name) {
      builders.set(name, LuaBuilder(Rc::new(builder)))?;
    }
  }
  remake.set("builders", builders)?;

  register_builder(lua, &remake, state.clone())?;
  register_rule(lua, &remake, state.clone())?;
  register_pattern_rule(lua, &remake, state.clone())?;
  register_targets(lua, &remake, state.clone())?;
  register_subdir(lua, &remake, state)?;

  lua.globals().set(REMAKE_GLOBAL, remake)?;

  Ok(())
}

fn registration(err: RegistrationError) -> LuaError {
  LuaError::external(EngineError::Registration(err))
}

/// `remake.builder{ action, name?, destructive?, should_rebuild? }`
fn register_builder(lua: &Lua, remake: &LuaTable, state: Rc<SessionState>) -> LuaResult<()> {
  let builder_fn = lua.create_function(move |_, spec: LuaTable| {
    let action = match spec.get::<LuaValue>("action")? {
      LuaValue::String(command) => Action::template(&command.to_str()?),
      LuaValue::Table(tokens) => Action::ShellTemplate(tokens.sequence_values::<String>().collect::<LuaResult<_>>()?),
      LuaValue::Function(func) => {
        let name = spec
          .get::<Option<String>>("name")?
          .unwrap_or_else(|| "lua_action".to_string());
        Action::Native(Rc::new(LuaAction::new(name, func)))
      }
      other => {
        return Err(LuaError::external(format!(
          "builder action must be a string, list or function, got {}",
          other.type_name()
        )));
      }
    };

    let mut builder = Builder::new(action).destructive(spec.get::<Option<bool>>("destructive")?.unwrap_or(false));
    if let Some(check) = spec.get::<Option<LuaFunction>>("should_rebuild")? {
      builder = builder.with_rebuild_check(Rc::new(LuaRebuildCheck::new(check)));
    }

    let builder = Rc::new(builder);
    state.stack.borrow_mut().add_builder(builder.clone());
    Ok(LuaBuilder(builder))
  })?;
  remake.set("builder", builder_fn)
}

/// `remake.rule{ targets, deps?, builder, kwargs? }`
fn register_rule(lua: &Lua, remake: &LuaTable, state: Rc<SessionState>) -> LuaResult<()> {
  let rule_fn = lua.create_function(move |lua, spec: LuaTable| {
    let base = state.stack.borrow().base_dir();

    let mut targets_value: LuaValue = spec.get("targets")?;
    if targets_value.is_nil() {
      targets_value = spec.get("target")?;
    }
    let targets = lua_to_paths(targets_value, &base, Role::Target)?;
    let deps = lua_to_paths(spec.get("deps")?, &base, Role::Dep)?;
    let builder = builder_field(&spec, "builder")?;
    let kwargs = lua_to_kwargs(lua, spec.get("kwargs")?)?;

    let rule = Rule::new(targets, deps, builder).map_err(registration)?.with_kwargs(kwargs);
    let rule = state.stack.borrow_mut().add_rule(rule).map_err(registration)?;
    debug!(rule = %rule.action_name(), targets = rule.targets().len(), "registered rule");
    Ok(())
  })?;
  remake.set("rule", rule_fn)
}

/// `remake.pattern_rule{ target, deps, builder, exclude?, kwargs? }`
fn register_pattern_rule(lua: &Lua, remake: &LuaTable, state: Rc<SessionState>) -> LuaResult<()> {
  let pattern_fn = lua.create_function(move |lua, spec: LuaTable| {
    let base = state.stack.borrow().base_dir();

    let target: String = spec.get("target")?;
    let deps = lua_to_strings(spec.get("deps")?)?;
    let builder = builder_field(&spec, "builder")?;
    let exclude = lua_to_strings(spec.get("exclude")?)?
      .into_iter()
      .map(|e| absolutize(&base, Path::new(&e)).to_string_lossy().into_owned())
      .collect();
    let kwargs = lua_to_kwargs(lua, spec.get("kwargs")?)?;

    let rule = PatternRule::new(&target, &deps, builder)
      .map_err(registration)?
      .with_exclude(exclude)
      .with_kwargs(kwargs);
    let rule = state.stack.borrow_mut().add_pattern_rule(rule);
    debug!(pattern = %rule, "registered pattern rule");
    Ok(LuaPatternRule { rule, dir: base })
  })?;
  remake.set("pattern_rule", pattern_fn)
}

/// `remake.target`, `remake.virtual_target` and `remake.virtual_dep`.
fn register_targets(lua: &Lua, remake: &LuaTable, state: Rc<SessionState>) -> LuaResult<()> {
  let st = state.clone();
  let target_fn = lua.create_function(move |_, value: LuaValue| {
    let base = st.stack.borrow().base_dir();
    let targets = lua_to_paths(value, &base, Role::Target)?;
    st.stack.borrow_mut().add_targets(targets);
    Ok(())
  })?;
  remake.set("target", target_fn)?;

  let virtual_target_fn = lua.create_function(move |lua, name: String| {
    state
      .stack
      .borrow_mut()
      .add_targets([BuildPath::virtual_target(name.clone())]);
    virtual_to_lua(lua, VIRTUAL_TARGET_TYPE, &name)
  })?;
  remake.set("virtual_target", virtual_target_fn)?;

  let virtual_dep_fn = lua.create_function(|lua, name: String| virtual_to_lua(lua, VIRTUAL_DEP_TYPE, &name))?;
  remake.set("virtual_dep", virtual_dep_fn)
}

/// `remake.subdir(dir, config_file?)` returns `{ dir, executed }`.
fn register_subdir(lua: &Lua, remake: &LuaTable, state: Rc<SessionState>) -> LuaResult<()> {
  let subdir_fn = lua.create_function(move |lua, (dir, config_file): (String, Option<String>)| {
    let parent = state.stack.borrow().base_dir();
    let dir = absolutize(&parent, Path::new(&dir));
    let config_file = config_file.unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

    let outcome = execute_directory(lua, &state, &dir, &config_file, &[]);
    runtime::set_dir(lua, &parent)?;
    let context = outcome.map_err(LuaError::external)?;

    let result = lua.create_table()?;
    result.set(
      "dir",
      context
        .cwd()
        .map(|cwd| cwd.to_string_lossy().into_owned())
        .unwrap_or_default(),
    )?;
    result.set("executed", context.executed().len())?;
    Ok(result)
  })?;
  remake.set("subdir", subdir_fn)
}
