//! Lua functions as builder actions, and the userdata handed back to scripts.

use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;

use mlua::prelude::*;
use mlua::{IntoLua, LuaSerdeExt};

use crate::action::{ActionError, Kwargs, NativeAction, RebuildCheck};
use crate::builder::{Action, Builder};
use crate::path::BuildPath;
use crate::rule::PatternRule;

/// A builder action implemented by a Lua function.
///
/// The function is called as `f(deps, targets, kwargs)`. A returned string is
/// written to the output sink.
pub struct LuaAction {
  name: String,
  func: LuaFunction,
}

impl LuaAction {
  pub fn new(name: impl Into<String>, func: LuaFunction) -> Self {
    Self {
      name: name.into(),
      func,
    }
  }
}

impl NativeAction for LuaAction {
  fn name(&self) -> &str {
    &self.name
  }

  fn run(&self, deps: &[BuildPath], targets: &[BuildPath], out: &mut dyn Write, kwargs: &Kwargs) -> Result<(), ActionError> {
    let result: LuaValue = self.func.call((names(deps), names(targets), KwargsArg(kwargs)))?;
    if let LuaValue::String(message) = result {
      writeln!(out, "{}", message.to_string_lossy())?;
    }
    Ok(())
  }
}

/// A staleness override implemented by a Lua function `f(targets, deps) -> bool`.
pub struct LuaRebuildCheck {
  func: LuaFunction,
}

impl LuaRebuildCheck {
  pub fn new(func: LuaFunction) -> Self {
    Self { func }
  }
}

impl RebuildCheck for LuaRebuildCheck {
  fn should_rebuild(&self, targets: &[BuildPath], deps: &[BuildPath]) -> Result<bool, ActionError> {
    Ok(self.func.call::<bool>((names(targets), names(deps)))?)
  }
}

fn names(paths: &[BuildPath]) -> Vec<String> {
  paths.iter().map(ToString::to_string).collect()
}

struct KwargsArg<'a>(&'a Kwargs);

impl IntoLua for KwargsArg<'_> {
  fn into_lua(self, lua: &Lua) -> LuaResult<LuaValue> {
    lua.to_value(self.0)
  }
}

/// Builder handle returned by `remake.builder` and found in `remake.builders`.
#[derive(Clone)]
pub struct LuaBuilder(pub Rc<Builder>);

impl LuaUserData for LuaBuilder {
  fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
    fields.add_field_method_get("destructive", |_, this| Ok(this.0.is_destructive()));
  }

  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| {
      Ok(match this.0.action() {
        Action::ShellTemplate(tokens) => format!("Builder({})", tokens.join(" ")),
        Action::Native(native) => format!("Builder({})", native.name()),
      })
    });
  }
}

/// Extract the builder handle stored under `key` of a spec table.
pub fn builder_field(spec: &LuaTable, key: &str) -> LuaResult<Rc<Builder>> {
  let value: LuaValue = spec.get(key)?;
  let LuaValue::UserData(ud) = value else {
    return Err(LuaError::external(format!("spec requires a builder in '{key}'")));
  };
  Ok(ud.borrow::<LuaBuilder>()?.0.clone())
}

/// Pattern rule handle returned by `remake.pattern_rule`.
pub struct LuaPatternRule {
  pub rule: Rc<PatternRule>,
  pub dir: PathBuf,
}

impl LuaUserData for LuaPatternRule {
  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_method("all_targets", |_, this, ()| {
      let targets = this.rule.all_targets(&this.dir).map_err(LuaError::external)?;
      Ok(names(&targets))
    });

    methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| Ok(this.rule.to_string()));
  }
}
