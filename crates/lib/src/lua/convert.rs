//! Conversions between Lua values and engine types.

use std::path::Path;

use mlua::prelude::*;

use crate::action::Kwargs;
use crate::path::{BuildPath, VIRTUAL_DEP_TYPE, VIRTUAL_TARGET_TYPE};

/// Metatable key carrying the type marker of virtual values.
pub const TYPE_KEY: &str = "__type";

/// Which side of a rule a converted path ends up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
  Target,
  Dep,
}

/// Build the marker table of a virtual target or dependency.
pub fn virtual_to_lua(lua: &Lua, type_name: &str, name: &str) -> LuaResult<LuaTable> {
  let table = lua.create_table()?;
  table.set("name", name)?;

  let mt = lua.create_table()?;
  mt.set(TYPE_KEY, type_name)?;
  mt.set(
    "__tostring",
    lua.create_function(|_, this: LuaTable| this.get::<String>("name"))?,
  )?;
  table.set_metatable(Some(mt))?;
  Ok(table)
}

/// The virtual name carried by a marker table, if `table` is one.
pub fn virtual_name(table: &LuaTable) -> LuaResult<Option<String>> {
  let Some(mt) = table.metatable() else {
    return Ok(None);
  };
  match mt.get::<Option<String>>(TYPE_KEY)?.as_deref() {
    Some(VIRTUAL_TARGET_TYPE) | Some(VIRTUAL_DEP_TYPE) => Ok(Some(table.get("name")?)),
    _ => Ok(None),
  }
}

/// Convert a string, virtual marker or (nested) list of those into paths.
///
/// Strings are filesystem paths relative to `base`. Virtual markers take the
/// kind matching `role`, since a target and a dependency with the same virtual
/// name denote the same entity.
pub fn lua_to_paths(value: LuaValue, base: &Path, role: Role) -> LuaResult<Vec<BuildPath>> {
  let mut paths = Vec::new();
  collect_paths(value, base, role, &mut paths)?;
  Ok(paths)
}

fn collect_paths(value: LuaValue, base: &Path, role: Role, paths: &mut Vec<BuildPath>) -> LuaResult<()> {
  match value {
    LuaValue::Nil => Ok(()),
    LuaValue::String(s) => {
      paths.push(BuildPath::real(base, &*s.to_str()?));
      Ok(())
    }
    LuaValue::Table(table) => {
      if let Some(name) = virtual_name(&table)? {
        paths.push(match role {
          Role::Target => BuildPath::virtual_target(name),
          Role::Dep => BuildPath::virtual_dep(name),
        });
        return Ok(());
      }
      for item in table.sequence_values::<LuaValue>() {
        collect_paths(item?, base, role, paths)?;
      }
      Ok(())
    }
    other => Err(LuaError::external(format!(
      "expected a path, virtual value or list, got {}",
      other.type_name()
    ))),
  }
}

/// A string or list of strings.
pub fn lua_to_strings(value: LuaValue) -> LuaResult<Vec<String>> {
  match value {
    LuaValue::Nil => Ok(Vec::new()),
    LuaValue::String(s) => Ok(vec![s.to_str()?.to_string()]),
    LuaValue::Table(table) => table.sequence_values::<String>().collect(),
    other => Err(LuaError::external(format!(
      "expected a string or list of strings, got {}",
      other.type_name()
    ))),
  }
}

pub fn lua_to_kwargs(lua: &Lua, value: Option<LuaTable>) -> LuaResult<Kwargs> {
  match value {
    Some(table) => lua.from_value(LuaValue::Table(table)),
    None => Ok(Kwargs::new()),
  }
}
