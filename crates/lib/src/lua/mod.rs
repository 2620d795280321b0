//! Lua runtime for build scripts.
//!
//! - [`runtime`] - VM creation and script loading
//! - [`globals`] - the `remake` global table
//! - [`action`] - Lua functions as actions, userdata handles
//! - [`convert`] - Lua values to paths and keyword arguments
//! - [`helpers`] - helper tables such as `remake.path`

pub mod action;
pub mod convert;
pub mod globals;
pub mod helpers;
pub mod runtime;
