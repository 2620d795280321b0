//! Concrete action implementations.

pub mod archive;
pub mod cmd;
pub mod fs;

pub use cmd::execute_cmd;
