//! Configuration sources, listed from lowest to highest precedence.

pub mod env;
pub mod global_file;
pub mod workspace_file;
