//! Configuration sources, lowest precedence first.

pub mod data_root_file;
pub mod environment;
pub mod global_file;
