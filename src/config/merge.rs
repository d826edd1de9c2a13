//! Source composition and merge rules.

pub mod merge_policy;
pub mod service;
