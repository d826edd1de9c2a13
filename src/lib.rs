//! docsync: Document Sync Core
//!
//! Content-addressed storage and reconciliation for the documents a user
//! keeps on a note-taking tablet, served to clients over two sync protocol
//! generations: per-document archives (1.0) and a hashed document tree (1.5).

pub mod backend;
pub mod blob;
pub mod cli;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod legacy;
pub mod logging;
pub mod metadata;
pub mod notify;
pub mod store;
pub mod tree;
pub mod types;
