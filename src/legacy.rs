//! Legacy (sync v1) storage: one zip archive plus one metadata record per
//! document, stored flat in the user's directory.

pub mod archive;
pub mod storage;

pub use storage::{DocumentHandler, FileSystemStorage, MetadataStorer};
