//! Entity model and reconciliation engine
//!
//! A `HashTree` holds one `HashDoc` per document; each `HashDoc` lists the
//! content-addressed files that make up the document. Hashes are recomputed
//! bottom-up on every mutation and `mirror` aligns a cached tree with a
//! remote listing.

pub mod doc;
pub mod entry;
pub mod hasher;
pub mod hashtree;
pub mod index;
pub mod mirror;

pub use doc::HashDoc;
pub use entry::{HashEntry, DOC_TYPE, FILE_TYPE};
pub use hashtree::HashTree;
pub use index::{parse_index, IndexReader, SCHEMA_VERSION};
pub use mirror::{MetadataOutcome, MirrorStats};
