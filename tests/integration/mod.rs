//! Integration tests for the document sync core

mod blob_backend;
mod config_integration;
mod index_codec;
mod legacy_backend;
mod mirror_reconciliation;
mod test_utils;
