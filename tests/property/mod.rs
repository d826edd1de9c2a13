//! Property-based tests for hashing and index guarantees

mod determinism;
