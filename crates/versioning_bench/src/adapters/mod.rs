// Rust guideline compliant 2026-02-23

//! Adapters (secondary ports) for the versioning benchmark binary.
//!
//! Each sub-module implements one or more hexagonal port traits defined in
//! the `domain` crate. Adapters are intentionally isolated from component
//! logic.

pub mod channel_bus;
pub mod in_memory_store;
pub mod store_probe;
pub mod synthetic_changes;
