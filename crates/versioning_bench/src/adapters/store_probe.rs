// Rust guideline compliant 2026-02-23

//! Adapter for the `ResourceUsageProbe` port, derived from the in-memory
//! store's footprint.

use domain::{ProbeError, ResourceUsageProbe};

use super::in_memory_store::InMemoryStore;

/// `ResourceUsageProbe` adapter reporting a fixed capacity minus the bytes
/// currently held by an [`InMemoryStore`].
#[derive(Debug)]
pub struct StoreSpaceProbe<'a> {
    capacity_bytes: u64,
    store: &'a InMemoryStore,
}

impl<'a> StoreSpaceProbe<'a> {
    /// Create a probe over `store` with `capacity_bytes` of nominal space.
    #[must_use]
    pub fn new(capacity_bytes: u64, store: &'a InMemoryStore) -> Self {
        Self {
            capacity_bytes,
            store,
        }
    }
}

impl ResourceUsageProbe for StoreSpaceProbe<'_> {
    /// Usable space; saturates at zero when the store outgrows the nominal
    /// capacity. Never fails for proof-of-concept usage.
    async fn usable_space(&self) -> Result<u64, ProbeError> {
        Ok(self.capacity_bytes.saturating_sub(self.store.bytes_held()))
    }
}
