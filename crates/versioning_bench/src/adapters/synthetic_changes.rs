// Rust guideline compliant 2026-02-23

//! Seeded synthetic adapter for the `ChangeSetSource` port.
//!
//! Generates one producer's shard of each version: a random number of
//! additions, deletions drawn from triples still live in earlier versions,
//! and exact cumulative counts. The same seed reproduces the same run.

use std::cell::RefCell;
use std::collections::VecDeque;

use domain::{ChangeSet, ChangeSetSource, DataPayload, GenerationError};
use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng as _};

/// `ChangeSetSource` adapter producing deterministic synthetic changesets.
///
/// Deletions are emitted as `- <line>` entries referencing triples this
/// source generated for earlier versions, so a store that applies them
/// literally ends up holding exactly `triples_loaded` of this shard.
#[derive(Debug)]
pub struct SyntheticChangeSource {
    producer_id: u32,
    triples_per_version: usize,
    payload_chunk: usize,
    rng: RefCell<StdRng>,
    /// This shard's triples currently in the store, oldest first.
    live: RefCell<VecDeque<String>>,
}

impl SyntheticChangeSource {
    /// Create a source for `producer_id`, seeded with `seed`.
    ///
    /// `triples_per_version` bounds the additions per version;
    /// `payload_chunk` is the number of lines per bulk payload unit
    /// (clamped to at least 1).
    #[must_use]
    pub fn new(producer_id: u32, seed: u64, triples_per_version: usize, payload_chunk: usize) -> Self {
        Self {
            producer_id,
            triples_per_version: triples_per_version.max(1),
            payload_chunk: payload_chunk.max(1),
            rng: RefCell::new(StdRng::seed_from_u64(seed)),
            live: RefCell::new(VecDeque::new()),
        }
    }

    fn triple_line(&self, version: usize, index: usize) -> String {
        format!(
            "<http://versioning.local/resource/p{}v{version}i{index}> \
             <http://purl.org/dc/terms/identifier> \"{}-{version}-{index}\" .",
            self.producer_id, self.producer_id
        )
    }
}

impl ChangeSetSource for SyntheticChangeSource {
    /// Generate this shard of `version`. Never fails; the error arm exists
    /// only for real generators behind the same port.
    async fn generate(&self, version: usize) -> Result<ChangeSet, GenerationError> {
        let mut rng = self.rng.borrow_mut();
        let mut live = self.live.borrow_mut();

        let added = rng.random_range(self.triples_per_version / 2..=self.triples_per_version);
        let added = added.max(1);
        // Version 0 is the initial dataset: nothing exists to delete yet.
        let deleted = if version == 0 {
            0
        } else {
            rng.random_range(0..=live.len().min(added / 4))
        };

        let mut lines = Vec::with_capacity(added + deleted);
        for _ in 0..deleted {
            // live is non-empty for every drawn deletion.
            if let Some(victim) = live.pop_front() {
                lines.push(format!("- {victim}"));
            }
        }
        for index in 0..added {
            let line = self.triple_line(version, index);
            live.push_back(line.clone());
            lines.push(line);
        }

        let payloads: Vec<DataPayload> = lines
            .chunks(self.payload_chunk)
            .map(|chunk| DataPayload {
                graph_uri: format!("http://versioning.local/graph/version-{version}"),
                content: chunk.join("\n").into_bytes(),
            })
            .collect();

        Ok(ChangeSet {
            payloads,
            triples_added: u32::try_from(added).unwrap_or(u32::MAX),
            triples_deleted: u32::try_from(deleted).unwrap_or(u32::MAX),
            triples_loaded: u32::try_from(live.len()).unwrap_or(u32::MAX),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
