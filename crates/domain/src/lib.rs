// Rust guideline compliant 2026-02-23

//! Shared domain types for the RDF-versioning benchmark orchestrator.
//!
//! Defines the version/task data model, the [`ResultSet`] comparison type,
//! and the hexagonal port traits: [`CommandSink`], [`DataSink`],
//! [`ChangeSetSource`], [`ResourceUsageProbe`], [`BulkLoader`], and
//! [`QueryEngine`]. The [`barrier`] module holds the counting readiness
//! primitive and [`command`] holds the wire protocol. All pipeline
//! components depend on this crate; no other workspace crate is imported
//! here.

pub mod barrier;
pub mod command;
pub mod env_keys;

use crate::command::Command;

// ---------------------------------------------------------------------------
// Query types
// ---------------------------------------------------------------------------

/// One of the eight fixed query classes measured by the benchmark.
///
/// Construct via [`QueryType::new`]; the wrapped value is always in `1..=8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryType(u8);

impl QueryType {
    /// Number of query classes.
    pub const COUNT: usize = 8;

    /// All query types in ascending order.
    pub const ALL: [QueryType; Self::COUNT] = [
        QueryType(1),
        QueryType(2),
        QueryType(3),
        QueryType(4),
        QueryType(5),
        QueryType(6),
        QueryType(7),
        QueryType(8),
    ];

    /// Wrap a raw query-type number.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidQueryType`] when `raw` is outside `1..=8`.
    pub fn new(raw: u8) -> Result<Self, ProtocolError> {
        if (1..=8).contains(&raw) {
            Ok(Self(raw))
        } else {
            Err(ProtocolError::InvalidQueryType { raw })
        }
    }

    /// The raw query-type number (`1..=8`).
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based index into per-type aggregator arrays.
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0) - 1
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Data model
// ---------------------------------------------------------------------------

/// One producer's completion record for one version.
///
/// Exactly one report is expected per producer per version; the controller
/// merges reports additively across producers and attributes them to the
/// version currently being loaded (the wire layout carries no version
/// ordinal -- the sequential protocol makes it implicit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionReport {
    /// Triples added by this producer's shard of the changeset.
    pub triples_added: u32,
    /// Triples deleted by this producer's shard of the changeset.
    pub triples_deleted: u32,
    /// Cumulative triples the store holds once this version is applied.
    pub triples_loaded: u32,
    /// Reporting producer's identity.
    pub producer_id: u32,
    /// Number of bulk payload units this producer delivered for the version.
    pub message_count: u32,
}

/// Controller-to-system notification that all producers finished sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadFinishedSignal {
    /// Total payload units sent by all producers for the current version.
    pub message_count: u32,
    /// `true` on the final version; the system switches to query serving
    /// once this version is loaded.
    pub last_version: bool,
}

/// One bulk data unit delivered out-of-band from a producer to the system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPayload {
    /// Target named graph of the payload.
    pub graph_uri: String,
    /// Opaque serialized triples.
    pub content: Vec<u8>,
}

/// One version's changeset as produced by the external generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    /// Payload units to deliver (adds first, then deletes).
    pub payloads: Vec<DataPayload>,
    /// Triples added by this changeset.
    pub triples_added: u32,
    /// Triples deleted by this changeset.
    pub triples_deleted: u32,
    /// Cumulative store size once this changeset is applied.
    pub triples_loaded: u32,
}

/// One benchmark query task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Numeric-sequential task identity, e.g. `"0"`, `"1"`.
    pub task_id: String,
    /// Query class of this task.
    pub query_type: QueryType,
    /// Sub-type within the query class.
    pub query_sub_type: u32,
    /// Substitution parameter used when instantiating the query template.
    pub substitution_param: u32,
    /// Full query text.
    pub query_text: String,
}

impl Task {
    /// Encode the expected answer for this task.
    ///
    /// The result bytes are preceded by a 12-byte
    /// `(query_type, query_sub_type, substitution_param)` header; the
    /// evaluation module needs it to route the outcome to the right
    /// aggregator.
    #[must_use]
    pub fn expected_answer_bytes(&self, result: &[u8]) -> Vec<u8> {
        command::encode_expected_answer(
            self.query_type,
            self.query_sub_type,
            self.substitution_param,
            result,
        )
    }
}

// ---------------------------------------------------------------------------
// Result sets
// ---------------------------------------------------------------------------

/// An ordered set of query result rows.
///
/// Wire form is newline-separated UTF-8 rows. Value comparison is
/// order-insensitive; see [`ResultSet::equals_by_value`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSet {
    rows: Vec<String>,
}

impl ResultSet {
    /// Build a result set from owned rows.
    #[must_use]
    pub fn new(rows: Vec<String>) -> Self {
        Self { rows }
    }

    /// Decode from newline-separated UTF-8 bytes. Empty input decodes to an
    /// empty result set; a trailing newline does not add an empty row.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidUtf8`] when `bytes` is not UTF-8.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let Ok(text) = std::str::from_utf8(bytes) else {
            return Err(ProtocolError::InvalidUtf8);
        };
        let rows = text
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect();
        Ok(Self { rows })
    }

    /// Encode to newline-separated UTF-8 bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.rows.join("\n").into_bytes()
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// `true` when the result set has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row slice in wire order.
    #[must_use]
    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    /// Order-insensitive value equality: both sets contain the same rows
    /// with the same multiplicities.
    #[must_use]
    pub fn equals_by_value(&self, other: &Self) -> bool {
        if self.rows.len() != other.rows.len() {
            return false;
        }
        let mut left = self.rows.clone();
        let mut right = other.rows.clone();
        left.sort_unstable();
        right.sort_unstable();
        left == right
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while decoding wire payloads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Payload ended before the expected field.
    #[error("truncated payload: needed {needed} more byte(s) at offset {offset}")]
    Truncated {
        /// Bytes still required by the current field.
        needed: usize,
        /// Read position where decoding stopped.
        offset: usize,
    },
    /// A length-prefixed string was not valid UTF-8.
    #[error("payload string is not valid UTF-8")]
    InvalidUtf8,
    /// Query-type number outside `1..=8`.
    #[error("invalid query type: {raw}")]
    InvalidQueryType {
        /// The rejected raw value.
        raw: u8,
    },
}

/// Errors from the command and data channel ports.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// The receiving side is gone; no further delivery is possible.
    #[error("channel closed")]
    Closed,
}

/// Errors from the changeset generation port.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The generator could not produce the requested version.
    #[error("changeset generation failed for version {version}: {reason}")]
    Failed {
        /// Version that failed to generate.
        version: usize,
        /// Human-readable description.
        reason: String,
    },
}

/// Errors from the resource usage probe port.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    /// No snapshot could be taken.
    #[error("resource probe unavailable: {reason}")]
    Unavailable {
        /// Human-readable description.
        reason: String,
    },
}

/// Errors from the system-under-test store ports.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The bulk load could not be applied.
    #[error("bulk load failed: {reason}")]
    LoadFailed {
        /// Human-readable description.
        reason: String,
    },
    /// Query execution failed.
    #[error("query failed: {reason}")]
    QueryFailed {
        /// Human-readable description.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Hexagonal port: asynchronous command delivery.
///
/// Fire-and-forget from the sender's perspective: delivery is at-least-once
/// and ordered per sender, with no acknowledgement beyond application-level
/// counting. Implementations live in the binary crate.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait CommandSink {
    /// Send one command.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] when no receiver remains.
    async fn send(&self, command: Command) -> Result<(), ChannelError>;
}

/// Hexagonal port: the unicast bulk data channel from producers to the
/// system under test.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait DataSink {
    /// Deliver one bulk payload unit.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] when the receiving side is gone.
    async fn deliver(&self, payload: DataPayload) -> Result<(), ChannelError>;
}

/// Hexagonal port: the external RDF changeset generator.
///
/// Producers depend exclusively on this trait -- never on a concrete
/// generator. Generation of realistic datasets is outside the orchestrator.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait ChangeSetSource {
    /// Produce the changeset transforming version `version - 1` into
    /// `version` (version 0 is the initial dataset).
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Failed`] when the changeset cannot be
    /// produced.
    async fn generate(&self, version: usize) -> Result<ChangeSet, GenerationError>;
}

/// Hexagonal port: point-in-time disk usage snapshots.
///
/// Queried synchronously by the controller at exactly two points (before
/// the first load, after the last) and per-version by the system adapter.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait ResourceUsageProbe {
    /// Currently usable storage space, in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Unavailable`] when no snapshot can be taken.
    async fn usable_space(&self) -> Result<u64, ProbeError>;
}

/// Hexagonal port: the system under test's bulk-load action.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait BulkLoader {
    /// Load all staged payloads of `version` and return the number of
    /// triples ingested.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LoadFailed`] when the load cannot be applied.
    async fn load(&self, version: usize, payloads: Vec<DataPayload>) -> Result<u64, StoreError>;
}

/// Hexagonal port: query execution against the loaded store.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait QueryEngine {
    /// Execute `query` and return the serialized result set.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::QueryFailed`] on execution failure.
    async fn execute(&self, query: &str) -> Result<Vec<u8>, StoreError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
