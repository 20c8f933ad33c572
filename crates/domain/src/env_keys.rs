// Rust guideline compliant 2026-02-23

//! Fixed key grammar of the evaluation module's environment interface.
//!
//! The controller assembles its per-version aggregates under these keys and
//! the evaluation module reads them back; both sides must agree on the
//! exact spelling (including the historical `avgerage` typo, kept for
//! compatibility with existing result stores).

/// Total number of versions composing the dataset.
pub const TOTAL_VERSIONS: &str = "versions_number";

/// Aggregate storage-cost delta in bytes (signed).
pub const STORAGE_COST_VALUE: &str = "storage_cost_value";

/// URI of the experiment the report describes.
pub const EXPERIMENT_URI: &str = "experiment_uri";

/// Metric label: initial-version ingestion speed.
pub const INITIAL_VERSION_INGESTION_SPEED: &str = "initial_version_ingestion_speed";

/// Metric label: average applied changes per second.
pub const AVG_APPLIED_CHANGES_PS: &str = "avg_applied_changes_ps";

/// Metric label: storage cost.
pub const STORAGE_COST: &str = "storage_cost";

/// Metric label: total query failures.
pub const QUERY_FAILURES: &str = "query_failures";

/// Metric label: queries per second.
pub const QUERIES_PER_SECOND: &str = "queries_per_second";

/// Per-version loading time key, milliseconds.
#[must_use]
pub fn loading_time(version: usize) -> String {
    format!("version_{version}_loading_time")
}

/// Per-version added-triples key.
#[must_use]
pub fn triples_to_be_added(version: usize) -> String {
    format!("version_{version}_triples_to_be_added")
}

/// Per-version deleted-triples key.
#[must_use]
pub fn triples_to_be_deleted(version: usize) -> String {
    format!("version_{version}_triples_to_be_deleted")
}

/// Per-version cumulative-triples key.
#[must_use]
pub fn triples_to_be_loaded(version: usize) -> String {
    format!("version_{version}_triples_to_be_loaded")
}

/// Per-query-type average execution time metric label key.
#[must_use]
pub fn qt_avg_exec_time(query_type: u8) -> String {
    format!("query_type_{query_type}_avgerage_execution_time")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templated_keys() {
        assert_eq!(loading_time(3), "version_3_loading_time");
        assert_eq!(triples_to_be_added(0), "version_0_triples_to_be_added");
        assert_eq!(triples_to_be_deleted(11), "version_11_triples_to_be_deleted");
        assert_eq!(triples_to_be_loaded(7), "version_7_triples_to_be_loaded");
        assert_eq!(
            qt_avg_exec_time(5),
            "query_type_5_avgerage_execution_time"
        );
    }
}
