// Rust guideline compliant 2026-02-23

//! Ingestion and per-query-type aggregators feeding the final report.

use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

/// The initial version's bulk-load record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InitialIngestion {
    triples_loaded: u64,
    loading_time_ms: u64,
}

/// One changeset version's load record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChangeRecord {
    triples_added: u64,
    triples_deleted: u64,
    loading_time_ms: u64,
}

/// Aggregator for the dataset-loading side of the benchmark.
///
/// Version 0 contributes the ingestion-speed metric; every later version
/// contributes to the average applied-changes rate. Any recorded failure
/// forces the ingestion speed to zero -- a partially loaded initial version
/// makes the throughput figure meaningless.
#[derive(Debug, Default)]
pub struct IngestionStatistics {
    initial: Option<InitialIngestion>,
    changes: BTreeMap<usize, ChangeRecord>,
    failures: u64,
}

impl IngestionStatistics {
    /// Create an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the initial version's load.
    pub fn record_initial(&mut self, triples_loaded: u64, loading_time_ms: u64) {
        self.initial = Some(InitialIngestion {
            triples_loaded,
            loading_time_ms,
        });
    }

    /// Record one changeset version's load. Re-recording a version
    /// overwrites the previous entry.
    pub fn record_changeset(
        &mut self,
        version: usize,
        triples_added: u64,
        triples_deleted: u64,
        loading_time_ms: u64,
    ) {
        self.changes.insert(
            version,
            ChangeRecord {
                triples_added,
                triples_deleted,
                loading_time_ms,
            },
        );
    }

    /// Record one ingestion failure.
    pub fn report_failure(&mut self) {
        self.failures += 1;
    }

    /// Number of recorded ingestion failures.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Initial-version ingestion speed in triples per second.
    ///
    /// Zero when no initial record exists, when the loading time is zero,
    /// or when any ingestion failure was recorded.
    #[must_use]
    pub fn initial_ingestion_speed(&self) -> f64 {
        if self.failures > 0 {
            return 0.0;
        }
        match self.initial {
            Some(initial) if initial.loading_time_ms > 0 => {
                let seconds = initial.loading_time_ms as f64 / 1000.0;
                initial.triples_loaded as f64 / seconds
            }
            _ => 0.0,
        }
    }

    /// Average applied changes (additions plus deletions) per second over
    /// all changeset versions; zero with no records.
    #[must_use]
    pub fn avg_changes_per_second(&self) -> f64 {
        let rates: Vec<f64> = self
            .changes
            .values()
            .filter(|record| record.loading_time_ms > 0)
            .map(|record| {
                let changes = (record.triples_added + record.triples_deleted) as f64;
                changes / (record.loading_time_ms as f64 / 1000.0)
            })
            .collect();
        if rates.is_empty() {
            0.0
        } else {
            rates.iter().sum::<f64>() / rates.len() as f64
        }
    }
}

// ---------------------------------------------------------------------------
// Query types
// ---------------------------------------------------------------------------

/// Aggregator for one query class.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueryTypeStatistics {
    runs: u64,
    failures: u64,
    min_ms: u64,
    max_ms: u64,
    sum_ms: u64,
}

impl QueryTypeStatistics {
    /// Create an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successful execution. The first success sets both
    /// extremes unconditionally.
    pub fn report_success(&mut self, execution_time_ms: u64) {
        if self.runs == 0 {
            self.min_ms = execution_time_ms;
            self.max_ms = execution_time_ms;
        } else {
            self.min_ms = self.min_ms.min(execution_time_ms);
            self.max_ms = self.max_ms.max(execution_time_ms);
        }
        self.runs += 1;
        self.sum_ms += execution_time_ms;
    }

    /// Record one failed or mismatching execution.
    pub fn report_failure(&mut self) {
        self.failures += 1;
    }

    /// Number of successful executions.
    #[must_use]
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// Number of failures.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Fastest successful execution in milliseconds; zero with no runs.
    #[must_use]
    pub fn min_execution_time_ms(&self) -> u64 {
        self.min_ms
    }

    /// Slowest successful execution in milliseconds; zero with no runs.
    #[must_use]
    pub fn max_execution_time_ms(&self) -> u64 {
        self.max_ms
    }

    /// Summed successful execution time in milliseconds.
    #[must_use]
    pub fn total_execution_time_ms(&self) -> u64 {
        self.sum_ms
    }

    /// Mean successful execution time in milliseconds; zero with no runs.
    #[must_use]
    pub fn avg_execution_time_ms(&self) -> f64 {
        if self.runs == 0 {
            0.0
        } else {
            self.sum_ms as f64 / self.runs as f64
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{IngestionStatistics, QueryTypeStatistics};

    #[test]
    fn ingestion_speed_is_triples_per_second() {
        let mut stats = IngestionStatistics::new();
        stats.record_initial(1_000_000, 10_000);
        let speed = stats.initial_ingestion_speed();
        assert!((speed - 100_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ingestion_speed_forced_to_zero_by_failure() {
        let mut stats = IngestionStatistics::new();
        stats.record_initial(1_000_000, 10_000);
        stats.report_failure();
        assert_eq!(stats.initial_ingestion_speed(), 0.0);
        assert_eq!(stats.failures(), 1);
    }

    #[test]
    fn ingestion_speed_zero_without_record_or_time() {
        let stats = IngestionStatistics::new();
        assert_eq!(stats.initial_ingestion_speed(), 0.0);
        let mut zero_time = IngestionStatistics::new();
        zero_time.record_initial(100, 0);
        assert_eq!(zero_time.initial_ingestion_speed(), 0.0);
    }

    #[test]
    fn avg_changes_per_second_averages_per_version_rates() {
        let mut stats = IngestionStatistics::new();
        stats.record_changeset(1, 100, 50, 1000);
        stats.record_changeset(2, 200, 100, 2000);
        stats.record_changeset(3, 50, 25, 500);
        let avg = stats.avg_changes_per_second();
        assert!((avg - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn avg_changes_per_second_zero_without_records() {
        assert_eq!(IngestionStatistics::new().avg_changes_per_second(), 0.0);
    }

    #[test]
    fn query_type_statistics_track_extremes_and_mean() {
        let mut stats = QueryTypeStatistics::new();
        stats.report_success(120);
        stats.report_success(80);
        stats.report_failure();
        assert_eq!(stats.runs(), 2);
        assert_eq!(stats.failures(), 1);
        assert_eq!(stats.min_execution_time_ms(), 80);
        assert_eq!(stats.max_execution_time_ms(), 120);
        assert_eq!(stats.total_execution_time_ms(), 200);
        assert!((stats.avg_execution_time_ms() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn query_type_average_is_zero_without_runs() {
        let mut stats = QueryTypeStatistics::new();
        stats.report_failure();
        assert_eq!(stats.avg_execution_time_ms(), 0.0);
        assert_eq!(stats.min_execution_time_ms(), 0);
    }
}
