// Rust guideline compliant 2026-02-23

//! Evaluation module -- scores query answers and summarizes the run.
//!
//! Configuration arrives as the flat key/value environment assembled by
//! the controller. Answers are compared order-insensitively, degrading to
//! a size-only comparison above [`SIZE_ONLY_THRESHOLD`] rows, and the
//! final report carries the five headline metrics plus per-query-type
//! averages.
//!
//! Entry points: [`EvaluationConfig::from_env`],
//! [`EvaluationModule::evaluate_response`], [`EvaluationModule::summarize`].

pub mod stats;

use std::collections::HashMap;

use domain::command::ExpectedAnswer;
use domain::{env_keys, ProtocolError, QueryType, ResultSet};

use crate::stats::{IngestionStatistics, QueryTypeStatistics};

/// Result-set size above which answers are compared by size only; sorting
/// and matching sets this large dominates evaluation time.
pub const SIZE_ONLY_THRESHOLD: usize = 50_000;

// ---------------------------------------------------------------------------
// EvaluationError
// ---------------------------------------------------------------------------

/// Errors that can occur in the evaluation module.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    /// A required environment key is absent.
    #[error("missing environment key: {key}")]
    MissingKey {
        /// The absent key.
        key: String,
    },
    /// An environment value could not be parsed.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// Key whose value failed to parse.
        key: String,
        /// The rejected raw value.
        value: String,
    },
    /// An expected-answer payload could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

// ---------------------------------------------------------------------------
// EvaluationConfig
// ---------------------------------------------------------------------------

/// Evaluation configuration parsed from the controller's environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationConfig {
    num_versions: usize,
    experiment_uri: String,
    storage_cost_bytes: i64,
    loading_times_ms: Vec<u64>,
    triples_added: Vec<u64>,
    triples_deleted: Vec<u64>,
    triples_loaded: Vec<u64>,
    metric_labels: MetricLabels,
}

/// URIs labeling each reported metric, routed through the environment by
/// the controller. All label keys are required; the report is unusable
/// without its labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricLabels {
    /// Label of the initial-version ingestion-speed metric.
    pub initial_version_ingestion_speed: String,
    /// Label of the applied-changes-per-second metric.
    pub avg_applied_changes_ps: String,
    /// Label of the storage-cost metric.
    pub storage_cost: String,
    /// Label of the query-failure-count metric.
    pub query_failures: String,
    /// Label of the queries-per-second metric.
    pub queries_per_second: String,
    /// Per-query-type average execution-time labels, by query-type index.
    pub avg_execution_time_ms: Vec<String>,
}

impl MetricLabels {
    fn from_map(map: &HashMap<String, String>) -> Result<Self, EvaluationError> {
        let mut avg_execution_time_ms = Vec::with_capacity(QueryType::COUNT);
        for qt in QueryType::ALL {
            avg_execution_time_ms
                .push(required(map, &env_keys::qt_avg_exec_time(qt.get()))?.to_owned());
        }
        Ok(Self {
            initial_version_ingestion_speed: required(
                map,
                env_keys::INITIAL_VERSION_INGESTION_SPEED,
            )?
            .to_owned(),
            avg_applied_changes_ps: required(map, env_keys::AVG_APPLIED_CHANGES_PS)?.to_owned(),
            storage_cost: required(map, env_keys::STORAGE_COST)?.to_owned(),
            query_failures: required(map, env_keys::QUERY_FAILURES)?.to_owned(),
            queries_per_second: required(map, env_keys::QUERIES_PER_SECOND)?.to_owned(),
            avg_execution_time_ms,
        })
    }
}

impl EvaluationConfig {
    /// Parse the config from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::MissingKey`] or
    /// [`EvaluationError::InvalidValue`]; both are fatal, the module never
    /// runs on a partial environment.
    pub fn from_env() -> Result<Self, EvaluationError> {
        Self::from_map(&std::env::vars().collect())
    }

    /// Parse the config from an explicit key/value map.
    ///
    /// # Errors
    ///
    /// Same contract as [`EvaluationConfig::from_env`].
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, EvaluationError> {
        let num_versions: usize = parse_required(map, env_keys::TOTAL_VERSIONS)?;
        if num_versions == 0 {
            return Err(EvaluationError::InvalidValue {
                key: env_keys::TOTAL_VERSIONS.to_owned(),
                value: "0".to_owned(),
            });
        }
        let experiment_uri = required(map, env_keys::EXPERIMENT_URI)?.to_owned();
        let storage_cost_bytes: i64 = parse_required(map, env_keys::STORAGE_COST_VALUE)?;

        let mut loading_times_ms = Vec::with_capacity(num_versions);
        let mut triples_added = Vec::with_capacity(num_versions);
        let mut triples_deleted = Vec::with_capacity(num_versions);
        let mut triples_loaded = Vec::with_capacity(num_versions);
        for version in 0..num_versions {
            loading_times_ms.push(parse_required(map, &env_keys::loading_time(version))?);
            triples_added.push(parse_required(map, &env_keys::triples_to_be_added(version))?);
            triples_deleted.push(parse_required(
                map,
                &env_keys::triples_to_be_deleted(version),
            )?);
            triples_loaded.push(parse_required(
                map,
                &env_keys::triples_to_be_loaded(version),
            )?);
        }

        Ok(Self {
            num_versions,
            experiment_uri,
            storage_cost_bytes,
            loading_times_ms,
            triples_added,
            triples_deleted,
            triples_loaded,
            metric_labels: MetricLabels::from_map(map)?,
        })
    }

    /// Number of dataset versions in the run.
    #[must_use]
    pub fn num_versions(&self) -> usize {
        self.num_versions
    }

    /// URI of the experiment being evaluated.
    #[must_use]
    pub fn experiment_uri(&self) -> &str {
        &self.experiment_uri
    }

    /// URIs labeling the reported metrics.
    #[must_use]
    pub fn metric_labels(&self) -> &MetricLabels {
        &self.metric_labels
    }
}

fn required<'a>(
    map: &'a HashMap<String, String>,
    key: &str,
) -> Result<&'a str, EvaluationError> {
    map.get(key)
        .map(String::as_str)
        .ok_or_else(|| EvaluationError::MissingKey {
            key: key.to_owned(),
        })
}

fn parse_required<T: std::str::FromStr>(
    map: &HashMap<String, String>,
    key: &str,
) -> Result<T, EvaluationError> {
    let raw = required(map, key)?;
    match raw.parse() {
        Ok(value) => Ok(value),
        Err(_) => Err(EvaluationError::InvalidValue {
            key: key.to_owned(),
            value: raw.to_owned(),
        }),
    }
}

// ---------------------------------------------------------------------------
// EvaluationReport
// ---------------------------------------------------------------------------

/// Final benchmark metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    /// URI of the evaluated experiment.
    pub experiment_uri: String,
    /// Initial-version ingestion speed in triples per second.
    pub initial_version_ingestion_speed: f64,
    /// Average applied changes (additions plus deletions) per second.
    pub avg_applied_changes_ps: f64,
    /// Usable space after the run minus before, in mebibytes; negative
    /// when loading consumed space.
    pub storage_cost_mib: f64,
    /// Total failed or mismatching query executions across all types.
    pub query_failures: u64,
    /// Successful query throughput.
    pub queries_per_second: f64,
    /// Mean execution time in milliseconds, indexed by query-type index.
    pub avg_execution_time_ms: [f64; QueryType::COUNT],
    /// URI labels for every metric above.
    pub metric_labels: MetricLabels,
}

// ---------------------------------------------------------------------------
// EvaluationModule
// ---------------------------------------------------------------------------

/// Scores answers against expectations and aggregates the final report.
#[derive(Debug)]
pub struct EvaluationModule {
    config: EvaluationConfig,
    ingestion: IngestionStatistics,
    query_stats: [QueryTypeStatistics; QueryType::COUNT],
}

impl EvaluationModule {
    /// Build the module, seeding the ingestion aggregator from the
    /// per-version figures in the config.
    #[must_use]
    pub fn new(config: EvaluationConfig) -> Self {
        let mut ingestion = IngestionStatistics::new();
        ingestion.record_initial(config.triples_loaded[0], config.loading_times_ms[0]);
        for version in 1..config.num_versions {
            ingestion.record_changeset(
                version,
                config.triples_added[version],
                config.triples_deleted[version],
                config.loading_times_ms[version],
            );
        }
        Self {
            config,
            ingestion,
            query_stats: [QueryTypeStatistics::new(); QueryType::COUNT],
        }
    }

    /// The parsed configuration.
    #[must_use]
    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Record one ingestion failure; any failure zeroes the ingestion-speed
    /// metric in the final report.
    pub fn report_ingestion_failure(&mut self) {
        self.ingestion.report_failure();
    }

    /// Score one answered task.
    ///
    /// A received answer that cannot be decoded, or that does not match the
    /// expectation, counts as a failure for its query type; a match records
    /// the execution time as a success.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::Protocol`] when `expected` cannot be
    /// decoded -- expectations are produced locally and must be well-formed.
    pub fn evaluate_response(
        &mut self,
        expected: &[u8],
        received: &[u8],
        execution_time_ms: u64,
    ) -> Result<(), EvaluationError> {
        let expectation = ExpectedAnswer::decode(expected)?;
        let stats = &mut self.query_stats[expectation.query_type.index()];

        let expected_set = ResultSet::from_bytes(&expectation.result)?;
        let received_set = match ResultSet::from_bytes(received) {
            Ok(set) => set,
            Err(e) => {
                tracing::warn!(
                    "evaluation.answer.undecodable: query_type={} error={e}",
                    expectation.query_type
                );
                stats.report_failure();
                return Ok(());
            }
        };

        if results_match(&expected_set, &received_set) {
            stats.report_success(execution_time_ms);
        } else {
            tracing::warn!(
                "evaluation.answer.mismatch: query_type={} expected_rows={} received_rows={}",
                expectation.query_type,
                expected_set.len(),
                received_set.len()
            );
            stats.report_failure();
        }
        Ok(())
    }

    /// Assemble the final report.
    #[must_use]
    pub fn summarize(&self) -> EvaluationReport {
        let query_failures = self.query_stats.iter().map(QueryTypeStatistics::failures).sum();
        let total_runs: u64 = self.query_stats.iter().map(QueryTypeStatistics::runs).sum();
        let total_ms: u64 = self
            .query_stats
            .iter()
            .map(QueryTypeStatistics::total_execution_time_ms)
            .sum();
        let queries_per_second = if total_ms == 0 {
            // Guards the 0/0 case as well as instantaneous runs.
            0.0
        } else {
            total_runs as f64 / (total_ms as f64 / 1000.0)
        };

        let mut avg_execution_time_ms = [0.0; QueryType::COUNT];
        for qt in QueryType::ALL {
            avg_execution_time_ms[qt.index()] =
                self.query_stats[qt.index()].avg_execution_time_ms();
        }

        EvaluationReport {
            experiment_uri: self.config.experiment_uri.clone(),
            initial_version_ingestion_speed: self.ingestion.initial_ingestion_speed(),
            avg_applied_changes_ps: self.ingestion.avg_changes_per_second(),
            storage_cost_mib: self.config.storage_cost_bytes as f64 / (1024.0 * 1024.0),
            query_failures,
            queries_per_second,
            avg_execution_time_ms,
            metric_labels: self.config.metric_labels.clone(),
        }
    }
}

/// Order-insensitive match, degrading to size-only above the threshold.
fn results_match(expected: &ResultSet, received: &ResultSet) -> bool {
    if expected.len() == received.len() && expected.len() > SIZE_ONLY_THRESHOLD {
        return true;
    }
    expected.equals_by_value(received)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{EvaluationConfig, EvaluationError, EvaluationModule, SIZE_ONLY_THRESHOLD};
    use domain::command::encode_expected_answer;
    use domain::QueryType;
    use std::collections::HashMap;

    fn base_map(num_versions: usize) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("versions_number".to_owned(), num_versions.to_string());
        map.insert(
            "experiment_uri".to_owned(),
            "http://w3id.org/versioning/experiments#test".to_owned(),
        );
        // Loading consumed one mebibyte of usable space.
        map.insert("storage_cost_value".to_owned(), "-1048576".to_owned());
        let prefix = "http://w3id.org/versioning/experiments#";
        map.insert(
            "initial_version_ingestion_speed".to_owned(),
            format!("{prefix}initialVersionIngestionSpeed"),
        );
        map.insert(
            "avg_applied_changes_ps".to_owned(),
            format!("{prefix}avgAppliedChangesPS"),
        );
        map.insert("storage_cost".to_owned(), format!("{prefix}storageCost"));
        map.insert("query_failures".to_owned(), format!("{prefix}queryFailures"));
        map.insert(
            "queries_per_second".to_owned(),
            format!("{prefix}queriesPerSecond"),
        );
        for qt in 1..=8u8 {
            map.insert(
                format!("query_type_{qt}_avgerage_execution_time"),
                format!("{prefix}queryType{qt}AvgExecTime"),
            );
        }
        for version in 0..num_versions {
            map.insert(format!("version_{version}_loading_time"), "1000".to_owned());
            map.insert(
                format!("version_{version}_triples_to_be_added"),
                "100".to_owned(),
            );
            map.insert(
                format!("version_{version}_triples_to_be_deleted"),
                "50".to_owned(),
            );
            map.insert(
                format!("version_{version}_triples_to_be_loaded"),
                "1000".to_owned(),
            );
        }
        map
    }

    fn expected_bytes(query_type: u8, rows: &str) -> Vec<u8> {
        encode_expected_answer(QueryType::new(query_type).unwrap(), 1, 0, rows.as_bytes())
    }

    #[test]
    fn config_requires_every_key() {
        let mut map = base_map(2);
        map.remove("version_1_triples_to_be_deleted");
        assert_eq!(
            EvaluationConfig::from_map(&map),
            Err(EvaluationError::MissingKey {
                key: "version_1_triples_to_be_deleted".to_owned(),
            })
        );
    }

    #[test]
    fn missing_metric_label_is_fatal() {
        let mut map = base_map(1);
        map.remove("queries_per_second");
        assert_eq!(
            EvaluationConfig::from_map(&map),
            Err(EvaluationError::MissingKey {
                key: "queries_per_second".to_owned(),
            })
        );
    }

    #[test]
    fn metric_labels_flow_into_the_report() {
        let config = EvaluationConfig::from_map(&base_map(1)).unwrap();
        let labels = EvaluationModule::new(config).summarize().metric_labels;
        assert!(labels.storage_cost.ends_with("storageCost"));
        assert!(labels
            .initial_version_ingestion_speed
            .ends_with("initialVersionIngestionSpeed"));
        assert_eq!(labels.avg_execution_time_ms.len(), 8);
        assert!(labels.avg_execution_time_ms[0].ends_with("queryType1AvgExecTime"));
        assert!(labels.avg_execution_time_ms[7].ends_with("queryType8AvgExecTime"));
    }

    #[test]
    fn config_rejects_unparsable_values() {
        let mut map = base_map(1);
        map.insert("storage_cost_value".to_owned(), "lots".to_owned());
        assert!(matches!(
            EvaluationConfig::from_map(&map),
            Err(EvaluationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn matching_answer_in_any_row_order_is_a_success() {
        let config = EvaluationConfig::from_map(&base_map(1)).unwrap();
        let mut module = EvaluationModule::new(config);
        module
            .evaluate_response(&expected_bytes(1, "a\nb\nc"), b"c\na\nb", 40)
            .unwrap();
        let report = module.summarize();
        assert_eq!(report.query_failures, 0);
        assert!((report.avg_execution_time_ms[0] - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn mismatching_answer_is_a_failure() {
        let config = EvaluationConfig::from_map(&base_map(1)).unwrap();
        let mut module = EvaluationModule::new(config);
        module
            .evaluate_response(&expected_bytes(3, "a\nb"), b"a\nz", 40)
            .unwrap();
        let report = module.summarize();
        assert_eq!(report.query_failures, 1);
        assert_eq!(report.avg_execution_time_ms[2], 0.0);
    }

    #[test]
    fn undecodable_answer_is_a_failure() {
        let config = EvaluationConfig::from_map(&base_map(1)).unwrap();
        let mut module = EvaluationModule::new(config);
        module
            .evaluate_response(&expected_bytes(2, "a"), &[0xff, 0xfe], 40)
            .unwrap();
        assert_eq!(module.summarize().query_failures, 1);
    }

    #[test]
    fn oversized_answers_match_by_size_alone() {
        let config = EvaluationConfig::from_map(&base_map(1)).unwrap();
        let mut module = EvaluationModule::new(config);
        let rows = SIZE_ONLY_THRESHOLD + 1;
        let expected: String = (0..rows).map(|i| format!("e{i}\n")).collect();
        let received: String = (0..rows).map(|i| format!("r{i}\n")).collect();
        module
            .evaluate_response(&expected_bytes(1, &expected), received.as_bytes(), 40)
            .unwrap();
        assert_eq!(module.summarize().query_failures, 0);
    }

    #[test]
    fn summary_metrics_from_seeded_ingestion() {
        let mut map = base_map(2);
        map.insert("version_0_triples_to_be_loaded".to_owned(), "1000000".to_owned());
        map.insert("version_0_loading_time".to_owned(), "10000".to_owned());
        let config = EvaluationConfig::from_map(&map).unwrap();
        let module = EvaluationModule::new(config);
        let report = module.summarize();
        assert!((report.initial_version_ingestion_speed - 100_000.0).abs() < f64::EPSILON);
        // Version 1: (100 + 50) changes in 1 second.
        assert!((report.avg_applied_changes_ps - 150.0).abs() < f64::EPSILON);
        assert!((report.storage_cost_mib + 1.0).abs() < f64::EPSILON);
        // No queries ran; throughput must be 0, never NaN.
        assert_eq!(report.queries_per_second, 0.0);
    }

    #[test]
    fn ingestion_failure_zeroes_the_speed_metric() {
        let config = EvaluationConfig::from_map(&base_map(1)).unwrap();
        let mut module = EvaluationModule::new(config);
        module.report_ingestion_failure();
        assert_eq!(module.summarize().initial_version_ingestion_speed, 0.0);
    }

    #[test]
    fn queries_per_second_counts_successes_only() {
        let config = EvaluationConfig::from_map(&base_map(1)).unwrap();
        let mut module = EvaluationModule::new(config);
        module
            .evaluate_response(&expected_bytes(1, "a"), b"a", 250)
            .unwrap();
        module
            .evaluate_response(&expected_bytes(2, "a"), b"a", 250)
            .unwrap();
        let report = module.summarize();
        // 2 queries in 0.5 seconds.
        assert!((report.queries_per_second - 4.0).abs() < f64::EPSILON);
    }
}
