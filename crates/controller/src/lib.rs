// Rust guideline compliant 2026-02-23

//! BenchmarkController component -- drives the version-by-version protocol.
//!
//! The controller broadcasts the start signal, gates each version on two
//! counting barriers (all producers reported, system confirmed the load),
//! merges per-producer reports into per-version aggregates, drains
//! terminations under a ceiling, and emits the flat key/value environment
//! the evaluation module consumes.
//!
//! Entry points: [`Controller::run`] and [`Controller::handle_command`].

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use domain::barrier::Barrier;
use domain::command::{codes, Command};
use domain::{env_keys, ChannelError, CommandSink, LoadFinishedSignal, ProtocolError,
    QueryType, ResourceUsageProbe, VersionReport};
use uuid::Uuid;

/// Ceiling on the draining phase; a run that cannot collect all
/// terminations within it is aborted.
pub const DRAIN_CEILING: Duration = Duration::from_secs(25 * 60);

// ---------------------------------------------------------------------------
// ControllerError
// ---------------------------------------------------------------------------

/// Errors that can occur in the benchmark controller.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The configuration is invalid.
    #[error("invalid controller config: {reason}")]
    InvalidConfig {
        /// Human-readable description.
        reason: String,
    },
    /// A command payload could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    /// The command channel is closed.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),
    /// Not every component terminated within the draining ceiling.
    #[error("drain phase exceeded the ceiling of {ceiling:?}")]
    DrainTimeout {
        /// Configured draining ceiling.
        ceiling: Duration,
    },
}

// ---------------------------------------------------------------------------
// ControllerConfig
// ---------------------------------------------------------------------------

/// Controller configuration.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    num_producers: u64,
    num_versions: usize,
    drain_ceiling: Duration,
    experiment_uri_prefix: String,
}

impl ControllerConfig {
    /// Start building a config for `num_producers` producers over
    /// `num_versions` dataset versions.
    #[must_use]
    pub fn builder(num_producers: u64, num_versions: usize) -> ControllerConfigBuilder {
        ControllerConfigBuilder {
            num_producers,
            num_versions,
            drain_ceiling: DRAIN_CEILING,
            experiment_uri_prefix: "http://w3id.org/versioning/experiments#".to_owned(),
        }
    }

    /// Number of producers the controller waits for each version.
    #[must_use]
    pub fn num_producers(&self) -> u64 {
        self.num_producers
    }

    /// Number of dataset versions in the run.
    #[must_use]
    pub fn num_versions(&self) -> usize {
        self.num_versions
    }
}

/// Builder for [`ControllerConfig`].
#[derive(Debug)]
pub struct ControllerConfigBuilder {
    num_producers: u64,
    num_versions: usize,
    drain_ceiling: Duration,
    experiment_uri_prefix: String,
}

impl ControllerConfigBuilder {
    /// Override the draining ceiling.
    #[must_use]
    pub fn drain_ceiling(mut self, ceiling: Duration) -> Self {
        self.drain_ceiling = ceiling;
        self
    }

    /// Override the experiment URI prefix.
    #[must_use]
    pub fn experiment_uri_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.experiment_uri_prefix = prefix.into();
        self
    }

    /// Validate and build the config.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidConfig`] when producer or version
    /// counts are zero.
    pub fn build(self) -> Result<ControllerConfig, ControllerError> {
        if self.num_producers == 0 {
            return Err(ControllerError::InvalidConfig {
                reason: "num_producers must be at least 1".to_owned(),
            });
        }
        if self.num_versions == 0 {
            return Err(ControllerError::InvalidConfig {
                reason: "num_versions must be at least 1".to_owned(),
            });
        }
        Ok(ControllerConfig {
            num_producers: self.num_producers,
            num_versions: self.num_versions,
            drain_ceiling: self.drain_ceiling,
            experiment_uri_prefix: self.experiment_uri_prefix,
        })
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Benchmark controller state machine.
///
/// Command handling and the run loop execute concurrently; all shared
/// state is atomics and barriers, so [`handle_command`](Self::handle_command)
/// needs only `&self`.
#[derive(Debug)]
pub struct Controller {
    config: ControllerConfig,
    run_id: Uuid,
    /// Producers finished sending the current version (one permit each).
    version_sent: Barrier,
    /// System confirmed bulk loading of the current version.
    version_loaded: Barrier,
    producers_done: Barrier,
    system_done: Barrier,
    /// Per-version additive aggregates, merged from producer reports.
    added: Vec<AtomicU64>,
    deleted: Vec<AtomicU64>,
    loaded: Vec<AtomicU64>,
    /// Payload units announced for the version in flight; drained into the
    /// sending-finished signal.
    pending_messages: AtomicU64,
    /// Version the run loop is currently cycling; reports are attributed
    /// here (the wire carries no ordinal).
    current_version: AtomicUsize,
    load_started: Mutex<Option<Instant>>,
    loading_times_ms: Mutex<Vec<u64>>,
}

impl Controller {
    /// Create a controller with a fresh run identity.
    #[must_use]
    pub fn new(config: ControllerConfig) -> Self {
        let versions = config.num_versions;
        Self {
            config,
            run_id: Uuid::new_v4(),
            version_sent: Barrier::new(),
            version_loaded: Barrier::new(),
            producers_done: Barrier::new(),
            system_done: Barrier::new(),
            added: (0..versions).map(|_| AtomicU64::new(0)).collect(),
            deleted: (0..versions).map(|_| AtomicU64::new(0)).collect(),
            loaded: (0..versions).map(|_| AtomicU64::new(0)).collect(),
            pending_messages: AtomicU64::new(0),
            current_version: AtomicUsize::new(0),
            load_started: Mutex::new(None),
            loading_times_ms: Mutex::new(Vec::with_capacity(versions)),
        }
    }

    /// URI identifying this run.
    #[must_use]
    pub fn experiment_uri(&self) -> String {
        format!("{}{}", self.config.experiment_uri_prefix, self.run_id)
    }

    /// Number of versions confirmed loaded so far.
    #[must_use]
    pub fn loaded_versions(&self) -> usize {
        self.current_version.load(Ordering::SeqCst)
    }

    /// Route one inbound command.
    ///
    /// Reports are merged additively into the version currently in flight;
    /// order across producers does not matter. Unknown codes are logged and
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Protocol`] when a report payload cannot
    /// be decoded.
    pub fn handle_command(&self, command: &Command) -> Result<(), ControllerError> {
        match command.code {
            codes::VERSION_DATA_SENT => {
                let report = VersionReport::decode(&command.payload)?;
                self.merge_report(&report);
                self.version_sent.release();
            }
            codes::BULK_LOADING_FINISHED => {
                self.record_loading_time();
                self.version_loaded.release();
            }
            codes::PRODUCER_TERMINATED => {
                tracing::info!("controller.producer.terminated");
                self.producers_done.release();
            }
            codes::SYSTEM_TERMINATED => {
                tracing::info!("controller.system.terminated");
                self.system_done.release();
            }
            other => {
                tracing::warn!("controller.command.unknown: code={other}");
            }
        }
        Ok(())
    }

    fn merge_report(&self, report: &VersionReport) {
        let version = self.current_version.load(Ordering::SeqCst);
        if version >= self.config.num_versions {
            tracing::warn!(
                "controller.report.late: producer={} dropped after the final version",
                report.producer_id
            );
            return;
        }
        self.added[version].fetch_add(u64::from(report.triples_added), Ordering::SeqCst);
        self.deleted[version].fetch_add(u64::from(report.triples_deleted), Ordering::SeqCst);
        self.loaded[version].fetch_add(u64::from(report.triples_loaded), Ordering::SeqCst);
        self.pending_messages
            .fetch_add(u64::from(report.message_count), Ordering::SeqCst);
        tracing::info!(
            "controller.report.merged: version={version} producer={} added={} deleted={} messages={}",
            report.producer_id,
            report.triples_added,
            report.triples_deleted,
            report.message_count
        );
    }

    fn record_loading_time(&self) {
        let started = self
            .load_started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let elapsed_ms = started.map_or(0, |t| {
            u64::try_from(t.elapsed().as_millis()).unwrap_or(u64::MAX)
        });
        self.loading_times_ms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(elapsed_ms);
    }

    /// Execute the full benchmark protocol.
    ///
    /// Broadcasts the producer start, cycles every version through its two
    /// barriers, drains terminations under the configured ceiling, probes
    /// the overall storage delta, and returns the evaluation environment as
    /// flat key/value pairs.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Channel`] when a signal cannot be sent
    /// and [`ControllerError::DrainTimeout`] when terminations do not all
    /// arrive within the ceiling.
    pub async fn run<C, P>(
        &self,
        cmd_sink: &C,
        probe: &P,
    ) -> Result<Vec<(String, String)>, ControllerError>
    where
        C: CommandSink,
        P: ResourceUsageProbe,
    {
        tracing::info!(
            "controller.run.started: run_id={} producers={} versions={}",
            self.run_id,
            self.config.num_producers,
            self.config.num_versions
        );

        let space_before = self.probe_space(probe, "before").await;
        cmd_sink.send(Command::signal(codes::PRODUCER_START)).await?;

        for version in 0..self.config.num_versions {
            self.version_sent.acquire(self.config.num_producers).await;
            let message_count =
                u32::try_from(self.pending_messages.swap(0, Ordering::SeqCst)).unwrap_or(u32::MAX);
            let signal = LoadFinishedSignal {
                message_count,
                last_version: version + 1 == self.config.num_versions,
            };
            tracing::info!(
                "controller.version.sent: version={version} messages={message_count}"
            );
            *self
                .load_started
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
            cmd_sink
                .send(Command::new(
                    codes::BULK_LOAD_SENDING_FINISHED,
                    signal.encode(),
                ))
                .await?;

            self.version_loaded.acquire(1).await;
            self.current_version.store(version + 1, Ordering::SeqCst);
            tracing::info!("controller.version.loaded: version={version}");
        }

        tracing::info!("controller.draining");
        let drain = async {
            self.producers_done.acquire(self.config.num_producers).await;
            self.system_done.acquire(1).await;
        };
        if tokio::time::timeout(self.config.drain_ceiling, drain)
            .await
            .is_err()
        {
            return Err(ControllerError::DrainTimeout {
                ceiling: self.config.drain_ceiling,
            });
        }

        let space_after = self.probe_space(probe, "after").await;
        tracing::info!("controller.run.finished: run_id={}", self.run_id);
        Ok(self.summarize(space_before, space_after))
    }

    async fn probe_space<P: ResourceUsageProbe>(&self, probe: &P, stage: &str) -> u64 {
        match probe.usable_space().await {
            Ok(space) => {
                tracing::info!("controller.storage.probed: stage={stage} usable_space={space}");
                space
            }
            Err(e) => {
                tracing::warn!("controller.storage.probe_failed: stage={stage} error={e}");
                0
            }
        }
    }

    /// Assemble the flat evaluation environment.
    fn summarize(&self, space_before: u64, space_after: u64) -> Vec<(String, String)> {
        let mut env = Vec::new();
        env.push((
            env_keys::EXPERIMENT_URI.to_owned(),
            self.experiment_uri(),
        ));
        env.push((
            env_keys::TOTAL_VERSIONS.to_owned(),
            self.config.num_versions.to_string(),
        ));
        // Post-run usable space minus the pre-run snapshot; loading that
        // consumes space yields a negative delta.
        let storage_cost = i64::try_from(space_after).unwrap_or(i64::MAX)
            - i64::try_from(space_before).unwrap_or(i64::MAX);
        env.push((
            env_keys::STORAGE_COST_VALUE.to_owned(),
            storage_cost.to_string(),
        ));

        let times = self
            .loading_times_ms
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for version in 0..self.config.num_versions {
            env.push((
                env_keys::triples_to_be_added(version),
                self.added[version].load(Ordering::SeqCst).to_string(),
            ));
            env.push((
                env_keys::triples_to_be_deleted(version),
                self.deleted[version].load(Ordering::SeqCst).to_string(),
            ));
            env.push((
                env_keys::triples_to_be_loaded(version),
                self.loaded[version].load(Ordering::SeqCst).to_string(),
            ));
            env.push((
                env_keys::loading_time(version),
                times.get(version).copied().unwrap_or(0).to_string(),
            ));
        }

        // Metric labels routed through the environment so the evaluation
        // module stays free of controller imports.
        let metric_prefix = &self.config.experiment_uri_prefix;
        env.push((
            env_keys::INITIAL_VERSION_INGESTION_SPEED.to_owned(),
            format!("{metric_prefix}initialVersionIngestionSpeed"),
        ));
        env.push((
            env_keys::AVG_APPLIED_CHANGES_PS.to_owned(),
            format!("{metric_prefix}avgAppliedChangesPS"),
        ));
        env.push((
            env_keys::STORAGE_COST.to_owned(),
            format!("{metric_prefix}storageCost"),
        ));
        env.push((
            env_keys::QUERY_FAILURES.to_owned(),
            format!("{metric_prefix}queryFailures"),
        ));
        env.push((
            env_keys::QUERIES_PER_SECOND.to_owned(),
            format!("{metric_prefix}queriesPerSecond"),
        ));
        for qt in QueryType::ALL {
            env.push((
                env_keys::qt_avg_exec_time(qt.get()),
                format!("{metric_prefix}queryType{qt}AvgExecTime"),
            ));
        }
        env
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
