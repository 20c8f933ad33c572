// Rust guideline compliant 2026-02-23

//! VersionProducer component -- generates one shard of each version's
//! changeset, delivers the payload units over the bulk data channel, and
//! reports completion to the controller.
//!
//! Entry points: [`Producer::produce_version`], [`Producer::run`].
//! Configuration via [`ProducerConfig::builder`].

use domain::barrier::Barrier;
use domain::command::{Command, codes};
use domain::{ChangeSetSource, ChannelError, CommandSink, DataSink, VersionReport};

// ---------------------------------------------------------------------------
// ProducerError
// ---------------------------------------------------------------------------

/// Errors that can occur while producing version data.
#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    /// The supplied configuration is invalid.
    #[error("invalid producer configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// A command or data channel delivery failed.
    #[error("channel error: {source}")]
    Channel {
        /// The underlying channel error.
        #[from]
        source: ChannelError,
    },
}

// ---------------------------------------------------------------------------
// ProducerConfig + builder
// ---------------------------------------------------------------------------

/// Runtime configuration for a [`Producer`].
///
/// Construct via [`ProducerConfig::builder`].
#[derive(Debug)]
pub struct ProducerConfig {
    /// Identity reported with every completion record.
    pub producer_id: u32,
    /// Number of versions to produce (`>= 1`).
    pub num_versions: usize,
}

/// Builder for [`ProducerConfig`].
///
/// Obtain via [`ProducerConfig::builder`]; finalize with [`build`](Self::build).
#[derive(Debug)]
pub struct ProducerConfigBuilder {
    producer_id: u32,
    num_versions: usize,
}

impl ProducerConfig {
    /// Create a builder. Both parameters are required.
    #[must_use]
    pub fn builder(producer_id: u32, num_versions: usize) -> ProducerConfigBuilder {
        ProducerConfigBuilder {
            producer_id,
            num_versions,
        }
    }
}

impl ProducerConfigBuilder {
    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProducerError::InvalidConfig`] when `num_versions` is zero.
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<ProducerConfig, ProducerError> {
        if self.num_versions == 0 {
            return Err(ProducerError::InvalidConfig {
                reason: "num_versions must be >= 1".to_owned(),
            });
        }
        Ok(ProducerConfig {
            producer_id: self.producer_id,
            num_versions: self.num_versions,
        })
    }
}

// ---------------------------------------------------------------------------
// Producer
// ---------------------------------------------------------------------------

/// Produces one shard of each version's data and drives the controller's
/// `version_sent` counting barrier.
///
/// Generic over the [`ChangeSetSource`], [`DataSink`] and [`CommandSink`]
/// ports for zero-cost static dispatch. Holds no concrete adapter
/// references -- dependencies are injected per call (hexagonal
/// architecture).
#[derive(Debug)]
pub struct Producer {
    config: ProducerConfig,
}

impl Producer {
    /// Create a new producer from `config`.
    #[must_use]
    pub fn new(config: ProducerConfig) -> Self {
        Self { config }
    }

    /// Generate, deliver, and report one version.
    ///
    /// A generation failure is logged and still reported with zero counts:
    /// the controller has no failure channel from participants, so the
    /// report keeps its `version_sent` barrier progressing and the run
    /// alive (bounded only by the controller's drain ceiling).
    ///
    /// # Errors
    ///
    /// Returns [`ProducerError::Channel`] when the data or command channel
    /// is closed; a dead channel is fatal for the producer.
    pub async fn produce_version<S, D, C>(
        &self,
        version: usize,
        source: &S,
        data_sink: &D,
        cmd_sink: &C,
    ) -> Result<(), ProducerError>
    where
        S: ChangeSetSource,
        D: DataSink,
        C: CommandSink,
    {
        let report = match source.generate(version).await {
            Ok(change_set) => {
                let mut message_count = 0u32;
                for payload in change_set.payloads {
                    data_sink.deliver(payload).await?;
                    message_count += 1;
                }
                VersionReport {
                    triples_added: change_set.triples_added,
                    triples_deleted: change_set.triples_deleted,
                    triples_loaded: change_set.triples_loaded,
                    producer_id: self.config.producer_id,
                    message_count,
                }
            }
            Err(e) => {
                tracing::error!(
                    "producer.generate.failed: producer_id={} version={version} error={e}",
                    self.config.producer_id
                );
                VersionReport {
                    triples_added: 0,
                    triples_deleted: 0,
                    triples_loaded: 0,
                    producer_id: self.config.producer_id,
                    message_count: 0,
                }
            }
        };

        tracing::info!(
            "producer.version.sent: producer_id={} version={version} messages={}",
            self.config.producer_id,
            report.message_count
        );
        cmd_sink
            .send(Command::new(codes::VERSION_DATA_SENT, report.encode()))
            .await?;
        Ok(())
    }

    /// Run the full version loop, then announce termination.
    ///
    /// After reporting version `v` the producer blocks on `version_loaded`
    /// (one permit per loaded version, released on the system's
    /// `BULK_LOADING_FINISHED` broadcast) before producing `v + 1`:
    /// changeset extraction depends on the prior version's final content.
    ///
    /// # Errors
    ///
    /// Returns [`ProducerError::Channel`] when a channel closes mid-run.
    pub async fn run<S, D, C>(
        &self,
        source: &S,
        data_sink: &D,
        cmd_sink: &C,
        version_loaded: &Barrier,
    ) -> Result<(), ProducerError>
    where
        S: ChangeSetSource,
        D: DataSink,
        C: CommandSink,
    {
        for version in 0..self.config.num_versions {
            self.produce_version(version, source, data_sink, cmd_sink)
                .await?;
            tracing::debug!(
                "producer.waiting.loaded: producer_id={} version={version}",
                self.config.producer_id
            );
            version_loaded.acquire(1).await;
        }

        tracing::info!(
            "producer.run.finished: producer_id={} versions={}",
            self.config.producer_id,
            self.config.num_versions
        );
        cmd_sink
            .send(Command::signal(codes::PRODUCER_TERMINATED))
            .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
