// Rust guideline compliant 2026-02-23

//! Versioning benchmark entry point.
//!
//! Wires all components (VersionProducer, SystemAdapter,
//! BenchmarkController, EvaluationModule) to their in-process queue and
//! in-memory store adapters and runs a proof-of-concept concurrent
//! end-to-end benchmark.
//!
//! # Usage
//!
//! ```text
//! # Default run: 2 producers, 5 versions
//! RUST_LOG=info cargo run
//!
//! # Scale the run and fix the dataset seed
//! RUST_LOG=info BENCH_PRODUCERS=4 BENCH_VERSIONS=8 BENCH_SEED=7 cargo run
//! ```

mod adapters;

use std::collections::HashMap;
use std::time::Instant;

use adapters::channel_bus::{CommandQueue, DataChannel};
use adapters::in_memory_store::InMemoryStore;
use adapters::store_probe::StoreSpaceProbe;
use adapters::synthetic_changes::SyntheticChangeSource;
use anyhow::Context as _;
use controller::{Controller, ControllerConfig};
use domain::barrier::Barrier;
use domain::command::{codes, encode_task_payload};
use domain::{ChannelError, LoadFinishedSignal, QueryEngine as _, QueryType, Task};
use evaluation::{EvaluationConfig, EvaluationModule, EvaluationReport};
use producer::{Producer, ProducerConfig};
use sut::SystemAdapter;

/// Nominal capacity reported by the storage probe.
const STORE_CAPACITY_BYTES: u64 = 16 * 1024 * 1024;
/// Upper bound on triples added per producer per version.
const TRIPLES_PER_VERSION: usize = 200;
/// Triples per bulk payload unit.
const PAYLOAD_CHUNK: usize = 25;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let num_producers: u32 = env_or("BENCH_PRODUCERS", 2);
    let num_versions: usize = env_or("BENCH_VERSIONS", 5);
    let seed: u64 = env_or("BENCH_SEED", 42);

    // Race the benchmark against CTRL+C.
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("main.shutdown: ctrl_c received");
        }
        result = run_benchmark(num_producers, num_versions, seed) => {
            let report = result?;
            log_report(&report);
        }
    }

    Ok(())
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("main.config.invalid: key={key} value={raw} error={e}, using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// Run the full benchmark protocol and evaluate the results.
async fn run_benchmark(
    num_producers: u32,
    num_versions: usize,
    seed: u64,
) -> anyhow::Result<EvaluationReport> {
    let store = InMemoryStore::new();
    let probe = StoreSpaceProbe::new(STORE_CAPACITY_BYTES, &store);

    // Command routing: participants report into the controller inbox; the
    // controller broadcasts into the participants inbox; bulk data travels
    // out-of-band on its own channel.
    let controller_inbox = CommandQueue::new();
    let participants_inbox = CommandQueue::new();
    let data_channel = DataChannel::new();

    let controller_config =
        ControllerConfig::builder(u64::from(num_producers), num_versions).build()?;
    let benchmark_controller = Controller::new(controller_config);
    let adapter = SystemAdapter::new();
    adapter.record_baseline(&probe).await;

    let producer_start = Barrier::new();
    let version_loaded: Vec<Barrier> = (0..num_producers).map(|_| Barrier::new()).collect();

    // Unblocks every stalled participant after a run ends, cleanly or not.
    let close_all = || {
        controller_inbox.close();
        participants_inbox.close();
        data_channel.close();
        producer_start.release_n(u64::from(num_producers));
        for barrier in &version_loaded {
            barrier.release_n(u64::try_from(num_versions).unwrap_or(u64::MAX));
        }
    };

    let controller_run = async {
        let result = benchmark_controller.run(&participants_inbox, &probe).await;
        close_all();
        result.context("controller run failed")
    };

    // Routes participant commands into the controller and broadcasts each
    // load completion to the producers.
    let controller_pump = async {
        let result = async {
            loop {
                match controller_inbox.recv().await {
                    Ok(command) => {
                        let code = command.code;
                        benchmark_controller
                            .handle_command(&command)
                            .context("controller rejected a command")?;
                        if code == codes::BULK_LOADING_FINISHED {
                            for barrier in &version_loaded {
                                barrier.release();
                            }
                        }
                    }
                    Err(ChannelError::Closed) => return anyhow::Ok(()),
                }
            }
        }
        .await;
        if result.is_err() {
            close_all();
        }
        result
    };

    // Routes the controller's broadcasts to the producers' start gate and
    // the system adapter.
    let participant_pump = async {
        let result = async {
            loop {
                match participants_inbox.recv().await {
                    Ok(command) => match command.code {
                        codes::PRODUCER_START => {
                            producer_start.release_n(u64::from(num_producers));
                        }
                        codes::BULK_LOAD_SENDING_FINISHED => {
                            let signal = LoadFinishedSignal::decode(&command.payload)
                                .context("malformed sending-finished signal")?;
                            adapter
                                .handle_sending_finished(signal, &store, &probe, &controller_inbox)
                                .await
                                .context("bulk load cycle failed")?;
                        }
                        other => {
                            tracing::warn!("main.participant.unknown_command: code={other}");
                        }
                    },
                    Err(ChannelError::Closed) => return anyhow::Ok(()),
                }
            }
        }
        .await;
        if result.is_err() {
            close_all();
        }
        result
    };

    let data_pump = async {
        loop {
            match data_channel.recv().await {
                Ok(payload) => adapter.receive_data(payload),
                Err(ChannelError::Closed) => return anyhow::Ok(()),
            }
        }
    };

    let sources: Vec<SyntheticChangeSource> = (0..num_producers)
        .map(|id| {
            SyntheticChangeSource::new(
                id,
                seed.wrapping_add(u64::from(id)),
                TRIPLES_PER_VERSION,
                PAYLOAD_CHUNK,
            )
        })
        .collect();
    let producer_futures: Vec<_> = sources
        .iter()
        .zip(version_loaded.iter())
        .enumerate()
        .map(|(id, (source, loaded))| {
            let start = &producer_start;
            let data = &data_channel;
            let commands = &controller_inbox;
            async move {
                let config = ProducerConfig::builder(
                    u32::try_from(id).unwrap_or(u32::MAX),
                    num_versions,
                )
                .build()
                .context("failed to build producer config")?;
                let version_producer = Producer::new(config);
                start.acquire(1).await;
                version_producer
                    .run(source, data, commands, loaded)
                    .await
                    .with_context(|| format!("producer {id} failed"))
            }
        })
        .collect();
    let producers_run = async {
        futures::future::join_all(producer_futures)
            .await
            .into_iter()
            .collect::<anyhow::Result<()>>()
    };

    // Query phase: once the system serves queries, send one task per query
    // type, collecting (expected, received, time) outcomes, then announce
    // system termination so the controller can finish draining.
    let task_driver = async {
        while !adapter.is_query_serving() {
            if participants_inbox.is_closed() {
                return anyhow::Ok(Vec::new());
            }
            tokio::task::yield_now().await;
        }

        let mut outcomes = Vec::with_capacity(QueryType::COUNT);
        for query_type in QueryType::ALL {
            let version = query_type.index() % num_versions;
            let graph = format!("http://versioning.local/graph/version-{version}");
            let query_text = if query_type.get() % 2 == 1 {
                format!("count:{graph}")
            } else {
                format!("graph:{graph}")
            };
            let task = Task {
                task_id: query_type.index().to_string(),
                query_type,
                query_sub_type: 1,
                substitution_param: u32::try_from(version).unwrap_or(u32::MAX),
                query_text,
            };

            let expected = store
                .execute(&task.query_text)
                .await
                .context("expected-answer query failed")?;
            let expected_bytes = task.expected_answer_bytes(&expected);

            let payload = encode_task_payload(&task.query_text);
            let started = Instant::now();
            let received = adapter
                .receive_task(&task.task_id, &payload, &store, &probe)
                .await
                .context("task execution failed")?;
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            if let Some(received) = received {
                outcomes.push((expected_bytes, received, elapsed_ms));
            }
        }

        adapter
            .shutdown(&controller_inbox)
            .await
            .context("system shutdown failed")?;
        anyhow::Ok(outcomes)
    };

    // controller_run must stay first: after each load completion the run
    // loop has to advance its version counter before the pump routes the
    // next version's reports.
    let (env_result, pump_a, pump_b, pump_c, producers_result, outcomes_result) = tokio::join!(
        controller_run,
        controller_pump,
        participant_pump,
        data_pump,
        producers_run,
        task_driver
    );
    let env = env_result?;
    pump_a?;
    pump_b?;
    pump_c?;
    producers_result?;
    let outcomes = outcomes_result?;

    let env_map: HashMap<String, String> = env.into_iter().collect();
    let evaluation_config =
        EvaluationConfig::from_map(&env_map).context("controller environment is incomplete")?;
    let mut evaluation_module = EvaluationModule::new(evaluation_config);
    for (expected, received, elapsed_ms) in &outcomes {
        evaluation_module
            .evaluate_response(expected, received, *elapsed_ms)
            .context("failed to evaluate a task outcome")?;
    }
    Ok(evaluation_module.summarize())
}

fn log_report(report: &EvaluationReport) {
    let labels = &report.metric_labels;
    tracing::info!("report.experiment: uri={}", report.experiment_uri);
    tracing::info!(
        "report.ingestion_speed: metric={} triples_per_second={:.2}",
        labels.initial_version_ingestion_speed,
        report.initial_version_ingestion_speed
    );
    tracing::info!(
        "report.applied_changes: metric={} per_second={:.2}",
        labels.avg_applied_changes_ps,
        report.avg_applied_changes_ps
    );
    tracing::info!(
        "report.storage_cost: metric={} mib={:.4}",
        labels.storage_cost,
        report.storage_cost_mib
    );
    tracing::info!(
        "report.query_failures: metric={} count={}",
        labels.query_failures,
        report.query_failures
    );
    tracing::info!(
        "report.throughput: metric={} queries_per_second={:.2}",
        labels.queries_per_second,
        report.queries_per_second
    );
    for query_type in QueryType::ALL {
        tracing::info!(
            "report.query_type: metric={} avg_ms={:.2}",
            labels.avg_execution_time_ms[query_type.index()],
            report.avg_execution_time_ms[query_type.index()]
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
