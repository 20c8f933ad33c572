// Rust guideline compliant 2026-02-23

//! SystemAdapter component -- the system-under-test side of the bulk-load
//! protocol.
//!
//! Stages inbound payload units, waits until every expected unit of the
//! current version has arrived, performs the bulk load through the
//! [`BulkLoader`] port, and confirms completion to the controller. After
//! the final version it switches to query serving.
//!
//! Entry points: [`SystemAdapter::receive_data`],
//! [`SystemAdapter::handle_sending_finished`],
//! [`SystemAdapter::receive_task`].

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use domain::barrier::Barrier;
use domain::command::{Command, codes, decode_task_payload};
use domain::{
    BulkLoader, ChannelError, CommandSink, DataPayload, LoadFinishedSignal, ProtocolError,
    QueryEngine, ResourceUsageProbe,
};

// ---------------------------------------------------------------------------
// AdapterError
// ---------------------------------------------------------------------------

/// Errors that can occur in the system adapter.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// A command or task payload could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    /// The command channel back to the controller is closed.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),
}

// ---------------------------------------------------------------------------
// SystemAdapter
// ---------------------------------------------------------------------------

/// System-under-test adapter implementing the counted load barrier.
///
/// Two independent cumulative counters track progress: `total_received`
/// (one increment per inbound payload unit) and `total_sent` (added to by
/// every `BULK_LOAD_SENDING_FINISHED` command). Whichever update makes the
/// counters equal releases the load barrier -- the equality is re-checked
/// at BOTH update sites because payload units and the command race under
/// network reordering, and either may arrive last. Both sites can observe
/// the equality for the same cycle when they interleave; a release counter
/// keyed to the load cycle caps the barrier at one permit per cycle.
#[derive(Debug, Default)]
pub struct SystemAdapter {
    total_received: AtomicU64,
    total_sent: AtomicU64,
    all_data_received: Barrier,
    /// Cumulative load-barrier releases; trails `loading_number` by at
    /// most one and gates duplicate releases within a cycle.
    barrier_releases: AtomicU64,
    staged: Mutex<Vec<DataPayload>>,
    loading_number: AtomicUsize,
    query_serving: AtomicBool,
    /// Usable-space snapshot taken before the current version's load.
    space_before: AtomicU64,
    /// Usable-space snapshot taken at initialization.
    space_at_init: AtomicU64,
}

impl SystemAdapter {
    /// Create an adapter with zeroed counters, ready for version 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the usable space before any data arrives.
    ///
    /// A probe failure is logged and leaves the baseline at 0; subsequent
    /// storage-cost figures may undercount (best-effort by design).
    pub async fn record_baseline<P: ResourceUsageProbe>(&self, probe: &P) {
        match probe.usable_space().await {
            Ok(space) => {
                self.space_before.store(space, Ordering::SeqCst);
                self.space_at_init.store(space, Ordering::SeqCst);
                tracing::info!("adapter.baseline.recorded: usable_space={space}");
            }
            Err(e) => {
                tracing::error!("adapter.baseline.failed: error={e}");
            }
        }
    }

    /// `true` once the final version is loaded and queries are accepted.
    #[must_use]
    pub fn is_query_serving(&self) -> bool {
        self.query_serving.load(Ordering::SeqCst)
    }

    /// Index of the version currently (or next) being loaded.
    #[must_use]
    pub fn loading_number(&self) -> usize {
        self.loading_number.load(Ordering::SeqCst)
    }

    /// Stage one inbound payload unit.
    ///
    /// Update site 1 of the load barrier: if this unit makes
    /// `total_received` reach `total_sent`, the barrier is released here.
    pub fn receive_data(&self, payload: DataPayload) {
        self.lock_staged().push(payload);
        let received = self.total_received.fetch_add(1, Ordering::SeqCst) + 1;
        if received == self.total_sent.load(Ordering::SeqCst) {
            self.release_all_data_received();
        }
    }

    /// Handle the controller's "all sending finished" command.
    ///
    /// Update site 2 of the load barrier: the message count is added to
    /// `total_sent` (additive across calls) and the equality re-checked,
    /// covering the ordering where every payload unit arrived before this
    /// command. The call then blocks until all expected units are staged,
    /// bulk-loads them, clears the staging area, logs the per-version
    /// storage delta, and confirms with `BULK_LOADING_FINISHED`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Channel`] when the confirmation cannot be
    /// sent. Load and probe failures are logged and swallowed; the
    /// protocol keeps progressing (recorded downstream as degraded data).
    pub async fn handle_sending_finished<L, P, C>(
        &self,
        signal: LoadFinishedSignal,
        loader: &L,
        probe: &P,
        cmd_sink: &C,
    ) -> Result<(), AdapterError>
    where
        L: BulkLoader,
        P: ResourceUsageProbe,
        C: CommandSink,
    {
        let version = self.loading_number.load(Ordering::SeqCst);
        tracing::info!(
            "adapter.sending_finished: version={version} messages={} last={}",
            signal.message_count,
            signal.last_version
        );

        let sent = self
            .total_sent
            .fetch_add(u64::from(signal.message_count), Ordering::SeqCst)
            + u64::from(signal.message_count);
        if self.total_received.load(Ordering::SeqCst) == sent {
            // All data already arrived: release before the acquire below so
            // the load proceeds immediately.
            self.release_all_data_received();
        }

        self.all_data_received.acquire(1).await;
        tracing::info!("adapter.version.received: version={version}");

        let payloads = std::mem::take(&mut *self.lock_staged());
        match loader.load(version, payloads).await {
            Ok(triples) => {
                tracing::info!("adapter.version.loaded: version={version} triples={triples}");
            }
            Err(e) => {
                tracing::error!("adapter.load.failed: version={version} error={e}");
            }
        }

        match probe.usable_space().await {
            Ok(space) => {
                let before = self.space_before.swap(space, Ordering::SeqCst);
                // Post-load minus pre-load; consuming space goes negative.
                let delta = i64::try_from(space).unwrap_or(i64::MAX)
                    - i64::try_from(before).unwrap_or(i64::MAX);
                tracing::info!("adapter.storage.delta: version={version} bytes={delta}");
            }
            Err(e) => {
                tracing::warn!("adapter.storage.probe_failed: version={version} error={e}");
            }
        }

        cmd_sink
            .send(Command::signal(codes::BULK_LOADING_FINISHED))
            .await?;
        self.loading_number.fetch_add(1, Ordering::SeqCst);
        self.query_serving
            .store(signal.last_version, Ordering::SeqCst);
        Ok(())
    }

    /// Execute one query task.
    ///
    /// Before the query-serving state the task is dropped (`Ok(None)`): the
    /// store has not reached the dataset state the task expects. After it,
    /// the query is decoded and executed; an execution failure yields an
    /// empty result (recorded as a failure by the evaluation module, not
    /// here). Task `"0"` additionally logs the overall storage cost since
    /// initialization.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Protocol`] when the task payload cannot be
    /// decoded.
    pub async fn receive_task<Q, P>(
        &self,
        task_id: &str,
        payload: &[u8],
        engine: &Q,
        probe: &P,
    ) -> Result<Option<Vec<u8>>, AdapterError>
    where
        Q: QueryEngine,
        P: ResourceUsageProbe,
    {
        if !self.is_query_serving() {
            tracing::debug!("adapter.task.ignored: task_id={task_id} bulk loading in progress");
            return Ok(None);
        }

        if task_id == "0" {
            match probe.usable_space().await {
                Ok(space) => {
                    let init = self.space_at_init.load(Ordering::SeqCst);
                    let cost = i64::try_from(space).unwrap_or(i64::MAX)
                        - i64::try_from(init).unwrap_or(i64::MAX);
                    tracing::info!("adapter.storage.overall: bytes={cost}");
                }
                Err(e) => {
                    tracing::warn!("adapter.storage.probe_failed: task_id=0 error={e}");
                }
            }
        }

        let query = decode_task_payload(payload)?;
        tracing::info!("adapter.task.executing: task_id={task_id}");
        match engine.execute(&query).await {
            Ok(results) => Ok(Some(results)),
            Err(e) => {
                tracing::error!("adapter.task.failed: task_id={task_id} error={e}");
                Ok(Some(Vec::new()))
            }
        }
    }

    /// Announce system termination to the controller.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Channel`] when the channel is closed.
    pub async fn shutdown<C: CommandSink>(&self, cmd_sink: &C) -> Result<(), AdapterError> {
        tracing::info!("adapter.shutdown");
        cmd_sink
            .send(Command::signal(codes::SYSTEM_TERMINATED))
            .await?;
        Ok(())
    }

    /// Add one load-barrier permit for the current cycle, at most once.
    ///
    /// Both counter-update sites call this when they observe the counter
    /// equality; under a multithreaded runtime they can both observe it
    /// for the same cycle, and a duplicate permit here would let the next
    /// version's load start before its data arrived.
    fn release_all_data_received(&self) {
        let cycle = u64::try_from(self.loading_number.load(Ordering::SeqCst)).unwrap_or(u64::MAX);
        if self
            .barrier_releases
            .compare_exchange(cycle, cycle + 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.all_data_received.release();
        }
    }

    fn lock_staged(&self) -> std::sync::MutexGuard<'_, Vec<DataPayload>> {
        // No code path panics while holding the lock.
        self.staged.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::SystemAdapter;
    use domain::command::{codes, encode_task_payload, Command};
    use domain::{
        BulkLoader, ChannelError, CommandSink, DataPayload, LoadFinishedSignal, ProbeError,
        QueryEngine, ResourceUsageProbe, StoreError,
    };
    use std::cell::{Cell, RefCell};

    // ------------------------------------------------------------------
    // Test helpers
    // ------------------------------------------------------------------

    fn payload(tag: &str) -> DataPayload {
        DataPayload {
            graph_uri: "http://graph.version.0".to_owned(),
            content: tag.as_bytes().to_vec(),
        }
    }

    /// Loader recording every call: (version, payload count).
    struct RecordingLoader {
        calls: RefCell<Vec<(usize, usize)>>,
    }

    impl RecordingLoader {
        fn new() -> Self {
            Self {
                calls: RefCell::new(vec![]),
            }
        }
    }

    impl BulkLoader for RecordingLoader {
        async fn load(
            &self,
            version: usize,
            payloads: Vec<DataPayload>,
        ) -> Result<u64, StoreError> {
            self.calls.borrow_mut().push((version, payloads.len()));
            Ok(payloads.len() as u64)
        }
    }

    /// Probe with a settable usable-space value.
    struct FakeProbe {
        space: Cell<u64>,
    }

    impl FakeProbe {
        fn new(space: u64) -> Self {
            Self {
                space: Cell::new(space),
            }
        }
    }

    impl ResourceUsageProbe for FakeProbe {
        async fn usable_space(&self) -> Result<u64, ProbeError> {
            Ok(self.space.get())
        }
    }

    struct CollectingCmdSink {
        commands: RefCell<Vec<Command>>,
    }

    impl CollectingCmdSink {
        fn new() -> Self {
            Self {
                commands: RefCell::new(vec![]),
            }
        }
    }

    impl CommandSink for CollectingCmdSink {
        async fn send(&self, command: Command) -> Result<(), ChannelError> {
            self.commands.borrow_mut().push(command);
            Ok(())
        }
    }

    /// Engine answering with the query text itself, or failing on demand.
    struct EchoEngine {
        fail: bool,
    }

    impl QueryEngine for EchoEngine {
        async fn execute(&self, query: &str) -> Result<Vec<u8>, StoreError> {
            if self.fail {
                Err(StoreError::QueryFailed {
                    reason: "no such graph".to_owned(),
                })
            } else {
                Ok(query.as_bytes().to_vec())
            }
        }
    }

    fn signal(message_count: u32, last_version: bool) -> LoadFinishedSignal {
        LoadFinishedSignal {
            message_count,
            last_version,
        }
    }

    // ------------------------------------------------------------------
    // Load barrier orderings
    // ------------------------------------------------------------------

    // SA-T01: all payloads arrive before the sending-finished command.
    #[tokio::test]
    async fn data_before_command_reaches_load() {
        let adapter = SystemAdapter::new();
        let loader = RecordingLoader::new();
        let probe = FakeProbe::new(1000);
        let sink = CollectingCmdSink::new();

        adapter.receive_data(payload("a"));
        adapter.receive_data(payload("b"));
        adapter
            .handle_sending_finished(signal(2, false), &loader, &probe, &sink)
            .await
            .unwrap();

        assert_eq!(*loader.calls.borrow(), vec![(0, 2)]);
        let commands = sink.commands.borrow();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].code, codes::BULK_LOADING_FINISHED);
        assert_eq!(adapter.loading_number(), 1);
    }

    // SA-T02: the command arrives first; payloads trickle in afterwards.
    #[tokio::test]
    async fn command_before_data_reaches_load() {
        let adapter = SystemAdapter::new();
        let loader = RecordingLoader::new();
        let probe = FakeProbe::new(1000);
        let sink = CollectingCmdSink::new();

        let (result, ()) = tokio::join!(
            adapter.handle_sending_finished(signal(2, false), &loader, &probe, &sink),
            async {
                tokio::task::yield_now().await;
                adapter.receive_data(payload("a"));
                tokio::task::yield_now().await;
                adapter.receive_data(payload("b"));
            }
        );
        result.unwrap();

        assert_eq!(*loader.calls.borrow(), vec![(0, 2)]);
    }

    // SA-T03: counters are cumulative across versions; a second cycle loads
    // only its own staged payloads.
    #[tokio::test]
    async fn totals_are_additive_across_cycles() {
        let adapter = SystemAdapter::new();
        let loader = RecordingLoader::new();
        let probe = FakeProbe::new(1000);
        let sink = CollectingCmdSink::new();

        adapter.receive_data(payload("v0"));
        adapter
            .handle_sending_finished(signal(1, false), &loader, &probe, &sink)
            .await
            .unwrap();

        adapter.receive_data(payload("v1-a"));
        adapter.receive_data(payload("v1-b"));
        adapter
            .handle_sending_finished(signal(2, true), &loader, &probe, &sink)
            .await
            .unwrap();

        assert_eq!(*loader.calls.borrow(), vec![(0, 1), (1, 2)]);
        assert_eq!(sink.commands.borrow().len(), 2);
        assert!(adapter.is_query_serving());
    }

    // SA-T04: a zero-message version loads immediately.
    #[tokio::test]
    async fn zero_message_version_loads_immediately() {
        let adapter = SystemAdapter::new();
        let loader = RecordingLoader::new();
        let probe = FakeProbe::new(1000);
        let sink = CollectingCmdSink::new();

        adapter
            .handle_sending_finished(signal(0, false), &loader, &probe, &sink)
            .await
            .unwrap();
        assert_eq!(*loader.calls.borrow(), vec![(0, 0)]);
    }

    // SA-T05: when both update sites observe the counter equality for the
    // same cycle, only one permit reaches the barrier; the guard re-arms
    // once the cycle's load completes.
    #[tokio::test]
    async fn duplicate_equality_observations_release_one_permit_per_cycle() {
        let adapter = SystemAdapter::new();
        let loader = RecordingLoader::new();
        let probe = FakeProbe::new(1000);
        let sink = CollectingCmdSink::new();

        adapter.release_all_data_received();
        adapter.release_all_data_received();
        assert_eq!(adapter.all_data_received.available(), 1);

        // The cycle consumes its single permit; no stale permit survives
        // for the next version's wait.
        adapter
            .handle_sending_finished(signal(0, false), &loader, &probe, &sink)
            .await
            .unwrap();
        assert_eq!(adapter.all_data_received.available(), 0);

        adapter.release_all_data_received();
        adapter.release_all_data_received();
        assert_eq!(adapter.all_data_received.available(), 1);
    }

    // ------------------------------------------------------------------
    // Query-serving gate
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn tasks_ignored_before_last_version() {
        let adapter = SystemAdapter::new();
        let probe = FakeProbe::new(1000);
        let task = encode_task_payload("count:http://graph.version.0");

        let result = adapter
            .receive_task("1", &task, &EchoEngine { fail: false }, &probe)
            .await
            .unwrap();
        assert!(result.is_none(), "tasks must be dropped during bulk load");
    }

    #[tokio::test]
    async fn tasks_executed_after_last_version() {
        let adapter = SystemAdapter::new();
        let loader = RecordingLoader::new();
        let probe = FakeProbe::new(1000);
        let sink = CollectingCmdSink::new();

        adapter.receive_data(payload("a"));
        adapter
            .handle_sending_finished(signal(1, true), &loader, &probe, &sink)
            .await
            .unwrap();

        let task = encode_task_payload("count:http://graph.version.0");
        let result = adapter
            .receive_task("1", &task, &EchoEngine { fail: false }, &probe)
            .await
            .unwrap();
        assert_eq!(result.unwrap(), b"count:http://graph.version.0");
    }

    #[tokio::test]
    async fn failed_query_returns_empty_result() {
        let adapter = SystemAdapter::new();
        let loader = RecordingLoader::new();
        let probe = FakeProbe::new(1000);
        let sink = CollectingCmdSink::new();

        adapter
            .handle_sending_finished(signal(0, true), &loader, &probe, &sink)
            .await
            .unwrap();

        let task = encode_task_payload("count:nope");
        let result = adapter
            .receive_task("3", &task, &EchoEngine { fail: true }, &probe)
            .await
            .unwrap();
        assert_eq!(result.unwrap(), Vec::<u8>::new());
    }

    #[tokio::test]
    async fn malformed_task_payload_is_a_protocol_error() {
        let adapter = SystemAdapter::new();
        let loader = RecordingLoader::new();
        let probe = FakeProbe::new(1000);
        let sink = CollectingCmdSink::new();
        adapter
            .handle_sending_finished(signal(0, true), &loader, &probe, &sink)
            .await
            .unwrap();

        let result = adapter
            .receive_task("1", &[0, 0, 0, 9], &EchoEngine { fail: false }, &probe)
            .await;
        assert!(result.is_err());
    }

    // ------------------------------------------------------------------
    // Shutdown
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn shutdown_sends_system_terminated() {
        let adapter = SystemAdapter::new();
        let sink = CollectingCmdSink::new();
        adapter.shutdown(&sink).await.unwrap();
        let commands = sink.commands.borrow();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].code, codes::SYSTEM_TERMINATED);
    }
}
