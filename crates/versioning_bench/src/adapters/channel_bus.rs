// Rust guideline compliant 2026-02-23

//! In-process queue adapters for the `CommandSink` and `DataSink` ports.
//!
//! Both queues cooperatively yield on empty rather than blocking, so every
//! pump can share a `current_thread` runtime under `tokio::join!`. Explicit
//! `close()` signals end-of-data to readers; a closed queue is drained
//! before `recv` reports [`ChannelError::Closed`].

use std::cell::RefCell;
use std::collections::VecDeque;

use domain::command::Command;
use domain::{ChannelError, CommandSink, DataPayload, DataSink};

// ---------------------------------------------------------------------------
// Inner state
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct QueueInner<T> {
    data: VecDeque<T>,
    closed: bool,
}

impl<T> QueueInner<T> {
    fn new() -> Self {
        Self {
            data: VecDeque::new(),
            closed: false,
        }
    }

    fn push(&mut self, item: T) -> Result<(), ChannelError> {
        if self.closed {
            return Err(ChannelError::Closed);
        }
        self.data.push_back(item);
        Ok(())
    }

    fn pop(&mut self) -> Option<Result<T, ChannelError>> {
        match self.data.pop_front() {
            Some(item) => Some(Ok(item)),
            None if self.closed => Some(Err(ChannelError::Closed)),
            None => None,
        }
    }
}

async fn recv_from<T>(inner: &RefCell<QueueInner<T>>) -> Result<T, ChannelError> {
    loop {
        // Scope the borrow so it is dropped before yield_now().await,
        // preventing a panic on re-entrant polling within tokio::join!.
        let result = inner.borrow_mut().pop();
        match result {
            Some(r) => return r,
            None => tokio::task::yield_now().await,
        }
    }
}

// ---------------------------------------------------------------------------
// CommandQueue
// ---------------------------------------------------------------------------

/// `CommandSink` adapter backed by an in-memory FIFO.
///
/// Senders share it by reference; one pump drains it via
/// [`recv`](Self::recv) and routes commands to its component.
#[derive(Debug)]
pub struct CommandQueue {
    inner: RefCell<QueueInner<Command>>,
}

impl CommandQueue {
    /// Create an empty, open queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(QueueInner::new()),
        }
    }

    /// Signal end-of-data. Idempotent: safe to call multiple times.
    pub fn close(&self) {
        self.inner.borrow_mut().closed = true;
    }

    /// `true` once the queue has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.borrow().closed
    }

    /// Receive the next command; yields while the queue is open but empty.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] when the queue is empty and closed.
    pub async fn recv(&self) -> Result<Command, ChannelError> {
        recv_from(&self.inner).await
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandSink for CommandQueue {
    /// Enqueue `command` if the queue is open.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] if the queue has been closed.
    async fn send(&self, command: Command) -> Result<(), ChannelError> {
        self.inner.borrow_mut().push(command)
    }
}

// ---------------------------------------------------------------------------
// DataChannel
// ---------------------------------------------------------------------------

/// `DataSink` adapter: the unicast bulk data path from producers to the
/// system under test.
#[derive(Debug)]
pub struct DataChannel {
    inner: RefCell<QueueInner<DataPayload>>,
}

impl DataChannel {
    /// Create an empty, open channel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(QueueInner::new()),
        }
    }

    /// Signal end-of-data. Idempotent.
    pub fn close(&self) {
        self.inner.borrow_mut().closed = true;
    }

    /// Receive the next payload; yields while the channel is open but empty.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] when the channel is empty and closed.
    pub async fn recv(&self) -> Result<DataPayload, ChannelError> {
        recv_from(&self.inner).await
    }
}

impl Default for DataChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl DataSink for DataChannel {
    /// Enqueue `payload` if the channel is open.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] if the channel has been closed.
    async fn deliver(&self, payload: DataPayload) -> Result<(), ChannelError> {
        self.inner.borrow_mut().push(payload)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{CommandQueue, DataChannel};
    use domain::command::{codes, Command};
    use domain::{ChannelError, CommandSink as _, DataPayload, DataSink as _};

    // CQ-T01: send/recv preserves FIFO order.
    #[tokio::test]
    async fn commands_arrive_in_order() {
        let queue = CommandQueue::new();
        queue.send(Command::signal(codes::PRODUCER_START)).await.unwrap();
        queue
            .send(Command::signal(codes::BULK_LOADING_FINISHED))
            .await
            .unwrap();

        assert_eq!(queue.recv().await.unwrap().code, codes::PRODUCER_START);
        assert_eq!(
            queue.recv().await.unwrap().code,
            codes::BULK_LOADING_FINISHED
        );
    }

    // CQ-T02: a closed queue is drained before reporting Closed.
    #[tokio::test]
    async fn closed_queue_drains_then_errors() {
        let queue = CommandQueue::new();
        queue.send(Command::signal(codes::SYSTEM_TERMINATED)).await.unwrap();
        queue.close();
        queue.close(); // idempotent

        assert!(queue.recv().await.is_ok());
        assert_eq!(queue.recv().await, Err(ChannelError::Closed));
        assert!(queue.is_closed());
    }

    // CQ-T03: sending to a closed queue fails.
    #[tokio::test]
    async fn send_to_closed_queue_fails() {
        let queue = CommandQueue::new();
        queue.close();
        let result = queue.send(Command::signal(codes::PRODUCER_START)).await;
        assert_eq!(result, Err(ChannelError::Closed));
    }

    // CQ-T04: recv yields on empty+open; a concurrent send unblocks it.
    #[tokio::test]
    async fn yield_unblocks_recv() {
        let queue = CommandQueue::new();
        let (received, ()) = tokio::join!(queue.recv(), async {
            queue
                .send(Command::signal(codes::PRODUCER_TERMINATED))
                .await
                .unwrap();
        });
        assert_eq!(received.unwrap().code, codes::PRODUCER_TERMINATED);
    }

    #[tokio::test]
    async fn data_channel_roundtrip() {
        let channel = DataChannel::new();
        let payload = DataPayload {
            graph_uri: "http://graph.version.0".to_owned(),
            content: b"<a> <b> <c> .".to_vec(),
        };
        channel.deliver(payload.clone()).await.unwrap();
        channel.close();

        assert_eq!(channel.recv().await.unwrap(), payload);
        assert_eq!(channel.recv().await, Err(ChannelError::Closed));
    }
}
