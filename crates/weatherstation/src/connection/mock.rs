//! Scripted transport for listener tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use super::{Transport, TransportError};
use crate::context::Context;

/// What a [`MockTransport`] does once its scripted reads run out.
#[derive(Debug, Clone, Copy, Default)]
pub enum WhenDrained {
    /// Fail with [`TransportError::Closed`]
    #[default]
    Close,
    /// Block until the context is cancelled
    Hang,
}

/// Transport that replays scripted reads and records writes and closes.
pub struct MockTransport {
    reads: VecDeque<Result<Vec<u8>, TransportError>>,
    when_drained: WhenDrained,
    fail_write: bool,
    pub writes: Arc<Mutex<Vec<Value>>>,
    pub closes: Arc<AtomicUsize>,
    pub read_calls: Arc<AtomicUsize>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            reads: VecDeque::new(),
            when_drained: WhenDrained::Close,
            fail_write: false,
            writes: Arc::new(Mutex::new(Vec::new())),
            closes: Arc::new(AtomicUsize::new(0)),
            read_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue one successful read returning `message`.
    pub fn with_message(mut self, message: impl Into<Vec<u8>>) -> Self {
        self.reads.push_back(Ok(message.into()));
        self
    }

    /// Queue one failing read.
    pub fn with_read_error(mut self, error: TransportError) -> Self {
        self.reads.push_back(Err(error));
        self
    }

    pub fn when_drained(mut self, behavior: WhenDrained) -> Self {
        self.when_drained = behavior;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_write = true;
        self
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn write(&mut self, ctx: &Context, message: &Value) -> Result<(), TransportError> {
        if ctx.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        if self.fail_write {
            return Err(TransportError::Closed);
        }
        self.writes.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn read(&mut self, ctx: &Context) -> Result<Vec<u8>, TransportError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        if ctx.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        if let Some(next) = self.reads.pop_front() {
            return next;
        }
        match self.when_drained {
            WhenDrained::Close => Err(TransportError::Closed),
            WhenDrained::Hang => {
                ctx.cancelled().await;
                Err(TransportError::Cancelled)
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
