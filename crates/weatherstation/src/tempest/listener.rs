//! Subscribe-read-dispatch loop over a [`Transport`].

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinSet;
use uuid::Uuid;

use super::envelope::Envelope;
use super::events::{EventType, ListenGroup};
use super::handler::{Handler, Payload};
use crate::connection::{Connection, Transport, TransportError};
use crate::context::Context;

#[derive(Debug, Error)]
pub enum ListenError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("invalid message envelope: {0}")]
    Envelope(#[source] serde_json::Error),
}

impl ListenError {
    /// Whether the listener stopped because its context was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Transport(TransportError::Cancelled))
    }
}

/// What to do with an inbound message whose envelope cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopePolicy {
    /// End the session with [`ListenError::Envelope`]
    #[default]
    Strict,
    /// Log the message and keep reading
    Skip,
}

/// First message written on a fresh connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionRequest {
    #[serde(rename = "type")]
    pub group: ListenGroup,
    pub device_id: i64,
    pub id: String,
}

impl SubscriptionRequest {
    /// A request with a fresh random id.
    pub fn new(group: ListenGroup, device_id: i64) -> Self {
        Self {
            group,
            device_id,
            id: Uuid::new_v4().to_string(),
        }
    }
}

/// Owns a transport and the handler registry, and runs the listen loop.
///
/// ```ignore
/// let mut listener = EventListener::new(conn, ListenGroup::ListenStart, device_id);
/// listener.register_handler(EventType::ObservationTempest, |_ctx: Context, payload: Payload| async move {
///     log::info!("{} bytes", payload.len());
/// });
/// listener.listen(ctx).await?;
/// ```
pub struct EventListener<T: Transport = Connection> {
    transport: T,
    group: ListenGroup,
    device_id: i64,
    handlers: HashMap<EventType, Vec<Arc<dyn Handler>>>,
    envelope_policy: EnvelopePolicy,
}

impl<T: Transport> EventListener<T> {
    pub fn new(transport: T, group: ListenGroup, device_id: i64) -> Self {
        Self {
            transport,
            group,
            device_id,
            handlers: HashMap::new(),
            envelope_policy: EnvelopePolicy::default(),
        }
    }

    pub fn with_envelope_policy(mut self, policy: EnvelopePolicy) -> Self {
        self.envelope_policy = policy;
        self
    }

    /// Append `handler` to the handlers of `event`.
    pub fn register_handler(
        &mut self,
        event: EventType,
        handler: impl Handler + 'static,
    ) -> &mut Self {
        self.handlers
            .entry(event)
            .or_default()
            .push(Arc::new(handler));
        self
    }

    /// Append several handlers to `event`, keeping their order. Nothing
    /// changes when `handlers` is empty.
    pub fn register_handlers(
        &mut self,
        event: EventType,
        handlers: impl IntoIterator<Item = Arc<dyn Handler>>,
    ) -> &mut Self {
        let mut handlers = handlers.into_iter().peekable();
        if handlers.peek().is_some() {
            self.handlers.entry(event).or_default().extend(handlers);
        }
        self
    }

    pub fn handler_count(&self, event: EventType) -> usize {
        self.handlers.get(&event).map_or(0, Vec::len)
    }

    /// Subscribe and dispatch inbound messages until the transport fails or
    /// `ctx` is cancelled.
    ///
    /// Always returns an error: the one that ended the session. Cancellation
    /// surfaces as an error for which [`ListenError::is_cancelled`] holds.
    /// The transport is closed exactly once before returning. Handlers
    /// still running are left to finish on their own.
    pub async fn listen(mut self, ctx: Context) -> Result<(), ListenError> {
        let mut tasks = JoinSet::new();
        let result = self.run(&ctx, &mut tasks).await;

        if let Err(e) = self.transport.close().await {
            log::warn!("Failed to close transport: {}", e);
        }
        reap(&mut tasks);
        tasks.detach_all();

        match &result {
            Err(e) if e.is_cancelled() => log::info!("Listener stopped: context cancelled"),
            Err(e) => log::warn!("Listener stopped: {}", e),
            Ok(()) => log::info!("Listener stopped"),
        }
        result
    }

    async fn run(&mut self, ctx: &Context, tasks: &mut JoinSet<()>) -> Result<(), ListenError> {
        let request = SubscriptionRequest::new(self.group, self.device_id);
        let message = serde_json::to_value(&request).map_err(TransportError::Encode)?;
        self.transport.write(ctx, &message).await?;
        log::info!(
            "Subscribed with {} for device {} (request {})",
            request.group,
            request.device_id,
            request.id
        );

        loop {
            let bytes = self.transport.read(ctx).await?;
            self.dispatch(ctx, bytes, tasks)?;
            reap(tasks);
        }
    }

    fn dispatch(
        &self,
        ctx: &Context,
        bytes: Vec<u8>,
        tasks: &mut JoinSet<()>,
    ) -> Result<(), ListenError> {
        let envelope = match Envelope::decode(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => match self.envelope_policy {
                EnvelopePolicy::Strict => return Err(ListenError::Envelope(e)),
                EnvelopePolicy::Skip => {
                    log::warn!("Skipping message with invalid envelope: {}", e);
                    return Ok(());
                }
            },
        };

        let Some(handlers) = envelope
            .event()
            .and_then(|event| self.handlers.get(&event))
        else {
            log::trace!("No handlers for {}", envelope.event_type);
            return Ok(());
        };

        let payload: Payload = bytes.into();
        log::debug!(
            "Dispatching {} to {} handler(s)",
            envelope.event_type,
            handlers.len()
        );
        for handler in handlers {
            let handler = Arc::clone(handler);
            let ctx = ctx.clone();
            let payload = Arc::clone(&payload);
            tasks.spawn(async move { handler.handle(ctx, payload).await });
        }
        Ok(())
    }
}

/// Collect finished handler tasks without waiting on running ones.
fn reap(tasks: &mut JoinSet<()>) {
    while let Some(joined) = tasks.try_join_next() {
        if let Err(e) = joined {
            if e.is_panic() {
                log::error!("Handler panicked: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::mock::{MockTransport, WhenDrained};
    use crate::tempest::fixtures::{CONNECTION_OPENED, OBS_AIR, OBS_ST};
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio::sync::mpsc;

    type Calls = mpsc::UnboundedReceiver<(&'static str, Payload)>;

    /// Handler reporting `label` and the payload on a channel.
    fn recording(
        label: &'static str,
        tx: &mpsc::UnboundedSender<(&'static str, Payload)>,
    ) -> impl Handler {
        let tx = tx.clone();
        move |_ctx: Context, payload: Payload| {
            let tx = tx.clone();
            async move {
                let _ = tx.send((label, payload));
            }
        }
    }

    async fn drain(rx: &mut Calls) -> Vec<&'static str> {
        let mut labels = Vec::new();
        while let Ok(Some((label, _))) =
            tokio::time::timeout(Duration::from_millis(100), rx.recv()).await
        {
            labels.push(label);
        }
        labels
    }

    #[tokio::test]
    async fn test_subscription_request_is_written_first() {
        let transport = MockTransport::new();
        let writes = Arc::clone(&transport.writes);

        let listener = EventListener::new(transport, ListenGroup::ListenStartEvents, 4242);
        let _ = listener.listen(Context::background()).await;

        let writes = writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0]["type"], "listen_start_events");
        assert_eq!(writes[0]["device_id"], 4242);
        let id = writes[0]["id"].as_str().unwrap();
        assert_eq!(Uuid::parse_str(id).unwrap().get_version_num(), 4);
    }

    #[tokio::test]
    async fn test_subscription_ids_are_fresh() {
        let a = SubscriptionRequest::new(ListenGroup::ListenStart, 1);
        let b = SubscriptionRequest::new(ListenGroup::ListenStart, 1);
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_dispatches_only_to_matching_type() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let transport = MockTransport::new().with_message(OBS_ST);

        let mut listener = EventListener::new(transport, ListenGroup::ListenStart, 1);
        listener.register_handler(EventType::ObservationTempest, recording("obs_st", &tx));
        listener.register_handler(EventType::ObservationAir, recording("obs_air", &tx));

        let err = listener.listen(Context::background()).await.unwrap_err();
        assert!(matches!(err, ListenError::Transport(TransportError::Closed)));

        assert_eq!(drain(&mut rx).await, vec!["obs_st"]);
    }

    #[tokio::test]
    async fn test_payload_is_passed_unchanged() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let transport = MockTransport::new().with_message(OBS_AIR);

        let mut listener = EventListener::new(transport, ListenGroup::ListenStart, 1);
        listener.register_handler(EventType::ObservationAir, recording("obs_air", &tx));
        let _ = listener.listen(Context::background()).await;

        let (_, payload) = rx.recv().await.unwrap();
        assert_eq!(&*payload, OBS_AIR.as_bytes());
    }

    #[tokio::test]
    async fn test_fan_out_to_every_handler() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let transport = MockTransport::new().with_message(OBS_ST);

        let mut listener = EventListener::new(transport, ListenGroup::ListenStart, 1);
        listener
            .register_handler(EventType::ObservationTempest, recording("first", &tx))
            .register_handler(EventType::ObservationTempest, recording("second", &tx));
        assert_eq!(listener.handler_count(EventType::ObservationTempest), 2);

        let _ = listener.listen(Context::background()).await;

        let mut labels = drain(&mut rx).await;
        labels.sort();
        assert_eq!(labels, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_register_handlers_appends_in_order() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut listener = EventListener::new(MockTransport::new(), ListenGroup::ListenStart, 1);

        listener.register_handler(EventType::RapidWind, recording("a", &tx));
        listener.register_handlers(
            EventType::RapidWind,
            vec![
                Arc::new(recording("b", &tx)) as Arc<dyn Handler>,
                Arc::new(recording("c", &tx)) as Arc<dyn Handler>,
            ],
        );
        assert_eq!(listener.handler_count(EventType::RapidWind), 3);

        listener.register_handlers(EventType::LightningStrike, Vec::new());
        assert_eq!(listener.handler_count(EventType::LightningStrike), 0);
        assert!(!listener.handlers.contains_key(&EventType::LightningStrike));
    }

    #[tokio::test]
    async fn test_unregistered_types_are_skipped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let transport = MockTransport::new()
            .with_message(CONNECTION_OPENED)
            .with_message(r#"{"type":"obs_from_the_future"}"#)
            .with_message(OBS_ST);
        let read_calls = Arc::clone(&transport.read_calls);

        let mut listener = EventListener::new(transport, ListenGroup::ListenStart, 1);
        listener.register_handler(EventType::ObservationTempest, recording("obs_st", &tx));

        let err = listener.listen(Context::background()).await.unwrap_err();
        assert!(matches!(err, ListenError::Transport(TransportError::Closed)));
        // three messages plus the read that hit the closed transport
        assert_eq!(read_calls.load(Ordering::SeqCst), 4);
        assert_eq!(drain(&mut rx).await, vec!["obs_st"]);
    }

    #[tokio::test]
    async fn test_read_error_is_returned_and_transport_closed_once() {
        let transport = MockTransport::new()
            .with_message(CONNECTION_OPENED)
            .with_read_error(TransportError::Io(std::io::Error::other("boom")));
        let closes = Arc::clone(&transport.closes);

        let listener = EventListener::new(transport, ListenGroup::ListenStart, 1);
        let err = listener.listen(Context::background()).await.unwrap_err();

        assert!(matches!(err, ListenError::Transport(TransportError::Io(_))));
        assert!(!err.is_cancelled());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_listen() {
        let transport = MockTransport::new();
        let writes = Arc::clone(&transport.writes);
        let closes = Arc::clone(&transport.closes);
        let read_calls = Arc::clone(&transport.read_calls);

        let (ctx, cancel) = Context::with_cancel();
        cancel.cancel();

        let listener = EventListener::new(transport, ListenGroup::ListenStart, 1);
        let err = listener.listen(ctx).await.unwrap_err();

        assert!(err.is_cancelled());
        assert!(writes.lock().unwrap().is_empty());
        assert_eq!(read_calls.load(Ordering::SeqCst), 0);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_while_reading() {
        let transport = MockTransport::new().when_drained(WhenDrained::Hang);
        let closes = Arc::clone(&transport.closes);
        let (ctx, cancel) = Context::with_cancel();

        let listener = EventListener::new(transport, ListenGroup::ListenStart, 1);
        let task = tokio::spawn(listener.listen(ctx));
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let err = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("listen did not stop on cancel")
            .unwrap()
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_write_failure_skips_read_loop() {
        let transport = MockTransport::new()
            .with_message(OBS_ST)
            .failing_writes();
        let read_calls = Arc::clone(&transport.read_calls);
        let closes = Arc::clone(&transport.closes);

        let listener = EventListener::new(transport, ListenGroup::ListenStart, 1);
        let err = listener.listen(Context::background()).await.unwrap_err();

        assert!(matches!(err, ListenError::Transport(TransportError::Closed)));
        assert_eq!(read_calls.load(Ordering::SeqCst), 0);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_envelope_is_fatal_by_default() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let transport = MockTransport::new()
            .with_message("garbage")
            .with_message(OBS_ST);
        let closes = Arc::clone(&transport.closes);

        let mut listener = EventListener::new(transport, ListenGroup::ListenStart, 1);
        listener.register_handler(EventType::ObservationTempest, recording("obs_st", &tx));
        let err = listener.listen(Context::background()).await.unwrap_err();

        assert!(matches!(err, ListenError::Envelope(_)));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(drain(&mut rx).await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_envelope_skipped_when_configured() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let transport = MockTransport::new()
            .with_message("garbage")
            .with_message(OBS_ST);

        let mut listener = EventListener::new(transport, ListenGroup::ListenStart, 1)
            .with_envelope_policy(EnvelopePolicy::Skip);
        listener.register_handler(EventType::ObservationTempest, recording("obs_st", &tx));
        let err = listener.listen(Context::background()).await.unwrap_err();

        assert!(matches!(err, ListenError::Transport(TransportError::Closed)));
        assert_eq!(drain(&mut rx).await, vec!["obs_st"]);
    }

    #[tokio::test]
    async fn test_handler_panic_does_not_stop_listener() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let transport = MockTransport::new()
            .with_message(OBS_ST)
            .with_message(OBS_ST);
        let read_calls = Arc::clone(&transport.read_calls);

        let mut listener = EventListener::new(transport, ListenGroup::ListenStart, 1);
        listener
            .register_handler(
                EventType::ObservationTempest,
                |_ctx: Context, _payload: Payload| async move {
                    panic!("handler bug");
                },
            )
            .register_handler(EventType::ObservationTempest, recording("ok", &tx));

        let err = listener.listen(Context::background()).await.unwrap_err();
        assert!(matches!(err, ListenError::Transport(TransportError::Closed)));
        assert_eq!(read_calls.load(Ordering::SeqCst), 3);
        assert_eq!(drain(&mut rx).await, vec!["ok", "ok"]);
    }

    #[tokio::test]
    async fn test_handlers_receive_listener_context() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let transport = MockTransport::new()
            .with_message(OBS_ST)
            .when_drained(WhenDrained::Hang);
        let (ctx, cancel) = Context::with_cancel();

        let mut listener = EventListener::new(transport, ListenGroup::ListenStart, 1);
        listener.register_handler(
            EventType::ObservationTempest,
            move |ctx: Context, _payload: Payload| {
                let tx = tx.clone();
                async move {
                    ctx.cancelled().await;
                    let _ = tx.send(());
                }
            },
        );

        let task = tokio::spawn(listener.listen(ctx));
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("handler did not observe cancellation");
        let _ = task.await;
    }
}
