//! End-to-end listener tests against local websocket and UDP peers.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::Ready;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use weatherstation::config::TempestConfig;
use weatherstation::connection;
use weatherstation::supervisor::{Backoff, SessionEvent, Supervisor};
use weatherstation::tempest::{EventListener, EventType, ListenGroup, ObservationTempest, Payload};
use weatherstation::Context;

use common::{fake_gateway, OBS_ST};

const WAIT: Duration = Duration::from_secs(5);

/// Handler that forwards every payload to `tx`.
fn forward(
    tx: mpsc::UnboundedSender<Vec<u8>>,
) -> impl Fn(Context, Payload) -> Ready<()> + Send + Sync + 'static {
    move |_ctx: Context, payload: Payload| {
        let _ = tx.send(payload.to_vec());
        futures::future::ready(())
    }
}

#[tokio::test]
async fn test_websocket_session() {
    let (addr, seen, mut subscriptions) = fake_gateway(vec![OBS_ST.to_string()]).await;

    let conn = connection::connect("ws", &addr.to_string(), "/swd/data", "secret")
        .await
        .unwrap();
    assert_eq!(conn.kind(), "websocket");

    let (opened_tx, mut opened_rx) = mpsc::unbounded_channel();
    let (obs_tx, mut obs_rx) = mpsc::unbounded_channel();
    let mut listener = EventListener::new(conn, ListenGroup::ListenStart, 4242);
    listener
        .register_handler(EventType::ConnectionOpened, forward(opened_tx))
        .register_handler(EventType::ObservationTempest, forward(obs_tx));

    let (ctx, cancel) = Context::with_cancel();
    let task = tokio::spawn(listener.listen(ctx));

    let subscription = tokio::time::timeout(WAIT, subscriptions.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(subscription["type"], "listen_start");
    assert_eq!(subscription["device_id"], 4242);
    assert!(subscription["id"].as_str().is_some_and(|id| !id.is_empty()));

    tokio::time::timeout(WAIT, opened_rx.recv())
        .await
        .unwrap()
        .unwrap();
    let payload = tokio::time::timeout(WAIT, obs_rx.recv())
        .await
        .unwrap()
        .unwrap();
    let obs = ObservationTempest::decode(&payload).unwrap();
    assert_eq!(obs.device_id, 4242);
    assert_eq!(obs.data.air_temperature, 18.0);

    let uri = seen.lock().unwrap().uri.clone().unwrap();
    assert!(uri.starts_with("/swd/data"), "{}", uri);
    assert!(uri.contains("token=secret"), "{}", uri);

    cancel.cancel();
    let err = tokio::time::timeout(WAIT, task)
        .await
        .unwrap()
        .unwrap()
        .unwrap_err();
    assert!(err.is_cancelled(), "{}", err);
}

#[tokio::test]
async fn test_udp_session() {
    let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let peer_addr = peer.local_addr().unwrap();

    let conn = connection::connect("udp", &peer_addr.to_string(), "", "")
        .await
        .unwrap();
    assert_eq!(conn.kind(), "udp");

    let (obs_tx, mut obs_rx) = mpsc::unbounded_channel();
    let mut listener = EventListener::new(conn, ListenGroup::ListenRapidStart, 7);
    listener.register_handler(EventType::ObservationTempest, forward(obs_tx));

    let (ctx, cancel) = Context::with_cancel();
    let task = tokio::spawn(listener.listen(ctx));

    let mut buf = [0u8; 1024];
    let (n, client) = tokio::time::timeout(WAIT, peer.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();
    let subscription: serde_json::Value = serde_json::from_slice(&buf[..n]).unwrap();
    assert_eq!(subscription["type"], "listen_rapid_start");
    assert_eq!(subscription["device_id"], 7);

    peer.send_to(OBS_ST.as_bytes(), client).await.unwrap();
    let payload = tokio::time::timeout(WAIT, obs_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payload, OBS_ST.as_bytes());

    cancel.cancel();
    let err = tokio::time::timeout(WAIT, task)
        .await
        .unwrap()
        .unwrap()
        .unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn test_supervisor_delivers_observations() {
    let (addr, _seen, _subscriptions) = fake_gateway(vec![OBS_ST.to_string()]).await;

    let config = TempestConfig {
        scheme: "ws".into(),
        host: addr.to_string(),
        device_id: 4242,
        ..Default::default()
    };

    let events = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&events);
    let (obs_tx, mut obs_rx) = mpsc::unbounded_channel();
    let mut supervisor = Supervisor::new(config).with_backoff(Backoff::new(
        Duration::from_millis(10),
        Duration::from_millis(50),
    ));
    supervisor
        .register_handler(EventType::ObservationTempest, forward(obs_tx))
        .on_session_event(move |event| recorded.lock().unwrap().push(event));

    let (ctx, cancel) = Context::with_cancel();
    let task = tokio::spawn(supervisor.run(ctx));

    let payload = tokio::time::timeout(WAIT, obs_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payload, OBS_ST.as_bytes());

    cancel.cancel();
    tokio::time::timeout(WAIT, task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events[0], SessionEvent::Connecting { attempt: 1 });
    assert!(events.contains(&SessionEvent::Connected {
        transport: "websocket"
    }));
}
