#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

pub const OBS_ST: &str = r#"{"status":{"status_code":0,"status_message":"SUCCESS"},"device_id":4242,"type":"obs_st","source":"mqtt","summary":{"pressure_trend":"steady"},"obs":[[1700000000,0.1,0.9,1.8,90,3,1009.2,18.0,61,8000,1.0,80,0.0,0,0,0,2.5,1,0.0,0,0,0]]}"#;

pub const CONNECTION_OPENED: &str = r#"{"type":"connection_opened"}"#;

/// What the fake gateway saw from one client.
#[derive(Debug, Default)]
pub struct Seen {
    pub uri: Option<String>,
    pub messages: Vec<serde_json::Value>,
}

/// A websocket gateway that accepts one client, sends `connection_opened`,
/// waits for the subscription and then replays `frames`.
///
/// Every frame the client sends is recorded in the returned [`Seen`] and
/// echoed on the channel.
pub async fn fake_gateway(
    frames: Vec<String>,
) -> (SocketAddr, Arc<Mutex<Seen>>, mpsc::UnboundedReceiver<serde_json::Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Seen::default()));
    let (tx, rx) = mpsc::unbounded_channel();

    let record = Arc::clone(&seen);
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let uri_seen = Arc::clone(&record);
        let mut ws = tokio_tungstenite::accept_hdr_async(
            stream,
            move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                uri_seen.lock().unwrap().uri = Some(req.uri().to_string());
                Ok(resp)
            },
        )
        .await
        .unwrap();

        ws.send(Message::Text(CONNECTION_OPENED.into())).await.unwrap();

        // Subscription first, then the scripted frames
        if let Some(Ok(msg)) = ws.next().await {
            let value: serde_json::Value = serde_json::from_str(msg.to_text().unwrap()).unwrap();
            record.lock().unwrap().messages.push(value.clone());
            let _ = tx.send(value);
        }
        for frame in frames {
            if ws.send(Message::Text(frame.into())).await.is_err() {
                return;
            }
        }

        // Hold the socket open until the client leaves
        while let Some(Ok(msg)) = ws.next().await {
            if msg.is_close() {
                break;
            }
        }
    });

    (addr, seen, rx)
}
