use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::EventEmitter;
use crate::error::EventError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage {
  #[serde(rename = "type")]
  pub msg_type: String,
  pub event: Option<String>,
  pub payload: Option<serde_json::Value>,
}

/// `http://127.0.0.1:10108` -> `ws://127.0.0.1:10108/ws/events`
pub fn events_url(host_url: &str) -> String {
  let host_url = host_url.trim_end_matches('/');
  if let Some(rest) = host_url.strip_prefix("https://") {
    format!("wss://{rest}/ws/events")
  } else {
    let rest = host_url.strip_prefix("http://").unwrap_or(host_url);
    format!("ws://{rest}/ws/events")
  }
}

/// Re-emit one text frame from the host. Returns true when it was an event.
pub fn forward_frame(emitter: &dyn EventEmitter, text: &str) -> bool {
  let ws_msg = match serde_json::from_str::<WsMessage>(text) {
    Ok(msg) => msg,
    Err(e) => {
      log::debug!("[ws] Ignoring undecodable frame: {e}");
      return false;
    }
  };

  match ws_msg.msg_type.as_str() {
    "event" => {
      let Some(event) = ws_msg.event else {
        log::debug!("[ws] Event frame without a name");
        return false;
      };
      let payload = ws_msg.payload.unwrap_or(serde_json::Value::Null);
      if let Err(e) = emitter.emit_value(&event, payload) {
        log::error!("[ws] Failed to emit event {event}: {e}");
      }
      true
    }
    "connected" => {
      log::info!("[ws] Received connection confirmation");
      false
    }
    "pong" => {
      log::debug!("[ws] Received pong");
      false
    }
    other => {
      log::debug!("[ws] Unknown message type: {other}");
      false
    }
  }
}

/// Relays push events from the host's `/ws/events` socket into a local
/// emitter, usually the `EventBus`.
pub struct WsEventForwarder {
  emitter: Arc<dyn EventEmitter>,
  connected: Arc<AtomicBool>,
  task: Mutex<Option<JoinHandle<()>>>,
}

impl WsEventForwarder {
  pub fn new(emitter: Arc<dyn EventEmitter>) -> Self {
    Self {
      emitter,
      connected: Arc::new(AtomicBool::new(false)),
      task: Mutex::new(None),
    }
  }

  pub fn is_connected(&self) -> bool {
    self.connected.load(Ordering::SeqCst)
  }

  pub async fn connect(&self, host_url: &str) -> Result<(), EventError> {
    let url = events_url(host_url);

    log::info!("[ws] Connecting to host events at {url}");

    let (ws_stream, _) = connect_async(url.as_str())
      .await
      .map_err(|e| EventError::Connect(e.to_string()))?;

    self.connected.store(true, Ordering::SeqCst);
    log::info!("[ws] Connected to host");

    let (mut write, mut read) = ws_stream.split();

    let emitter = self.emitter.clone();
    let connected = self.connected.clone();

    let task = tokio::spawn(async move {
      loop {
        match read.next().await {
          Some(Ok(Message::Text(text))) => {
            forward_frame(emitter.as_ref(), text.as_str());
          }
          Some(Ok(Message::Ping(data))) => {
            if let Err(e) = write.send(Message::Pong(data)).await {
              log::error!("[ws] Failed to send pong: {e}");
              break;
            }
          }
          Some(Ok(Message::Close(_))) => {
            log::info!("[ws] Host closed connection");
            break;
          }
          Some(Err(e)) => {
            log::error!("[ws] WebSocket error: {e}");
            break;
          }
          None => {
            log::info!("[ws] WebSocket stream ended");
            break;
          }
          _ => {}
        }
      }

      connected.store(false, Ordering::SeqCst);
      log::info!("[ws] Disconnected from host");
    });

    // A second connect replaces the first socket
    if let Some(previous) = self.task.lock().unwrap().replace(task) {
      previous.abort();
    }

    Ok(())
  }

  /// Stop relaying and drop the socket right away.
  pub fn disconnect(&self) {
    if let Some(task) = self.task.lock().unwrap().take() {
      task.abort();
      log::info!("[ws] Disconnected from host");
    }
    self.connected.store(false, Ordering::SeqCst);
  }
}

impl Drop for WsEventForwarder {
  fn drop(&mut self) {
    self.disconnect();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::events::{EventBus, EventHandler, PROFILES_CHANGED};
  use serde_json::Value;
  use std::time::Duration;
  use tokio::net::TcpListener;

  #[test]
  fn test_events_url() {
    assert_eq!(
      events_url("http://127.0.0.1:10108"),
      "ws://127.0.0.1:10108/ws/events"
    );
    assert_eq!(
      events_url("https://host.local/"),
      "wss://host.local/ws/events"
    );
    assert_eq!(events_url("localhost:9000"), "ws://localhost:9000/ws/events");
  }

  #[test]
  fn test_forward_frame() {
    let bus = EventBus::new();
    let seen: Arc<Mutex<Vec<Value>>> = Arc::default();
    let sink = seen.clone();
    let handler: EventHandler = Arc::new(move |payload: &Value| {
      sink.lock().unwrap().push(payload.clone());
    });
    let _subscription = bus.subscribe(PROFILES_CHANGED, handler);

    assert!(forward_frame(
      &bus,
      r#"{"type":"event","event":"profiles-changed"}"#
    ));
    assert!(forward_frame(
      &bus,
      r#"{"type":"event","event":"profiles-changed","payload":{"n":1}}"#
    ));
    assert!(!forward_frame(&bus, r#"{"type":"pong"}"#));
    assert!(!forward_frame(&bus, "not json"));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], Value::Null);
    assert_eq!(seen[1]["n"], 1);
  }

  #[tokio::test]
  async fn test_connect_failure() {
    let forwarder = WsEventForwarder::new(Arc::new(EventBus::new()));
    let result = forwarder.connect("http://127.0.0.1:1").await;
    assert!(matches!(result, Err(EventError::Connect(_))));
    assert!(!forwarder.is_connected());
  }

  #[tokio::test]
  async fn test_disconnect_closes_socket() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
      let (stream, _) = listener.accept().await.unwrap();
      let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
      // resolves once the client side goes away
      ws.next().await.map(|frame| frame.is_ok())
    });

    let forwarder = WsEventForwarder::new(Arc::new(EventBus::new()));
    forwarder
      .connect(&format!("http://{addr}"))
      .await
      .unwrap();
    assert!(forwarder.is_connected());

    forwarder.disconnect();
    assert!(!forwarder.is_connected());

    let closed = tokio::time::timeout(Duration::from_secs(5), server).await;
    assert!(closed.is_ok(), "server still waiting on an open socket");
  }
}
