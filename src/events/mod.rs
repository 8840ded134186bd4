use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tokio::task::JoinHandle;

use crate::error::EventError;

pub mod ws;

pub use ws::WsEventForwarder;

pub const PROFILES_CHANGED: &str = "profiles-changed";
pub const DOWNLOAD_PROGRESS: &str = "download-progress";
pub const TOAST: &str = "toast";

pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Trait for emitting events to whoever is listening.
///
/// Uses `serde_json::Value` to stay dyn-compatible; `emit()` accepts any
/// Serialize payload.
pub trait EventEmitter: Send + Sync {
  fn emit_value(&self, event: &str, payload: Value) -> Result<(), EventError>;
}

pub fn emit<S: Serialize>(
  emitter: &dyn EventEmitter,
  event: &str,
  payload: S,
) -> Result<(), EventError> {
  let value = serde_json::to_value(payload).map_err(|e| EventError::Payload(e.to_string()))?;
  emitter.emit_value(event, value)
}

/// Something a view can subscribe to. Subscribing is async because the host
/// may only confirm the listener later.
#[async_trait]
pub trait EventSource: Send + Sync {
  async fn listen(&self, event: &str, handler: EventHandler) -> Result<Subscription, EventError>;
}

/// Disposer for one listener. Dropping it unlistens.
pub struct Subscription {
  dispose: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
  pub fn new(dispose: impl FnOnce() + Send + 'static) -> Self {
    Self {
      dispose: Some(Box::new(dispose)),
    }
  }

  pub fn unsubscribe(mut self) {
    self.run_dispose();
  }

  fn run_dispose(&mut self) {
    if let Some(dispose) = self.dispose.take() {
      dispose();
    }
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    self.run_dispose();
  }
}

impl std::fmt::Debug for Subscription {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription")
      .field("active", &self.dispose.is_some())
      .finish()
  }
}

#[derive(Default)]
struct Registry {
  next_id: u64,
  listeners: HashMap<String, Vec<(u64, EventHandler)>>,
}

/// In-process listener registry. Host push events are emitted into it (see
/// `WsEventForwarder`) and views listen on it.
#[derive(Clone, Default)]
pub struct EventBus {
  registry: Arc<Mutex<Registry>>,
}

impl EventBus {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn subscribe(&self, event: &str, handler: EventHandler) -> Subscription {
    let id = {
      let mut registry = self.registry.lock().unwrap();
      registry.next_id += 1;
      let id = registry.next_id;
      registry
        .listeners
        .entry(event.to_string())
        .or_default()
        .push((id, handler));
      id
    };

    let registry: Weak<Mutex<Registry>> = Arc::downgrade(&self.registry);
    let event = event.to_string();
    Subscription::new(move || {
      if let Some(registry) = registry.upgrade() {
        let mut registry = registry.lock().unwrap();
        if let Some(handlers) = registry.listeners.get_mut(&event) {
          handlers.retain(|(handler_id, _)| *handler_id != id);
          if handlers.is_empty() {
            registry.listeners.remove(&event);
          }
        }
      }
    })
  }

  pub fn listener_count(&self, event: &str) -> usize {
    let registry = self.registry.lock().unwrap();
    registry.listeners.get(event).map_or(0, Vec::len)
  }
}

impl EventEmitter for EventBus {
  fn emit_value(&self, event: &str, payload: Value) -> Result<(), EventError> {
    // Handlers run outside the lock so they may subscribe or unsubscribe
    let handlers: Vec<EventHandler> = {
      let registry = self.registry.lock().unwrap();
      registry
        .listeners
        .get(event)
        .map(|handlers| handlers.iter().map(|(_, h)| h.clone()).collect())
        .unwrap_or_default()
    };

    for handler in handlers {
      handler(&payload);
    }
    Ok(())
  }
}

#[async_trait]
impl EventSource for EventBus {
  async fn listen(&self, event: &str, handler: EventHandler) -> Result<Subscription, EventError> {
    Ok(self.subscribe(event, handler))
  }
}

enum Slot {
  Pending,
  Active(Subscription),
  Disposed,
}

/// A listener tied to a mount scope. `dispose` may run before the
/// subscription resolves; the late subscription is then released on arrival.
pub struct ScopedListener {
  slot: Arc<Mutex<Slot>>,
  task: Mutex<Option<JoinHandle<()>>>,
}

impl ScopedListener {
  pub fn pending() -> Self {
    Self {
      slot: Arc::new(Mutex::new(Slot::Pending)),
      task: Mutex::new(None),
    }
  }

  /// Start listening in the background. Outside a tokio runtime nothing is
  /// subscribed and the listener comes back already disposed.
  pub fn spawn(source: Arc<dyn EventSource>, event: &str, handler: EventHandler) -> Self {
    let listener = Self::pending();
    let event = event.to_string();

    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
      log::warn!("[events] No runtime to listen for {event}");
      listener.dispose();
      return listener;
    };

    let slot = listener.slot.clone();
    let task = runtime.spawn(async move {
      match source.listen(&event, handler).await {
        Ok(subscription) => {
          install_into(&slot, subscription);
        }
        Err(e) => {
          log::error!("[events] Failed to listen for {event}: {e}");
        }
      }
    });

    *listener.task.lock().unwrap() = Some(task);
    listener
  }

  /// Returns false when the scope was already disposed; the subscription is
  /// dropped, which unlistens.
  pub fn install(&self, subscription: Subscription) -> bool {
    install_into(&self.slot, subscription)
  }

  pub fn dispose(&self) {
    let previous = std::mem::replace(&mut *self.slot.lock().unwrap(), Slot::Disposed);
    drop(previous);
  }

  pub fn is_active(&self) -> bool {
    matches!(*self.slot.lock().unwrap(), Slot::Active(_))
  }

  pub fn is_disposed(&self) -> bool {
    matches!(*self.slot.lock().unwrap(), Slot::Disposed)
  }

  /// Wait until the background subscribe attempt has finished.
  pub async fn settled(&self) {
    let task = self.task.lock().unwrap().take();
    if let Some(task) = task {
      if let Err(e) = task.await {
        log::error!("[events] Listener task failed: {e}");
      }
    }
  }
}

fn install_into(slot: &Mutex<Slot>, subscription: Subscription) -> bool {
  let mut slot = slot.lock().unwrap();
  if matches!(*slot, Slot::Disposed) {
    drop(slot);
    drop(subscription);
    return false;
  }
  *slot = Slot::Active(subscription);
  true
}

impl Drop for ScopedListener {
  fn drop(&mut self) {
    self.dispose();
  }
}
