#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use foxia_lib::host::{CommandInvoker, HostClient};
use foxia_lib::notify::{Notifier, Toast};
use foxia_lib::{HostError, HostResult, OdooSession, SessionHandle};

#[derive(Clone)]
enum Reply {
  Ok(Value),
  Err(String),
}

/// Host stand-in for integration tests. Each command answers from its own
/// queue and the last reply repeats; unscripted commands answer null.
#[derive(Default)]
pub struct MockHost {
  replies: Mutex<HashMap<String, VecDeque<Reply>>>,
  delays: Mutex<HashMap<String, Duration>>,
  calls: Mutex<Vec<(String, Value)>>,
}

impl MockHost {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn client(self: &Arc<Self>) -> HostClient {
    HostClient::new(self.clone())
  }

  pub fn respond(&self, command: &str, value: Value) -> &Self {
    self.push(command, Reply::Ok(value))
  }

  pub fn fail(&self, command: &str, message: &str) -> &Self {
    self.push(command, Reply::Err(message.to_string()))
  }

  /// Hold every call to `command` for `delay` before answering.
  pub fn delay(&self, command: &str, delay: Duration) -> &Self {
    self
      .delays
      .lock()
      .unwrap()
      .insert(command.to_string(), delay);
    self
  }

  fn push(&self, command: &str, reply: Reply) -> &Self {
    self
      .replies
      .lock()
      .unwrap()
      .entry(command.to_string())
      .or_default()
      .push_back(reply);
    self
  }

  pub fn commands(&self) -> Vec<String> {
    self
      .calls
      .lock()
      .unwrap()
      .iter()
      .map(|(command, _)| command.clone())
      .collect()
  }

  pub fn calls_to(&self, command: &str) -> Vec<Value> {
    self
      .calls
      .lock()
      .unwrap()
      .iter()
      .filter(|(name, _)| name == command)
      .map(|(_, args)| args.clone())
      .collect()
  }

  pub fn count(&self, command: &str) -> usize {
    self.calls_to(command).len()
  }

  pub fn clear_calls(&self) {
    self.calls.lock().unwrap().clear();
  }

  fn next_reply(&self, command: &str) -> Reply {
    let mut replies = self.replies.lock().unwrap();
    match replies.get_mut(command) {
      Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Reply::Ok(Value::Null)),
      Some(queue) => queue.front().cloned().unwrap_or(Reply::Ok(Value::Null)),
      None => Reply::Ok(Value::Null),
    }
  }
}

#[async_trait]
impl CommandInvoker for MockHost {
  async fn invoke(&self, command: &str, args: Value) -> HostResult<Value> {
    self
      .calls
      .lock()
      .unwrap()
      .push((command.to_string(), args));

    let delay = self.delays.lock().unwrap().get(command).copied();
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }

    match self.next_reply(command) {
      Reply::Ok(value) => Ok(value),
      Reply::Err(message) => Err(HostError::command(command, message)),
    }
  }
}

/// Keeps every notification in order.
#[derive(Default)]
pub struct RecordingNotifier {
  toasts: Mutex<Vec<Toast>>,
}

impl RecordingNotifier {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn toasts(&self) -> Vec<Toast> {
    self.toasts.lock().unwrap().clone()
  }

  pub fn successes(&self) -> Vec<String> {
    self
      .toasts()
      .into_iter()
      .filter_map(|toast| match toast {
        Toast::Success { message } => Some(message),
        _ => None,
      })
      .collect()
  }

  pub fn errors(&self) -> Vec<String> {
    self
      .toasts()
      .into_iter()
      .filter_map(|toast| match toast {
        Toast::Error { message, .. } => Some(message),
        _ => None,
      })
      .collect()
  }

  pub fn clear(&self) {
    self.toasts.lock().unwrap().clear();
  }
}

impl Notifier for RecordingNotifier {
  fn show(&self, toast: Toast) {
    self.toasts.lock().unwrap().push(toast);
  }
}

pub fn logged_in_session() -> SessionHandle {
  SessionHandle::new(OdooSession {
    base_url: "https://odoo.test".to_string(),
    session_id: "sid-1".to_string(),
    username: Some("admin".to_string()),
  })
}
