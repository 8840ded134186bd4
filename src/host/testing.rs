use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::CommandInvoker;
use crate::error::{HostError, HostResult};

#[derive(Clone)]
enum Reply {
  Ok(Value),
  Err(String),
}

/// Replies per command in order; the last reply repeats. Unscripted commands
/// answer null.
#[derive(Default)]
pub(crate) struct ScriptedInvoker {
  replies: Mutex<HashMap<String, VecDeque<Reply>>>,
  calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedInvoker {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  pub(crate) fn respond(&self, command: &str, value: Value) -> &Self {
    self.push(command, Reply::Ok(value))
  }

  pub(crate) fn fail(&self, command: &str, message: &str) -> &Self {
    self.push(command, Reply::Err(message.to_string()))
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

  pub(crate) fn commands(&self) -> Vec<String> {
    self
      .calls
      .lock()
      .unwrap()
      .iter()
      .map(|(command, _)| command.clone())
      .collect()
  }

  pub(crate) fn calls_to(&self, command: &str) -> Vec<Value> {
    self
      .calls
      .lock()
      .unwrap()
      .iter()
      .filter(|(name, _)| name == command)
      .map(|(_, args)| args.clone())
      .collect()
  }
}

#[async_trait]
impl CommandInvoker for ScriptedInvoker {
  async fn invoke(&self, command: &str, args: Value) -> HostResult<Value> {
    self
      .calls
      .lock()
      .unwrap()
      .push((command.to_string(), args));

    let reply = {
      let mut replies = self.replies.lock().unwrap();
      match replies.get_mut(command) {
        Some(queue) if queue.len() > 1 => queue.pop_front(),
        Some(queue) => queue.front().cloned(),
        None => None,
      }
    };

    match reply {
      Some(Reply::Ok(value)) => Ok(value),
      Some(Reply::Err(message)) => Err(HostError::command(command, message)),
      None => Ok(Value::Null),
    }
  }
}
