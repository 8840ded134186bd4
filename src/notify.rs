use serde::Serialize;
use std::sync::Arc;

use crate::events::{emit, EventEmitter, TOAST};

/// Follow-up the user can trigger from an error notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToastAction {
  DownloadBrowser { browser: String, version: String },
}

/// A transient user message. `Loading` is keyed by id so later messages with
/// the same id replace it, which is how progress is shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Toast {
  Loading {
    id: String,
    message: String,
  },
  Success {
    message: String,
  },
  Error {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    action: Option<ToastAction>,
  },
  Dismiss {
    id: String,
  },
}

pub trait Notifier: Send + Sync {
  fn show(&self, toast: Toast);

  fn loading(&self, id: &str, message: String) {
    self.show(Toast::Loading {
      id: id.to_string(),
      message,
    });
  }

  fn success(&self, message: String) {
    self.show(Toast::Success { message });
  }

  fn error(&self, message: String) {
    self.show(Toast::Error {
      message,
      action: None,
    });
  }

  fn dismiss(&self, id: &str) {
    self.show(Toast::Dismiss { id: id.to_string() });
  }
}

/// Writes notifications to the log. Used by the CLI.
#[derive(Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  fn show(&self, toast: Toast) {
    match toast {
      Toast::Loading { id, message } => log::info!("[{id}] {message}"),
      Toast::Success { message } => log::info!("{message}"),
      Toast::Error { message, action } => match action {
        Some(ToastAction::DownloadBrowser { browser, version }) => {
          log::error!("{message} (download {browser} {version} to continue)")
        }
        None => log::error!("{message}"),
      },
      Toast::Dismiss { .. } => {}
    }
  }
}

/// Publishes notifications as `toast` events for a UI to render.
#[derive(Clone)]
pub struct EmitterNotifier {
  emitter: Arc<dyn EventEmitter>,
}

impl EmitterNotifier {
  pub fn new(emitter: Arc<dyn EventEmitter>) -> Self {
    Self { emitter }
  }
}

impl Notifier for EmitterNotifier {
  fn show(&self, toast: Toast) {
    if let Err(e) = emit(self.emitter.as_ref(), TOAST, &toast) {
      log::error!("[events] Failed to emit toast: {e}");
    }
  }
}
