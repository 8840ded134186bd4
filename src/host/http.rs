use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::CommandInvoker;
use crate::error::{HostError, HostResult};
use crate::settings_manager::FoxiaSettings;

/// Posts commands to the host's local API at `/v1/commands/{command}`.
#[derive(Clone)]
pub struct HttpInvoker {
  client: Client,
  base_url: String,
  token: Option<String>,
}

impl HttpInvoker {
  pub fn new(base_url: String, token: Option<String>) -> Self {
    Self {
      client: Client::new(),
      base_url: base_url.trim_end_matches('/').to_string(),
      token: token.filter(|t| !t.trim().is_empty()),
    }
  }

  pub fn from_settings(settings: &FoxiaSettings) -> Self {
    Self::new(settings.host_url.clone(), settings.host_token.clone())
  }

  fn url(&self, command: &str) -> String {
    format!("{}/v1/commands/{}", self.base_url, command)
  }
}

/// The host reports failures as `{"error": "..."}` or as plain text.
fn error_message(body: &str) -> Option<String> {
  match serde_json::from_str::<Value>(body) {
    Ok(Value::Object(map)) => map
      .get("error")
      .or_else(|| map.get("message"))
      .and_then(Value::as_str)
      .map(str::to_string),
    Ok(Value::String(message)) => Some(message),
    _ => None,
  }
}

#[async_trait]
impl CommandInvoker for HttpInvoker {
  async fn invoke(&self, command: &str, args: Value) -> HostResult<Value> {
    let mut request = self.client.post(self.url(command)).json(&args);
    if let Some(token) = &self.token {
      request = request.header("Authorization", format!("Bearer {token}"));
    }

    let response = request
      .send()
      .await
      .map_err(|e| HostError::Network(e.to_string()))?;

    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|e| HostError::Network(e.to_string()))?;

    if !status.is_success() {
      let message = error_message(&body)
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
        .unwrap_or_else(|| format!("HTTP {status}"));
      log::warn!("[host] {command} returned {status}: {message}");
      return Err(HostError::command(command, message));
    }

    if body.trim().is_empty() {
      return Ok(Value::Null);
    }

    serde_json::from_str(&body).map_err(|e| HostError::decode(command, e.to_string()))
  }
}
