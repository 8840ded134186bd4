use thiserror::Error;

/// Failure of a single host command round trip.
#[derive(Debug, Error)]
pub enum HostError {
  /// The host ran the command and rejected it.
  #[error("{command} failed: {message}")]
  Command { command: String, message: String },
  #[error("Network error: {0}")]
  Network(String),
  /// The host answered with something we could not decode.
  #[error("Unexpected response from {command}: {message}")]
  Decode { command: String, message: String },
}

impl HostError {
  pub fn command(command: &str, message: impl Into<String>) -> Self {
    HostError::Command {
      command: command.to_string(),
      message: message.into(),
    }
  }

  pub fn decode(command: &str, message: impl Into<String>) -> Self {
    HostError::Decode {
      command: command.to_string(),
      message: message.into(),
    }
  }

  /// Message text without the command prefix, used for substring checks
  /// such as "Browser app not found".
  pub fn message(&self) -> &str {
    match self {
      HostError::Command { message, .. } => message,
      HostError::Network(message) => message,
      HostError::Decode { message, .. } => message,
    }
  }
}

pub type HostResult<T> = Result<T, HostError>;

#[derive(Debug, Error)]
pub enum SettingsError {
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
  #[error("Serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum EventError {
  #[error("Failed to connect to event stream: {0}")]
  Connect(String),
  #[error("Failed to encode event payload: {0}")]
  Payload(String),
}

/// Validation failures of pasted zs-mkt JSON.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImportInputError {
  #[error("Paste the exported JSON first")]
  Empty,
  #[error("Invalid JSON: {0}")]
  InvalidJson(String),
  #[error("No profiles found")]
  NoProfilesFound,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_host_error_display() {
    let err = HostError::command("clone_profile", "disk full");
    assert_eq!(err.to_string(), "clone_profile failed: disk full");
    assert_eq!(err.message(), "disk full");

    let err = HostError::Network("connection refused".to_string());
    assert_eq!(err.to_string(), "Network error: connection refused");
  }
}
