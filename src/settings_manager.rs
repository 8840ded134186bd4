use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::error::SettingsError;

pub const DEFAULT_HOST_URL: &str = "http://127.0.0.1:10108";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FoxiaSettings {
  #[serde(default = "default_host_url")]
  pub host_url: String, // Local API of the browser host
  #[serde(default)]
  pub host_token: Option<String>,
  #[serde(default)]
  pub odoo_url: Option<String>,
  #[serde(default)]
  pub session_id: Option<String>,
  #[serde(default)]
  pub odoo_username: Option<String>,
  #[serde(default = "default_remote_page_size")]
  pub remote_page_size: u32,
  #[serde(default = "default_upload_after_stop_delay_ms")]
  pub upload_after_stop_delay_ms: u64, // Lets the browser release its files before zipping
}

fn default_host_url() -> String {
  DEFAULT_HOST_URL.to_string()
}

fn default_remote_page_size() -> u32 {
  1000
}

fn default_upload_after_stop_delay_ms() -> u64 {
  1500
}

impl Default for FoxiaSettings {
  fn default() -> Self {
    Self {
      host_url: default_host_url(),
      host_token: None,
      odoo_url: None,
      session_id: None,
      odoo_username: None,
      remote_page_size: default_remote_page_size(),
      upload_after_stop_delay_ms: default_upload_after_stop_delay_ms(),
    }
  }
}

/// Odoo credentials the upload command forwards to the S3 proxy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OdooSession {
  pub base_url: String,
  pub session_id: String,
  pub username: Option<String>,
}

impl OdooSession {
  pub fn is_logged_in(&self) -> bool {
    !self.session_id.trim().is_empty()
  }
}

impl FoxiaSettings {
  pub fn odoo_session(&self) -> OdooSession {
    OdooSession {
      base_url: self.odoo_url.clone().unwrap_or_default(),
      session_id: self.session_id.clone().unwrap_or_default(),
      username: self.odoo_username.clone(),
    }
  }
}

/// Session shared by the cache and the sync controller. Updated when the
/// user logs in or out.
#[derive(Clone, Default)]
pub struct SessionHandle(Arc<RwLock<OdooSession>>);

impl SessionHandle {
  pub fn new(session: OdooSession) -> Self {
    Self(Arc::new(RwLock::new(session)))
  }

  pub fn get(&self) -> OdooSession {
    self.0.read().unwrap().clone()
  }

  pub fn set(&self, session: OdooSession) {
    *self.0.write().unwrap() = session;
  }

  pub fn is_logged_in(&self) -> bool {
    self.0.read().unwrap().is_logged_in()
  }
}

pub struct SettingsManager {
  settings_dir: PathBuf,
}

impl Default for SettingsManager {
  fn default() -> Self {
    Self::new()
  }
}

impl SettingsManager {
  pub fn new() -> Self {
    Self {
      settings_dir: crate::app_dirs::settings_dir(),
    }
  }

  pub fn with_dir(settings_dir: PathBuf) -> Self {
    Self { settings_dir }
  }

  pub fn get_settings_dir(&self) -> PathBuf {
    self.settings_dir.clone()
  }

  pub fn get_settings_file(&self) -> PathBuf {
    self.settings_dir.join("settings.json")
  }

  pub fn load_settings(&self) -> Result<FoxiaSettings, SettingsError> {
    let settings_file = self.get_settings_file();

    if !settings_file.exists() {
      return Ok(FoxiaSettings::default());
    }

    let content = fs::read_to_string(&settings_file)?;

    // serde fills in defaults for missing fields
    match serde_json::from_str::<FoxiaSettings>(&content) {
      Ok(settings) => Ok(settings),
      Err(e) => {
        log::warn!(
          "[settings] Failed to parse {}: {e}, using defaults",
          settings_file.display()
        );
        Ok(FoxiaSettings::default())
      }
    }
  }

  pub fn save_settings(&self, settings: &FoxiaSettings) -> Result<(), SettingsError> {
    create_dir_all(&self.settings_dir)?;

    let json = serde_json::to_string_pretty(settings)?;
    fs::write(self.get_settings_file(), json)?;
    Ok(())
  }

  pub fn save_session(
    &self,
    odoo_url: &str,
    session_id: &str,
    username: Option<String>,
  ) -> Result<FoxiaSettings, SettingsError> {
    let mut settings = self.load_settings()?;
    settings.odoo_url = Some(odoo_url.trim_end_matches('/').to_string());
    settings.session_id = Some(session_id.to_string());
    settings.odoo_username = username;
    self.save_settings(&settings)?;
    Ok(settings)
  }

  pub fn clear_session(&self) -> Result<FoxiaSettings, SettingsError> {
    let mut settings = self.load_settings()?;
    settings.session_id = None;
    settings.odoo_username = None;
    self.save_settings(&settings)?;
    Ok(settings)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn create_test_settings_manager() -> (SettingsManager, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let manager = SettingsManager::with_dir(temp_dir.path().join("settings"));
    (manager, temp_dir)
  }

  #[test]
  fn test_default_settings() {
    let settings = FoxiaSettings::default();
    assert_eq!(settings.host_url, DEFAULT_HOST_URL);
    assert_eq!(settings.remote_page_size, 1000);
    assert_eq!(settings.upload_after_stop_delay_ms, 1500);
    assert!(!settings.odoo_session().is_logged_in());
  }

  #[test]
  fn test_load_missing_file_returns_defaults() {
    let (manager, _temp_dir) = create_test_settings_manager();
    let settings = manager.load_settings().unwrap();
    assert_eq!(settings, FoxiaSettings::default());
  }

  #[test]
  fn test_partial_file_fills_defaults() {
    let (manager, _temp_dir) = create_test_settings_manager();
    fs::create_dir_all(manager.get_settings_dir()).unwrap();
    fs::write(
      manager.get_settings_file(),
      r#"{"odoo_url": "https://erp.example.com", "session_id": "abc"}"#,
    )
    .unwrap();

    let settings = manager.load_settings().unwrap();
    assert_eq!(settings.host_url, DEFAULT_HOST_URL);
    assert_eq!(settings.remote_page_size, 1000);
    let session = settings.odoo_session();
    assert!(session.is_logged_in());
    assert_eq!(session.base_url, "https://erp.example.com");
  }

  #[test]
  fn test_corrupt_file_falls_back_to_defaults() {
    let (manager, _temp_dir) = create_test_settings_manager();
    fs::create_dir_all(manager.get_settings_dir()).unwrap();
    fs::write(manager.get_settings_file(), "{not json").unwrap();

    let settings = manager.load_settings().unwrap();
    assert_eq!(settings, FoxiaSettings::default());
  }

  #[test]
  fn test_session_roundtrip() {
    let (manager, _temp_dir) = create_test_settings_manager();

    let saved = manager
      .save_session("https://erp.example.com/", "sess-1", Some("lan".to_string()))
      .unwrap();
    assert_eq!(saved.odoo_url.as_deref(), Some("https://erp.example.com"));

    let loaded = manager.load_settings().unwrap();
    assert_eq!(loaded.session_id.as_deref(), Some("sess-1"));
    assert_eq!(loaded.odoo_username.as_deref(), Some("lan"));

    let cleared = manager.clear_session().unwrap();
    assert!(!cleared.odoo_session().is_logged_in());
    assert_eq!(cleared.odoo_url.as_deref(), Some("https://erp.example.com"));
  }

  #[test]
  fn test_session_handle_shares_updates() {
    let handle = SessionHandle::default();
    let shared = handle.clone();
    assert!(!shared.is_logged_in());

    handle.set(OdooSession {
      base_url: "https://erp.example.com".to_string(),
      session_id: "abc".to_string(),
      username: None,
    });
    assert!(shared.is_logged_in());
    assert_eq!(shared.get().session_id, "abc");
  }
}
