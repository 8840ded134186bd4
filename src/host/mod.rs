use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::{HostError, HostResult};
use crate::odoo::{decode_remote_list, NewOdooProfile, RemoteProfile};
use crate::profile::types::{is_valid_remote_id, LocalProfile, ProfileGroup};

pub mod http;
#[cfg(test)]
pub(crate) mod testing;

pub use http::HttpInvoker;

/// One request/response round trip to the host application. Arguments use
/// camelCase keys.
#[async_trait]
pub trait CommandInvoker: Send + Sync {
  async fn invoke(&self, command: &str, args: Value) -> HostResult<Value>;
}

/// Arguments for `create_browser_profile_new`.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileRequest {
  pub name: String,
  pub browser_str: String,
  pub version: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub release_type: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub proxy_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub camoufox_config: Option<Value>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub group_id: Option<String>,
}

/// Typed facade over a `CommandInvoker`. Every response is decoded and
/// validated here so callers never see raw JSON.
#[derive(Clone)]
pub struct HostClient {
  invoker: Arc<dyn CommandInvoker>,
}

impl HostClient {
  pub fn new(invoker: Arc<dyn CommandInvoker>) -> Self {
    Self { invoker }
  }

  async fn call(&self, command: &str, args: Value) -> HostResult<Value> {
    log::debug!("[host] {command}");
    self.invoker.invoke(command, args).await
  }

  async fn call_unit(&self, command: &str, args: Value) -> HostResult<()> {
    self.call(command, args).await.map(|_| ())
  }

  async fn call_typed<T: DeserializeOwned>(&self, command: &str, args: Value) -> HostResult<T> {
    let value = self.call(command, args).await?;
    serde_json::from_value(value).map_err(|e| HostError::decode(command, e.to_string()))
  }

  pub async fn list_odoo_profiles(&self, offset: u32, limit: u32) -> HostResult<Vec<RemoteProfile>> {
    const COMMAND: &str = "list_odoo_profiles";
    let value = self
      .call(COMMAND, json!({ "offset": offset, "limit": limit }))
      .await?;
    decode_remote_list(value).map_err(|e| HostError::decode(COMMAND, e))
  }

  pub async fn download_profile_from_odoo_s3(
    &self,
    profile_id: &str,
    profile_url: &str,
  ) -> HostResult<()> {
    self
      .call_unit(
        "download_profile_from_odoo_s3",
        json!({ "profileId": profile_id, "profileUrl": profile_url }),
      )
      .await
  }

  /// Returns the S3 url of the uploaded archive.
  pub async fn upload_profile_to_odoo_s3(
    &self,
    profile_id: &str,
    base_url: &str,
    session_id: &str,
  ) -> HostResult<String> {
    const COMMAND: &str = "upload_profile_to_odoo_s3";
    let value = self
      .call(
        COMMAND,
        json!({ "profileId": profile_id, "baseUrl": base_url, "sessionId": session_id }),
      )
      .await?;
    match value {
      Value::String(url) if !url.trim().is_empty() => Ok(url),
      other => Err(HostError::decode(
        COMMAND,
        format!("expected a profile url, got {other}"),
      )),
    }
  }

  pub async fn update_profile_url(&self, profile_id: &str, profile_url: &str) -> HostResult<()> {
    self
      .call_unit(
        "update_profile_url",
        json!({ "profileId": profile_id, "profileUrl": profile_url }),
      )
      .await
  }

  pub async fn update_odoo_profile(&self, profile: Value) -> HostResult<()> {
    self
      .call_unit("update_odoo_profile", json!({ "profile": profile }))
      .await
  }

  /// Returns the new Odoo id, or None when the host did not report a usable one.
  pub async fn create_odoo_profile(&self, profile: &NewOdooProfile) -> HostResult<Option<String>> {
    let value = self
      .call("create_odoo_profile", json!({ "profile": profile }))
      .await?;
    Ok(created_id(value))
  }

  pub async fn update_profile_odoo_id(&self, profile_id: &str, odoo_id: &str) -> HostResult<()> {
    self
      .call_unit(
        "update_profile_odoo_id",
        json!({ "profileId": profile_id, "odooId": odoo_id }),
      )
      .await
  }

  /// Returns how many profiles the host imported.
  pub async fn import_zsmkt_profiles_batch<T: Serialize + Sync>(
    &self,
    profiles: &[T],
  ) -> HostResult<u64> {
    const COMMAND: &str = "import_zsmkt_profiles_batch";
    let value = self
      .call(COMMAND, json!({ "zsProfiles": profiles }))
      .await?;
    match value {
      Value::Null => Ok(profiles.len() as u64),
      other => other.as_u64().ok_or_else(|| {
        HostError::decode(COMMAND, format!("expected an import count, got {other}"))
      }),
    }
  }

  pub async fn delete_odoo_profile(&self, odoo_id: i64) -> HostResult<()> {
    self
      .call_unit("delete_odoo_profile", json!({ "id": odoo_id }))
      .await
  }

  /// Local profiles; records the host sends that we cannot read are skipped.
  pub async fn list_browser_profiles(&self) -> HostResult<Vec<LocalProfile>> {
    const COMMAND: &str = "list_browser_profiles";
    let value = self.call(COMMAND, json!({})).await?;
    let Value::Array(items) = value else {
      return Err(HostError::decode(COMMAND, "expected a list of profiles"));
    };

    Ok(
      items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<LocalProfile>(item) {
          Ok(profile) => Some(profile),
          Err(e) => {
            log::warn!("[host] Skipping unreadable local profile: {e}");
            None
          }
        })
        .collect(),
    )
  }

  pub async fn get_profile_groups(&self) -> HostResult<Vec<ProfileGroup>> {
    self.call_typed("get_profile_groups", json!({})).await
  }

  pub async fn create_browser_profile(&self, request: &CreateProfileRequest) -> HostResult<Value> {
    let args = serde_json::to_value(request)
      .map_err(|e| HostError::decode("create_browser_profile_new", e.to_string()))?;
    self.call("create_browser_profile_new", args).await
  }

  pub async fn launch_browser_profile(&self, profile: &LocalProfile) -> HostResult<()> {
    self
      .call_unit("launch_browser_profile", json!({ "profile": profile }))
      .await
  }

  pub async fn kill_browser_profile(&self, profile: &LocalProfile) -> HostResult<()> {
    self
      .call_unit("kill_browser_profile", json!({ "profile": profile }))
      .await
  }

  pub async fn clone_profile(&self, profile_id: &str) -> HostResult<()> {
    self
      .call_unit("clone_profile", json!({ "profileId": profile_id }))
      .await
  }

  pub async fn delete_profile(&self, profile_id: &str) -> HostResult<()> {
    self
      .call_unit("delete_profile", json!({ "profileId": profile_id }))
      .await
  }

  pub async fn delete_selected_profiles(&self, profile_ids: &[String]) -> HostResult<()> {
    self
      .call_unit(
        "delete_selected_profiles",
        json!({ "profileIds": profile_ids }),
      )
      .await
  }

  pub async fn rename_profile(&self, profile_id: &str, new_name: &str) -> HostResult<()> {
    self
      .call_unit(
        "rename_profile",
        json!({ "profileId": profile_id, "newName": new_name }),
      )
      .await
  }

  pub async fn update_camoufox_config(&self, profile_id: &str, config: Value) -> HostResult<()> {
    self
      .call_unit(
        "update_camoufox_config",
        json!({ "profileId": profile_id, "config": config }),
      )
      .await
  }

  pub async fn create_profile_group(&self, name: &str) -> HostResult<ProfileGroup> {
    self
      .call_typed("create_profile_group", json!({ "name": name }))
      .await
  }

  pub async fn download_browser(&self, browser: &str, version: &str) -> HostResult<()> {
    self
      .call_unit(
        "download_browser",
        json!({ "browserStr": browser, "version": version }),
      )
      .await
  }
}

/// `create_odoo_profile` answers with `{id}` or the bare id.
fn created_id(value: Value) -> Option<String> {
  let raw = match value {
    Value::Object(mut map) => map.remove("id")?,
    other => other,
  };
  let id = match raw {
    Value::Number(n) => n.to_string(),
    Value::String(s) => s.trim().to_string(),
    _ => return None,
  };
  is_valid_remote_id(&id).then_some(id)
}
