use std::sync::RwLock;
use tokio::sync::Mutex as AsyncMutex;

use crate::host::HostClient;
use crate::odoo::RemoteProfile;
use crate::settings_manager::SessionHandle;

/// Last list of Odoo profiles fetched through the host. Only `refresh`
/// writes it.
pub struct RemoteProfileCache {
  host: HostClient,
  session: SessionHandle,
  page_size: u32,
  profiles: RwLock<Vec<RemoteProfile>>,
  refreshing: AsyncMutex<()>,
}

impl RemoteProfileCache {
  pub fn new(host: HostClient, session: SessionHandle, page_size: u32) -> Self {
    Self {
      host,
      session,
      page_size,
      profiles: RwLock::new(Vec::new()),
      refreshing: AsyncMutex::new(()),
    }
  }

  pub fn snapshot(&self) -> Vec<RemoteProfile> {
    self.profiles.read().unwrap().clone()
  }

  pub fn len(&self) -> usize {
    self.profiles.read().unwrap().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Cached record for an Odoo id. Ids compare numerically when both parse.
  pub fn find(&self, odoo_id: &str) -> Option<RemoteProfile> {
    let wanted = odoo_id.trim();
    let wanted_num = wanted.parse::<i64>().ok();
    self
      .profiles
      .read()
      .unwrap()
      .iter()
      .find(|profile| match (wanted_num, profile.numeric_id()) {
        (Some(a), Some(b)) => a == b,
        _ => profile.id == wanted,
      })
      .cloned()
  }

  /// Fetch the first page from Odoo. Skipped without a session; failures are
  /// logged and keep the previous list. Returns whether the list was replaced.
  pub async fn refresh(&self) -> bool {
    if !self.session.is_logged_in() {
      log::debug!("[cache] Not logged in to Odoo, skipping refresh");
      return false;
    }

    // Fetches are serialized
    let _guard = self.refreshing.lock().await;

    match self.host.list_odoo_profiles(0, self.page_size).await {
      Ok(profiles) => {
        log::info!("[cache] Reloaded {} Odoo profiles", profiles.len());
        *self.profiles.write().unwrap() = profiles;
        true
      }
      Err(e) => {
        log::error!("[cache] Failed to reload Odoo profiles: {e}");
        false
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::host::testing::ScriptedInvoker;
  use crate::settings_manager::OdooSession;
  use serde_json::json;
  use std::sync::Arc;

  fn logged_in() -> SessionHandle {
    SessionHandle::new(OdooSession {
      base_url: "https://erp.example.com".to_string(),
      session_id: "sid".to_string(),
      username: None,
    })
  }

  fn cache_with(session: SessionHandle) -> (RemoteProfileCache, Arc<ScriptedInvoker>) {
    let invoker = Arc::new(ScriptedInvoker::new());
    let cache = RemoteProfileCache::new(HostClient::new(invoker.clone()), session, 1000);
    (cache, invoker)
  }

  #[tokio::test]
  async fn test_refresh_skipped_without_session() {
    let (cache, invoker) = cache_with(SessionHandle::default());
    assert!(!cache.refresh().await);
    assert!(invoker.commands().is_empty());
  }

  #[tokio::test]
  async fn test_refresh_replaces_list() {
    let (cache, invoker) = cache_with(logged_in());
    invoker.respond(
      "list_odoo_profiles",
      json!({"items": [{"id": 3, "name": "a"}, {"id": "12", "name": "b"}]}),
    );

    assert!(cache.refresh().await);
    assert_eq!(cache.len(), 2);
    assert_eq!(
      invoker.calls_to("list_odoo_profiles"),
      vec![json!({"offset": 0, "limit": 1000})]
    );
    assert_eq!(cache.find("12").map(|p| p.name), Some("b".to_string()));
    assert_eq!(cache.find("012").map(|p| p.name), Some("b".to_string()));
    assert!(cache.find("99").is_none());
  }

  #[tokio::test]
  async fn test_failed_refresh_keeps_previous_list() {
    let (cache, invoker) = cache_with(logged_in());
    invoker
      .respond("list_odoo_profiles", json!({"items": [{"id": 1, "name": "a"}]}))
      .fail("list_odoo_profiles", "session expired");

    assert!(cache.refresh().await);
    assert!(!cache.refresh().await);
    assert_eq!(cache.len(), 1);
  }
}
