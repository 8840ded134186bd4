use serde_json::Value;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::cache::RemoteProfileCache;
use crate::dialogs::{parse_zsmkt_profiles, DeleteChoice, DialogState};
use crate::error::HostResult;
use crate::events::{EventHandler, EventSource, ScopedListener, DOWNLOAD_PROGRESS, PROFILES_CHANGED};
use crate::host::{CreateProfileRequest, HostClient};
use crate::notify::{Notifier, Toast, ToastAction};
use crate::profile::filter::{build_view, BrowserFilter, FilterQuery, ProfileView};
use crate::profile::merge::{merge_profiles, orphaned_profiles, CloudProfile, MergedProfile};
use crate::profile::types::{LocalProfile, ProfileGroup, DEFAULT_GROUP};
use crate::settings_manager::{FoxiaSettings, SessionHandle};
use crate::sync::{SyncController, SyncOutcome};

const BROWSER_NOT_FOUND: &str = "Browser app not found";

#[derive(Debug, Clone)]
pub struct HomeOptions {
  pub remote_page_size: u32,
  /// Wait between stopping a browser and uploading its profile.
  pub upload_after_stop_delay: Duration,
}

impl Default for HomeOptions {
  fn default() -> Self {
    Self::from_settings(&FoxiaSettings::default())
  }
}

impl HomeOptions {
  pub fn from_settings(settings: &FoxiaSettings) -> Self {
    Self {
      remote_page_size: settings.remote_page_size,
      upload_after_stop_delay: Duration::from_millis(settings.upload_after_stop_delay_ms),
    }
  }
}

/// The profile list screen: local and cloud profiles, the filters applied to
/// them, the open dialog, and every action a row offers.
pub struct HomeView {
  host: HostClient,
  events: Arc<dyn EventSource>,
  notifier: Arc<dyn Notifier>,
  cache: Arc<RemoteProfileCache>,
  controller: Arc<SyncController>,
  locals: RwLock<Vec<LocalProfile>>,
  groups: RwLock<Vec<ProfileGroup>>,
  query: RwLock<FilterQuery>,
  selected: RwLock<Vec<String>>,
  dialog: Mutex<DialogState>,
  listeners: Mutex<Vec<Arc<ScopedListener>>>,
  upload_delay: Duration,
}

impl HomeView {
  pub fn new(
    host: HostClient,
    events: Arc<dyn EventSource>,
    notifier: Arc<dyn Notifier>,
    session: SessionHandle,
    options: HomeOptions,
  ) -> Arc<Self> {
    let cache = Arc::new(RemoteProfileCache::new(
      host.clone(),
      session.clone(),
      options.remote_page_size,
    ));
    let controller = Arc::new(SyncController::new(
      host.clone(),
      cache.clone(),
      session,
      notifier.clone(),
    ));

    Arc::new(Self {
      host,
      events,
      notifier,
      cache,
      controller,
      locals: RwLock::new(Vec::new()),
      groups: RwLock::new(Vec::new()),
      query: RwLock::new(FilterQuery::default()),
      selected: RwLock::new(Vec::new()),
      dialog: Mutex::new(DialogState::Closed),
      listeners: Mutex::new(Vec::new()),
      upload_delay: options.upload_after_stop_delay,
    })
  }

  pub fn controller(&self) -> &Arc<SyncController> {
    &self.controller
  }

  pub fn cache(&self) -> &Arc<RemoteProfileCache> {
    &self.cache
  }

  // Data

  pub async fn refresh_local(&self) -> HostResult<()> {
    let profiles = self.host.list_browser_profiles().await?;
    log::debug!("[home] Loaded {} local profiles", profiles.len());
    *self.locals.write().unwrap() = profiles;
    Ok(())
  }

  pub async fn refresh_groups(&self) -> HostResult<()> {
    let groups = self.host.get_profile_groups().await?;
    *self.groups.write().unwrap() = groups;
    Ok(())
  }

  pub async fn refresh_remote(&self) -> bool {
    self.cache.refresh().await
  }

  /// Reload everything; failures are logged and leave the previous data.
  pub async fn refresh_all(&self) {
    if let Err(e) = self.refresh_local().await {
      log::error!("[home] Failed to load local profiles: {e}");
    }
    if let Err(e) = self.refresh_groups().await {
      log::error!("[home] Failed to load profile groups: {e}");
    }
    self.refresh_remote().await;

    let locals = self.locals();
    let remotes = self.cache.snapshot();
    for orphan in orphaned_profiles(&locals, &remotes) {
      log::warn!(
        "[home] {} points at Odoo record {} which no longer exists",
        orphan.id,
        orphan.odoo_id.as_deref().unwrap_or_default()
      );
    }
  }

  pub fn locals(&self) -> Vec<LocalProfile> {
    self.locals.read().unwrap().clone()
  }

  pub fn groups(&self) -> Vec<ProfileGroup> {
    self.groups.read().unwrap().clone()
  }

  pub fn merged(&self) -> Vec<MergedProfile> {
    let locals = self.locals.read().unwrap();
    merge_profiles(&locals, &self.cache.snapshot())
  }

  pub fn rows(&self) -> ProfileView {
    let query = self.query.read().unwrap().clone();
    build_view(&self.merged(), &query)
  }

  /// Any row of the merged list, visible or not.
  pub fn find_row(&self, row_id: &str) -> Option<MergedProfile> {
    self.merged().into_iter().find(|row| row.id() == row_id)
  }

  // Selection

  pub fn query(&self) -> FilterQuery {
    self.query.read().unwrap().clone()
  }

  pub fn select_group(&self, group: &str) {
    self.query.write().unwrap().group = group.to_string();
  }

  pub fn set_browser_filter(&self, filter: BrowserFilter) {
    self.query.write().unwrap().browser = filter;
  }

  pub fn set_search(&self, search: &str) {
    self.query.write().unwrap().search = search.to_string();
  }

  pub fn set_selected_profiles(&self, profile_ids: Vec<String>) {
    *self.selected.write().unwrap() = profile_ids;
  }

  pub fn selected_profiles(&self) -> Vec<String> {
    self.selected.read().unwrap().clone()
  }

  // Lifecycle

  /// Listen for host pushes while the view is shown. Mounting twice is a no-op.
  pub fn mount(self: &Arc<Self>) {
    let mut listeners = self.listeners.lock().unwrap();
    if !listeners.is_empty() {
      return;
    }

    let view = Arc::downgrade(self);
    let on_profiles_changed: EventHandler = Arc::new(move |_: &Value| {
      let Some(view) = view.upgrade() else {
        return;
      };
      match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
          runtime.spawn(async move {
            log::info!("[home] profiles-changed received, reloading");
            view.refresh_all().await;
          });
        }
        Err(_) => log::warn!("[home] profiles-changed outside a runtime, ignoring"),
      }
    });

    let controller = Arc::downgrade(&self.controller);
    let on_progress: EventHandler = Arc::new(move |payload: &Value| {
      if let Some(controller) = controller.upgrade() {
        controller.handle_progress(payload);
      }
    });

    listeners.push(Arc::new(ScopedListener::spawn(
      self.events.clone(),
      PROFILES_CHANGED,
      on_profiles_changed,
    )));
    listeners.push(Arc::new(ScopedListener::spawn(
      self.events.clone(),
      DOWNLOAD_PROGRESS,
      on_progress,
    )));
  }

  /// Wait for the listeners started by `mount` to be registered.
  pub async fn mounted(&self) {
    let listeners: Vec<Arc<ScopedListener>> = self.listeners.lock().unwrap().clone();
    for listener in listeners {
      listener.settled().await;
    }
  }

  pub fn unmount(&self) {
    let listeners: Vec<Arc<ScopedListener>> = self.listeners.lock().unwrap().drain(..).collect();
    for listener in listeners {
      listener.dispose();
    }
  }

  // Actions

  /// New profiles land in the selected group unless the request names one.
  pub async fn create_profile(&self, mut request: CreateProfileRequest) -> bool {
    if request.group_id.is_none() {
      let group = self.query.read().unwrap().group.clone();
      if !group.is_empty() && group != DEFAULT_GROUP {
        request.group_id = Some(group);
      }
    }

    match self.host.create_browser_profile(&request).await {
      Ok(_) => true,
      Err(e) => {
        log::error!("[home] Failed to create profile {}: {e}", request.name);
        self
          .notifier
          .error(format!("Failed to create profile: {e}"));
        false
      }
    }
  }

  pub async fn launch_profile(&self, profile: &LocalProfile) -> bool {
    let Err(e) = self.host.launch_browser_profile(profile).await else {
      return true;
    };

    log::error!("[home] Failed to launch {}: {e}", profile.id);
    if e.message().contains(BROWSER_NOT_FOUND) {
      self.notifier.show(Toast::Error {
        message: format!("Browser {} is not downloaded yet", profile.browser),
        action: Some(ToastAction::DownloadBrowser {
          browser: profile.browser.to_string(),
          version: profile.version.clone(),
        }),
      });
    } else {
      self.notifier.error(format!("Failed to launch: {e}"));
    }
    false
  }

  /// Follow-up of the "download browser" notification action.
  pub async fn download_browser(&self, browser: &str, version: &str) -> bool {
    match self.host.download_browser(browser, version).await {
      Ok(()) => true,
      Err(e) => {
        self
          .notifier
          .error(format!("Failed to download {browser} {version}: {e}"));
        false
      }
    }
  }

  /// Stop the browser, then upload the profile once it has released its
  /// files. The upload never creates a new Odoo record.
  pub async fn kill_profile(&self, profile: &LocalProfile) -> Option<JoinHandle<SyncOutcome>> {
    if let Err(e) = self.host.kill_browser_profile(profile).await {
      log::error!("[home] Failed to stop {}: {e}", profile.id);
      self.notifier.error(format!("Failed to stop: {e}"));
      return None;
    }

    let controller = self.controller.clone();
    let profile = profile.clone();
    let delay = self.upload_delay;
    Some(tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      controller.upload(&profile, false).await
    }))
  }

  pub async fn clone_profile(&self, profile: &LocalProfile) -> bool {
    let toast_id = format!("clone-{}", profile.id);
    self
      .notifier
      .loading(&toast_id, format!("Cloning \"{}\"...", profile.name));

    let result = self.host.clone_profile(&profile.id).await;
    self.notifier.dismiss(&toast_id);
    match result {
      Ok(()) => {
        self
          .notifier
          .success(format!("Cloned \"{}\"", profile.name));
        true
      }
      Err(e) => {
        self.notifier.error(format!("Failed to clone: {e}"));
        false
      }
    }
  }

  /// Delete a row, optionally removing its Odoo record first. A failed
  /// server delete is reported and the local delete still runs.
  pub async fn delete_profile(&self, row: &MergedProfile, delete_from_server: bool) -> bool {
    let mut server_deleted = false;
    if delete_from_server {
      if let Some(odoo_id) = row
        .odoo_id()
        .and_then(|id| id.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
      {
        match self.host.delete_odoo_profile(odoo_id).await {
          Ok(()) => {
            log::info!("[home] Deleted Odoo record {odoo_id}");
            server_deleted = true;
          }
          Err(e) => {
            log::error!("[home] Failed to delete Odoo record {odoo_id}: {e}");
            self
              .notifier
              .error(format!("Failed to delete on server: {e}"));
          }
        }
      }
    }

    let local_deleted = match row.local() {
      Some(local) => match self.host.delete_profile(&local.id).await {
        Ok(()) => true,
        Err(e) => {
          log::error!("[home] Failed to delete {}: {e}", local.id);
          self.notifier.error(format!("Failed to delete: {e}"));
          false
        }
      },
      None => {
        log::debug!("[home] {} has no local copy to delete", row.id());
        false
      }
    };

    if server_deleted {
      self.cache.refresh().await;
    }
    local_deleted || server_deleted
  }

  pub async fn delete_selected_profiles(&self, profile_ids: &[String]) -> bool {
    match self.host.delete_selected_profiles(profile_ids).await {
      Ok(()) => {
        self.selected.write().unwrap().retain(|id| !profile_ids.contains(id));
        true
      }
      Err(e) => {
        self.notifier.error(format!("Failed to delete profiles: {e}"));
        false
      }
    }
  }

  pub async fn rename_profile(&self, profile_id: &str, new_name: &str) -> bool {
    match self.host.rename_profile(profile_id, new_name).await {
      Ok(()) => true,
      Err(e) => {
        self.notifier.error(format!("Failed to rename: {e}"));
        false
      }
    }
  }

  pub async fn update_camoufox_config(&self, profile_id: &str, config: Value) -> bool {
    match self.host.update_camoufox_config(profile_id, config).await {
      Ok(()) => true,
      Err(e) => {
        self
          .notifier
          .error(format!("Failed to save camoufox config: {e}"));
        false
      }
    }
  }

  pub async fn upload(&self, profile: &LocalProfile) -> SyncOutcome {
    self.controller.upload(profile, true).await
  }

  /// Pull a row's cloud copy. Cloud-only rows go through the import path;
  /// rows without a profile url are skipped.
  pub async fn download(&self, row: &MergedProfile) -> SyncOutcome {
    if let MergedProfile::CloudOnly(cloud) = row {
      return self.import_cloud(cloud).await;
    }
    let Some(profile_url) = row.profile_url() else {
      log::info!("[home] {} has no profile url, nothing to download", row.id());
      return SyncOutcome::Skipped;
    };
    self
      .controller
      .download(row.id(), profile_url, row.name())
      .await
  }

  pub async fn import_cloud(&self, cloud: &CloudProfile) -> SyncOutcome {
    let locals = self.locals();
    self.controller.import_cloud(cloud, &locals).await
  }

  // Dialogs

  pub fn dialog(&self) -> DialogState {
    self.dialog.lock().unwrap().clone()
  }

  pub fn open_dialog(&self, state: DialogState) {
    *self.dialog.lock().unwrap() = state;
  }

  pub fn close_dialog(&self) {
    self.open_dialog(DialogState::Closed);
  }

  pub fn set_create_group_name(&self, name: &str) {
    if let DialogState::CreateGroup(form) = &mut *self.dialog.lock().unwrap() {
      form.name = name.to_string();
    }
  }

  pub fn set_delete_choice(&self, choice: DeleteChoice) -> bool {
    self.dialog.lock().unwrap().set_delete_choice(choice)
  }

  /// Submit the create-group form. An empty name does nothing; a failure
  /// stays on the form.
  pub async fn submit_create_group(&self) -> Option<ProfileGroup> {
    let name = match &*self.dialog.lock().unwrap() {
      DialogState::CreateGroup(form) => form.submittable_name()?.to_string(),
      _ => return None,
    };

    match self.host.create_profile_group(&name).await {
      Ok(group) => {
        self
          .notifier
          .success(format!("Group \"{}\" created", group.name));
        self.groups.write().unwrap().push(group.clone());
        self.close_dialog();
        Some(group)
      }
      Err(e) => {
        let message = e.message().to_string();
        if let DialogState::CreateGroup(form) = &mut *self.dialog.lock().unwrap() {
          form.error = Some(message.clone());
        }
        self.notifier.error(message);
        None
      }
    }
  }

  /// Import pasted zs-mkt JSON. Returns the imported count.
  pub async fn submit_zsmkt_import(&self, input: &str) -> Option<u64> {
    let profiles = match parse_zsmkt_profiles(input) {
      Ok(profiles) => profiles,
      Err(e) => {
        self.notifier.error(e.to_string());
        return None;
      }
    };

    match self.host.import_zsmkt_profiles_batch(&profiles).await {
      Ok(count) => {
        self
          .notifier
          .success(format!("Imported {count} profiles"));
        self.close_dialog();
        Some(count)
      }
      Err(e) => {
        log::error!("[home] Failed to import profiles: {e}");
        self.notifier.error(format!("Import failed: {e}"));
        None
      }
    }
  }

  /// Confirm the open single or bulk delete dialog.
  pub async fn confirm_delete(&self) -> bool {
    let dialog = self.dialog();
    let deleted = match &dialog {
      DialogState::DeleteProfile { profile, choice } => {
        self
          .delete_profile(profile, *choice == DeleteChoice::LocalAndServer)
          .await
      }
      DialogState::BulkDelete { profile_ids } => self.delete_selected_profiles(profile_ids).await,
      _ => return false,
    };
    self.close_dialog();
    deleted
  }
}
