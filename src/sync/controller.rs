use serde_json::{Map, Value};
use std::sync::Arc;

use super::guard::{InFlightRegistry, SyncState};
use super::slug::slugify;
use crate::cache::RemoteProfileCache;
use crate::error::HostResult;
use crate::host::HostClient;
use crate::notify::Notifier;
use crate::odoo::{strip_cloud_prefix, NewOdooProfile, RemoteProfile, ZsFingerprint, ZsProfile, ZsProxy};
use crate::profile::merge::CloudProfile;
use crate::profile::types::LocalProfile;
use crate::settings_manager::SessionHandle;

pub const DEFAULT_TIMEZONE: &str = "Asia/Ho_Chi_Minh";
pub const DEFAULT_LANGUAGE: &str = "vi-VN";
pub const CLOUD_LOCAL_PATH: &str = "S3 Cloud";
const SYNCED_STATUS: &str = "synced";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
  /// Another transfer for the profile was already running.
  Skipped,
  Completed,
  Failed(String),
}

/// `Downloading "Shop": 1.50MB / 3.00MB (50%)`
pub fn progress_message(profile_name: &str, downloaded: f64, total: f64, percentage: f64) -> String {
  let downloaded_mb = downloaded / 1024.0 / 1024.0;
  let total_mb = total / 1024.0 / 1024.0;
  format!("Downloading \"{profile_name}\": {downloaded_mb:.2}MB / {total_mb:.2}MB ({percentage}%)")
}

/// Body for `update_odoo_profile`: the cached record as Odoo sent it, with
/// id, name and url replaced. Everything else goes back untouched.
pub fn update_payload(
  cached: Option<&RemoteProfile>,
  odoo_id: &str,
  name: &str,
  profile_url: &str,
) -> Value {
  let mut payload: Map<String, Value> = cached
    .map(|remote| remote.raw.clone())
    .unwrap_or_default();

  let id = match odoo_id.trim().parse::<i64>() {
    Ok(n) => Value::from(n),
    Err(_) => Value::from(odoo_id),
  };
  payload.insert("id".to_string(), id);
  payload.insert("name".to_string(), Value::from(name));
  payload.insert("profileUrl".to_string(), Value::from(profile_url));
  Value::Object(payload)
}

/// Single entry for `import_zsmkt_profiles_batch` describing a cloud-only row.
pub fn import_entry(cloud: &CloudProfile) -> ZsProfile {
  let remote = &cloud.remote;
  ZsProfile {
    id: strip_cloud_prefix(&cloud.odoo_id).to_string(),
    name: cloud.name.clone(),
    fingerprint: ZsFingerprint {
      user_agent: remote.user_agent.clone().unwrap_or_default(),
      timezone: remote
        .timezone
        .clone()
        .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
      language: remote
        .language
        .clone()
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
      platform: remote.platform.clone(),
    },
    status: SYNCED_STATUS.to_string(),
    version: cloud.version.clone(),
    proxy: remote.active_proxy().map(ZsProxy::from),
    created_at: remote.created_at.clone(),
    local_path: remote
      .local_path
      .clone()
      .unwrap_or_else(|| CLOUD_LOCAL_PATH.to_string()),
    profile_url: cloud.profile_url.clone().filter(|url| !url.is_empty()),
  }
}

/// Runs upload, download and cloud import. Errors never escape a workflow:
/// each ends in exactly one success or error notification.
pub struct SyncController {
  host: HostClient,
  cache: Arc<RemoteProfileCache>,
  session: SessionHandle,
  notifier: Arc<dyn Notifier>,
  in_flight: InFlightRegistry,
}

impl SyncController {
  pub fn new(
    host: HostClient,
    cache: Arc<RemoteProfileCache>,
    session: SessionHandle,
    notifier: Arc<dyn Notifier>,
  ) -> Self {
    Self {
      host,
      cache,
      session,
      notifier,
      in_flight: InFlightRegistry::new(),
    }
  }

  pub fn state(&self, profile_id: &str) -> SyncState {
    self.in_flight.state(profile_id)
  }

  pub fn in_flight(&self) -> &InFlightRegistry {
    &self.in_flight
  }

  pub async fn download(&self, profile_id: &str, profile_url: &str, profile_name: &str) -> SyncOutcome {
    let Some(_guard) = self
      .in_flight
      .try_claim(profile_id, profile_name, SyncState::Downloading)
    else {
      log::info!("[sync] \"{profile_name}\" is already transferring, skipping download");
      return SyncOutcome::Skipped;
    };

    let toast_id = format!("download-{profile_name}");
    self
      .notifier
      .loading(&toast_id, progress_message(profile_name, 0.0, 0.0, 0.0));

    log::info!("[sync] Downloading {profile_id} from {profile_url}");
    let result = self
      .host
      .download_profile_from_odoo_s3(profile_id, profile_url)
      .await;

    self.notifier.dismiss(&toast_id);
    match result {
      Ok(()) => {
        self
          .notifier
          .success(format!("Downloaded data for \"{profile_name}\""));
        self.cache.refresh().await;
        SyncOutcome::Completed
      }
      Err(e) => {
        log::error!("[sync] Download of {profile_id} failed: {e}");
        self.notifier.error(format!("Download failed: {e}"));
        SyncOutcome::Failed(e.to_string())
      }
    }
  }

  /// Apply a `download-progress` payload. Returns false when it was ignored,
  /// either because it came from a browser download (no profile name or
  /// non-numeric sizes) or because no such profile download is running.
  pub fn handle_progress(&self, payload: &Value) -> bool {
    let Some(profile_name) = payload
      .get("profile_name")
      .and_then(Value::as_str)
      .filter(|name| !name.is_empty())
    else {
      return false;
    };
    let (Some(downloaded), Some(total)) = (
      payload.get("downloaded").and_then(Value::as_f64),
      payload.get("total").and_then(Value::as_f64),
    ) else {
      return false;
    };

    if !self.in_flight.is_downloading_name(profile_name) {
      log::debug!("[sync] Progress for \"{profile_name}\" without an active download");
      return false;
    }

    let percentage = payload
      .get("percentage")
      .and_then(Value::as_f64)
      .unwrap_or_else(|| {
        if total > 0.0 {
          (downloaded / total * 100.0).round()
        } else {
          0.0
        }
      });

    self.notifier.loading(
      &format!("download-{profile_name}"),
      progress_message(profile_name, downloaded, total, percentage),
    );
    true
  }

  pub async fn upload(&self, profile: &LocalProfile, allow_create: bool) -> SyncOutcome {
    let Some(guard) = self
      .in_flight
      .try_claim(&profile.id, &profile.name, SyncState::Uploading)
    else {
      log::info!(
        "[sync] \"{}\" is already uploading, skipping upload",
        profile.name
      );
      return SyncOutcome::Skipped;
    };

    let toast_id = format!("upload-{}", profile.name);
    self
      .notifier
      .loading(&toast_id, format!("Uploading \"{}\" to Odoo...", profile.name));

    let result = self.run_upload(profile, allow_create).await;

    self.cache.refresh().await;
    drop(guard);
    self.notifier.dismiss(&toast_id);

    match result {
      Ok(()) => {
        log::info!("[sync] Uploaded {}", profile.id);
        self
          .notifier
          .success(format!("Uploaded \"{}\" to Odoo", profile.name));
        SyncOutcome::Completed
      }
      Err(e) => {
        log::error!("[sync] Upload of {} failed: {e}", profile.id);
        self.notifier.error(format!("Upload failed: {e}"));
        SyncOutcome::Failed(e.to_string())
      }
    }
  }

  async fn run_upload(&self, profile: &LocalProfile, allow_create: bool) -> HostResult<()> {
    let session = self.session.get();
    let profile_url = self
      .host
      .upload_profile_to_odoo_s3(&profile.id, &session.base_url, &session.session_id)
      .await?;

    self
      .host
      .update_profile_url(&profile.id, &profile_url)
      .await?;

    match profile.remote_id() {
      Some(odoo_id) => {
        let cached = self.cache.find(odoo_id);
        if cached.is_none() {
          log::warn!("[sync] Odoo record {odoo_id} is not cached, updating with local fields only");
        }
        let payload = update_payload(cached.as_ref(), odoo_id, &profile.name, &profile_url);
        self.host.update_odoo_profile(payload).await?;
        log::info!("[sync] Updated Odoo record {odoo_id}");
      }
      None if allow_create => {
        let record = NewOdooProfile {
          id: 0,
          name: profile.name.clone(),
          profile_url: profile_url.clone(),
          user_agent: profile.user_agent.clone().unwrap_or_default(),
          local_path: format!("profiles/{}", slugify(&profile.name)),
        };
        match self.host.create_odoo_profile(&record).await? {
          Some(odoo_id) => {
            log::info!("[sync] Created Odoo record {odoo_id} for {}", profile.id);
            self
              .host
              .update_profile_odoo_id(&profile.id, &odoo_id)
              .await?;
          }
          None => {
            log::warn!("[sync] Odoo did not return an id for {}", profile.id);
          }
        }
      }
      None => {
        log::info!(
          "[sync] {} has no Odoo record and creation is not allowed, skipping registration",
          profile.id
        );
      }
    }

    Ok(())
  }

  /// Bring a cloud-only profile onto this machine. `locals` is the current
  /// local list, used to detect a copy that is already linked.
  pub async fn import_cloud(&self, cloud: &CloudProfile, locals: &[LocalProfile]) -> SyncOutcome {
    let odoo_id = strip_cloud_prefix(&cloud.odoo_id);
    let toast_id = format!("import-{}", cloud.name);
    self
      .notifier
      .loading(&toast_id, format!("Importing \"{}\"...", cloud.name));

    if let Some(existing) = locals.iter().find(|p| p.remote_id() == Some(odoo_id)) {
      self.notifier.dismiss(&toast_id);
      log::info!(
        "[sync] Odoo record {odoo_id} is already linked to {}",
        existing.id
      );
      return match cloud.profile_url.as_deref().filter(|url| !url.is_empty()) {
        Some(url) => self.download(&existing.id, url, &cloud.name).await,
        None => {
          let message = format!("\"{}\" has no data to download", cloud.name);
          self.notifier.error(message.clone());
          SyncOutcome::Failed(message)
        }
      };
    }

    let entry = import_entry(cloud);
    match self.host.import_zsmkt_profiles_batch(&[entry]).await {
      Ok(_) => {
        self.cache.refresh().await;
        self.notifier.dismiss(&toast_id);
        self
          .notifier
          .success(format!("Imported \"{}\"", cloud.name));
        SyncOutcome::Completed
      }
      Err(e) => {
        log::error!("[sync] Import of Odoo record {odoo_id} failed: {e}");
        self.notifier.dismiss(&toast_id);
        self.notifier.error(format!("Import failed: {e}"));
        SyncOutcome::Failed(e.to_string())
      }
    }
  }
}
