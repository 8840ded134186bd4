use std::collections::{HashMap, HashSet};

use crate::odoo::{OdooProxy, RemoteProfile, CLOUD_ID_PREFIX};

use super::types::{BrowserKind, LocalProfile};

pub const CLOUD_STATUS: &str = "cloud";

/// A local profile paired with its Odoo record. `profile` already carries the
/// effective values: remote url, timestamp and user agent win when present.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedProfile {
  pub profile: LocalProfile,
  pub odoo_proxy: Option<OdooProxy>,
}

/// An Odoo record with no local counterpart yet.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudProfile {
  pub id: String,
  pub odoo_id: String,
  pub name: String,
  pub browser: BrowserKind,
  pub version: String,
  pub user_agent: Option<String>,
  pub profile_url: Option<String>,
  pub created_at: i64,
  pub odoo_proxy: Option<OdooProxy>,
  pub remote: RemoteProfile,
}

impl CloudProfile {
  pub fn from_remote(remote: &RemoteProfile) -> Self {
    let browser = BrowserKind::infer_from_user_agent(remote.user_agent.as_deref());
    Self {
      id: format!("{CLOUD_ID_PREFIX}{}", remote.id),
      odoo_id: remote.id.clone(),
      name: remote.name.clone(),
      version: browser.default_version().to_string(),
      browser,
      user_agent: remote.user_agent.clone(),
      profile_url: remote.profile_url.clone(),
      created_at: remote.created_at_secs(),
      odoo_proxy: remote.active_proxy().cloned(),
      remote: remote.clone(),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MergedProfile {
  Linked(LinkedProfile),
  CloudOnly(CloudProfile),
  LocalOnly(LocalProfile),
}

impl MergedProfile {
  pub fn id(&self) -> &str {
    match self {
      MergedProfile::Linked(linked) => &linked.profile.id,
      MergedProfile::CloudOnly(cloud) => &cloud.id,
      MergedProfile::LocalOnly(local) => &local.id,
    }
  }

  pub fn name(&self) -> &str {
    match self {
      MergedProfile::Linked(linked) => &linked.profile.name,
      MergedProfile::CloudOnly(cloud) => &cloud.name,
      MergedProfile::LocalOnly(local) => &local.name,
    }
  }

  pub fn browser(&self) -> &BrowserKind {
    match self {
      MergedProfile::Linked(linked) => &linked.profile.browser,
      MergedProfile::CloudOnly(cloud) => &cloud.browser,
      MergedProfile::LocalOnly(local) => &local.browser,
    }
  }

  pub fn version(&self) -> &str {
    match self {
      MergedProfile::Linked(linked) => &linked.profile.version,
      MergedProfile::CloudOnly(cloud) => &cloud.version,
      MergedProfile::LocalOnly(local) => &local.version,
    }
  }

  pub fn odoo_id(&self) -> Option<&str> {
    match self {
      MergedProfile::Linked(linked) => linked.profile.remote_id(),
      MergedProfile::CloudOnly(cloud) => Some(&cloud.odoo_id),
      MergedProfile::LocalOnly(_) => None,
    }
  }

  pub fn group_id(&self) -> Option<&str> {
    self.local().and_then(|local| local.group_id.as_deref())
  }

  pub fn note(&self) -> Option<&str> {
    self.local().and_then(|local| local.note.as_deref())
  }

  pub fn profile_url(&self) -> Option<&str> {
    let url = match self {
      MergedProfile::CloudOnly(cloud) => cloud.profile_url.as_deref(),
      _ => self.local().and_then(|local| local.profile_url.as_deref()),
    };
    url.filter(|url| !url.trim().is_empty())
  }

  pub fn user_agent(&self) -> Option<&str> {
    match self {
      MergedProfile::CloudOnly(cloud) => cloud.user_agent.as_deref(),
      _ => self.local().and_then(|local| local.user_agent.as_deref()),
    }
  }

  pub fn created_at(&self) -> i64 {
    match self {
      MergedProfile::Linked(linked) => linked.profile.created_at,
      MergedProfile::CloudOnly(cloud) => cloud.created_at,
      MergedProfile::LocalOnly(local) => local.created_at,
    }
  }

  pub fn odoo_proxy(&self) -> Option<&OdooProxy> {
    match self {
      MergedProfile::Linked(linked) => linked.odoo_proxy.as_ref(),
      MergedProfile::CloudOnly(cloud) => cloud.odoo_proxy.as_ref(),
      MergedProfile::LocalOnly(_) => None,
    }
  }

  pub fn is_cloud_only(&self) -> bool {
    matches!(self, MergedProfile::CloudOnly(_))
  }

  /// Has both a local copy and an Odoo record.
  pub fn is_synced(&self) -> bool {
    matches!(self, MergedProfile::Linked(_))
  }

  pub fn status(&self) -> Option<&'static str> {
    self.is_cloud_only().then_some(CLOUD_STATUS)
  }

  /// The host-side record, absent for cloud-only rows.
  pub fn local(&self) -> Option<&LocalProfile> {
    match self {
      MergedProfile::Linked(linked) => Some(&linked.profile),
      MergedProfile::CloudOnly(_) => None,
      MergedProfile::LocalOnly(local) => Some(local),
    }
  }
}

fn link(local: &LocalProfile, remote: &RemoteProfile) -> LinkedProfile {
  let mut profile = local.clone();

  if let Some(url) = remote.profile_url.as_deref().filter(|url| !url.is_empty()) {
    profile.profile_url = Some(url.to_string());
  }

  let remote_created = remote.created_at_secs();
  if remote_created != 0 {
    profile.created_at = remote_created;
  }

  if let Some(user_agent) = &remote.user_agent {
    profile.user_agent = Some(user_agent.clone());
  }

  LinkedProfile {
    profile,
    odoo_proxy: remote.active_proxy().cloned(),
  }
}

/// Reconcile host profiles with Odoo records. Remote order comes first, then
/// local profiles that were never synced, in their original order.
pub fn merge_profiles(locals: &[LocalProfile], remotes: &[RemoteProfile]) -> Vec<MergedProfile> {
  // Later locals overwrite earlier ones claiming the same Odoo id
  let mut by_remote_id: HashMap<&str, &LocalProfile> = HashMap::new();
  for local in locals {
    if let Some(remote_id) = local.remote_id() {
      by_remote_id.insert(remote_id, local);
    }
  }

  let mut merged = Vec::with_capacity(remotes.len() + locals.len());

  for remote in remotes {
    match by_remote_id.get(remote.id.as_str()) {
      Some(local) => merged.push(MergedProfile::Linked(link(local, remote))),
      None => merged.push(MergedProfile::CloudOnly(CloudProfile::from_remote(remote))),
    }
  }

  merged.extend(
    locals
      .iter()
      .filter(|local| local.remote_id().is_none())
      .cloned()
      .map(MergedProfile::LocalOnly),
  );

  merged
}

/// Local profiles pointing at an Odoo record that no longer exists. They are
/// not part of the merged list.
pub fn orphaned_profiles<'a>(
  locals: &'a [LocalProfile],
  remotes: &[RemoteProfile],
) -> Vec<&'a LocalProfile> {
  let remote_ids: HashSet<&str> = remotes.iter().map(|remote| remote.id.as_str()).collect();
  locals
    .iter()
    .filter(|local| {
      local
        .remote_id()
        .is_some_and(|remote_id| !remote_ids.contains(remote_id))
    })
    .collect()
}
