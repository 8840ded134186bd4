use serde::Serialize;
use std::str::FromStr;

use super::merge::MergedProfile;
use super::types::DEFAULT_GROUP;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserFilter {
  #[default]
  All,
  Cloud,
  Camoufox,
  Wayfern,
}

impl FromStr for BrowserFilter {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "all" => Ok(BrowserFilter::All),
      "cloud" => Ok(BrowserFilter::Cloud),
      "camoufox" => Ok(BrowserFilter::Camoufox),
      "wayfern" => Ok(BrowserFilter::Wayfern),
      other => Err(format!("Unknown browser filter: {other}")),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterQuery {
  pub group: String,
  pub browser: BrowserFilter,
  pub search: String,
}

impl Default for FilterQuery {
  fn default() -> Self {
    Self {
      group: DEFAULT_GROUP.to_string(),
      browser: BrowserFilter::All,
      search: String::new(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BrowserCounts {
  pub all: usize,
  pub camoufox: usize,
  pub wayfern: usize,
  pub cloud: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileView {
  pub rows: Vec<MergedProfile>,
  pub counts: BrowserCounts,
}

/// Counts over the whole merged list, ignoring the group and browser filter.
pub fn count_browsers(merged: &[MergedProfile]) -> BrowserCounts {
  let mut counts = BrowserCounts {
    all: merged.len(),
    ..Default::default()
  };

  for profile in merged {
    if profile.is_cloud_only() {
      counts.cloud += 1;
    } else if profile.browser().is_camoufox_family() {
      counts.camoufox += 1;
    } else if profile.browser().is_wayfern_family() {
      counts.wayfern += 1;
    }
  }

  counts
}

pub fn matches_group(profile: &MergedProfile, selector: &str) -> bool {
  if selector.is_empty() || selector == DEFAULT_GROUP {
    profile.group_id().is_none()
  } else {
    profile.group_id() == Some(selector)
  }
}

pub fn matches_browser(profile: &MergedProfile, filter: BrowserFilter) -> bool {
  match filter {
    BrowserFilter::All => true,
    BrowserFilter::Cloud => profile.is_cloud_only(),
    BrowserFilter::Camoufox => !profile.is_cloud_only() && profile.browser().is_camoufox_family(),
    BrowserFilter::Wayfern => !profile.is_cloud_only() && profile.browser().is_wayfern_family(),
  }
}

/// `needle` must already be trimmed and lowercased.
fn matches_search(profile: &MergedProfile, needle: &str) -> bool {
  profile.name().to_lowercase().contains(needle)
    || profile
      .note()
      .is_some_and(|note| note.to_lowercase().contains(needle))
}

/// Reads the leading integer of `raw`, so `"12abc"` is 12. No digits is 0.
fn leading_int(raw: &str) -> i64 {
  let raw = raw.trim_start();
  let (negative, digits) = match raw.as_bytes().first() {
    Some(b'-') => (true, &raw[1..]),
    Some(b'+') => (false, &raw[1..]),
    _ => (false, raw),
  };
  let end = digits
    .find(|c: char| !c.is_ascii_digit())
    .unwrap_or(digits.len());
  let value = digits[..end].parse::<i64>().unwrap_or(0);
  if negative { -value } else { value }
}

fn sort_key(profile: &MergedProfile) -> (i64, i64) {
  let odoo_id = profile.odoo_id().map(leading_int).unwrap_or(0);
  (odoo_id, profile.created_at())
}

/// Newest Odoo id first, then newest creation time. Stable, so full ties
/// keep merge order.
pub fn sort_rows(rows: &mut [&MergedProfile]) {
  rows.sort_by(|a, b| sort_key(b).cmp(&sort_key(a)));
}

pub fn visible_rows<'a>(merged: &'a [MergedProfile], query: &FilterQuery) -> Vec<&'a MergedProfile> {
  let needle = query.search.trim().to_lowercase();

  let mut rows: Vec<&MergedProfile> = merged
    .iter()
    .filter(|profile| matches_group(profile, &query.group))
    .filter(|profile| matches_browser(profile, query.browser))
    .filter(|profile| needle.is_empty() || matches_search(profile, &needle))
    .collect();

  sort_rows(&mut rows);
  rows
}

pub fn build_view(merged: &[MergedProfile], query: &FilterQuery) -> ProfileView {
  ProfileView {
    rows: visible_rows(merged, query).into_iter().cloned().collect(),
    counts: count_browsers(merged),
  }
}
