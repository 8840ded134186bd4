use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::odoo::types::id_from_value;

pub const DEFAULT_CAMOUFOX_VERSION: &str = "v135.0.1-beta.24";
pub const DEFAULT_WAYFERN_VERSION: &str = "v132.0.6834.83";

/// Selector value meaning "profiles without a group". Never a real group id.
pub const DEFAULT_GROUP: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BrowserKind {
  Camoufox,
  Wayfern,
  /// Legacy label for camoufox profiles.
  Firefox,
  /// Legacy label for wayfern profiles.
  Chromium,
  Other(String),
}

impl BrowserKind {
  pub fn as_str(&self) -> &str {
    match self {
      BrowserKind::Camoufox => "camoufox",
      BrowserKind::Wayfern => "wayfern",
      BrowserKind::Firefox => "firefox",
      BrowserKind::Chromium => "chromium",
      BrowserKind::Other(label) => label,
    }
  }

  pub fn is_camoufox_family(&self) -> bool {
    matches!(self, BrowserKind::Camoufox | BrowserKind::Firefox)
  }

  pub fn is_wayfern_family(&self) -> bool {
    matches!(self, BrowserKind::Wayfern | BrowserKind::Chromium)
  }

  pub fn default_version(&self) -> &'static str {
    if self.is_wayfern_family() {
      DEFAULT_WAYFERN_VERSION
    } else {
      DEFAULT_CAMOUFOX_VERSION
    }
  }

  /// Guess the engine of a remote profile from its user agent. Firefox
  /// wins over Chrome, and anything unrecognized is treated as camoufox.
  pub fn infer_from_user_agent(user_agent: Option<&str>) -> Self {
    let ua = user_agent.unwrap_or_default().to_lowercase();
    if ua.contains("firefox") {
      BrowserKind::Camoufox
    } else if ua.contains("chrome") || ua.contains("chromium") {
      BrowserKind::Wayfern
    } else {
      BrowserKind::Camoufox
    }
  }
}

impl From<String> for BrowserKind {
  fn from(label: String) -> Self {
    match label.as_str() {
      "camoufox" => BrowserKind::Camoufox,
      "wayfern" => BrowserKind::Wayfern,
      "firefox" => BrowserKind::Firefox,
      "chromium" => BrowserKind::Chromium,
      _ => BrowserKind::Other(label),
    }
  }
}

impl From<&str> for BrowserKind {
  fn from(label: &str) -> Self {
    BrowserKind::from(label.to_string())
  }
}

impl From<BrowserKind> for String {
  fn from(kind: BrowserKind) -> Self {
    match kind {
      BrowserKind::Other(label) => label,
      other => other.as_str().to_string(),
    }
  }
}

impl std::fmt::Display for BrowserKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A profile as stored by the host. Fields this crate does not model are
/// carried in `extra` so the record can be handed back to launch/kill as is.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LocalProfile {
  pub id: String,
  pub name: String,
  pub browser: BrowserKind,
  #[serde(default)]
  pub version: String,
  #[serde(default)]
  pub group_id: Option<String>, // Reference to profile group
  #[serde(default, deserialize_with = "deserialize_odoo_id")]
  pub odoo_id: Option<String>, // Id of the linked Odoo record
  #[serde(default)]
  pub profile_url: Option<String>, // S3 object of the last upload
  #[serde(default)]
  pub user_agent: Option<String>,
  #[serde(default, deserialize_with = "unix_secs")]
  pub created_at: i64,
  #[serde(default)]
  pub note: Option<String>, // User note
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl LocalProfile {
  pub fn new(id: impl Into<String>, name: impl Into<String>, browser: BrowserKind) -> Self {
    let version = browser.default_version().to_string();
    Self {
      id: id.into(),
      name: name.into(),
      browser,
      version,
      group_id: None,
      odoo_id: None,
      profile_url: None,
      user_agent: None,
      created_at: 0,
      note: None,
      extra: Map::new(),
    }
  }

  /// The linked Odoo id, if it is a usable one.
  pub fn remote_id(&self) -> Option<&str> {
    self.odoo_id.as_deref().filter(|id| is_valid_remote_id(id))
  }

  pub fn has_profile_url(&self) -> bool {
    self
      .profile_url
      .as_deref()
      .is_some_and(|url| !url.trim().is_empty())
  }
}

/// Empty, `"null"` and `"0"` are placeholders left behind by older hosts.
pub fn is_valid_remote_id(id: &str) -> bool {
  let id = id.trim();
  !id.is_empty() && id != "null" && id != "0"
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ProfileGroup {
  pub id: String,
  pub name: String,
}

fn deserialize_odoo_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<Value>::deserialize(deserializer)?;
  Ok(
    value
      .and_then(id_from_value)
      .filter(|id| is_valid_remote_id(id)),
  )
}

fn unix_secs<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<Value>::deserialize(deserializer)?;
  Ok(match value {
    Some(Value::Number(n)) => n
      .as_i64()
      .or_else(|| n.as_f64().map(|secs| secs as i64))
      .unwrap_or(0),
    _ => 0,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_browser_kind_serde() {
    let kind: BrowserKind = serde_json::from_value(json!("wayfern")).unwrap();
    assert_eq!(kind, BrowserKind::Wayfern);
    let kind: BrowserKind = serde_json::from_value(json!("brave")).unwrap();
    assert_eq!(kind, BrowserKind::Other("brave".to_string()));
    assert_eq!(serde_json::to_value(&kind).unwrap(), json!("brave"));
    assert_eq!(
      serde_json::to_value(BrowserKind::Chromium).unwrap(),
      json!("chromium")
    );
  }

  #[test]
  fn test_infer_from_user_agent() {
    let firefox = "Mozilla/5.0 (Windows NT 10.0; rv:135.0) Gecko/20100101 Firefox/135.0";
    let chrome =
      "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0 Safari/537.36";

    assert_eq!(
      BrowserKind::infer_from_user_agent(Some(firefox)),
      BrowserKind::Camoufox
    );
    assert_eq!(
      BrowserKind::infer_from_user_agent(Some(chrome)),
      BrowserKind::Wayfern
    );
    assert_eq!(
      BrowserKind::infer_from_user_agent(Some("CHROMIUM build")),
      BrowserKind::Wayfern
    );
    assert_eq!(
      BrowserKind::infer_from_user_agent(Some("curl/8.0")),
      BrowserKind::Camoufox
    );
    assert_eq!(
      BrowserKind::infer_from_user_agent(None),
      BrowserKind::Camoufox
    );
  }

  #[test]
  fn test_default_versions() {
    assert_eq!(BrowserKind::Camoufox.default_version(), "v135.0.1-beta.24");
    assert_eq!(BrowserKind::Chromium.default_version(), "v132.0.6834.83");
  }

  #[test]
  fn test_local_profile_odoo_id_normalization() {
    let numeric: LocalProfile = serde_json::from_value(json!({
      "id": "a", "name": "A", "browser": "camoufox", "odoo_id": 12
    }))
    .unwrap();
    assert_eq!(numeric.remote_id(), Some("12"));

    for placeholder in [json!("null"), json!(""), json!(null), json!(0)] {
      let profile: LocalProfile = serde_json::from_value(json!({
        "id": "b", "name": "B", "browser": "wayfern", "odoo_id": placeholder
      }))
      .unwrap();
      assert_eq!(profile.odoo_id, None);
    }
  }

  #[test]
  fn test_local_profile_keeps_unknown_fields() {
    let raw = json!({
      "id": "c",
      "name": "C",
      "browser": "firefox",
      "version": "v1",
      "created_at": 1700000000,
      "process_id": 4242,
      "camoufox_config": {"screen_max_width": 1920}
    });
    let profile: LocalProfile = serde_json::from_value(raw).unwrap();
    assert_eq!(profile.created_at, 1_700_000_000);
    assert_eq!(profile.extra.get("process_id"), Some(&json!(4242)));

    let back = serde_json::to_value(&profile).unwrap();
    assert_eq!(back["camoufox_config"]["screen_max_width"], 1920);
    assert_eq!(back["browser"], "firefox");
  }

  #[test]
  fn test_has_profile_url() {
    let mut profile = LocalProfile::new("d", "D", BrowserKind::Camoufox);
    assert!(!profile.has_profile_url());
    profile.profile_url = Some("  ".to_string());
    assert!(!profile.has_profile_url());
    profile.profile_url = Some("https://s3.example.com/d.zip".to_string());
    assert!(profile.has_profile_url());
  }
}
