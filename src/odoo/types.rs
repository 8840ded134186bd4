use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Prefix of the synthetic row id given to profiles that only exist in Odoo.
pub const CLOUD_ID_PREFIX: &str = "cloud-";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ProxyPort {
  Number(u32),
  Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OdooProxy {
  #[serde(default, deserialize_with = "text")]
  pub giaothuc: String, // protocol
  #[serde(default, deserialize_with = "text")]
  pub ip: String,
  pub port: ProxyPort,
  #[serde(
    default,
    deserialize_with = "opt_text",
    skip_serializing_if = "Option::is_none"
  )]
  pub tendangnhap: Option<String>, // username
  #[serde(
    default,
    deserialize_with = "opt_text",
    skip_serializing_if = "Option::is_none"
  )]
  pub matkhau: Option<String>, // password
}

/// A profile record as held by Odoo, normalized once when it crosses the
/// command boundary. Odoo encodes empty values as `false`, and the API has
/// used both camelCase and snake_case spellings over time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "Value")]
pub struct RemoteProfile {
  pub id: String,
  pub name: String,
  #[serde(rename = "userAgent", skip_serializing_if = "Option::is_none")]
  pub user_agent: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timezone: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub language: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub platform: Option<String>,
  pub proxy_ids: Vec<OdooProxy>,
  #[serde(rename = "profileUrl", skip_serializing_if = "Option::is_none")]
  pub profile_url: Option<String>,
  #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
  pub created_at: Option<String>,
  #[serde(rename = "localPath", skip_serializing_if = "Option::is_none")]
  pub local_path: Option<String>,
  /// Fields this crate never reads.
  #[serde(flatten)]
  pub extra: Map<String, Value>,
  /// The record exactly as Odoo sent it. Updates are built from this so
  /// keys and proxy entries we do not model survive the round trip.
  #[serde(skip)]
  pub raw: Map<String, Value>,
}

impl RemoteProfile {
  pub fn numeric_id(&self) -> Option<i64> {
    self.id.trim().parse().ok()
  }

  /// The active proxy is the first one Odoo lists.
  pub fn active_proxy(&self) -> Option<&OdooProxy> {
    self.proxy_ids.first()
  }

  /// Creation time in unix seconds; 0 when absent or unparseable.
  pub fn created_at_secs(&self) -> i64 {
    self
      .created_at
      .as_deref()
      .map(parse_timestamp)
      .unwrap_or(0)
  }
}

impl TryFrom<Value> for RemoteProfile {
  type Error = String;

  fn try_from(value: Value) -> Result<Self, Self::Error> {
    let Value::Object(mut map) = value else {
      return Err("remote profile is not an object".to_string());
    };
    let raw = map.clone();

    let id = map
      .remove("id")
      .and_then(id_from_value)
      .ok_or_else(|| "remote profile has no id".to_string())?;

    let name = take_text(&mut map, &["name"]).unwrap_or_default();
    let user_agent = take_text(&mut map, &["userAgent", "user_agent"]);
    let timezone = take_text(&mut map, &["timezone"]);
    let language = take_text(&mut map, &["language"]);
    let platform = take_text(&mut map, &["platform"]);
    let profile_url = take_text(&mut map, &["profileUrl", "profile_url"]);
    let created_at = take_text(&mut map, &["createdAt", "create_date"]);
    let local_path = take_text(&mut map, &["localPath", "local_path"]);

    let proxy_ids = match map.remove("proxy_ids") {
      Some(Value::Array(items)) => items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<OdooProxy>(item) {
          Ok(proxy) => Some(proxy),
          Err(e) => {
            log::warn!("[odoo] Skipping malformed proxy on profile {id}: {e}");
            None
          }
        })
        .collect(),
      _ => Vec::new(),
    };

    Ok(Self {
      id,
      name,
      user_agent,
      timezone,
      language,
      platform,
      proxy_ids,
      profile_url,
      created_at,
      local_path,
      extra: map,
      raw,
    })
  }
}

/// Decode the `list_odoo_profiles` response. Items that fail validation are
/// skipped so one bad record never hides the rest.
pub fn decode_remote_list(value: Value) -> Result<Vec<RemoteProfile>, String> {
  let items = match value {
    Value::Object(mut map) => match map.remove("items") {
      Some(Value::Array(items)) => items,
      Some(Value::Null) | None => Vec::new(),
      Some(other) => return Err(format!("items is not a list: {other}")),
    },
    Value::Array(items) => items,
    Value::Null => Vec::new(),
    other => return Err(format!("unexpected list response: {other}")),
  };

  Ok(
    items
      .into_iter()
      .filter_map(|item| match RemoteProfile::try_from(item) {
        Ok(profile) => Some(profile),
        Err(e) => {
          log::warn!("[odoo] Skipping remote profile: {e}");
          None
        }
      })
      .collect(),
  )
}

/// Remote id from a number or a non-empty string. `"null"` counts as absent.
pub fn id_from_value(value: Value) -> Option<String> {
  match value {
    Value::Number(n) => Some(n.to_string()),
    Value::String(s) => {
      let trimmed = s.trim();
      if trimmed.is_empty() || trimmed == "null" {
        None
      } else {
        Some(trimmed.to_string())
      }
    }
    _ => None,
  }
}

/// Strip the synthetic `cloud-` prefix to recover the Odoo id.
pub fn strip_cloud_prefix(id: &str) -> &str {
  id.strip_prefix(CLOUD_ID_PREFIX).unwrap_or(id)
}

/// Parse an Odoo timestamp into unix seconds. Accepts RFC 3339, Odoo's
/// `YYYY-MM-DD HH:MM:SS` (UTC) and bare dates. Anything else is 0.
pub fn parse_timestamp(raw: &str) -> i64 {
  let raw = raw.trim();

  if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
    return dt.timestamp();
  }

  for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
      return naive.and_utc().timestamp();
    }
  }

  if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
    if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
      return midnight.and_utc().timestamp();
    }
  }

  log::debug!("[odoo] Failed to parse date: {raw}");
  0
}

fn take_text(map: &mut Map<String, Value>, keys: &[&str]) -> Option<String> {
  let mut found = None;
  for key in keys {
    if let Some(value) = map.remove(*key) {
      if found.is_none() {
        found = text_from_value(value);
      }
    }
  }
  found
}

fn text_from_value(value: Value) -> Option<String> {
  match value {
    Value::String(s) if !s.is_empty() => Some(s),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(opt_text(deserializer)?.unwrap_or_default())
}

fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<Value>::deserialize(deserializer)?;
  Ok(value.and_then(text_from_value))
}

/// Payload for `create_odoo_profile`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewOdooProfile {
  pub id: i64,
  pub name: String,
  #[serde(rename = "profileUrl")]
  pub profile_url: String,
  #[serde(rename = "userAgent")]
  pub user_agent: String,
  #[serde(rename = "localPath")]
  pub local_path: String,
}

/// One entry of the `import_zsmkt_profiles_batch` command.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ZsProfile {
  pub id: String,
  pub name: String,
  pub fingerprint: ZsFingerprint,
  pub status: String,
  pub version: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub proxy: Option<ZsProxy>,
  #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
  pub created_at: Option<String>,
  #[serde(rename = "localPath")]
  pub local_path: String,
  #[serde(rename = "profileUrl", skip_serializing_if = "Option::is_none")]
  pub profile_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ZsFingerprint {
  #[serde(rename = "userAgent")]
  pub user_agent: String,
  pub timezone: String,
  pub language: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub platform: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ZsProxy {
  pub protocol: String,
  pub host: String,
  pub port: ProxyPort,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub username: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub password: Option<String>,
}

impl From<&OdooProxy> for ZsProxy {
  fn from(proxy: &OdooProxy) -> Self {
    Self {
      protocol: proxy.giaothuc.clone(),
      host: proxy.ip.clone(),
      port: proxy.port.clone(),
      username: proxy.tendangnhap.clone(),
      password: proxy.matkhau.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_decode_odoo_falsy_fields() {
    let profile: RemoteProfile = serde_json::from_value(json!({
      "id": 42,
      "name": "Shop A",
      "userAgent": false,
      "timezone": "Europe/Berlin",
      "proxy_ids": false,
      "profile_url": "https://s3.example.com/a.zip",
      "create_date": false,
      "partner_id": [3, "Lan"]
    }))
    .unwrap();

    assert_eq!(profile.id, "42");
    assert_eq!(profile.numeric_id(), Some(42));
    assert_eq!(profile.user_agent, None);
    assert_eq!(profile.timezone.as_deref(), Some("Europe/Berlin"));
    assert!(profile.proxy_ids.is_empty());
    assert_eq!(
      profile.profile_url.as_deref(),
      Some("https://s3.example.com/a.zip")
    );
    assert_eq!(profile.created_at, None);
    assert_eq!(profile.created_at_secs(), 0);
    assert_eq!(profile.extra.get("partner_id"), Some(&json!([3, "Lan"])));
  }

  #[test]
  fn test_camel_case_wins_over_snake_case() {
    let profile: RemoteProfile = serde_json::from_value(json!({
      "id": "7",
      "name": "x",
      "createdAt": "2024-01-01T00:00:00Z",
      "create_date": "2020-01-01 00:00:00",
      "profileUrl": "",
      "profile_url": "https://s3.example.com/b.zip"
    }))
    .unwrap();

    assert_eq!(profile.created_at_secs(), 1_704_067_200);
    assert_eq!(
      profile.profile_url.as_deref(),
      Some("https://s3.example.com/b.zip")
    );
    assert!(profile.extra.is_empty());
  }

  #[test]
  fn test_missing_id_is_rejected() {
    let result = serde_json::from_value::<RemoteProfile>(json!({"name": "orphan"}));
    assert!(result.is_err());
    let result = serde_json::from_value::<RemoteProfile>(json!({"id": "null"}));
    assert!(result.is_err());
  }

  #[test]
  fn test_decode_list_skips_bad_items() {
    let profiles = decode_remote_list(json!({
      "items": [
        {"id": 1, "name": "one"},
        {"name": "no id"},
        "garbage",
        {"id": "3", "name": "three"}
      ]
    }))
    .unwrap();

    let ids: Vec<&str> = profiles.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3"]);

    assert!(decode_remote_list(json!({})).unwrap().is_empty());
    assert!(decode_remote_list(json!({"items": 5})).is_err());
  }

  #[test]
  fn test_proxy_decoding() {
    let profile: RemoteProfile = serde_json::from_value(json!({
      "id": 5,
      "name": "p",
      "proxy_ids": [
        {"giaothuc": "socks5", "ip": "10.0.0.1", "port": 1080, "tendangnhap": "u", "matkhau": false},
        {"giaothuc": "http", "ip": "10.0.0.2", "port": "8080"},
        {"ip": "missing port"}
      ]
    }))
    .unwrap();

    assert_eq!(profile.proxy_ids.len(), 2);
    let active = profile.active_proxy().unwrap();
    assert_eq!(active.port, ProxyPort::Number(1080));
    assert_eq!(active.tendangnhap.as_deref(), Some("u"));
    assert_eq!(active.matkhau, None);
    assert_eq!(
      profile.proxy_ids[1].port,
      ProxyPort::Text("8080".to_string())
    );
  }

  #[test]
  fn test_parse_timestamp_formats() {
    assert_eq!(parse_timestamp("2024-01-01T00:00:00Z"), 1_704_067_200);
    assert_eq!(parse_timestamp("2024-01-01T07:00:00+07:00"), 1_704_067_200);
    assert_eq!(parse_timestamp("2024-01-01 00:00:00"), 1_704_067_200);
    assert_eq!(parse_timestamp("2024-01-01"), 1_704_067_200);
    assert_eq!(parse_timestamp("not-a-date"), 0);
    assert_eq!(parse_timestamp(""), 0);
  }

  #[test]
  fn test_serialize_uses_canonical_names() {
    let profile: RemoteProfile = serde_json::from_value(json!({
      "id": 9,
      "name": "n",
      "user_agent": "UA",
      "local_path": "profiles/n",
      "note_internal": "keep me"
    }))
    .unwrap();

    let value = serde_json::to_value(&profile).unwrap();
    assert_eq!(value["userAgent"], "UA");
    assert_eq!(value["localPath"], "profiles/n");
    assert_eq!(value["note_internal"], "keep me");
    assert!(value.get("user_agent").is_none());
  }

  #[test]
  fn test_raw_record_is_untouched() {
    let record = json!({
      "id": 12,
      "name": "p",
      "create_date": "2024-01-01 00:00:00",
      "proxy_ids": [
        {"id": 31, "name": "VN proxy", "giaothuc": "http", "ip": "1.2.3.4", "port": 8080},
        {"id": 32, "giaothuc": "socks5", "ip": "5.6.7.8", "port": false}
      ]
    });
    let profile: RemoteProfile = serde_json::from_value(record.clone()).unwrap();

    assert_eq!(profile.proxy_ids.len(), 1);
    assert_eq!(Value::Object(profile.raw.clone()), record);
    assert!(serde_json::to_value(&profile).unwrap().get("raw").is_none());
  }

  #[test]
  fn test_strip_cloud_prefix() {
    assert_eq!(strip_cloud_prefix("cloud-42"), "42");
    assert_eq!(strip_cloud_prefix("42"), "42");
  }
}
