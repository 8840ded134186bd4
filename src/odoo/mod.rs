pub mod types;

pub use types::{
  decode_remote_list, parse_timestamp, strip_cloud_prefix, NewOdooProfile, OdooProxy, ProxyPort,
  RemoteProfile, ZsFingerprint, ZsProfile, ZsProxy, CLOUD_ID_PREFIX,
};
