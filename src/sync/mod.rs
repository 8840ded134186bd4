pub mod controller;
pub mod guard;
pub mod slug;

pub use controller::{
  import_entry, progress_message, update_payload, SyncController, SyncOutcome, CLOUD_LOCAL_PATH,
  DEFAULT_LANGUAGE, DEFAULT_TIMEZONE,
};
pub use guard::{InFlightGuard, InFlightRegistry, SyncState};
pub use slug::slugify;
