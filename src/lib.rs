pub mod app_dirs;
pub mod cache;
pub mod dialogs;
pub mod error;
pub mod events;
pub mod home;
pub mod host;
pub mod notify;
pub mod odoo;
pub mod profile;
pub mod settings_manager;
pub mod sync;

pub use cache::RemoteProfileCache;
pub use error::{EventError, HostError, HostResult, ImportInputError, SettingsError};
pub use events::{EventBus, EventEmitter, EventSource, ScopedListener};
pub use home::{HomeOptions, HomeView};
pub use host::{CommandInvoker, CreateProfileRequest, HostClient};
pub use notify::{LogNotifier, Notifier, Toast, ToastAction};
pub use settings_manager::{FoxiaSettings, OdooSession, SessionHandle, SettingsManager};
pub use sync::{SyncController, SyncOutcome, SyncState};
