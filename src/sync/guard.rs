use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
  Idle,
  Uploading,
  Downloading,
}

#[derive(Debug, Clone)]
struct InFlight {
  state: SyncState,
  profile_name: String,
}

/// Profiles with a transfer running, keyed by local profile id. A profile
/// has at most one transfer at a time.
#[derive(Clone, Default)]
pub struct InFlightRegistry {
  profiles: Arc<Mutex<HashMap<String, InFlight>>>,
}

impl InFlightRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<String, InFlight>> {
    self.profiles.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Check and claim under one lock. None when the profile is busy.
  pub fn try_claim(
    &self,
    profile_id: &str,
    profile_name: &str,
    state: SyncState,
  ) -> Option<InFlightGuard> {
    let mut profiles = self.lock();
    if profiles.contains_key(profile_id) {
      return None;
    }
    profiles.insert(
      profile_id.to_string(),
      InFlight {
        state,
        profile_name: profile_name.to_string(),
      },
    );

    Some(InFlightGuard {
      registry: self.clone(),
      profile_id: profile_id.to_string(),
    })
  }

  pub fn state(&self, profile_id: &str) -> SyncState {
    self
      .lock()
      .get(profile_id)
      .map_or(SyncState::Idle, |entry| entry.state)
  }

  /// Progress events only carry the profile name.
  pub fn is_downloading_name(&self, profile_name: &str) -> bool {
    self
      .lock()
      .values()
      .any(|entry| entry.state == SyncState::Downloading && entry.profile_name == profile_name)
  }

  pub fn active_count(&self) -> usize {
    self.lock().len()
  }

  fn release(&self, profile_id: &str) {
    self.lock().remove(profile_id);
  }
}

/// Releases the claim when dropped, including during unwinding.
pub struct InFlightGuard {
  registry: InFlightRegistry,
  profile_id: String,
}

impl Drop for InFlightGuard {
  fn drop(&mut self) {
    self.registry.release(&self.profile_id);
  }
}
