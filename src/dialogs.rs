use serde_json::Value;

use crate::error::ImportInputError;
use crate::profile::merge::MergedProfile;
use crate::profile::types::LocalProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteChoice {
  #[default]
  LocalOnly,
  LocalAndServer,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateGroupForm {
  pub name: String,
  pub error: Option<String>,
}

impl CreateGroupForm {
  /// Trimmed name, or None when there is nothing to submit.
  pub fn submittable_name(&self) -> Option<&str> {
    let name = self.name.trim();
    (!name.is_empty()).then_some(name)
  }
}

/// The one dialog currently shown by the home view. Opening a dialog
/// replaces whatever was open.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DialogState {
  #[default]
  Closed,
  CreateProfile,
  Settings,
  OdooImport,
  ZsmktImport,
  GroupManagement,
  CreateGroup(CreateGroupForm),
  GroupAssignment {
    profile_ids: Vec<String>,
  },
  CamoufoxConfig {
    profile: LocalProfile,
  },
  DeleteProfile {
    profile: MergedProfile,
    choice: DeleteChoice,
  },
  BulkDelete {
    profile_ids: Vec<String>,
  },
}

impl DialogState {
  /// The delete choice always starts at local-only.
  pub fn delete(profile: MergedProfile) -> Self {
    DialogState::DeleteProfile {
      profile,
      choice: DeleteChoice::LocalOnly,
    }
  }

  pub fn create_group() -> Self {
    DialogState::CreateGroup(CreateGroupForm::default())
  }

  pub fn is_open(&self) -> bool {
    !matches!(self, DialogState::Closed)
  }

  /// Server deletion is only offered for profiles that exist in Odoo.
  pub fn offers_server_delete(&self) -> bool {
    match self {
      DialogState::DeleteProfile { profile, .. } => profile.odoo_id().is_some(),
      _ => false,
    }
  }

  /// Returns false when the choice does not apply to the open dialog.
  pub fn set_delete_choice(&mut self, new_choice: DeleteChoice) -> bool {
    let offered = self.offers_server_delete();
    match self {
      DialogState::DeleteProfile { choice, .. } => {
        if new_choice == DeleteChoice::LocalAndServer && !offered {
          return false;
        }
        *choice = new_choice;
        true
      }
      _ => false,
    }
  }
}

/// Read profiles from pasted zs-mkt data. Accepts a bare array or the
/// persisted store shape `{"state": {"profiles": [...]}}`.
pub fn parse_zsmkt_profiles(input: &str) -> Result<Vec<Value>, ImportInputError> {
  let input = input.trim();
  if input.is_empty() {
    return Err(ImportInputError::Empty);
  }

  let parsed: Value =
    serde_json::from_str(input).map_err(|e| ImportInputError::InvalidJson(e.to_string()))?;

  let profiles = match parsed {
    Value::Array(profiles) => profiles,
    Value::Object(mut map) => match map.remove("state") {
      Some(Value::Object(mut state)) => match state.remove("profiles") {
        Some(Value::Array(profiles)) => profiles,
        _ => Vec::new(),
      },
      _ => Vec::new(),
    },
    _ => Vec::new(),
  };

  if profiles.is_empty() {
    return Err(ImportInputError::NoProfilesFound);
  }
  Ok(profiles)
}
