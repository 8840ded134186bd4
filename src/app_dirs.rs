use directories::BaseDirs;
use std::path::PathBuf;
use std::sync::OnceLock;

static BASE_DIRS: OnceLock<Option<BaseDirs>> = OnceLock::new();

fn base_dirs() -> Option<&'static BaseDirs> {
  BASE_DIRS.get_or_init(BaseDirs::new).as_ref()
}

pub fn app_name() -> &'static str {
  if cfg!(debug_assertions) {
    "FoxiaDev"
  } else {
    "Foxia"
  }
}

pub fn data_dir() -> PathBuf {
  #[cfg(test)]
  {
    if let Some(dir) = TEST_DATA_DIR.with(|cell| cell.borrow().clone()) {
      return dir;
    }
  }

  if let Ok(dir) = std::env::var("FOXIA_DATA_DIR") {
    return PathBuf::from(dir);
  }

  match base_dirs() {
    Some(dirs) => dirs.data_local_dir().join(app_name()),
    None => PathBuf::from(".").join(app_name()),
  }
}

pub fn settings_dir() -> PathBuf {
  data_dir().join("settings")
}

#[cfg(test)]
thread_local! {
  static TEST_DATA_DIR: std::cell::RefCell<Option<PathBuf>> = const { std::cell::RefCell::new(None) };
}

#[cfg(test)]
pub struct TestDirGuard;

#[cfg(test)]
impl Drop for TestDirGuard {
  fn drop(&mut self) {
    TEST_DATA_DIR.with(|cell| *cell.borrow_mut() = None);
  }
}

#[cfg(test)]
pub fn set_test_data_dir(dir: PathBuf) -> TestDirGuard {
  TEST_DATA_DIR.with(|cell| *cell.borrow_mut() = Some(dir));
  TestDirGuard
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  fn test_app_name() {
    let name = app_name();
    assert!(
      name == "Foxia" || name == "FoxiaDev",
      "app_name should be Foxia or FoxiaDev, got: {name}"
    );
  }

  #[test]
  fn test_subdirectory_helpers() {
    assert!(settings_dir().ends_with("settings"));
  }

  #[test]
  #[serial]
  fn test_guard_cleanup() {
    let original = data_dir();

    {
      let _guard = set_test_data_dir(PathBuf::from("/tmp/test-foxia-data"));
      assert_eq!(data_dir(), PathBuf::from("/tmp/test-foxia-data"));
      assert_eq!(
        settings_dir(),
        PathBuf::from("/tmp/test-foxia-data/settings")
      );
    }
    assert_eq!(data_dir(), original);
  }

  #[test]
  #[serial]
  fn test_env_override() {
    std::env::set_var("FOXIA_DATA_DIR", "/tmp/foxia-env-data");
    let dir = data_dir();
    std::env::remove_var("FOXIA_DATA_DIR");

    assert_eq!(dir, PathBuf::from("/tmp/foxia-env-data"));
  }

  #[test]
  #[serial]
  fn test_guard_wins_over_env() {
    std::env::set_var("FOXIA_DATA_DIR", "/tmp/foxia-env-data");
    let dir = {
      let _guard = set_test_data_dir(PathBuf::from("/tmp/foxia-guard-data"));
      data_dir()
    };
    std::env::remove_var("FOXIA_DATA_DIR");

    assert_eq!(dir, PathBuf::from("/tmp/foxia-guard-data"));
  }
}
