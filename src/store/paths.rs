use super::StoreError;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub root: PathBuf,
}

impl StorePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn required_directories(&self) -> Vec<PathBuf> {
        vec![self.root.join("db"), self.root.join("logs")]
    }

    pub fn settings_file(&self) -> PathBuf {
        self.root.join("config.yaml")
    }

    pub fn users_file(&self) -> PathBuf {
        self.root.join("db/users.json")
    }

    pub fn projects_file(&self) -> PathBuf {
        self.root.join("db/projects.json")
    }

    pub fn tasks_file(&self) -> PathBuf {
        self.root.join("db/tasks.json")
    }

    pub fn counters_file(&self) -> PathBuf {
        self.root.join("db/counters.json")
    }
}

pub const DEFAULT_STATE_ROOT_DIR: &str = ".taskchat";
pub const STATE_ROOT_ENV: &str = "TASKCHAT_STATE_ROOT";

pub fn default_state_root_path() -> Result<PathBuf, StoreError> {
    if let Some(root) = std::env::var_os(STATE_ROOT_ENV) {
        return Ok(PathBuf::from(root));
    }
    let home = std::env::var_os("HOME").ok_or(StoreError::HomeDirectoryUnavailable)?;
    Ok(PathBuf::from(home).join(DEFAULT_STATE_ROOT_DIR))
}

pub fn bootstrap_state_root(paths: &StorePaths) -> Result<(), StoreError> {
    for path in paths.required_directories() {
        fs::create_dir_all(&path).map_err(|source| StoreError::CreateDir {
            path: path.display().to_string(),
            source,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn collection_files_live_under_db() {
        let paths = StorePaths::new("/tmp/state");
        assert_eq!(paths.projects_file(), PathBuf::from("/tmp/state/db/projects.json"));
        assert_eq!(paths.users_file(), PathBuf::from("/tmp/state/db/users.json"));
        assert_eq!(paths.tasks_file(), PathBuf::from("/tmp/state/db/tasks.json"));
        assert_eq!(paths.counters_file(), PathBuf::from("/tmp/state/db/counters.json"));
    }

    #[test]
    fn bootstrap_creates_required_directories() {
        let tmp = tempdir().expect("tempdir");
        let paths = StorePaths::new(tmp.path());
        bootstrap_state_root(&paths).expect("bootstrap");
        for dir in paths.required_directories() {
            assert!(dir.is_dir(), "missing {}", dir.display());
        }
    }
}
