use crate::config::ConfigError;
use std::fs;
use std::path::PathBuf;

pub const GLOBAL_STATE_DIR: &str = ".benchwarden";
pub const GLOBAL_SETTINGS_FILE_NAME: &str = "config.yaml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    pub root: PathBuf,
}

impl StatePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn required_directories(&self) -> Vec<PathBuf> {
        vec![self.root.join("logs")]
    }

    pub fn settings_file(&self) -> PathBuf {
        self.root.join(GLOBAL_SETTINGS_FILE_NAME)
    }

    pub fn runtime_log_path(&self) -> PathBuf {
        self.root.join("logs/runtime.log")
    }
}

pub fn default_state_root_path() -> Result<PathBuf, ConfigError> {
    let home = std::env::var_os("HOME").ok_or(ConfigError::HomeDirectoryUnavailable)?;
    Ok(PathBuf::from(home).join(GLOBAL_STATE_DIR))
}

pub fn default_global_config_path() -> Result<PathBuf, ConfigError> {
    Ok(StatePaths::new(default_state_root_path()?).settings_file())
}

pub fn bootstrap_state_root(paths: &StatePaths) -> Result<(), ConfigError> {
    for path in paths.required_directories() {
        fs::create_dir_all(&path).map_err(|source| ConfigError::CreateDir {
            path: path.display().to_string(),
            source,
        })?;
    }
    Ok(())
}
