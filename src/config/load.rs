use super::{default_global_config_path, ConfigError, Settings};
use std::path::Path;

/// Loads settings from `explicit` when given, otherwise from the global
/// config path. Only the global file may be absent; it then yields defaults.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings, ConfigError> {
    let settings = match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(ConfigError::MissingSettingsFile {
                    path: path.display().to_string(),
                });
            }
            Settings::from_path(path)?
        }
        None => {
            let path = default_global_config_path()?;
            if path.is_file() {
                Settings::from_path(&path)?
            } else {
                Settings::default()
            }
        }
    };
    settings.validate()?;
    Ok(settings)
}
