pub mod error;
pub mod load;
pub mod paths;
pub mod settings;

pub use error::ConfigError;
pub use load::load_settings;
pub use paths::{
    bootstrap_state_root, default_global_config_path, default_state_root_path, StatePaths,
    GLOBAL_SETTINGS_FILE_NAME, GLOBAL_STATE_DIR,
};
pub use settings::{
    BootstrapSettings, EngineSettings, LoggingSettings, OrchestrationSettings, PollingSettings,
    Settings, DEFAULT_BINDING, DEFAULT_ENGINE_PORT, DEFAULT_TEMP_TEST_SET_PREFIX,
};
