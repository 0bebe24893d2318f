use super::ConfigError;
use crate::engine::{BootstrapOptions, EngineEndpoint, HttpTimeouts};
use crate::orchestration::PollSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ENGINE_PORT: u16 = 1099;
pub const DEFAULT_BINDING: &str = "TestEngineApi";
pub const DEFAULT_TEMP_TEST_SET_PREFIX: &str = "JENKINS Exec";
const MIN_POLL_INTERVAL_MS: u64 = 10;
const MAX_STARTUP_GRACE_SECS: u64 = 3600;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub bootstrap: BootstrapSettings,
    #[serde(default)]
    pub polling: PollingSettings,
    #[serde(default)]
    pub orchestration: OrchestrationSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EngineSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_binding")]
    pub binding: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            binding: default_binding(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BootstrapSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub executables: Vec<PathBuf>,
    #[serde(default = "default_startup_grace_secs")]
    pub startup_grace_secs: u64,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            executables: Vec::new(),
            startup_grace_secs: default_startup_grace_secs(),
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PollingSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub deadline_secs: Option<u64>,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            deadline_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrchestrationSettings {
    #[serde(default = "default_temp_test_set_prefix")]
    pub temp_test_set_prefix: String,
}

impl Default for OrchestrationSettings {
    fn default() -> Self {
        Self {
            temp_test_set_prefix: default_temp_test_set_prefix(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingSettings {
    #[serde(default = "default_true")]
    pub echo: bool,
    #[serde(default = "default_true")]
    pub runtime_log: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            echo: true,
            runtime_log: true,
        }
    }
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.host.trim().is_empty() {
            return Err(ConfigError::Settings(
                "engine.host must be non-empty".to_string(),
            ));
        }
        if self.engine.port == 0 {
            return Err(ConfigError::Settings(
                "engine.port must be greater than 0".to_string(),
            ));
        }
        validate_binding(&self.engine.binding)?;
        if self.engine.connect_timeout_ms == 0 || self.engine.request_timeout_ms == 0 {
            return Err(ConfigError::Settings(
                "engine timeouts must be greater than 0".to_string(),
            ));
        }
        if self.bootstrap.startup_grace_secs > MAX_STARTUP_GRACE_SECS {
            return Err(ConfigError::Settings(format!(
                "bootstrap.startup_grace_secs must be at most {MAX_STARTUP_GRACE_SECS}"
            )));
        }
        if self.polling.interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(ConfigError::Settings(format!(
                "polling.interval_ms must be at least {MIN_POLL_INTERVAL_MS}"
            )));
        }
        if self.polling.deadline_secs == Some(0) {
            return Err(ConfigError::Settings(
                "polling.deadline_secs must be greater than 0 when set".to_string(),
            ));
        }
        if self.orchestration.temp_test_set_prefix.trim().is_empty() {
            return Err(ConfigError::Settings(
                "orchestration.temp_test_set_prefix must be non-empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn endpoint(&self) -> EngineEndpoint {
        EngineEndpoint::new(
            self.engine.host.clone(),
            self.engine.port,
            self.engine.binding.clone(),
        )
    }

    pub fn timeouts(&self) -> HttpTimeouts {
        HttpTimeouts {
            connect: Duration::from_millis(self.engine.connect_timeout_ms),
            request: Duration::from_millis(self.engine.request_timeout_ms),
        }
    }

    pub fn bootstrap_options(&self) -> BootstrapOptions {
        BootstrapOptions {
            executables: self.bootstrap.executables.clone(),
            startup_grace: Duration::from_secs(self.bootstrap.startup_grace_secs),
            extra_args: self.bootstrap.extra_args.clone(),
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(self.polling.interval_ms),
            deadline: self.polling.deadline_secs.map(Duration::from_secs),
        }
    }
}

fn validate_binding(binding: &str) -> Result<(), ConfigError> {
    if binding.is_empty() {
        return Err(ConfigError::Settings(
            "engine.binding must be non-empty".to_string(),
        ));
    }
    if binding
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
    {
        return Ok(());
    }
    Err(ConfigError::Settings(
        "engine.binding must use only ASCII letters, digits, '-', '_' or '.'".to_string(),
    ))
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_ENGINE_PORT
}

fn default_binding() -> String {
    DEFAULT_BINDING.to_string()
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_request_timeout_ms() -> u64 {
    60_000
}

fn default_startup_grace_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_temp_test_set_prefix() -> String {
    DEFAULT_TEMP_TEST_SET_PREFIX.to_string()
}
