use crate::config::{
    bootstrap_state_root, default_state_root_path, load_settings, ConfigError, Settings,
    StatePaths,
};
use crate::engine::{connect, ensure_running, ConnectError, HttpEngine};
use crate::orchestration::{OrchestrationContext, OrchestrationError};
use crate::shared::time::now_secs;
use crate::shared::{append_runtime_log, generate_invocation_id, Interrupt, LogLevel, StepLog};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum CommandFailure {
    #[error("{0}")]
    Failed(String),
    #[error("interrupted")]
    Interrupted,
}

impl CommandFailure {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Failed(_) => 1,
            Self::Interrupted => 130,
        }
    }
}

impl From<String> for CommandFailure {
    fn from(value: String) -> Self {
        Self::Failed(value)
    }
}

impl From<ConfigError> for CommandFailure {
    fn from(value: ConfigError) -> Self {
        Self::Failed(value.to_string())
    }
}

impl From<OrchestrationError> for CommandFailure {
    fn from(value: OrchestrationError) -> Self {
        match value {
            OrchestrationError::Interrupted => Self::Interrupted,
            other => Self::Failed(other.to_string()),
        }
    }
}

impl From<ConnectError> for CommandFailure {
    fn from(value: ConnectError) -> Self {
        OrchestrationError::from(value).into()
    }
}

/// Settings and step log shared by every verb.
pub struct CommandEnv {
    pub settings: Settings,
    pub log: StepLog,
}

impl CommandEnv {
    pub fn load(settings_path: Option<&Path>) -> Result<Self, CommandFailure> {
        let settings = load_settings(settings_path)?;
        let log = step_log(&settings)?;
        Ok(Self { settings, log })
    }

    /// Connects to the engine, launching it first when bootstrap is enabled.
    pub fn engine(&self, interrupt: &Interrupt) -> Result<HttpEngine, CommandFailure> {
        let endpoint = self.settings.endpoint();
        let timeouts = self.settings.timeouts();
        if !self.settings.bootstrap.enabled {
            let engine = connect(&endpoint, timeouts).map_err(|err| {
                self.log.error("engine.not_running", err.to_string());
                err
            })?;
            self.log
                .info("engine.connected", format!("connected to engine at {endpoint}"));
            return Ok(engine);
        }
        Ok(ensure_running(
            &endpoint,
            timeouts,
            &self.settings.bootstrap_options(),
            interrupt,
            &self.log,
        )?)
    }

    pub fn context<'a>(
        &'a self,
        engine: &'a HttpEngine,
        interrupt: &'a Interrupt,
    ) -> OrchestrationContext<'a, HttpEngine> {
        OrchestrationContext::new(engine, &self.log, interrupt)
            .with_polling(self.settings.poll_settings())
            .with_temp_prefix(self.settings.orchestration.temp_test_set_prefix.clone())
    }
}

/// Step log configured from the logging section. The runtime log lives under
/// the state root, which is created on demand.
pub fn step_log(settings: &Settings) -> Result<StepLog, ConfigError> {
    let log = StepLog::new().with_echo(settings.logging.echo);
    if !settings.logging.runtime_log {
        return Ok(log);
    }
    let paths = StatePaths::new(default_state_root_path()?);
    bootstrap_state_root(&paths)?;
    let log = log.with_runtime_log(paths.runtime_log_path());
    Ok(match generate_invocation_id(now_secs()) {
        Ok(id) => log.with_invocation_id(id),
        Err(_) => log,
    })
}

/// Runtime log path used by the signal handler, which runs before and
/// outside any loaded settings.
pub fn signal_log_path() -> Option<PathBuf> {
    default_state_root_path()
        .ok()
        .map(|root| StatePaths::new(root).runtime_log_path())
}

/// Reacts to SIGINT/SIGTERM. The first signal raises `interrupt` so the
/// running call cancels and restores. A repeated signal abandons the restore;
/// returns `true` when the process should exit right away.
pub fn handle_interrupt_signal(interrupt: &Interrupt, runtime_log: Option<&Path>) -> bool {
    if !interrupt.escalate() {
        eprintln!(
            "[benchwarden] WARNING: interrupt received; stopping after cleanup (interrupt again to abandon)"
        );
        return false;
    }
    let message = "second interrupt received; restore abandoned, the execution configuration may be left modified";
    eprintln!("[benchwarden] ERROR: {message}");
    if let Some(path) = runtime_log {
        append_runtime_log(path, None, LogLevel::Error, "restore.abandoned", message);
    }
    true
}
