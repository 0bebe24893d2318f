use super::{EngineError, HttpEngine, HttpTimeouts};
use crate::shared::{sleep_with_interrupt, Interrupt, StepLog};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

pub const PORT_FLAG: &str = "--api-port";
pub const BINDING_FLAG: &str = "--api-binding";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEndpoint {
    pub host: String,
    pub port: u16,
    pub binding: String,
}

impl EngineEndpoint {
    pub fn new(host: impl Into<String>, port: u16, binding: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            binding: binding.into(),
        }
    }

    pub fn base_url(&self) -> String {
        format!(
            "http://{}:{}/{}",
            self.host,
            self.port,
            urlencoding::encode(&self.binding)
        )
    }
}

impl std::fmt::Display for EngineEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}/{}", self.host, self.port, self.binding)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapOptions {
    pub executables: Vec<PathBuf>,
    pub startup_grace: Duration,
    pub extra_args: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("engine is not running at {endpoint}: {reason}")]
    NotRunning { endpoint: String, reason: String },
    #[error("failed to bootstrap engine at {endpoint}: {reason}")]
    BootstrapFailed { endpoint: String, reason: String },
    #[error("interrupted while waiting for the engine to start")]
    Interrupted,
}

/// Looks the engine up under its binding name. Any lookup failure means the
/// engine is treated as not running.
pub fn connect(
    endpoint: &EngineEndpoint,
    timeouts: HttpTimeouts,
) -> Result<HttpEngine, ConnectError> {
    let engine = HttpEngine::new(endpoint.clone(), timeouts);
    match engine.ping() {
        Ok(()) => Ok(engine),
        Err(err) => Err(ConnectError::NotRunning {
            endpoint: endpoint.to_string(),
            reason: lookup_failure_reason(&err),
        }),
    }
}

/// Connects, launching the engine once if the first lookup fails. The
/// launched process is left running for subsequent build steps.
pub fn ensure_running(
    endpoint: &EngineEndpoint,
    timeouts: HttpTimeouts,
    bootstrap: &BootstrapOptions,
    interrupt: &Interrupt,
    log: &StepLog,
) -> Result<HttpEngine, ConnectError> {
    let first_reason = match connect(endpoint, timeouts) {
        Ok(engine) => {
            log.info("engine.connected", format!("connected to engine at {endpoint}"));
            return Ok(engine);
        }
        Err(ConnectError::NotRunning { reason, .. }) => reason,
        Err(other) => return Err(other),
    };
    log.info(
        "engine.not_running",
        format!("engine not reachable at {endpoint} ({first_reason}); trying to start it"),
    );

    let Some(executable) = select_executable(&bootstrap.executables) else {
        let tried = bootstrap
            .executables
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>();
        let reason = if tried.is_empty() {
            "no engine executable configured".to_string()
        } else {
            format!("no engine executable found (tried: {})", tried.join(", "))
        };
        log.error("engine.bootstrap.no_executable", &reason);
        return Err(ConnectError::BootstrapFailed {
            endpoint: endpoint.to_string(),
            reason,
        });
    };

    let pid = spawn_engine(&executable, endpoint, &bootstrap.extra_args).map_err(|reason| {
        log.error(
            "engine.bootstrap.spawn_failed",
            format!("failed to start {}: {reason}", executable.display()),
        );
        ConnectError::BootstrapFailed {
            endpoint: endpoint.to_string(),
            reason: format!("failed to start {}: {reason}", executable.display()),
        }
    })?;
    log.info(
        "engine.bootstrap.spawned",
        format!(
            "started {} (pid={pid}); waiting {}s for startup",
            executable.display(),
            bootstrap.startup_grace.as_secs_f64()
        ),
    );

    if !sleep_with_interrupt(interrupt, bootstrap.startup_grace) {
        log.warn(
            "engine.bootstrap.interrupted",
            "interrupted while waiting for engine startup",
        );
        return Err(ConnectError::Interrupted);
    }

    match connect(endpoint, timeouts) {
        Ok(engine) => {
            log.info(
                "engine.connected",
                format!("connected to engine at {endpoint} after startup"),
            );
            Ok(engine)
        }
        Err(ConnectError::NotRunning { reason, .. }) => {
            log.error(
                "engine.bootstrap.unreachable",
                format!("engine still unreachable at {endpoint} after startup: {reason}"),
            );
            Err(ConnectError::BootstrapFailed {
                endpoint: endpoint.to_string(),
                reason: format!("engine still unreachable after startup: {reason}"),
            })
        }
        Err(other) => Err(other),
    }
}

/// First candidate that exists as a regular file. I/O errors on a candidate
/// only move on to the next one.
pub fn select_executable(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates
        .iter()
        .find(|path| {
            fs::metadata(path)
                .map(|meta| meta.is_file())
                .unwrap_or(false)
        })
        .cloned()
}

pub fn spawn_engine(
    executable: &Path,
    endpoint: &EngineEndpoint,
    extra_args: &[String],
) -> Result<u32, String> {
    let child = Command::new(executable)
        .arg(PORT_FLAG)
        .arg(endpoint.port.to_string())
        .arg(BINDING_FLAG)
        .arg(&endpoint.binding)
        .args(extra_args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| e.to_string())?;
    Ok(child.id())
}

fn lookup_failure_reason(err: &EngineError) -> String {
    match err {
        EngineError::Communication { reason, .. } => reason.clone(),
        EngineError::Application { message, .. } => format!("binding rejected: {message}"),
        EngineError::Protocol { reason, .. } => format!("unexpected lookup response: {reason}"),
    }
}
