use crate::engine::{ConnectError, EngineError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStage {
    Resolve,
    Mutate,
    Trigger,
    Poll,
}

impl RemoteStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resolve => "resolve",
            Self::Mutate => "mutate",
            Self::Trigger => "trigger",
            Self::Poll => "poll",
        }
    }
}

impl std::fmt::Display for RemoteStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error("engine connection unavailable: {0}")]
    ConnectionUnavailable(String),
    #[error("failed to open project {path}: {reason}")]
    ProjectOpenFailed {
        path: String,
        reason: String,
        log: Vec<String>,
    },
    #[error("execution configuration `{name}` not found in project")]
    ConfigNotFound { name: String },
    #[error("test set `{name}` not found in project")]
    TestSetNotFound { name: String },
    #[error(
        "only {found} of {requested} requested test cases were found; missing: {}",
        .missing.join(", ")
    )]
    PartialScenarioMatch {
        requested: usize,
        found: usize,
        missing: Vec<String>,
    },
    #[error("invalid orchestration request: {0}")]
    InvalidRequest(String),
    #[error("remote engine fault during {stage}: {source}")]
    RemoteExecutionFault {
        stage: RemoteStage,
        #[source]
        source: EngineError,
    },
    #[error("execution still running after {seconds}s; cancel requested")]
    PollDeadlineExceeded { seconds: u64 },
    #[error("orchestration interrupted")]
    Interrupted,
    #[error("{}", restore_incomplete_message(.failures, .cause.as_deref()))]
    RestoreIncomplete {
        failures: Vec<String>,
        cause: Option<String>,
    },
}

impl OrchestrationError {
    pub(crate) fn remote(stage: RemoteStage) -> impl FnOnce(EngineError) -> Self {
        move |source| Self::RemoteExecutionFault { stage, source }
    }

    /// True for failures raised before the configuration was touched; those
    /// carry no cleanup obligation.
    pub fn is_pre_mutation(&self) -> bool {
        match self {
            Self::ConnectionUnavailable(_)
            | Self::ProjectOpenFailed { .. }
            | Self::ConfigNotFound { .. }
            | Self::TestSetNotFound { .. }
            | Self::PartialScenarioMatch { .. }
            | Self::InvalidRequest(_) => true,
            Self::RemoteExecutionFault { stage, .. } => *stage == RemoteStage::Resolve,
            Self::PollDeadlineExceeded { .. }
            | Self::Interrupted
            | Self::RestoreIncomplete { .. } => false,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

impl From<ConnectError> for OrchestrationError {
    fn from(value: ConnectError) -> Self {
        match value {
            ConnectError::Interrupted => Self::Interrupted,
            other => Self::ConnectionUnavailable(other.to_string()),
        }
    }
}

fn restore_incomplete_message(failures: &[String], cause: Option<&str>) -> String {
    let mut message = format!(
        "configuration restore incomplete ({} failed step(s)): {}",
        failures.len(),
        failures.join("; ")
    );
    if let Some(cause) = cause {
        message.push_str(&format!("; run failed first: {cause}"));
    }
    message
}
