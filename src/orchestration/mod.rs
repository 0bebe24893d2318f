//! Mutate, trigger, poll and restore cycles against an execution
//! configuration owned by the engine.

use crate::engine::{ConfigItemHandle, Engine};
use crate::shared::{ConfigName, Interrupt, ScenarioName, StepLog, TestSetName};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

pub mod error;
pub mod execution;
pub mod guard;
pub mod locator;
pub mod poll;
pub mod report;
pub mod set_ops;

pub use error::{OrchestrationError, RemoteStage};
pub use execution::execute_test_cases;
pub use guard::{MutationGuard, RestoreReport};
pub use locator::{
    close_project, ensure_project_open, find_execution_config, find_scenarios, find_test_set,
    missing_scenario_names,
};
pub use poll::wait_for_completion;
pub use report::regenerate_report;
pub use set_ops::{describe_by_name, intersect_by_name};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub deadline: Option<Duration>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            deadline: None,
        }
    }
}

/// Everything one orchestration call borrows from its caller.
pub struct OrchestrationContext<'a, E: Engine + ?Sized> {
    pub engine: &'a E,
    pub log: &'a StepLog,
    pub interrupt: &'a Interrupt,
    pub polling: PollSettings,
    pub temp_prefix: String,
}

impl<'a, E: Engine + ?Sized> OrchestrationContext<'a, E> {
    pub fn new(engine: &'a E, log: &'a StepLog, interrupt: &'a Interrupt) -> Self {
        Self {
            engine,
            log,
            interrupt,
            polling: PollSettings::default(),
            temp_prefix: crate::config::DEFAULT_TEMP_TEST_SET_PREFIX.to_string(),
        }
    }

    pub fn with_polling(mut self, polling: PollSettings) -> Self {
        self.polling = polling;
        self
    }

    pub fn with_temp_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.temp_prefix = prefix.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub project: PathBuf,
    pub config: ConfigName,
    pub test_cases: BTreeSet<ScenarioName>,
    pub test_set: Option<TestSetName>,
    pub data_dir: PathBuf,
    pub report_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub project: PathBuf,
    pub config: ConfigName,
    pub test_set: Option<TestSetName>,
    pub data_dir: Option<PathBuf>,
    pub report_dir: Option<PathBuf>,
}

/// What a successful call changed and put back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestrationOutcome {
    pub config: ConfigName,
    pub temporary_test_sets: Vec<TestSetName>,
    pub reassigned_items: Vec<ConfigItemHandle>,
    pub deactivated_items: Vec<ConfigItemHandle>,
}

impl OrchestrationOutcome {
    pub fn summary(&self) -> String {
        format!(
            "configuration `{}` finished: {} temporary test set(s), {} item(s) reassigned, {} item(s) deactivated",
            self.config,
            self.temporary_test_sets.len(),
            self.reassigned_items.len(),
            self.deactivated_items.len()
        )
    }
}

/// Combines the outcome of the guarded region with the result of restoring.
/// An interruption always wins; otherwise restore failures replace the
/// original result and keep its message as the cause.
pub(crate) fn conclude(
    result: Result<OrchestrationOutcome, OrchestrationError>,
    restore: RestoreReport,
    log: &StepLog,
) -> Result<OrchestrationOutcome, OrchestrationError> {
    if !restore.is_complete() {
        log.error(
            "restore.incomplete",
            format!(
                "configuration left partially restored; manual intervention required: {}",
                restore.failures.join("; ")
            ),
        );
    }
    match result {
        Err(OrchestrationError::Interrupted) => Err(OrchestrationError::Interrupted),
        result if restore.is_complete() => result,
        result => Err(OrchestrationError::RestoreIncomplete {
            failures: restore.failures,
            cause: result.err().map(|err| err.to_string()),
        }),
    }
}
