use crate::engine::{
    ConfigItemHandle, Engine, EngineError, ExecutionConfigHandle, ProjectHandle, ScenarioRef,
    TestSetHandle,
};
use crate::shared::{StepLog, TestSetName};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub failures: Vec<String>,
}

impl RestoreReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Scoped ownership of a mutated execution configuration.
///
/// Every mutation goes through the guard, which records what must be undone
/// before touching the engine. [`MutationGuard::restore`] puts the
/// configuration back in a fixed order:
///
/// 1. original test sets are reassigned to their items, null included
/// 2. data and report directories are reset
/// 3. temporary test sets are deleted
/// 4. deactivated items are reactivated
///
/// Each step is attempted even when an earlier one failed. A guard dropped
/// without an explicit `restore` runs the same sequence from `Drop`.
pub struct MutationGuard<'a, E: Engine + ?Sized> {
    engine: &'a E,
    project: ProjectHandle,
    config: ExecutionConfigHandle,
    log: &'a StepLog,
    original_data_dir: PathBuf,
    original_report_dir: PathBuf,
    directories_changed: bool,
    original_test_sets: Vec<(ConfigItemHandle, Option<TestSetHandle>)>,
    temporary_test_sets: Vec<TestSetHandle>,
    deactivated: Vec<ConfigItemHandle>,
    restored: bool,
}

impl<'a, E: Engine + ?Sized> MutationGuard<'a, E> {
    /// Captures the directory paths. Nothing is mutated yet, so a failure
    /// here leaves no cleanup behind.
    pub fn begin(
        engine: &'a E,
        project: &ProjectHandle,
        config: &ExecutionConfigHandle,
        log: &'a StepLog,
    ) -> Result<Self, EngineError> {
        let original_data_dir = engine.data_dir(config)?;
        let original_report_dir = engine.report_dir(config)?;
        Ok(Self {
            engine,
            project: project.clone(),
            config: config.clone(),
            log,
            original_data_dir,
            original_report_dir,
            directories_changed: false,
            original_test_sets: Vec::new(),
            temporary_test_sets: Vec::new(),
            deactivated: Vec::new(),
            restored: false,
        })
    }

    pub fn config(&self) -> &ExecutionConfigHandle {
        &self.config
    }

    pub fn redirect_directories(
        &mut self,
        data_dir: Option<&Path>,
        report_dir: Option<&Path>,
    ) -> Result<(), EngineError> {
        if data_dir.is_none() && report_dir.is_none() {
            return Ok(());
        }
        self.directories_changed = true;
        if let Some(path) = data_dir {
            self.engine.set_data_dir(&self.config, path)?;
            self.log.info(
                "mutate.data_dir",
                format!(
                    "data directory changed from {} to {}",
                    self.original_data_dir.display(),
                    path.display()
                ),
            );
        }
        if let Some(path) = report_dir {
            self.engine.set_report_dir(&self.config, path)?;
            self.log.info(
                "mutate.report_dir",
                format!(
                    "report directory changed from {} to {}",
                    self.original_report_dir.display(),
                    path.display()
                ),
            );
        }
        Ok(())
    }

    /// Assigns `test_set` to `item`. The item's original test set is read
    /// once, on the first assignment.
    pub fn assign_test_set(
        &mut self,
        item: &ConfigItemHandle,
        test_set: &TestSetHandle,
    ) -> Result<(), EngineError> {
        if !self.original_test_sets.iter().any(|(seen, _)| seen == item) {
            let original = self.engine.item_test_set(item)?;
            self.original_test_sets.push((item.clone(), original));
        }
        self.engine.set_item_test_set(item, Some(test_set))?;
        self.log.info(
            "mutate.assign",
            format!("{item}: assigned test set `{}`", test_set.name),
        );
        Ok(())
    }

    pub fn deactivate(&mut self, item: &ConfigItemHandle) -> Result<(), EngineError> {
        if !self.deactivated.contains(item) {
            self.deactivated.push(item.clone());
        }
        self.engine.set_item_active(item, false)?;
        self.log.info(
            "mutate.deactivate",
            format!("{item}: deactivated, no requested test case in its test set"),
        );
        Ok(())
    }

    /// Creates and populates a test set that is deleted on restore.
    pub fn create_temporary_test_set(
        &mut self,
        name: &TestSetName,
        scenarios: &[ScenarioRef],
    ) -> Result<TestSetHandle, EngineError> {
        let test_set = self.engine.create_test_set(&self.project, name)?;
        self.temporary_test_sets.push(test_set.clone());
        self.engine.add_scenarios(&test_set, scenarios)?;
        self.log.info(
            "mutate.temp_test_set",
            format!(
                "created temporary test set `{}` with: {}",
                test_set.name,
                super::describe_by_name(scenarios)
            ),
        );
        Ok(test_set)
    }

    pub fn temporary_test_set_names(&self) -> Vec<TestSetName> {
        self.temporary_test_sets
            .iter()
            .map(|ts| ts.name.clone())
            .collect()
    }

    pub fn reassigned_items(&self) -> Vec<ConfigItemHandle> {
        self.original_test_sets
            .iter()
            .map(|(item, _)| item.clone())
            .collect()
    }

    pub fn deactivated_items(&self) -> Vec<ConfigItemHandle> {
        self.deactivated.clone()
    }

    pub fn restore(mut self) -> RestoreReport {
        self.restore_all()
    }

    fn restore_all(&mut self) -> RestoreReport {
        self.restored = true;
        let mut report = RestoreReport::default();

        let mut still_assigned = Vec::new();
        for (item, original) in &self.original_test_sets {
            if let Some(current) = self.restore_test_set(item, original.as_ref(), &mut report) {
                still_assigned.push((item.clone(), current));
            }
        }

        if self.directories_changed {
            match self.engine.set_data_dir(&self.config, &self.original_data_dir) {
                Ok(()) => self.log.info(
                    "restore.data_dir",
                    format!(
                        "data directory reset to {}",
                        self.original_data_dir.display()
                    ),
                ),
                Err(err) => self.fail(&mut report, "reset data directory", &err),
            }
            match self
                .engine
                .set_report_dir(&self.config, &self.original_report_dir)
            {
                Ok(()) => self.log.info(
                    "restore.report_dir",
                    format!(
                        "report directory reset to {}",
                        self.original_report_dir.display()
                    ),
                ),
                Err(err) => self.fail(&mut report, "reset report directory", &err),
            }
        }

        for test_set in &self.temporary_test_sets {
            match self.engine.delete_test_set(&self.project, test_set) {
                Ok(()) => {
                    self.log.info(
                        "restore.delete_temp_test_set",
                        format!("deleted temporary test set `{}`", test_set.name),
                    );
                    for (item, _) in still_assigned
                        .iter()
                        .filter(|(_, current)| current.id == test_set.id)
                    {
                        let dangling = format!(
                            "{item} still references deleted temporary test set `{}`; reassign it by hand",
                            test_set.name
                        );
                        self.log.error("restore.dangling_test_set", &dangling);
                        report.failures.push(dangling);
                    }
                }
                Err(err) => self.fail(
                    &mut report,
                    &format!("delete temporary test set `{}`", test_set.name),
                    &err,
                ),
            }
        }

        for item in &self.deactivated {
            match self.engine.set_item_active(item, true) {
                Ok(()) => self
                    .log
                    .info("restore.reactivate", format!("{item}: reactivated")),
                Err(err) => self.fail(&mut report, &format!("reactivate {item}"), &err),
            }
        }

        report
    }

    /// Returns the test set an item still holds after clearing it failed.
    fn restore_test_set(
        &self,
        item: &ConfigItemHandle,
        original: Option<&TestSetHandle>,
        report: &mut RestoreReport,
    ) -> Option<TestSetHandle> {
        if let Err(err) = self.engine.set_item_test_set(item, original) {
            self.fail(report, &format!("restore test set of {item}"), &err);
            return None;
        }
        let Some(original) = original else {
            // An unset test set may silently fail to apply; read it back.
            match self.engine.item_test_set(item) {
                Ok(None) => self
                    .log
                    .info("restore.assign", format!("{item}: test set cleared")),
                Ok(Some(still)) => {
                    let step = format!("clear test set of {item}");
                    self.log.error(
                        "restore.failed",
                        format!("{step}: still assigned `{}` after clearing", still.name),
                    );
                    report.failures.push(format!(
                        "{step}: still assigned `{}` after clearing",
                        still.name
                    ));
                    return Some(still);
                }
                Err(err) => self.fail(report, &format!("verify cleared test set of {item}"), &err),
            }
            return None;
        };
        self.log.info(
            "restore.assign",
            format!("{item}: test set `{}` restored", original.name),
        );
        None
    }

    fn fail(&self, report: &mut RestoreReport, step: &str, err: &EngineError) {
        self.log
            .error("restore.failed", format!("failed to {step}: {err}"));
        report.failures.push(format!("{step}: {err}"));
    }
}

impl<E: Engine + ?Sized> Drop for MutationGuard<'_, E> {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        self.log.warn(
            "restore.on_drop",
            "mutation guard dropped without restore; restoring now",
        );
        let report = self.restore_all();
        if !report.is_complete() {
            self.log.error(
                "restore.incomplete",
                format!(
                    "configuration left partially restored; manual intervention required: {}",
                    report.failures.join("; ")
                ),
            );
        }
    }
}
