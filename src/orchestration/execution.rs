use super::guard::MutationGuard;
use super::locator::{
    ensure_project_open, find_scenarios, missing_scenario_names, require_execution_config,
    require_test_set,
};
use super::poll::wait_for_completion;
use super::set_ops::{describe_by_name, intersect_by_name};
use super::{
    conclude, ExecutionRequest, OrchestrationContext, OrchestrationError, OrchestrationOutcome,
    RemoteStage,
};
use crate::engine::{ConfigItemHandle, Engine, ExecutionConfigHandle, ProjectHandle, ScenarioRef};
use crate::shared::{ScenarioName, StepLog, TestSetName};
use std::collections::{BTreeSet, HashSet};

/// What the guarded region will do to the configuration. Built entirely from
/// reads, so every failure while planning leaves nothing to restore.
#[derive(Debug)]
enum Plan {
    /// No test cases requested; only the directories are redirected.
    Unfiltered,
    PerItem(Vec<ItemAction>),
    Shared {
        scenarios: Vec<ScenarioRef>,
        items: Vec<ConfigItemHandle>,
    },
}

#[derive(Debug)]
enum ItemAction {
    Filter {
        item: ConfigItemHandle,
        scenarios: Vec<ScenarioRef>,
    },
    Deactivate(ConfigItemHandle),
}

/// Runs the requested test cases of one execution configuration and puts the
/// configuration back the way it was found.
pub fn execute_test_cases<E: Engine + ?Sized>(
    ctx: &OrchestrationContext<'_, E>,
    request: &ExecutionRequest,
) -> Result<OrchestrationOutcome, OrchestrationError> {
    let engine = ctx.engine;
    let log = ctx.log;

    let project = ensure_project_open(engine, &request.project, log)?;
    let config = require_execution_config(engine, &project, &request.config, log)?;
    let requested = resolve_requested(engine, &project, &request.test_cases, log)?;
    let plan = match &request.test_set {
        None => plan_per_item(engine, &config, &request.test_cases, &requested, log)?,
        Some(name) => plan_shared(
            engine,
            &project,
            &config,
            name,
            &request.test_cases,
            requested,
            log,
        )?,
    };
    let mut names = TemporaryNames::new(engine, &project, &ctx.temp_prefix)?;

    let mut guard = MutationGuard::begin(engine, &project, &config, log)
        .map_err(OrchestrationError::remote(RemoteStage::Resolve))?;
    let result = run_guarded(ctx, &mut guard, request, plan, &mut names);
    let outcome = OrchestrationOutcome {
        config: request.config.clone(),
        temporary_test_sets: guard.temporary_test_set_names(),
        reassigned_items: guard.reassigned_items(),
        deactivated_items: guard.deactivated_items(),
    };
    let restore = guard.restore();

    let concluded = conclude(result.map(|()| outcome), restore, log);
    match &concluded {
        Ok(outcome) => log.info("execution.done", outcome.summary()),
        Err(err) => log.error("execution.failed", err.to_string()),
    }
    concluded
}

fn run_guarded<E: Engine + ?Sized>(
    ctx: &OrchestrationContext<'_, E>,
    guard: &mut MutationGuard<'_, E>,
    request: &ExecutionRequest,
    plan: Plan,
    names: &mut TemporaryNames,
) -> Result<(), OrchestrationError> {
    let mutate = OrchestrationError::remote;
    guard
        .redirect_directories(Some(&request.data_dir), Some(&request.report_dir))
        .map_err(mutate(RemoteStage::Mutate))?;

    match plan {
        Plan::Unfiltered => ctx.log.info(
            "plan.unfiltered",
            "no test cases requested; running the configuration unfiltered",
        ),
        Plan::PerItem(actions) => {
            for action in actions {
                match action {
                    ItemAction::Deactivate(item) => guard
                        .deactivate(&item)
                        .map_err(mutate(RemoteStage::Mutate))?,
                    ItemAction::Filter { item, scenarios } => {
                        let name = names.next()?;
                        let test_set = guard
                            .create_temporary_test_set(&name, &scenarios)
                            .map_err(mutate(RemoteStage::Mutate))?;
                        guard
                            .assign_test_set(&item, &test_set)
                            .map_err(mutate(RemoteStage::Mutate))?;
                    }
                }
            }
        }
        Plan::Shared { scenarios, items } => {
            let name = names.next()?;
            let test_set = guard
                .create_temporary_test_set(&name, &scenarios)
                .map_err(mutate(RemoteStage::Mutate))?;
            if items.is_empty() {
                ctx.log
                    .warn("plan.no_active_items", "configuration has no active items");
            }
            for item in &items {
                guard
                    .assign_test_set(item, &test_set)
                    .map_err(mutate(RemoteStage::Mutate))?;
            }
        }
    }

    if ctx.interrupt.is_raised() {
        ctx.log
            .warn("execution.interrupted", "interrupted before the run was triggered");
        return Err(OrchestrationError::Interrupted);
    }

    let status = ctx
        .engine
        .run(guard.config())
        .map_err(mutate(RemoteStage::Trigger))?;
    ctx.log.info(
        "execution.triggered",
        format!("execution of `{}` started", guard.config().name),
    );
    wait_for_completion(ctx.engine, &status, ctx.polling, ctx.interrupt, ctx.log)
}

/// Looks every requested name up in the project's scenario tree. Any name
/// not found aborts the call before the configuration is touched.
fn resolve_requested<E: Engine + ?Sized>(
    engine: &E,
    project: &ProjectHandle,
    test_cases: &BTreeSet<ScenarioName>,
    log: &StepLog,
) -> Result<Vec<ScenarioRef>, OrchestrationError> {
    if test_cases.is_empty() {
        return Ok(Vec::new());
    }
    let tree = engine
        .scenario_tree(project)
        .map_err(OrchestrationError::remote(RemoteStage::Resolve))?;
    let found = find_scenarios(&tree, test_cases);
    if found.len() < test_cases.len() {
        let missing = missing_scenario_names(test_cases, &found);
        log.error(
            "scenarios.partial_match",
            format!(
                "found {} of {} requested test cases; missing: {}",
                found.len(),
                test_cases.len(),
                missing.join(", ")
            ),
        );
        return Err(OrchestrationError::PartialScenarioMatch {
            requested: test_cases.len(),
            found: found.len(),
            missing,
        });
    }
    log.info(
        "scenarios.resolved",
        format!("requested test cases: {}", describe_by_name(&found)),
    );
    Ok(found)
}

fn plan_per_item<E: Engine + ?Sized>(
    engine: &E,
    config: &ExecutionConfigHandle,
    test_cases: &BTreeSet<ScenarioName>,
    requested: &[ScenarioRef],
    log: &StepLog,
) -> Result<Plan, OrchestrationError> {
    if test_cases.is_empty() {
        return Ok(Plan::Unfiltered);
    }
    let resolve = OrchestrationError::remote;
    let mut actions = Vec::new();
    for item in engine
        .config_items(config)
        .map_err(resolve(RemoteStage::Resolve))?
    {
        if !engine
            .item_active(&item)
            .map_err(resolve(RemoteStage::Resolve))?
        {
            continue;
        }
        let current = match engine
            .item_test_set(&item)
            .map_err(resolve(RemoteStage::Resolve))?
        {
            Some(test_set) => engine
                .test_set_scenarios(&test_set)
                .map_err(resolve(RemoteStage::Resolve))?,
            None => Vec::new(),
        };
        let scenarios = intersect_by_name(&current, requested);
        if scenarios.is_empty() {
            log.info(
                "plan.deactivate",
                format!("{item}: no requested test case in its test set"),
            );
            actions.push(ItemAction::Deactivate(item));
        } else {
            log.info(
                "plan.filter",
                format!("{item}: will run {}", describe_by_name(&scenarios)),
            );
            actions.push(ItemAction::Filter { item, scenarios });
        }
    }
    Ok(Plan::PerItem(actions))
}

fn plan_shared<E: Engine + ?Sized>(
    engine: &E,
    project: &ProjectHandle,
    config: &ExecutionConfigHandle,
    name: &TestSetName,
    test_cases: &BTreeSet<ScenarioName>,
    requested: Vec<ScenarioRef>,
    log: &StepLog,
) -> Result<Plan, OrchestrationError> {
    let resolve = OrchestrationError::remote;
    let named = require_test_set(engine, project, name, log)?;
    let in_set = engine
        .test_set_scenarios(&named)
        .map_err(resolve(RemoteStage::Resolve))?;

    let scenarios = if test_cases.is_empty() {
        in_set
    } else {
        let covered = intersect_by_name(&in_set, &requested);
        if covered.len() < requested.len() {
            let missing = missing_scenario_names(test_cases, &covered);
            log.error(
                "scenarios.partial_match",
                format!(
                    "test set `{name}` lacks requested test cases: {}",
                    missing.join(", ")
                ),
            );
            return Err(OrchestrationError::PartialScenarioMatch {
                requested: requested.len(),
                found: covered.len(),
                missing,
            });
        }
        covered
    };
    if scenarios.is_empty() {
        return Err(OrchestrationError::InvalidRequest(format!(
            "test set `{name}` contains no test cases to run"
        )));
    }

    let mut items = Vec::new();
    for item in engine
        .config_items(config)
        .map_err(resolve(RemoteStage::Resolve))?
    {
        if engine
            .item_active(&item)
            .map_err(resolve(RemoteStage::Resolve))?
        {
            items.push(item);
        }
    }
    log.info(
        "plan.shared",
        format!(
            "{} active item(s) will run test set `{name}` restricted to: {}",
            items.len(),
            describe_by_name(&scenarios)
        ),
    );
    Ok(Plan::Shared { scenarios, items })
}

/// Hands out `"<prefix> N"` names, skipping any already present in the
/// project.
struct TemporaryNames {
    prefix: String,
    taken: HashSet<String>,
    next: usize,
}

impl TemporaryNames {
    fn new<E: Engine + ?Sized>(
        engine: &E,
        project: &ProjectHandle,
        prefix: &str,
    ) -> Result<Self, OrchestrationError> {
        let taken = engine
            .test_sets(project)
            .map_err(OrchestrationError::remote(RemoteStage::Resolve))?
            .into_iter()
            .map(|ts| ts.name.to_string())
            .collect();
        Ok(Self {
            prefix: prefix.trim().to_string(),
            taken,
            next: 1,
        })
    }

    fn next(&mut self) -> Result<TestSetName, OrchestrationError> {
        loop {
            let candidate = format!("{} {}", self.prefix, self.next);
            self.next += 1;
            if self.taken.insert(candidate.clone()) {
                return TestSetName::parse(&candidate).map_err(OrchestrationError::InvalidRequest);
            }
        }
    }
}
