use super::error::{OrchestrationError, RemoteStage};
use crate::engine::{
    Engine, EngineError, ExecutionConfigHandle, ProjectHandle, ScenarioNode, ScenarioRef,
    TestSetHandle,
};
use crate::shared::{ConfigName, ScenarioName, StepLog, TestSetName};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

pub fn find_execution_config<E: Engine + ?Sized>(
    engine: &E,
    project: &ProjectHandle,
    name: &ConfigName,
) -> Result<Option<ExecutionConfigHandle>, EngineError> {
    Ok(engine
        .execution_configs(project)?
        .into_iter()
        .find(|config| &config.name == name))
}

pub fn find_test_set<E: Engine + ?Sized>(
    engine: &E,
    project: &ProjectHandle,
    name: &TestSetName,
) -> Result<Option<TestSetHandle>, EngineError> {
    Ok(engine
        .test_sets(project)?
        .into_iter()
        .find(|test_set| &test_set.name == name))
}

pub(crate) fn require_execution_config<E: Engine + ?Sized>(
    engine: &E,
    project: &ProjectHandle,
    name: &ConfigName,
    log: &StepLog,
) -> Result<ExecutionConfigHandle, OrchestrationError> {
    match find_execution_config(engine, project, name)
        .map_err(OrchestrationError::remote(RemoteStage::Resolve))?
    {
        Some(config) => {
            log.info(
                "config.resolved",
                format!("using execution configuration `{name}`"),
            );
            Ok(config)
        }
        None => {
            log.error(
                "config.not_found",
                format!("execution configuration `{name}` not found in project"),
            );
            Err(OrchestrationError::ConfigNotFound {
                name: name.to_string(),
            })
        }
    }
}

pub(crate) fn require_test_set<E: Engine + ?Sized>(
    engine: &E,
    project: &ProjectHandle,
    name: &TestSetName,
    log: &StepLog,
) -> Result<TestSetHandle, OrchestrationError> {
    match find_test_set(engine, project, name)
        .map_err(OrchestrationError::remote(RemoteStage::Resolve))?
    {
        Some(test_set) => Ok(test_set),
        None => {
            log.error(
                "test_set.not_found",
                format!("test set `{name}` not found in project"),
            );
            Err(OrchestrationError::TestSetNotFound {
                name: name.to_string(),
            })
        }
    }
}

/// Depth-first search collecting every scenario leaf whose name is in
/// `names`. Groups are always descended into. A name reached twice through
/// different groups yields one scenario (the first one found).
pub fn find_scenarios(roots: &[ScenarioNode], names: &BTreeSet<ScenarioName>) -> Vec<ScenarioRef> {
    let mut found = Vec::new();
    let mut seen = HashSet::new();
    collect_scenarios(roots, names, &mut seen, &mut found);
    found
}

fn collect_scenarios(
    nodes: &[ScenarioNode],
    names: &BTreeSet<ScenarioName>,
    seen: &mut HashSet<ScenarioName>,
    found: &mut Vec<ScenarioRef>,
) {
    for node in nodes {
        match node {
            ScenarioNode::Scenario(scenario) => {
                if names.contains(&scenario.name) && seen.insert(scenario.name.clone()) {
                    found.push(scenario.clone());
                }
            }
            ScenarioNode::Group { children, .. } => {
                collect_scenarios(children, names, seen, found);
            }
        }
    }
}

pub fn missing_scenario_names(
    requested: &BTreeSet<ScenarioName>,
    found: &[ScenarioRef],
) -> Vec<String> {
    let found: HashSet<&ScenarioName> = found.iter().map(|s| &s.name).collect();
    requested
        .iter()
        .filter(|name| !found.contains(name))
        .map(|name| name.to_string())
        .collect()
}

/// Reuses the project when the engine already has it open, otherwise opens
/// it. Log lines returned by a failed open are copied into `log`.
pub fn ensure_project_open<E: Engine + ?Sized>(
    engine: &E,
    path: &Path,
    log: &StepLog,
) -> Result<ProjectHandle, OrchestrationError> {
    let open = engine
        .open_projects()
        .map_err(|err| project_open_failed(path, err, log))?;
    if let Some(project) = open.into_iter().find(|p| p.path == path) {
        log.info(
            "project.reused",
            format!("project {} is already open", path.display()),
        );
        return Ok(project);
    }

    let project = engine
        .open_project(path)
        .map_err(|err| project_open_failed(path, err, log))?;
    log.info("project.opened", format!("opened project {}", path.display()));
    Ok(project)
}

/// Closes the project at `path` if it is open. Returns `false` when there
/// was nothing to close.
pub fn close_project<E: Engine + ?Sized>(
    engine: &E,
    path: &Path,
    log: &StepLog,
) -> Result<bool, EngineError> {
    let Some(project) = engine
        .open_projects()?
        .into_iter()
        .find(|p| p.path == path)
    else {
        log.info(
            "project.close.not_open",
            format!("project {} is not open; nothing to close", path.display()),
        );
        return Ok(false);
    };
    engine.close_project(&project)?;
    log.info("project.closed", format!("closed project {}", path.display()));
    Ok(true)
}

fn project_open_failed(path: &Path, err: EngineError, log: &StepLog) -> OrchestrationError {
    let remote_log = err.remote_log().to_vec();
    log.error(
        "project.open_failed",
        format!("failed to open project {}: {err}", path.display()),
    );
    for line in &remote_log {
        log.error("project.open_failed.log", line);
    }
    OrchestrationError::ProjectOpenFailed {
        path: path.display().to_string(),
        reason: err.to_string(),
        log: remote_log,
    }
}
