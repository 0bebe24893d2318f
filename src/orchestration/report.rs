use super::guard::MutationGuard;
use super::locator::{ensure_project_open, require_execution_config, require_test_set};
use super::poll::wait_for_completion;
use super::{
    conclude, OrchestrationContext, OrchestrationError, OrchestrationOutcome, RemoteStage,
    ReportRequest,
};
use crate::engine::{ConfigItemHandle, Engine, TestSetHandle};

/// Regenerates the overview report of one execution configuration. When a
/// test set is named it is assigned to every active item for the duration of
/// the call. No test set is created, so none is deleted afterwards.
pub fn regenerate_report<E: Engine + ?Sized>(
    ctx: &OrchestrationContext<'_, E>,
    request: &ReportRequest,
) -> Result<OrchestrationOutcome, OrchestrationError> {
    let engine = ctx.engine;
    let log = ctx.log;
    let resolve = OrchestrationError::remote;

    let project = ensure_project_open(engine, &request.project, log)?;
    let config = require_execution_config(engine, &project, &request.config, log)?;
    let assignment = match &request.test_set {
        Some(name) => {
            let test_set = require_test_set(engine, &project, name, log)?;
            let mut items = Vec::new();
            for item in engine
                .config_items(&config)
                .map_err(resolve(RemoteStage::Resolve))?
            {
                if engine
                    .item_active(&item)
                    .map_err(resolve(RemoteStage::Resolve))?
                {
                    items.push(item);
                }
            }
            Some((test_set, items))
        }
        None => None,
    };

    let mut guard = MutationGuard::begin(engine, &project, &config, log)
        .map_err(resolve(RemoteStage::Resolve))?;
    let result = run_guarded(ctx, &mut guard, request, assignment);
    let outcome = OrchestrationOutcome {
        config: request.config.clone(),
        temporary_test_sets: Vec::new(),
        reassigned_items: guard.reassigned_items(),
        deactivated_items: Vec::new(),
    };
    let restore = guard.restore();

    let concluded = conclude(result.map(|()| outcome), restore, log);
    match &concluded {
        Ok(_) => log.info(
            "report.done",
            format!("overview report of `{}` regenerated", request.config),
        ),
        Err(err) => log.error("report.failed", err.to_string()),
    }
    concluded
}

fn run_guarded<E: Engine + ?Sized>(
    ctx: &OrchestrationContext<'_, E>,
    guard: &mut MutationGuard<'_, E>,
    request: &ReportRequest,
    assignment: Option<(TestSetHandle, Vec<ConfigItemHandle>)>,
) -> Result<(), OrchestrationError> {
    let mutate = OrchestrationError::remote;
    guard
        .redirect_directories(request.data_dir.as_deref(), request.report_dir.as_deref())
        .map_err(mutate(RemoteStage::Mutate))?;
    if let Some((test_set, items)) = assignment {
        for item in &items {
            guard
                .assign_test_set(item, &test_set)
                .map_err(mutate(RemoteStage::Mutate))?;
        }
    }

    if ctx.interrupt.is_raised() {
        ctx.log.warn(
            "report.interrupted",
            "interrupted before report regeneration was triggered",
        );
        return Err(OrchestrationError::Interrupted);
    }

    let status = ctx
        .engine
        .regenerate_overview_report(guard.config())
        .map_err(mutate(RemoteStage::Trigger))?;
    ctx.log.info(
        "report.triggered",
        format!("overview report regeneration of `{}` started", guard.config().name),
    );
    wait_for_completion(ctx.engine, &status, ctx.polling, ctx.interrupt, ctx.log)
}
