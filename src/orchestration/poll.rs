use super::{OrchestrationError, PollSettings, RemoteStage};
use crate::engine::{Engine, ExecutionStatusHandle};
use crate::shared::{sleep_with_interrupt, Interrupt, StepLog};
use std::time::Instant;

/// Blocks until the engine reports the execution neither running nor
/// pending. The interrupt is checked before every status query and during
/// every sleep; when it is raised, or the optional deadline passes, a cancel
/// is sent to the engine on a best-effort basis.
pub fn wait_for_completion<E: Engine + ?Sized>(
    engine: &E,
    status: &ExecutionStatusHandle,
    polling: PollSettings,
    interrupt: &Interrupt,
    log: &StepLog,
) -> Result<(), OrchestrationError> {
    let started = Instant::now();
    loop {
        if interrupt.is_raised() {
            cancel_best_effort(engine, status, log, "interrupted");
            return Err(OrchestrationError::Interrupted);
        }

        let snapshot = engine
            .execution_status(status)
            .map_err(OrchestrationError::remote(RemoteStage::Poll))?;
        if !snapshot.in_progress() {
            log.info(
                "poll.completed",
                format!(
                    "execution finished after {}s",
                    started.elapsed().as_secs()
                ),
            );
            return Ok(());
        }

        if let Some(deadline) = polling.deadline {
            if started.elapsed() >= deadline {
                cancel_best_effort(engine, status, log, "deadline exceeded");
                return Err(OrchestrationError::PollDeadlineExceeded {
                    seconds: deadline.as_secs(),
                });
            }
        }

        if !sleep_with_interrupt(interrupt, polling.interval) {
            cancel_best_effort(engine, status, log, "interrupted");
            return Err(OrchestrationError::Interrupted);
        }
    }
}

fn cancel_best_effort<E: Engine + ?Sized>(
    engine: &E,
    status: &ExecutionStatusHandle,
    log: &StepLog,
    reason: &str,
) {
    match engine.cancel(status) {
        Ok(()) => log.warn(
            "poll.cancelled",
            format!("{reason}; cancel sent to engine"),
        ),
        Err(err) => log.error(
            "poll.cancel_failed",
            format!("{reason}; cancel request failed: {err}"),
        ),
    }
}
