use crate::app::command_support::{CommandEnv, CommandFailure};
use crate::app::flag_parsing::expect_no_args;
use crate::engine::connect;
use crate::shared::Interrupt;

/// Lookup only; never launches the engine.
pub fn cmd_ping(env: &CommandEnv, args: &[String]) -> Result<String, CommandFailure> {
    expect_no_args("ping", args)?;
    let endpoint = env.settings.endpoint();
    connect(&endpoint, env.settings.timeouts())?;
    Ok(format!("engine reachable at {endpoint}"))
}

pub fn cmd_start_engine(
    env: &CommandEnv,
    args: &[String],
    interrupt: &Interrupt,
) -> Result<String, CommandFailure> {
    expect_no_args("start-engine", args)?;
    let engine = env.engine(interrupt)?;
    Ok(format!("engine running at {}", engine.endpoint()))
}
