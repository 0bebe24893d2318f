use crate::app::command_support::{CommandEnv, CommandFailure};
use crate::app::flag_parsing::parse_run_args;
use crate::orchestration::execute_test_cases;
use crate::shared::Interrupt;

pub fn cmd_run(
    env: &CommandEnv,
    args: &[String],
    interrupt: &Interrupt,
) -> Result<String, CommandFailure> {
    let request = parse_run_args(args)?;
    let engine = env.engine(interrupt)?;
    let outcome = execute_test_cases(&env.context(&engine, interrupt), &request)?;
    Ok(outcome.summary())
}
