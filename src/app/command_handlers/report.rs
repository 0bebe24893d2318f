use crate::app::command_support::{CommandEnv, CommandFailure};
use crate::app::flag_parsing::parse_report_args;
use crate::orchestration::regenerate_report;
use crate::shared::Interrupt;

pub fn cmd_regenerate_report(
    env: &CommandEnv,
    args: &[String],
    interrupt: &Interrupt,
) -> Result<String, CommandFailure> {
    let request = parse_report_args(args)?;
    let engine = env.engine(interrupt)?;
    let outcome = regenerate_report(&env.context(&engine, interrupt), &request)?;
    Ok(format!(
        "overview report of `{}` regenerated ({} item(s) reassigned)",
        outcome.config,
        outcome.reassigned_items.len()
    ))
}
