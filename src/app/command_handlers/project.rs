use crate::app::command_support::{CommandEnv, CommandFailure};
use crate::app::flag_parsing::parse_project_arg;
use crate::orchestration::close_project;
use crate::shared::Interrupt;

pub fn cmd_close_project(
    env: &CommandEnv,
    args: &[String],
    interrupt: &Interrupt,
) -> Result<String, CommandFailure> {
    let project = parse_project_arg(args)?;
    let engine = env.engine(interrupt)?;
    let closed = close_project(&engine, &project, &env.log)
        .map_err(|err| CommandFailure::Failed(format!("failed to close project: {err}")))?;
    Ok(if closed {
        format!("closed project {}", project.display())
    } else {
        format!("project {} was not open", project.display())
    })
}
