use crate::app::cli::{help_text, parse_cli_verb, CliVerb};
use crate::app::flag_parsing::split_settings_flag;
use crate::shared::Interrupt;

pub mod engine;
pub mod project;
pub mod report;
pub mod run;

pub use crate::app::command_support::{CommandEnv, CommandFailure};

pub fn run_cli(args: Vec<String>, interrupt: &Interrupt) -> Result<String, CommandFailure> {
    let (settings_path, args) = split_settings_flag(&args)?;
    if args.is_empty() {
        return Ok(help_text());
    }

    let verb = parse_cli_verb(args[0].as_str());
    match verb {
        CliVerb::Help => return Ok(help_text()),
        CliVerb::Unknown => {
            return Err(CommandFailure::Failed(format!(
                "unknown command `{}`",
                args[0]
            )))
        }
        _ => {}
    }

    let env = CommandEnv::load(settings_path.as_deref())?;
    match verb {
        CliVerb::Run => run::cmd_run(&env, &args[1..], interrupt),
        CliVerb::RegenerateReport => report::cmd_regenerate_report(&env, &args[1..], interrupt),
        CliVerb::CloseProject => project::cmd_close_project(&env, &args[1..], interrupt),
        CliVerb::Ping => engine::cmd_ping(&env, &args[1..]),
        CliVerb::StartEngine => engine::cmd_start_engine(&env, &args[1..], interrupt),
        CliVerb::Help | CliVerb::Unknown => Ok(help_text()),
    }
}
