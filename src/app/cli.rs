#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Run,
    RegenerateReport,
    CloseProject,
    Ping,
    StartEngine,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "run" => CliVerb::Run,
        "regenerate-report" => CliVerb::RegenerateReport,
        "close-project" => CliVerb::CloseProject,
        "ping" => CliVerb::Ping,
        "start-engine" => CliVerb::StartEngine,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Usage: benchwarden <command> [--settings <path>] [flags]".to_string(),
        String::new(),
        "Commands:".to_string(),
        "  run                                  Run selected test cases of an execution configuration"
            .to_string(),
        "      --project <path> --config <name> --data-dir <dir> --report-dir <dir>".to_string(),
        "      [--test-case <name>]... [--test-cases a,b] [--test-set <name>]".to_string(),
        "  regenerate-report                    Regenerate the overview report of a configuration"
            .to_string(),
        "      --project <path> --config <name> [--test-set <name>]".to_string(),
        "      [--data-dir <dir>] [--report-dir <dir>]".to_string(),
        "  close-project --project <path>       Close a project if the engine has it open"
            .to_string(),
        "  ping                                 Check that the engine answers under its binding"
            .to_string(),
        "  start-engine                         Connect, launching the engine if it is not running"
            .to_string(),
    ]
}

pub(crate) fn help_text() -> String {
    cli_help_lines().join("\n")
}
