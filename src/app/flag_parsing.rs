use crate::orchestration::{ExecutionRequest, ReportRequest};
use crate::shared::{ConfigName, ScenarioName, TestSetName};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Removes `--settings <path>` from anywhere in `args`.
pub fn split_settings_flag(args: &[String]) -> Result<(Option<PathBuf>, Vec<String>), String> {
    let mut settings = None;
    let mut rest = Vec::new();
    let mut index = 0usize;
    while index < args.len() {
        if args[index] == "--settings" {
            index += 1;
            let raw = args
                .get(index)
                .ok_or_else(|| "--settings requires a path".to_string())?;
            settings = Some(PathBuf::from(raw));
        } else {
            rest.push(args[index].clone());
        }
        index += 1;
    }
    Ok((settings, rest))
}

#[derive(Debug, Default)]
struct CommandFlags {
    project: Option<PathBuf>,
    config: Option<ConfigName>,
    test_cases: BTreeSet<ScenarioName>,
    test_set: Option<TestSetName>,
    data_dir: Option<PathBuf>,
    report_dir: Option<PathBuf>,
}

fn parse_flags(command: &str, args: &[String], allowed: &[&str]) -> Result<CommandFlags, String> {
    let mut flags = CommandFlags::default();
    let mut index = 0usize;
    while index < args.len() {
        let flag = args[index].as_str();
        if !allowed.contains(&flag) {
            if flag.starts_with("--") {
                return Err(format!("unknown {command} flag `{flag}`"));
            }
            return Err(format!("unexpected argument `{flag}` for {command}"));
        }
        index += 1;
        let raw = args
            .get(index)
            .ok_or_else(|| format!("{flag} requires a value"))?;
        match flag {
            "--project" => flags.project = Some(absolute_path(raw)?),
            "--config" => flags.config = Some(ConfigName::parse(raw)?),
            "--test-case" => {
                flags.test_cases.insert(ScenarioName::parse(raw)?);
            }
            "--test-cases" => {
                for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                    flags.test_cases.insert(ScenarioName::parse(name)?);
                }
            }
            "--test-set" => flags.test_set = Some(TestSetName::parse(raw)?),
            "--data-dir" => flags.data_dir = Some(absolute_path(raw)?),
            "--report-dir" => flags.report_dir = Some(absolute_path(raw)?),
            _ => return Err(format!("unknown {command} flag `{flag}`")),
        }
        index += 1;
    }
    Ok(flags)
}

/// Resolves `raw` against the working directory of this process. The engine
/// runs elsewhere and would resolve a relative path against its own.
fn absolute_path(raw: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir()
        .map_err(|err| format!("failed to resolve `{raw}` against the working directory: {err}"))?;
    Ok(cwd.join(path).components().collect())
}

fn required<T>(value: Option<T>, flag: &str, command: &str) -> Result<T, String> {
    value.ok_or_else(|| format!("{command} requires {flag}"))
}

pub fn parse_run_args(args: &[String]) -> Result<ExecutionRequest, String> {
    let flags = parse_flags(
        "run",
        args,
        &[
            "--project",
            "--config",
            "--test-case",
            "--test-cases",
            "--test-set",
            "--data-dir",
            "--report-dir",
        ],
    )?;
    Ok(ExecutionRequest {
        project: required(flags.project, "--project", "run")?,
        config: required(flags.config, "--config", "run")?,
        test_cases: flags.test_cases,
        test_set: flags.test_set,
        data_dir: required(flags.data_dir, "--data-dir", "run")?,
        report_dir: required(flags.report_dir, "--report-dir", "run")?,
    })
}

pub fn parse_report_args(args: &[String]) -> Result<ReportRequest, String> {
    let flags = parse_flags(
        "regenerate-report",
        args,
        &[
            "--project",
            "--config",
            "--test-set",
            "--data-dir",
            "--report-dir",
        ],
    )?;
    Ok(ReportRequest {
        project: required(flags.project, "--project", "regenerate-report")?,
        config: required(flags.config, "--config", "regenerate-report")?,
        test_set: flags.test_set,
        data_dir: flags.data_dir,
        report_dir: flags.report_dir,
    })
}

pub fn parse_project_arg(args: &[String]) -> Result<PathBuf, String> {
    let flags = parse_flags("close-project", args, &["--project"])?;
    required(flags.project, "--project", "close-project")
}

pub fn expect_no_args(command: &str, args: &[String]) -> Result<(), String> {
    match args.first() {
        Some(arg) => Err(format!("unexpected argument `{arg}` for {command}")),
        None => Ok(()),
    }
}
