//! Command-line front-end for h2mm-cli.
//!
//! Runs one tool command through the [`ProcessRunner`], printing stdout and
//! stderr lines as they arrive. Ctrl-C cancels the running command.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Result, bail};
use clap::Parser;
use tracing::{info, warn};

use h2mm_runner::tool::{self, ToolSource, available_commands};
use h2mm_runner::{CompletionResult, Invocation, ProcessRunner, RunnerEvent, StreamKind, config, utils};
use h2mm_runner::event::init_runner_eventsource;

#[derive(Parser, Debug)]
#[command(name = "h2mm-runner", version, about = "Run h2mm-cli and stream its output")]
struct Cli {
    /// Use this h2mm-cli executable instead of the configured one
    #[arg(long, value_name = "PATH")]
    cli: Option<PathBuf>,

    /// Config file to read (defaults to the user config directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Only check whether h2mm-cli can be found
    #[arg(long)]
    check: bool,

    /// List the commands offered by the front-end
    #[arg(long)]
    commands: bool,

    /// Arguments passed to h2mm-cli, e.g. `list` or `install ./mod.zip`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = utils::logger::init_logging();

    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let mut settings = config::load_or_default(&config_path).with_env_override();
    if let Some(path) = cli.cli {
        settings.tool = ToolSource::custom(path);
    }

    if cli.commands {
        for cmd in available_commands() {
            println!("{:<8} {:<14} {}", cmd.command, cmd.name, cmd.description);
        }
        return Ok(ExitCode::SUCCESS);
    }

    if cli.check {
        return Ok(if tool::is_available(&settings.tool) {
            println!("h2mm-cli is available");
            ExitCode::SUCCESS
        } else {
            println!("h2mm-cli not found. Please ensure it is installed and in your PATH.");
            ExitCode::FAILURE
        });
    }

    if cli.args.is_empty() {
        bail!("No command given. Run with --commands to see what is available.");
    }

    let runner = ProcessRunner::with_options(settings.tool.resolve()?, settings.runner_options())?;
    let (event_tx, mut events) = init_runner_eventsource();
    let id = runner.execute(Invocation::new(cli.args), event_tx)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(RunnerEvent::Output { event, .. }) => match event.stream {
                    StreamKind::Stdout => println!("{}", event.line),
                    StreamKind::Stderr => eprintln!("{}", event.line),
                },
                Some(RunnerEvent::Completed { result, .. }) => {
                    report(&result);
                    return Ok(ExitCode::from(exit_status_for(&result)));
                }
                None => bail!("Runner stopped without reporting completion of {}", id),
            },
            res = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                if let Err(e) = res {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                    continue;
                }
                info!("Interrupted, cancelling {}", id);
                runner.cancel();
            }
        }
    }
}

fn report(result: &CompletionResult) {
    match result {
        CompletionResult::ExitCode(0) => {}
        CompletionResult::ExitCode(code) => eprintln!("Command exited with code: {}", code),
        other => eprintln!("h2mm-cli {}", other),
    }
}

/// Mirror the tool's outcome in our own exit status.
fn exit_status_for(result: &CompletionResult) -> u8 {
    match result {
        CompletionResult::ExitCode(code) => u8::try_from(*code).unwrap_or(1),
        CompletionResult::Cancelled => 130,
        CompletionResult::LaunchFailure(_) => 127,
        CompletionResult::RuntimeFailure(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_collects_tool_args() {
        let cli = Cli::parse_from(["h2mm-runner", "install", "--force", "./mod.zip"]);
        assert_eq!(cli.args, vec!["install", "--force", "./mod.zip"]);
        assert!(!cli.check);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from(["h2mm-runner", "--cli", "/opt/h2mm-cli", "--check"]);
        assert_eq!(cli.cli, Some(PathBuf::from("/opt/h2mm-cli")));
        assert!(cli.check);
        assert!(cli.args.is_empty());
    }

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(exit_status_for(&CompletionResult::ExitCode(0)), 0);
        assert_eq!(exit_status_for(&CompletionResult::ExitCode(2)), 2);
        assert_eq!(exit_status_for(&CompletionResult::ExitCode(-1)), 1);
        assert_eq!(exit_status_for(&CompletionResult::Cancelled), 130);
        assert_eq!(exit_status_for(&CompletionResult::LaunchFailure("missing".into())), 127);
        assert_eq!(exit_status_for(&CompletionResult::RuntimeFailure("pipe".into())), 1);
    }
}
