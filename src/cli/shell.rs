use std::{
    env,
    io::{self, BufRead, IsTerminal},
};

use dialoguer::{theme::ColorfulTheme, Input};
use shell_words::split;

use crate::cli::{
    output,
    shell_context::{CliMode, LoopControl, ShellContext},
};
use crate::{CliError, CommandError};

const SCRIPT_ENV: &str = "SCHOOLSYNC_CLI_SCRIPT";

/// Entry point of `schoolsync_cli`.
///
/// Arguments run as a single command. Without arguments, commands are read
/// line by line from stdin, interactively when it is a terminal.
pub fn run_cli() -> Result<(), CliError> {
    let args: Vec<String> = env::args().skip(1).collect();
    let stdin_is_terminal = io::stdin().is_terminal();
    let mode = if args.is_empty() && stdin_is_terminal && env::var_os(SCRIPT_ENV).is_none() {
        CliMode::Interactive
    } else {
        CliMode::Script
    };

    let mut context = ShellContext::new(mode, stdin_is_terminal)?;
    let result = if !args.is_empty() {
        run_once(&mut context, &args)
    } else {
        match mode {
            CliMode::Interactive => run_interactive(&mut context),
            CliMode::Script => run_script(&mut context),
        }
    };
    context.shutdown();
    result
}

fn run_once(context: &mut ShellContext, args: &[String]) -> Result<(), CliError> {
    let command = args[0].to_lowercase();
    let rest: Vec<&str> = args.iter().skip(1).map(String::as_str).collect();
    context.dispatch(&command, &args[0], &rest)?;
    Ok(())
}

fn run_interactive(context: &mut ShellContext) -> Result<(), CliError> {
    let theme = ColorfulTheme::default();
    output::info("Type `help` for the list of commands, `exit` to quit.");
    while context.running {
        let line = Input::<String>::with_theme(&theme)
            .with_prompt("schoolsync")
            .allow_empty(true)
            .interact_text()?;
        match handle_line(context, &line) {
            Ok(LoopControl::Continue) => {}
            Ok(LoopControl::Exit) => break,
            Err(err) => context.report_error(err),
        }
    }
    Ok(())
}

fn run_script(context: &mut ShellContext) -> Result<(), CliError> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        if !context.running {
            break;
        }
        let line = line?;
        match handle_line(context, &line) {
            Ok(LoopControl::Continue) => {}
            Ok(LoopControl::Exit) => break,
            Err(err) => context.report_error(err),
        }
    }
    Ok(())
}

fn handle_line(context: &mut ShellContext, line: &str) -> Result<LoopControl, CommandError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(LoopControl::Continue);
    }
    let tokens = match split(trimmed) {
        Ok(tokens) => tokens,
        Err(err) => {
            output::warning(err);
            return Ok(LoopControl::Continue);
        }
    };
    let Some(raw) = tokens.first() else {
        return Ok(LoopControl::Continue);
    };
    let command = raw.to_lowercase();
    let args: Vec<&str> = tokens.iter().skip(1).map(String::as_str).collect();

    let control = context.dispatch(&command, raw, &args)?;
    if control == LoopControl::Exit {
        context.running = false;
    }
    Ok(control)
}
