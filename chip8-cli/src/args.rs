//! Command line arguments.
use std::collections::VecDeque;

use chip8_machine::prelude::*;

use crate::error::AppError;

pub enum Cmd {
    /// Run file
    Run(RunArgs),
}

pub struct RunArgs {
    pub filepath: String,
    pub conf: Chip8Conf,
    /// Number of instructions to execute before stopping.
    pub cycles: usize,
    /// Keys fed to the machine, one per `LD Vx, K` wait.
    pub keys: VecDeque<KeyCode>,
}

pub const DEFAULT_CYCLES: usize = 2000;

pub fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Cmd, AppError> {
    match args.next() {
        Some(cmd) => {
            // don't format me T.T
            match cmd.as_str() {
                "run" => Ok(Cmd::Run(parse_run(args)?)),
                _ => Err(AppError::args(format!("unknown command \"{cmd}\""))),
            }
        }
        None => Err(AppError::args("missing command")),
    }
}

fn parse_run(mut args: impl Iterator<Item = String>) -> Result<RunArgs, AppError> {
    let mut run = RunArgs {
        filepath: String::new(),
        conf: Chip8Conf::default(),
        cycles: DEFAULT_CYCLES,
        keys: VecDeque::new(),
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--hz" => run.conf.clock_frequency = Some(Hz(consume_num(&arg, &mut args)?)),
            "--seed" => run.conf.rng_seed = Some(consume_num(&arg, &mut args)?),
            "--cycles" => run.cycles = consume_num(&arg, &mut args)?,
            "--keys" => {
                for c in consume_arg(&arg, &mut args)?.chars() {
                    run.keys.push_back(KeyCode::from_char(c)?);
                }
            }
            flag if flag.starts_with("--") => {
                return Err(AppError::args(format!("unknown option \"{flag}\"")))
            }
            _ if run.filepath.is_empty() => run.filepath = arg,
            _ => return Err(AppError::args(format!("unexpected argument \"{arg}\""))),
        }
    }

    if run.filepath.is_empty() {
        return Err(AppError::args("missing ROM file"));
    }

    Ok(run)
}

/// Consumes the value of an option.
fn consume_arg(name: &str, args: &mut impl Iterator<Item = String>) -> Result<String, AppError> {
    args.next()
        .ok_or_else(|| AppError::args(format!("option {name} expects a value")))
}

fn consume_num<N: std::str::FromStr>(
    name: &str,
    args: &mut impl Iterator<Item = String>,
) -> Result<N, AppError> {
    let value = consume_arg(name, args)?;
    value
        .parse()
        .map_err(|_| AppError::args(format!("option {name} expects a number, got \"{value}\"")))
}
