use std::fmt;
use std::path::PathBuf;

use quiz_core::model::AssessmentSettingsDraft;

#[derive(Debug)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidNumber { source: &'static str, raw: String },
    InvalidPath { source: &'static str },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidNumber { source, raw } => {
                write!(f, "invalid {source} value: {raw}")
            }
            ArgsError::InvalidPath { source } => write!(f, "{source} must not be empty"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Run,
    Bank,
    Help,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "run" => Some(Self::Run),
            "bank" => Some(Self::Bank),
            "help" => Some(Self::Help),
            _ => None,
        }
    }
}

/// Resolved command line: env vars first, flags override.
#[derive(Debug, Clone, Default)]
pub struct Args {
    pub bank: Option<PathBuf>,
    pub settings: AssessmentSettingsDraft,
    pub seed: Option<u64>,
    pub json: bool,
    pub verbose: bool,
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  quiz [run]  [--bank <path>] [--questions <n>] [--time-limit <secs>] [--seed <n>]");
    eprintln!("             [--start-level <1-4>] [--topic <name>]... [--json] [--verbose]");
    eprintln!("  quiz bank   [--bank <path>] [--verbose]");
    eprintln!();
    eprintln!("Defaults for run:");
    eprintln!("  built-in bank, 10 questions, 300 second limit (0 disables it), level 3, all topics");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_BANK_PATH, QUIZ_QUESTIONS, QUIZ_TIME_LIMIT_SECS, QUIZ_SEED,");
    eprintln!("  QUIZ_START_LEVEL, QUIZ_TOPICS (comma separated), RUST_LOG");
}

/// Split off the subcommand; a leading flag or no argument means `run`.
///
/// # Errors
///
/// Returns `ArgsError::UnknownCommand` for an unrecognised first word.
pub fn split_command(mut argv: Vec<String>) -> Result<(Command, Vec<String>), ArgsError> {
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Run,
        Some("--help" | "-h") => Command::Help,
        Some(first) if first.starts_with("--") => return Ok((Command::Run, argv)),
        Some(first) => {
            Command::from_arg(first).ok_or_else(|| ArgsError::UnknownCommand(first.to_string()))?
        }
    };
    if !argv.is_empty() {
        argv.remove(0);
    }
    Ok((cmd, argv))
}

impl Args {
    /// Layer `env` under the flags in `args`.
    ///
    /// # Errors
    ///
    /// Returns `ArgsError` for unknown flags, missing values, or unparsable numbers.
    pub fn parse(
        args: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut parsed = Self::default();

        if let Some(path) = env("QUIZ_BANK_PATH") {
            parsed.bank = Some(non_empty_path(path, "QUIZ_BANK_PATH")?);
        }
        if let Some(raw) = env("QUIZ_QUESTIONS") {
            parsed.settings.total_questions = Some(parse_number(&raw, "QUIZ_QUESTIONS")?);
        }
        if let Some(raw) = env("QUIZ_TIME_LIMIT_SECS") {
            parsed.settings.time_limit_secs = Some(parse_number(&raw, "QUIZ_TIME_LIMIT_SECS")?);
        }
        if let Some(raw) = env("QUIZ_SEED") {
            parsed.seed = Some(parse_number(&raw, "QUIZ_SEED")?);
        }
        if let Some(raw) = env("QUIZ_START_LEVEL") {
            parsed.settings.starting_level = Some(parse_number(&raw, "QUIZ_START_LEVEL")?);
        }
        if let Some(raw) = env("QUIZ_TOPICS") {
            parsed.settings.topics = raw
                .split(',')
                .map(str::trim)
                .filter(|topic| !topic.is_empty())
                .map(str::to_string)
                .collect();
        }

        // repeated --topic flags replace the env list as a whole
        let mut flag_topics = Vec::new();

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--bank" => {
                    let value = require_value(&mut args, "--bank")?;
                    parsed.bank = Some(non_empty_path(value, "--bank")?);
                }
                "--questions" => {
                    let value = require_value(&mut args, "--questions")?;
                    parsed.settings.total_questions = Some(parse_number(&value, "--questions")?);
                }
                "--time-limit" => {
                    let value = require_value(&mut args, "--time-limit")?;
                    parsed.settings.time_limit_secs = Some(parse_number(&value, "--time-limit")?);
                }
                "--seed" => {
                    let value = require_value(&mut args, "--seed")?;
                    parsed.seed = Some(parse_number(&value, "--seed")?);
                }
                "--start-level" => {
                    let value = require_value(&mut args, "--start-level")?;
                    parsed.settings.starting_level = Some(parse_number(&value, "--start-level")?);
                }
                "--topic" => flag_topics.push(require_value(&mut args, "--topic")?),
                "--json" => parsed.json = true,
                "--verbose" | "-v" => parsed.verbose = true,
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        if !flag_topics.is_empty() {
            parsed.settings.topics = flag_topics;
        }

        Ok(parsed)
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number<T: std::str::FromStr>(raw: &str, source: &'static str) -> Result<T, ArgsError> {
    raw.trim().parse().map_err(|_| ArgsError::InvalidNumber {
        source,
        raw: raw.to_string(),
    })
}

fn non_empty_path(raw: String, source: &'static str) -> Result<PathBuf, ArgsError> {
    if raw.trim().is_empty() {
        return Err(ArgsError::InvalidPath { source });
    }
    Ok(PathBuf::from(raw))
}
