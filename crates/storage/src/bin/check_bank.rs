use std::fmt;
use std::path::PathBuf;

use quiz_core::model::DifficultyTier;
use storage::QuestionSource;
use storage::builtin::BuiltinBank;
use storage::json::JsonBankFile;

#[derive(Debug, Clone)]
struct Args {
    bank: Option<PathBuf>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidBankPath { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidBankPath { raw } => write!(f, "invalid --bank value: {raw:?}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut bank = std::env::var("QUIZ_BANK_PATH").ok().map(PathBuf::from);

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--bank" => {
                    let value = require_value(&mut args, "--bank")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidBankPath { raw: value });
                    }
                    bank = Some(PathBuf::from(value));
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { bank })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin check-bank -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --bank <path>   JSON bank document to validate (default: built-in bank)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_BANK_PATH");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        print_usage();
        e
    })?;

    let (label, bank) = match &args.bank {
        Some(path) => (
            path.display().to_string(),
            JsonBankFile::new(path).load_bank().await?,
        ),
        None => ("built-in bank".to_string(), BuiltinBank.load_bank().await?),
    };

    let counts = bank.tier_counts();
    println!("{label}: {} questions", bank.len());
    for tier in DifficultyTier::ALL {
        println!("  {:<10} {}", tier.label(), counts.get(tier));
    }
    let subjects: Vec<_> = bank.subjects().into_iter().collect();
    if !subjects.is_empty() {
        println!("  subjects: {}", subjects.join(", "));
    }
    for tier in DifficultyTier::ALL {
        if counts.get(tier) == 0 {
            println!("  warning: no {} questions; sessions will fall back to adjacent tiers", tier.label());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
