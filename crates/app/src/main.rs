mod args;
mod terminal;

use tracing::info;
use tracing_subscriber::EnvFilter;

use args::{Args, Command, print_usage, split_command};
use services::{AppServices, Clock};
use storage::Storage;

fn init_tracing(verbose: bool) {
    // Logs go to stderr so they never interleave with the quiz on stdout.
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let (cmd, rest) = split_command(argv).inspect_err(|_| print_usage())?;
    if cmd == Command::Help {
        print_usage();
        return Ok(());
    }
    let parsed = Args::parse(rest, |key| std::env::var(key).ok()).inspect_err(|_| print_usage())?;
    init_tracing(parsed.verbose);

    let settings = parsed.settings.clone().validate()?;
    let storage = match &parsed.bank {
        Some(path) => Storage::json_file(path.clone()),
        None => Storage::builtin(),
    };
    info!(bank = ?parsed.bank, ?settings, "starting");
    let app = AppServices::new(storage, settings, Clock::default_clock()).await?;

    match cmd {
        Command::Run => {
            let mut input = terminal::spawn_stdin_reader()?;
            let report = terminal::run_assessment(&app, parsed.seed, &mut input).await?;
            terminal::print_report(&report, parsed.json)
        }
        Command::Bank => {
            terminal::print_bank(&*app.bank().await?);
            Ok(())
        }
        Command::Help => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
