use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

mod config;
mod data;
mod error;
mod export;
mod html;
mod parser;
mod scheduler;
mod server;
mod trial;
mod types;

use config::AppConfig;
use export::CsvLayout;
use trial::TrialStatus;
use types::Roster;

#[derive(Parser, Debug)]
#[command(name = "turnista")]
#[command(about = "Generate staff shift rosters for small businesses")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory holding the trial file
    #[arg(short, long, default_value = ".", global = true)]
    data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the web interface (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Generate a roster from a JSON request file
    Generate {
        /// Path to the request JSON
        input: PathBuf,

        #[command(flatten)]
        output: OutputArgs,

        /// Override the seed stored in the request
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Export a previously saved roster JSON
    Export {
        /// Path to the roster JSON
        roster: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show the trial status
    Trial,
}

#[derive(clap::Args, Debug)]
struct OutputArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// CSV layout
    #[arg(short, long, value_enum, default_value_t = CsvLayout::Grid)]
    layout: CsvLayout,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Chat,
    Json,
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level))
        .add_directive("hyper=warn".parse()?)
        .add_directive("tower_http=warn".parse()?);

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_max_level(Level::TRACE)
        .init();

    Ok(())
}

/// Refuse to run once the trial is over
fn require_trial(config: &AppConfig, data_dir: &Path) -> Result<()> {
    let status = trial::check_trial(data_dir, config.trial_days, Local::now().date_naive())?;
    if status.is_expired() {
        bail!("The trial has ended");
    }
    Ok(())
}

fn write_output(roster: &Roster, config: &AppConfig, args: &OutputArgs) -> Result<()> {
    if let (OutputFormat::Json, Some(path)) = (args.format, &args.output) {
        data::save_roster(roster, path)?;
        info!(path = %path.display(), "Roster saved");
        return Ok(());
    }

    let text = match args.format {
        OutputFormat::Csv => export::to_csv(roster, args.layout)?,
        OutputFormat::Chat => export::to_chat_text(roster, &config.company),
        OutputFormat::Json => serde_json::to_string_pretty(roster)?,
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Roster written");
        }
        None => print!("{}", text),
    }

    Ok(())
}

fn warn_uncovered(roster: &Roster) {
    for slot in roster.uncovered() {
        warn!(date = %slot.date, shift = %slot.shift, role = %slot.role, "Uncovered slot");
    }
    for conflict in roster.conflicts() {
        warn!(%conflict, "Rule broken");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args.log_level)?;

    let config = AppConfig::from_env()?;

    match args.command {
        // Default to serve if no command specified
        None => {
            require_trial(&config, &args.data_dir)?;
            let state = Arc::new(server::AppState::new(config, args.data_dir));
            server::serve(8080, state).await?;
        }
        Some(Commands::Serve { port }) => {
            require_trial(&config, &args.data_dir)?;
            let state = Arc::new(server::AppState::new(config, args.data_dir));
            server::serve(port, state).await?;
        }
        Some(Commands::Generate { input, output, seed }) => {
            require_trial(&config, &args.data_dir)?;
            let mut request = data::load_request(&input)?;
            if seed.is_some() {
                request.seed = seed;
            }
            let roster = scheduler::generate(&request)
                .with_context(|| format!("Cannot generate a roster from {}", input.display()))?;
            warn_uncovered(&roster);
            write_output(&roster, &config, &output)?;
        }
        Some(Commands::Export { roster, output }) => {
            require_trial(&config, &args.data_dir)?;
            let roster = data::load_roster(&roster)?;
            warn_uncovered(&roster);
            write_output(&roster, &config, &output)?;
        }
        Some(Commands::Trial) => {
            let today = Local::now().date_naive();
            match trial::check_trial(&args.data_dir, config.trial_days, today)? {
                TrialStatus::Disabled => println!("No trial configured"),
                TrialStatus::Active { days_left } => println!("Trial active, {} days left", days_left),
                TrialStatus::Expired { trial_days } => {
                    println!("The {}-day trial has ended", trial_days)
                }
            }
        }
    }

    Ok(())
}
