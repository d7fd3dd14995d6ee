mod commands;
mod config;
mod render;

use std::path::PathBuf;

use agenda_core::NamedDateRange;
use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::Settings;

#[derive(Parser)]
#[command(name = "agenda")]
#[command(about = "Show upcoming events from your Home Assistant calendars")]
struct Cli {
    /// Config file (defaults to ~/.config/agenda/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch once and print the agenda
    Show {
        /// today, today_tomorrow, tomorrow, week or this_week
        #[arg(short, long)]
        range: Option<String>,

        /// Calendar to show instead of the configured ones (repeatable)
        #[arg(short, long = "calendar")]
        calendars: Vec<String>,

        /// Print the agenda as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the absolute window a named range resolves to
    Window {
        range: Option<String>,

        /// Resolve as of this instant (RFC 3339) instead of now
        #[arg(long)]
        at: Option<String>,

        /// 0 = Sunday, 1 = Monday, ... 6 = Saturday
        #[arg(long)]
        first_weekday: Option<u8>,
    },
    /// Keep the agenda on screen, refreshing periodically
    Watch {
        /// Seconds between refreshes
        #[arg(short, long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Show {
            range,
            calendars,
            json,
        } => {
            let card = commands::override_card(&settings.card, parse_range(range), &calendars);
            let settings = Settings { card, ..settings };
            commands::show::run(&settings, json).await
        }
        Commands::Window {
            range,
            at,
            first_weekday,
        } => commands::window::run(&settings, parse_range(range), at.as_deref(), first_weekday),
        Commands::Watch { interval } => {
            let path = Settings::resolve_path(cli.config.as_deref())?;
            commands::watch::run(path, settings, interval).await
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn parse_range(range: Option<String>) -> Option<NamedDateRange> {
    range.as_deref().map(NamedDateRange::parse)
}
