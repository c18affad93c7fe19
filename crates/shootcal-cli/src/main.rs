mod calendar;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use shootcal_core::{LocationFilter, MonthKey};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "shootcal")]
#[command(about = "Photo-shoot availability calendar")]
struct Cli {
    /// Use the built-in mock dataset instead of the records API
    #[arg(long, global = true)]
    preview: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show the sessions of one month
    Month {
        /// Month to show as YYYY-MM (defaults to the current month)
        #[arg(long, value_parser = parse_month)]
        month: Option<MonthKey>,
        /// Only show sessions at this location ("all" for every location)
        #[arg(long, default_value = "all")]
        location: LocationFilter,
    },
    /// List every known session from the current month forward
    Sessions {
        /// Only show sessions at this location ("all" for every location)
        #[arg(long, default_value = "all")]
        location: LocationFilter,
    },
    /// List the locations available for filtering
    Locations,
    /// Print the messaging link that starts a booking for a date
    Book {
        /// Session date as YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,
    },
    /// Show what the store has loaded
    Status,
}

fn parse_month(s: &str) -> Result<MonthKey, String> {
    MonthKey::parse_calendar(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = shootcal_core::load_app_config()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    config.preview |= cli.preview;
    tracing::debug!(?config, "loaded configuration");

    let Some(command) = cli.command else {
        println!("shootcal: pass --help to list commands");
        return Ok(());
    };

    let current_month = MonthKey::of(Local::now().date_naive());
    let store = calendar::build_store(&config, current_month)?;

    match command {
        Commands::Month { month, location } => {
            calendar::run_month(&store, month.unwrap_or(current_month), &location).await
        }
        Commands::Sessions { location } => calendar::run_sessions(&store, &location).await,
        Commands::Locations => calendar::run_locations(&store).await,
        Commands::Book { date } => calendar::run_book(&store, &config, date).await,
        Commands::Status => calendar::run_status(&store).await,
    }
}
