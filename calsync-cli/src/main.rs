mod commands;
mod config;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "calsync")]
#[command(about = "Sync remote calendar events into a local event store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage registered calendars
    Calendars {
        #[command(subcommand)]
        action: CalendarsAction,
    },
    /// Run one sync pass
    Sync {
        /// Only operate on this calendar (by slug)
        #[arg(short, long)]
        calendar: Option<String>,

        /// Ignore the stored sync cursor and re-fetch from scratch
        #[arg(long)]
        full: bool,
    },
    /// Show registered calendars and their sync state
    Status {
        /// Only operate on this calendar (by slug)
        #[arg(short, long)]
        calendar: Option<String>,
    },
    /// Keep syncing on an interval
    Watch {
        /// How often to run (e.g. "90s", "15m")
        #[arg(long, default_value = "15m")]
        every: String,
    },
}

#[derive(Subcommand)]
enum CalendarsAction {
    /// Register a calendar
    Add {
        /// Local identifier
        slug: String,
        /// The provider's calendar id (e.g. "primary" or an address)
        calendar_id: String,
        /// Display name (defaults to the slug)
        #[arg(long)]
        name: Option<String>,
    },
    /// List registered calendars
    List,
    /// Unregister a calendar and delete its local events
    Remove { slug: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Calendars { action } => match action {
            CalendarsAction::Add {
                slug,
                calendar_id,
                name,
            } => commands::calendars::add(&slug, &calendar_id, name.as_deref()),
            CalendarsAction::List => commands::calendars::list(),
            CalendarsAction::Remove { slug } => commands::calendars::remove(&slug),
        },
        Commands::Sync { calendar, full } => commands::sync::run(calendar.as_deref(), full).await,
        Commands::Status { calendar } => commands::status::run(calendar.as_deref()).await,
        Commands::Watch { every } => commands::watch::run(&every).await,
    }
}
