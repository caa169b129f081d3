mod search;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use search::SearchArgs;

#[derive(Debug, Parser)]
#[command(name = "nearhand")]
#[command(about = "Search local service providers from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search providers by category, location, name and filters
    Search(SearchArgs),
    /// List every provider the backend knows about
    Providers {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Label a position the way the search box would (reverse geocoding)
    Locate {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
    },
    /// Resolve a place name to coordinates
    Geocode {
        /// Free-text place name, e.g. "Springfield, IL"
        query: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("nearhand: try `nearhand search --help`");
        return Ok(());
    };

    let config = nearhand_core::load_app_config()?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    tracing::debug!(env = %config.env, "configuration loaded");

    match command {
        Commands::Search(args) => search::run_search(&config, &args).await,
        Commands::Providers { json } => search::run_providers(&config, json).await,
        Commands::Locate { lat, lon } => search::run_locate(&config, lat, lon).await,
        Commands::Geocode { query } => search::run_geocode(&config, &query).await,
    }
}
