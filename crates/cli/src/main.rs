mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use photomirror_core::Library;
use tracing_subscriber::EnvFilter;

/// Photomirror — offline mirror of a remote photo collection
#[derive(Parser)]
#[command(name = "photomirror", version, about)]
struct Cli {
    /// Path to the library database
    #[arg(long, default_value_t = default_library_path())]
    library: String,

    /// Path to the API credentials file
    #[arg(long, default_value_t = default_credentials_path())]
    credentials: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull remote changes into the local library
    Sync {
        /// Enumerate everything instead of only new uploads
        #[arg(long)]
        full: bool,
        /// Delete vanished photos outright instead of marking them removed
        #[arg(long)]
        purge_removed: bool,
        /// Directory to download thumbnails into
        #[arg(long)]
        thumbnails: Option<PathBuf>,
    },
    /// List all albums with photo counts
    Albums,
    /// Search photos by title, description, or tag
    Search {
        /// Text to look for
        query: String,
        /// Restrict results to one album ID
        #[arg(long)]
        album: Option<String>,
    },
    /// Show one photo with its albums and comments
    Photo {
        /// Photo ID
        id: String,
    },
    /// Show library status summary
    Status,
}

fn default_library_path() -> String {
    config_dir().join("library.db").to_string_lossy().to_string()
}

fn default_credentials_path() -> String {
    config_dir()
        .join("credentials.json")
        .to_string_lossy()
        .to_string()
}

fn config_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".photomirror")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut library = Library::open(&PathBuf::from(&cli.library))?;

    match cli.command {
        Commands::Sync {
            full,
            purge_removed,
            thumbnails,
        } => commands::sync::run(
            &mut library,
            &PathBuf::from(&cli.credentials),
            full,
            purge_removed,
            thumbnails,
        )?,
        Commands::Albums => commands::albums::run(&library)?,
        Commands::Search { query, album } => {
            commands::search::run(&library, &query, album.as_deref())?
        }
        Commands::Photo { id } => commands::photo::run(&library, &id)?,
        Commands::Status => commands::status::run(&library)?,
    }

    Ok(())
}
