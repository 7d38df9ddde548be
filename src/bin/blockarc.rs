//! blockarc CLI
//!
//! Command-line front end for block archives.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use blockarc::{Archive, Config, SyncStrategy, TracingObserver};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// blockarc
#[derive(Parser, Debug)]
#[command(name = "blockarc")]
#[command(about = "Store files in a single block archive")]
#[command(version)]
struct Args {
    /// Archive name (".arc" is appended when missing)
    #[arg(short, long)]
    archive: PathBuf,

    /// Sync the archive after every mutating command
    #[arg(long)]
    sync: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new, empty archive
    Create,

    /// Add a file
    Add {
        /// Path of the file to add
        file: PathBuf,
    },

    /// Extract a file
    Extract {
        /// Name of the file inside the archive
        name: String,

        /// Destination path (defaults to the name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Remove a file
    Del {
        /// Name of the file inside the archive
        name: String,
    },

    /// List files
    List,

    /// Show the state of every block
    Dump,

    /// Rewrite the archive without free blocks
    Compact,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,blockarc=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> blockarc::Result<()> {
    let strategy = if args.sync {
        SyncStrategy::EveryOperation
    } else {
        SyncStrategy::OnClose
    };
    let config = Config::builder()
        .path(&args.archive)
        .sync_strategy(strategy)
        .build();

    let mut archive = match args.command {
        Commands::Create => Archive::create(config)?,
        _ => Archive::open(config)?,
    };
    archive.add_observer(Arc::new(TracingObserver));

    let mut stdout = io::stdout().lock();

    match args.command {
        Commands::Create => {
            tracing::info!("Created {}", archive.full_path().display());
        }
        Commands::Add { file } => archive.add(&file)?,
        Commands::Extract { name, output } => {
            let output = output.unwrap_or_else(|| PathBuf::from(&name));
            archive.extract(&name, output)?;
        }
        Commands::Del { name } => archive.remove(&name)?,
        Commands::List => {
            let count = archive.list(&mut stdout)?;
            tracing::info!("{} file(s)", count);
        }
        Commands::Dump => {
            let count = archive.debug_dump(&mut stdout)?;
            tracing::info!("{} block(s), {} free", count, archive.free_block_count());
        }
        Commands::Compact => {
            let count = archive.compact()?;
            tracing::info!("Compacted to {} block(s)", count);
        }
    }

    archive.close()
}
