use crate::NoteBackend;
use crate::app::NoteService;
use crate::backends::{MemoryBackend, SqliteBackend};

use clap::{Parser, Subcommand};
use log::{LevelFilter, info};
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "notes.db";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Longest accepted note title, in bytes
    #[arg(long, default_value_t = 128)]
    pub max_title_size: u16,
    /// Largest accepted note content, in bytes
    #[arg(long, default_value_t = 10 * 1024 * 1024)]
    pub max_content_size: usize,
    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value_t = LevelFilter::Info)]
    pub log_level: LevelFilter,
    #[command(subcommand)]
    pub backend: Option<Backend>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Store notes in an SQLite database file (default)
    Sqlite {
        #[arg(short, long, default_value = DEFAULT_DB_PATH)]
        path: PathBuf,
    },
    /// Keep notes in memory until the program exits
    Memory,
}

impl Args {
    /// Selected backend, falling back to `SQLite` at `DEFAULT_DB_PATH`
    #[must_use]
    pub fn backend(&self) -> Backend {
        self.backend.clone().unwrap_or_else(|| Backend::Sqlite {
            path: PathBuf::from(DEFAULT_DB_PATH),
        })
    }
}

/// Initializes a `NoteService` from the parsed command-line arguments.
///
/// The database is not touched here. `SqliteBackend` creates its table on first use,
/// so an unusable path is reported by the first operation.
#[must_use]
pub fn build_service(args: &Args) -> NoteService {
    // Allow any struct that implements NoteBackend, and store on heap because size is unknown at compile time
    let repo: Box<dyn NoteBackend> = match args.backend() {
        Backend::Sqlite { path } => {
            info!("Using notes database at '{}'", path.display());
            Box::new(SqliteBackend::new(path))
        }
        Backend::Memory => {
            info!("Using in-memory notes. Nothing is saved on exit");
            Box::new(MemoryBackend::new())
        }
    };

    NoteService::new(repo, args.max_title_size, args.max_content_size)
}
