//! blobfile CLI
//!
//! Stores files in, and reads them back out of, a single blob file.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use blobfile::{AccessMode, BlobDatabase, EntryId};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// blobfile
#[derive(Parser, Debug)]
#[command(name = "blobfile")]
#[command(about = "Store many files inside one paged file")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store files and print their identifiers
    Put {
        /// Database file (created if missing)
        db: PathBuf,

        /// Files to store
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Copy a stored file to a path
    Get {
        db: PathBuf,
        id: EntryId,
        out: PathBuf,
    },

    /// Write a stored file to stdout
    Cat { db: PathBuf, id: EntryId },

    /// Delete a stored file
    Rm { db: PathBuf, id: EntryId },

    /// List stored files
    Ls { db: PathBuf },

    /// Copy every stored file into a directory
    Export {
        db: PathBuf,
        dir: PathBuf,

        /// File name pattern; {id}, {filename} and {extension} are replaced
        #[arg(short, long, default_value = blobfile::database::DEFAULT_EXPORT_PATTERN)]
        pattern: String,
    },

    /// Rewrite the database without deleted files
    Shrink { db: PathBuf },

    /// Print every page of the database
    Dump { db: PathBuf },
}

fn main() -> ExitCode {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,blobfile=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    match run(args.command) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> blobfile::Result<ExitCode> {
    match command {
        Commands::Put { db, files } => {
            let mut db = BlobDatabase::open(db, AccessMode::ReadWrite)?;
            for file in files {
                let entry = db.store_file(&file)?;
                println!("{}  {}", entry.id(), entry.file_name());
            }
            db.close()?;
        }

        Commands::Get { db, id, out } => {
            let mut db = BlobDatabase::open(db, AccessMode::ReadOnly)?;
            if db.read_to_file(&id, &out)?.is_none() {
                return Ok(not_found(&id));
            }
        }

        Commands::Cat { db, id } => {
            let mut db = BlobDatabase::open(db, AccessMode::ReadOnly)?;
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            if db.read(&id, &mut lock)?.is_none() {
                return Ok(not_found(&id));
            }
            lock.flush()?;
        }

        Commands::Rm { db, id } => {
            let mut db = BlobDatabase::open(db, AccessMode::ReadWrite)?;
            let found = db.delete(&id)?;
            db.close()?;
            if !found {
                return Ok(not_found(&id));
            }
        }

        Commands::Ls { db } => {
            let mut db = BlobDatabase::open(db, AccessMode::ReadOnly)?;
            for entry in db.list()? {
                println!("{entry}");
            }
        }

        Commands::Export { db, dir, pattern } => {
            let mut db = BlobDatabase::open(db, AccessMode::ReadOnly)?;
            for path in db.export_with_pattern(&dir, &pattern)? {
                println!("{}", path.display());
            }
        }

        Commands::Shrink { db } => {
            let mut db = BlobDatabase::open(db, AccessMode::ReadWrite)?;
            let saved = db.shrink()?;
            db.close()?;
            println!("reclaimed {saved} bytes");
        }

        Commands::Dump { db } => {
            let mut db = BlobDatabase::open(db, AccessMode::ReadOnly)?;
            print!("{}", db.engine()?.dump_pages()?);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn not_found(id: &EntryId) -> ExitCode {
    eprintln!("no entry {id}");
    ExitCode::from(2)
}
