use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Операторский CLI для файлов страниц tspager
#[derive(Parser, Debug)]
#[command(name = "tspager", version, about = "tspager page file CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Create a page file (optionally with N zero pages)
    Init {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = 4096)]
        page_size: usize,
        #[arg(long, default_value_t = 0)]
        pages: u32,
    },
    /// Show file size, identity and journal state (recovers a hot journal first)
    Status {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = 4096)]
        page_size: usize,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Read one page
    Read {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = 4096)]
        page_size: usize,
        #[arg(long)]
        pgno: u32,
        /// Optional file to write raw page bytes into
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Overwrite bytes inside one page and commit (value: literal, hex:.., @file, -)
    Write {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = 4096)]
        page_size: usize,
        #[arg(long)]
        pgno: u32,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        value: String,
    },
    /// Allocate N zero pages and commit
    Alloc {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = 4096)]
        page_size: usize,
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    /// Open the file, rolling back a hot journal if present
    Recover {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = 4096)]
        page_size: usize,
    },
    /// Inspect the journal without applying it
    Check {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = 4096)]
        page_size: usize,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}
