//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use vtools_core::Category;
use vtools_core::storage::DEFAULT_QUERY_LIMIT;

/// Crawl Zenodo for program-verification tools, classify them, and archive
/// the results as JSON, CSV and SQLite.
#[derive(Parser, Debug)]
#[command(name = "vtools")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a JSON config file (default: ./config.json when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the full pipeline: crawl, parse, store, upload (dry run by default)
    Run {
        /// Actually upload to GitHub
        #[arg(long)]
        live: bool,

        /// Open a summary issue after a live run
        #[arg(long, requires = "live")]
        issue: bool,
    },

    /// Crawl the query catalog and report the number of relevant hits
    Crawl,

    /// Quick unfiltered crawl written to JSON/CSV snapshots only
    Quick,

    /// Show database statistics
    Stats,

    /// List stored tools of one category
    Query {
        /// Category, e.g. termination or qbf_solver
        category: Category,

        /// Maximum number of tools to list
        #[arg(short, long, default_value_t = DEFAULT_QUERY_LIMIT, value_parser = clap::value_parser!(u32).range(1..=10_000))]
        limit: u32,
    },

    /// Write a backup archive of the database
    Backup,

    /// Show GitHub rate limit and repository access
    RepoStatus,
}

impl Default for Command {
    fn default() -> Self {
        Self::Run {
            live: false,
            issue: false,
        }
    }
}
