//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

use crate::application::services::ExportFormat;
use crate::domain::KeyOrder;

/// Load, validate, query and re-emit Doxygen navigation tree data
#[derive(Parser, Debug)]
#[command(name = "doxnav")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output on stderr (-d info, -dd debug, -ddd trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub debug: u8,

    /// Use the navigation snapshot compiled into the binary
    #[arg(long, global = true)]
    pub bundled: bool,

    /// Key normalisation for shard lookups (bytewise, case-insensitive)
    #[arg(long, global = true)]
    pub key_order: Option<KeyOrder>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate navigation data and print a summary
    Check {
        /// Data file or documentation directory (default: configured doc_dir)
        #[arg(value_hint = ValueHint::AnyPath)]
        path: Option<PathBuf>,
    },

    /// Show the navigation tree
    Tree {
        #[arg(value_hint = ValueHint::AnyPath)]
        path: Option<PathBuf>,
        /// Maximum depth to display
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Find the shard an href is routed to
    Lookup {
        /// Href to look up, e.g. "classes.html#a3"
        key: String,
        #[arg(value_hint = ValueHint::AnyPath)]
        path: Option<PathBuf>,
    },

    /// Find an href in the tree and print its breadcrumbs
    Locate {
        /// Href to locate
        href: String,
        #[arg(value_hint = ValueHint::AnyPath)]
        path: Option<PathBuf>,
    },

    /// Rebuild shard pages and the shard index from the tree
    Index {
        #[arg(value_hint = ValueHint::AnyPath)]
        path: Option<PathBuf>,
        /// Hrefs per shard page (default: configured shard_size)
        #[arg(long)]
        shard_size: Option<usize>,
        /// Print the new boundaries without writing files
        #[arg(long)]
        dry_run: bool,
    },

    /// Write navigation data as script or JSON
    Export {
        #[arg(value_hint = ValueHint::AnyPath)]
        path: Option<PathBuf>,
        /// Output format (js, json)
        #[arg(short, long, default_value_t = ExportFormat::Js)]
        format: ExportFormat,
        /// Output file (default: stdout)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective config
    Show,

    /// Show config file locations
    Path,

    /// Create config file
    Init {
        /// Create global config instead of local
        #[arg(short, long)]
        global: bool,
    },
}
