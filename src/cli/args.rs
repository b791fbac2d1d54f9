//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

use crate::domain::UnitType;

/// Inspect organizational unit hierarchies: trees, paths, filters and statistics
#[derive(Parser, Debug)]
#[command(name = "orgtree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Local config file (TOML), layered over the global config
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Query a hierarchy file
    Tree {
        #[command(subcommand)]
        command: TreeCommands,
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

/// Tree subcommands. FILE holds a flat unit array or nested hierarchies;
/// when omitted, `units_file` from the settings is used.
#[derive(Subcommand, Debug)]
pub enum TreeCommands {
    /// Render the hierarchy as a tree
    Show {
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
        /// Start at this unit
        #[arg(short, long)]
        root: Option<i64>,
    },

    /// List units in pre-order
    Flat {
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
        /// Start at this unit
        #[arg(short, long)]
        root: Option<i64>,
    },

    /// Show one unit as JSON
    Find {
        /// Unit id
        id: i64,
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
    },

    /// Show the chain of units from the root down to a unit
    Path {
        /// Unit id
        id: i64,
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
    },

    /// Keep only units of a type (and their ancestors)
    Filter {
        /// Unit type, e.g. department or RESEARCH_CENTER
        unit_type: UnitType,
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
    },

    /// Show hierarchy statistics
    Stats {
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
        /// Start at this unit
        #[arg(short, long)]
        root: Option<i64>,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Validate a nested hierarchy document and print it normalized
    Nested {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Print config template
    Template,

    /// Show config paths
    Path,
}
