//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};

use crate::domain::Direction;

/// Validate, inspect and edit bounded-depth indicator trees
#[derive(Parser, Debug)]
#[command(name = "indtree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug level, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Local config file, merged over the global one
    #[arg(long, global = true, value_hint = ValueHint::FilePath, env = "INDTREE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check an import document and list every problem
    Validate {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Show the normalized tree with codes
    Show {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Write the canonical export document
    Normalize {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Output file (default: stdout)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// Count indicators and leaf records
    Stats {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Add an indicator (as a leaf)
    Add {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Parent indicator id (default: new root)
        #[arg(short, long)]
        parent: Option<String>,
        /// Level of the new node (default: derived from the parent)
        #[arg(short, long)]
        level: Option<u8>,
        #[arg(short, long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(short, long)]
        weight: Option<f64>,
        #[command(flatten)]
        write: WriteArgs,
    },

    /// Change name, description or weight of an indicator
    Edit {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        id: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(short, long, conflicts_with = "clear_weight")]
        weight: Option<f64>,
        /// Remove the weight
        #[arg(long)]
        clear_weight: bool,
        #[command(flatten)]
        write: WriteArgs,
    },

    /// Delete an indicator and its subtree
    Delete {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        id: String,
        #[command(flatten)]
        write: WriteArgs,
    },

    /// Swap an indicator with its neighbour
    Move {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        id: String,
        #[arg(value_enum)]
        direction: DirectionArg,
        #[command(flatten)]
        write: WriteArgs,
    },

    /// Move an indicator one level up, after its parent
    Promote {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        id: String,
        #[command(flatten)]
        write: WriteArgs,
    },

    /// Move an indicator into its preceding sibling
    Demote {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        id: String,
        #[command(flatten)]
        write: WriteArgs,
    },

    /// Manage data indicators of a leaf
    Data {
        #[command(subcommand)]
        command: DataCommands,
    },

    /// Manage supporting materials of a leaf
    Material {
        #[command(subcommand)]
        command: MaterialCommands,
    },

    /// Store a document as an indicator system
    Save {
        system_id: String,
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Load a stored indicator system
    Load {
        system_id: String,
        /// Output file (default: stdout)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// List stored indicator systems
    List,

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

/// Where mutation results go.
#[derive(Args, Debug, Clone, Copy)]
pub struct WriteArgs {
    /// Rewrite the input file instead of printing the result
    #[arg(short, long)]
    pub in_place: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionArg {
    Up,
    Down,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Up => Direction::Up,
            DirectionArg::Down => Direction::Down,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum DataCommands {
    /// Append a data indicator to a leaf
    Add {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        node: String,
        /// Default: configured data indicator name
        #[arg(short, long)]
        name: Option<String>,
        /// Comparison expression, e.g. ">= 4.2"
        #[arg(short, long, default_value = "")]
        threshold: String,
        #[command(flatten)]
        write: WriteArgs,
    },
    /// Remove a data indicator
    Remove {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        node: String,
        record: String,
        #[command(flatten)]
        write: WriteArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum MaterialCommands {
    /// Append a supporting material to a leaf
    Add {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        node: String,
        /// Default: configured material name
        #[arg(short, long)]
        name: Option<String>,
        /// Comma-separated allow-list (default: configured file types)
        #[arg(long)]
        file_types: Option<String>,
        /// Upload limit such as 10MB (default: configured max size)
        #[arg(long)]
        max_size: Option<String>,
        #[arg(long)]
        required: bool,
        #[command(flatten)]
        write: WriteArgs,
    },
    /// Remove a supporting material
    Remove {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        node: String,
        record: String,
        #[command(flatten)]
        write: WriteArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Print a commented template config
    Template,
    /// Show the global config file location
    Path,
}
