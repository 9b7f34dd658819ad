//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};
use clap_complete::Shell;

/// Identity forest: hierarchical name nodes with shared-identity instances
#[derive(Parser, Debug)]
#[command(name = "idforest")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug level, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Forest document (default: from settings)
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,

    /// Print author and version
    #[arg(long)]
    pub info: bool,

    /// Generate shell completions
    #[arg(long = "generate", value_enum)]
    pub generator: Option<Shell>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Nodes are addressed by child-index paths from the top level, e.g. `0/2/1`.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a new person under each parent (top level if none)
    Add {
        /// Name, prompted on stdin if omitted
        name: Option<String>,
        /// Parent node path, repeatable
        #[arg(short, long = "parent")]
        parents: Vec<String>,
    },

    /// Add an instance of each node next to it, sharing its identity
    Instance {
        /// Node paths
        #[arg(required = true)]
        nodes: Vec<String>,
    },

    /// Delete nodes together with their subtrees
    Delete {
        /// Node paths
        #[arg(required = true)]
        nodes: Vec<String>,
    },

    /// Rename a node's identity, updating every instance
    Rename {
        /// Node path
        node: String,
        /// New name, prompted on stdin if omitted
        name: Option<String>,
    },

    /// Show the forest, highlighting shared instances of the selection
    Tree {
        /// Selected node path, repeatable
        #[arg(short, long = "select")]
        selected: Vec<String>,
    },

    /// List every node sharing the identity of NODE
    Instances {
        /// Node path
        node: String,
    },

    /// List live identities
    Identities,

    /// Print the forest document as JSON
    Export,

    /// Show effective settings
    Config,
}
