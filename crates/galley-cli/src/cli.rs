//! CLI argument definitions for Galley.
//!
//! Each command corresponds to a handler in the [`super::commands`] module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "galley",
    version,
    about = "Resolve and arrange feature-pack provisioning configs",
    long_about = "Galley resolves the feature-packs named by a provisioning config against \
                  their universes, merges package and config inclusion rules, and orders \
                  the resulting features into a replayable event stream."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Provisioning config to use instead of the nearest provisioning.toml
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Local artifact repository root, overriding ~/.galley/config.toml
    #[arg(short, long, global = true, value_name = "DIR", env = "GALLEY_REPOSITORY")]
    pub repository: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the feature-packs, packages and configs that would be installed
    Resolve {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Display the feature-pack dependency tree
    Tree {
        /// Maximum depth to display
        #[arg(short, long)]
        depth: Option<usize>,
        /// Show every request that reached a producer
        #[arg(long, value_name = "PRODUCER", conflicts_with = "overrides")]
        why: Option<String>,
        /// List producers whose requested builds were overridden
        #[arg(long)]
        overrides: bool,
    },

    /// Print the ordered feature events of each resolved config
    Arrange {
        /// Only configs matching this id or pattern (model/name, model/, /name)
        #[arg(long = "only", value_name = "CONFIG")]
        only: Option<String>,
    },
}

/// Parse command-line arguments into a [`Cli`] struct.
pub fn parse() -> Cli {
    Cli::parse()
}
