//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

use crate::domain::EntityId;

/// Portfolio allocation normalizer: keep fund shares summing to 100%
#[derive(Parser, Debug)]
#[command(name = "fundsplit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Data directory (overrides config and FUNDSPLIT_DATA_DIR)
    #[arg(short = 'D', long, global = true, value_hint = ValueHint::DirPath)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an allocation for the selected funds (equal split)
    Init {
        /// Fund ids, in display order
        #[arg(required = true, num_args = 1..)]
        ids: Vec<EntityId>,
    },

    /// Set one fund's share and rebalance the others
    Set {
        /// Fund id
        id: EntityId,
        /// Requested share in percent (clamped to the configured bounds)
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },

    /// Show the current allocation
    Show {
        /// Print the {id, share} records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the current total (exit 65 when not 100%)
    Total,

    /// Show the slider step for the current fund count
    Step,

    /// Confirm and store the current allocation
    Confirm,

    /// Drop the current allocation
    Discard,

    /// List confirmed allocations
    History {
        /// Print as JSON
        #[arg(long)]
        json: bool,
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
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}
