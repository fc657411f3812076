//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Talent tree planner: check and apply point allocations against tree rules
#[derive(Parser, Debug)]
#[command(name = "talentcalc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Project directory holding .talentcalc.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    /// Talent catalog file (overrides config)
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub catalog: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show all trees and the point budget
    Show,

    /// Apply steps (tree:talent+, tree:talent-, reset) and report each outcome
    Plan {
        /// Steps in order
        #[arg(required = true)]
        steps: Vec<String>,
        /// Exit with an error if any step was declined
        #[arg(long)]
        strict: bool,
    },

    /// Show one talent in detail after applying steps
    Inspect {
        /// Talent as tree:talent
        target: String,
        /// Steps to apply first
        steps: Vec<String>,
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
