//! Command-line argument parsing for rolerag
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// rolerag - Ask questions over company documents, scoped to your role
#[derive(Parser, Debug)]
#[command(name = "rolerag")]
#[command(version)]
#[command(about = "Role-aware question answering over internal documents", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Document directory (overrides config)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Answer with retrieved excerpts instead of calling Ollama
    #[arg(long, global = true)]
    pub offline: bool,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Ask a single question
    Ask {
        /// Role the question is asked as
        #[arg(short, long)]
        role: String,

        /// Number of passages to retrieve (config default when omitted)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print the answer as JSON
        #[arg(long)]
        json: bool,

        /// The question
        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,
    },

    /// Interactive session as one role
    Chat {
        #[arg(short, long)]
        role: String,
    },

    /// Show roles, departments and capabilities
    Roles,

    /// List documents visible to a role
    Docs {
        #[arg(short, long)]
        role: String,
    },

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }
}

impl Commands {
    /// Joined question text for `ask`
    pub fn question_text(&self) -> Option<String> {
        match self {
            Commands::Ask { question, .. } => Some(question.join(" ")),
            _ => None,
        }
    }
}

impl Verbosity {
    /// Default `tracing` filter directive when `RUST_LOG` is unset
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "rolerag=info",
            Verbosity::VeryVerbose => "rolerag=debug",
        }
    }

    /// Check if should show progress bars
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }
}
