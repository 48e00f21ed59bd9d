//! Command-line argument parsing for agentkernel
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use crate::agent::Stage;
use crate::config::KernelConfig;
use crate::errors::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// agentkernel - drive an agent through a checkpointed lifecycle
#[derive(Parser, Debug)]
#[command(name = "agentkernel")]
#[command(version)]
#[command(about = "Drive an agent through a fixed lifecycle with isolated tool calls", long_about = None)]
pub struct Args {
    /// Configuration file path (~/.agentkernel/config.toml by default)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the built-in echo agent over an input and print the final blackboard
    Run {
        /// Input placed under the `input` key of the blackboard
        #[arg(value_name = "INPUT")]
        input: String,

        /// Reuse a run id instead of generating one
        #[arg(long)]
        run_id: Option<String>,
    },

    /// List runs that have checkpoints
    Runs,

    /// Print a checkpoint record
    Show {
        /// Run identifier
        run_id: String,

        /// Stage to load (latest completed stage by default)
        #[arg(long)]
        stage: Option<Stage>,
    },

    /// Print the trace events of a run
    Trace {
        /// Run identifier
        run_id: String,
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

    /// Load the configuration named by `--config`, or the default one
    pub fn load_config(&self) -> Result<KernelConfig> {
        match &self.config {
            Some(path) => KernelConfig::load(path),
            None => KernelConfig::load_or_default(),
        }
    }
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Log filter used when `RUST_LOG` is unset
    pub fn default_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "agentkernel=info",
            Verbosity::VeryVerbose => "agentkernel=debug",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(parse(&["agentkernel", "-q", "runs"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["agentkernel", "runs"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["agentkernel", "runs", "-v"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["agentkernel", "-vv", "runs"]).verbosity(), Verbosity::VeryVerbose);
    }

    #[test]
    fn test_run_command() {
        let args = parse(&["agentkernel", "run", "hello", "--run-id", "r1"]);
        match args.command {
            Commands::Run { input, run_id } => {
                assert_eq!(input, "hello");
                assert_eq!(run_id.as_deref(), Some("r1"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_show_parses_stage() {
        let args = parse(&["agentkernel", "show", "r1", "--stage", "decide"]);
        assert!(matches!(
            args.command,
            Commands::Show { stage: Some(Stage::Decide), .. }
        ));

        assert!(Args::try_parse_from(["agentkernel", "show", "r1", "--stage", "REFLECT"]).is_err());
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Args::try_parse_from(["agentkernel"]).is_err());
    }

    #[test]
    fn test_verbosity_methods() {
        assert_eq!(Verbosity::Normal.as_str(), "normal");
        assert_eq!(Verbosity::Normal.default_filter(), "warn");
        assert_eq!(Verbosity::VeryVerbose.default_filter(), "agentkernel=debug");
    }
}
