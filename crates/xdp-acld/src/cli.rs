//! Command line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

/// XDP ACL daemon
#[derive(Parser, Debug)]
#[command(name = "xdp-acld")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file
    #[arg(short = 'c', long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short = 'l', long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Load a rules file and report the resulting tables and buckets
    Check {
        /// Rules file (defaults to rules.default_file)
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },

    /// Classify hex frames, one verdict per input line
    Classify {
        /// Rules file (defaults to rules.default_file)
        #[arg(short, long, conflicts_with = "dump")]
        rules: Option<PathBuf>,

        /// Classify against a packed store dump instead of a rules file
        #[arg(short, long)]
        dump: Option<PathBuf>,

        /// File with one hex-encoded Ethernet frame per line
        #[arg(short, long)]
        frames: PathBuf,

        /// Worker count (overrides dataplane.workers)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Write the packed table and rule records for a rules file
    Dump {
        /// Rules file (defaults to rules.default_file)
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Output file
        #[arg(short, long)]
        out: PathBuf,
    },
}
