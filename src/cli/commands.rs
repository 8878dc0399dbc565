//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - compare: run the comparison pipeline on two documents
//! - stages: show the stage table in execution order

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Redline - LLM-driven comparison of two versions of a legal document
#[derive(Parser, Debug)]
#[command(name = "redline")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare two documents and write a markdown report
    Compare {
        /// Original document (PDF, DOCX or TXT)
        #[arg(long)]
        doc1: PathBuf,

        /// Revised document (PDF, DOCX or TXT)
        #[arg(long)]
        doc2: PathBuf,

        /// Where to write the report
        #[arg(short, long, default_value = "comparison_report.md")]
        output: PathBuf,

        /// Also write run metadata and every stage output as JSON
        #[arg(long)]
        state_json: Option<PathBuf>,

        /// Echo prompts back instead of calling the model service
        #[arg(long)]
        dry_run: bool,

        /// Override the configured model
        #[arg(short, long)]
        model: Option<String>,
    },

    /// List pipeline stages in execution order
    Stages,
}
