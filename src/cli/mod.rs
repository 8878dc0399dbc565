//! CLI module for redline - command-line interface and subcommands.
//!
//! Provides the `compare` entry point and a `stages` listing.

pub mod commands;

pub use commands::Cli;
