//! Redline - LLM-driven comparison of two versions of a legal document
//!
//! Two documents are loaded as text, passed through a fixed sequence of model
//! prompts (structure, semantics, combined assessment, risk, summary) and the
//! accumulated results are rendered as a markdown report.

pub mod analysis;
pub mod comparison;
pub mod config;
pub mod document;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod report;

pub use error::{RedlineError, Result};
