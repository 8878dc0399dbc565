//! Prompt System - Stage templates, overrides and rendering
//!
//! This module provides the built-in stage templates, loading of per-stage
//! overrides from a directory, and strict rendering with Handlebars.

mod loader;
mod render;
pub mod templates;

pub use loader::PromptLoader;
pub use render::PromptRenderer;
