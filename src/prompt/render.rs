//! Prompt Renderer - Render stage templates with state values using Handlebars
//!
//! Rendering is strict: a placeholder without a value is an error rather than
//! an empty string, so a stage can never silently send a prompt with a hole in it.

use std::collections::HashMap;

use handlebars::Handlebars;

use crate::error::{RedlineError, Result};

/// Renders prompt templates using Handlebars templating
pub struct PromptRenderer {
    handlebars: Handlebars<'static>,
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRenderer {
    /// Create a new PromptRenderer with strict variable lookup
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        // Contract text must reach the model byte for byte
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }

    /// Compile and register a named template
    pub fn register_template(&mut self, name: &str, template: &str) -> Result<()> {
        self.handlebars
            .register_template_string(name, template)
            .map_err(|e| RedlineError::Template(format!("Failed to register template '{}': {}", name, e)))
    }

    /// Render a previously registered template
    pub fn render_named(&self, name: &str, context: &HashMap<String, String>) -> Result<String> {
        self.handlebars
            .render(name, context)
            .map_err(|e| RedlineError::Template(format!("Failed to render template '{}': {}", name, e)))
    }
}
