//! Prompt Loader - Load stage template overrides from a directory
//!
//! A file named `<stage_name>.md` in the configured prompts directory replaces
//! the built-in template for that stage.

use std::path::{Path, PathBuf};

use crate::error::{RedlineError, Result};

/// Loads prompt template overrides from a directory
#[derive(Debug, Clone)]
pub struct PromptLoader {
    /// Base directory containing prompt template files
    templates_dir: PathBuf,
}

impl PromptLoader {
    /// Create a new PromptLoader with the given templates directory
    pub fn new(templates_dir: impl AsRef<Path>) -> Self {
        Self {
            templates_dir: templates_dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the template file for a stage
    pub fn template_path(&self, name: &str) -> PathBuf {
        self.templates_dir.join(format!("{}.md", name))
    }

    /// Check if an override exists on disk
    pub fn exists(&self, name: &str) -> bool {
        self.template_path(name).is_file()
    }

    /// Load a template from disk
    pub fn load(&self, name: &str) -> Result<String> {
        let path = self.template_path(name);
        std::fs::read_to_string(&path).map_err(|e| {
            RedlineError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to load template '{}' from {:?}: {}", name, path, e),
            ))
        })
    }

    /// Load a template if an override exists, otherwise None
    pub fn load_optional(&self, name: &str) -> Result<Option<String>> {
        if self.exists(name) {
            self.load(name).map(Some)
        } else {
            Ok(None)
        }
    }
}
