// ============================================================================
// File: src/markdown.rs
// Markdown export of the references for a search
// ============================================================================

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub const README_HEADING: &str = "# Fun Fact Explanation";

pub struct MarkdownExporter<'a> {
    elaboration: &'a str,
}

impl<'a> MarkdownExporter<'a> {
    pub fn new(elaboration: &'a str) -> Self {
        Self { elaboration }
    }

    /// Write the document to `path`, replacing whatever was there.
    pub fn export(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    fn render(&self) -> String {
        let mut content = String::new();
        content.push_str(README_HEADING);
        content.push_str("\n\n");
        content.push_str(self.elaboration);
        content
    }
}
