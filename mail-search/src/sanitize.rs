//! Free-text sanitizing boundary
//!
//! The controller trusts its input; text from users passes through a
//! [`Sanitizer`] before it reaches it.

use regex::Regex;

/// Cleans raw user input into query text
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, raw: &str) -> String;
}

/// Drops markup and collapses whitespace
#[derive(Debug, Clone)]
pub struct MarkupSanitizer {
    blocks: Regex,
    tags: Regex,
    spaces: Regex,
}

impl MarkupSanitizer {
    pub fn new() -> Self {
        Self {
            blocks: Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>")
                .expect("valid block pattern"),
            tags: Regex::new(r"(?s)<[^>]*>").expect("valid tag pattern"),
            spaces: Regex::new(r"\s+").expect("valid whitespace pattern"),
        }
    }
}

impl Default for MarkupSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sanitizer for MarkupSanitizer {
    fn sanitize(&self, raw: &str) -> String {
        let text = self.blocks.replace_all(raw, " ");
        let text = self.tags.replace_all(&text, " ");
        let text = self.spaces.replace_all(&text, " ");
        text.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_and_collapses() {
        let sanitizer = MarkupSanitizer::new();
        assert_eq!(sanitizer.sanitize("  gas   pipeline \n"), "gas pipeline");
    }

    #[test]
    fn test_strips_markup() {
        let sanitizer = MarkupSanitizer::new();
        assert_eq!(
            sanitizer.sanitize("<b>power</b> <script>alert(1)</script>trading"),
            "power trading"
        );
    }

    #[test]
    fn test_plain_text_untouched() {
        let sanitizer = MarkupSanitizer::new();
        assert_eq!(sanitizer.sanitize("ken lay"), "ken lay");
        assert_eq!(sanitizer.sanitize(""), "");
    }
}
