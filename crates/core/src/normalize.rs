//! Text normalization for extracted slide content.
//!
//! Backends hand over raw text fragments (shape paragraphs, table cells, PDF
//! page text). The normalizer turns them into the single block of text the
//! verifier sees: NFC-composed, control characters dropped, whitespace runs
//! collapsed, blank lines removed.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Regex to collapse multiple horizontal whitespace characters into one.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{00A0}\u{3000}]+").unwrap());

/// Text normalizer for slide content.
#[derive(Debug, Clone)]
pub struct SlideTextNormalizer {
    /// Whether to keep line breaks between fragments.
    preserve_line_breaks: bool,
}

impl Default for SlideTextNormalizer {
    fn default() -> Self {
        Self {
            preserve_line_breaks: true,
        }
    }
}

impl SlideTextNormalizer {
    /// Create a new normalizer that keeps line breaks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to preserve line breaks.
    pub fn with_preserve_line_breaks(mut self, preserve: bool) -> Self {
        self.preserve_line_breaks = preserve;
        self
    }

    /// Normalize one block of text.
    pub fn normalize(&self, text: &str) -> String {
        let composed: String = text
            .replace("\r\n", "\n")
            .replace(['\r', '\u{000B}'], "\n")
            .nfc()
            .filter(|c| *c == '\n' || *c == '\t' || !c.is_control())
            .collect();

        let lines = composed
            .lines()
            .map(|line| WHITESPACE_COLLAPSE_REGEX.replace_all(line, " ").trim().to_string())
            .filter(|line| !line.is_empty());

        if self.preserve_line_breaks {
            lines.collect::<Vec<_>>().join("\n")
        } else {
            lines.collect::<Vec<_>>().join(" ")
        }
    }

    /// Normalize and join several fragments belonging to one slide.
    pub fn join_fragments<S: AsRef<str>>(&self, fragments: &[S]) -> String {
        let parts: Vec<String> = fragments
            .iter()
            .map(|f| self.normalize(f.as_ref()))
            .filter(|f| !f.is_empty())
            .collect();

        if self.preserve_line_breaks {
            parts.join("\n")
        } else {
            parts.join(" ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        let normalizer = SlideTextNormalizer::new();

        assert_eq!(normalizer.normalize("Hello    world"), "Hello world");
        assert_eq!(normalizer.normalize("  Hello  "), "Hello");
        assert_eq!(normalizer.normalize("\t\tHello\t\t"), "Hello");
        assert_eq!(normalizer.normalize("全角\u{3000}\u{3000}空白"), "全角 空白");
    }

    #[test]
    fn test_drop_blank_lines_and_controls() {
        let normalizer = SlideTextNormalizer::new();

        assert_eq!(
            normalizer.normalize("Transformer\r\n\r\n  \n2017\u{0007}"),
            "Transformer\n2017"
        );
        assert_eq!(normalizer.normalize("a\u{000B}b"), "a\nb");
    }

    #[test]
    fn test_nfc_composition() {
        let normalizer = SlideTextNormalizer::new();
        // "e" + combining acute accent
        assert_eq!(normalizer.normalize("caf\u{0065}\u{0301}"), "caf\u{00E9}");
    }

    #[test]
    fn test_single_line_mode() {
        let normalizer = SlideTextNormalizer::new().with_preserve_line_breaks(false);
        assert_eq!(normalizer.normalize("one\ntwo\n\nthree"), "one two three");
    }

    #[test]
    fn test_join_fragments() {
        let normalizer = SlideTextNormalizer::new();
        let fragments = vec!["Title ", "", "  Body\ttext ", "\n"];
        assert_eq!(normalizer.join_fragments(&fragments), "Title\nBody text");
    }
}
