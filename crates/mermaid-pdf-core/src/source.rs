//! Diagram source extraction.
//!
//! Users paste raw Mermaid code or upload a markdown document that contains a
//! fenced ```` ```mermaid ```` block. [`DiagramSource::extract`] accepts both.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;

static MERMAID_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```mermaid\s*([\s\S]*?)\s*```").expect("mermaid fence pattern is valid")
});

/// Text of a single Mermaid diagram, ready to hand to a renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramSource(String);

impl DiagramSource {
    /// Extracts diagram source from pasted or uploaded text.
    ///
    /// The first fenced ```` ```mermaid ```` block wins and its trimmed interior
    /// is used. Without a (non-empty) fenced block, the text is used as is.
    ///
    /// # Examples
    ///
    /// ```
    /// # use mermaid_pdf_core::source::DiagramSource;
    /// let doc = "# Title\n\n```mermaid\ngraph TD;\n  A-->B;\n```\n";
    /// assert_eq!(DiagramSource::extract(doc).as_str(), "graph TD;\n  A-->B;");
    ///
    /// let raw = "graph LR; A-->B;";
    /// assert_eq!(DiagramSource::extract(raw).as_str(), raw);
    /// ```
    pub fn extract(text: &str) -> Self {
        let fenced = MERMAID_BLOCK
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|block| block.as_str().trim())
            .filter(|block| !block.is_empty());

        match fenced {
            Some(block) => {
                debug!(len = block.len(); "Extracted mermaid code from markdown block");
                Self(block.to_string())
            }
            None => Self(text.to_string()),
        }
    }

    /// Returns the diagram text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` when there is nothing but whitespace to render.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl AsRef<str> for DiagramSource {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_text_is_kept_verbatim() {
        let raw = "  graph TD;\n    A-->B;\n";
        assert_eq!(DiagramSource::extract(raw).as_str(), raw);
    }

    #[test]
    fn test_fenced_block_is_extracted_and_trimmed() {
        let doc = "Intro text\n\n```mermaid\n\n  sequenceDiagram\n  A->>B: hi\n\n```\n\nOutro";
        assert_eq!(
            DiagramSource::extract(doc).as_str(),
            "sequenceDiagram\n  A->>B: hi"
        );
    }

    #[test]
    fn test_first_block_wins() {
        let doc = "```mermaid\ngraph TD; A-->B;\n```\n\n```mermaid\ngraph LR; C-->D;\n```";
        assert_eq!(DiagramSource::extract(doc).as_str(), "graph TD; A-->B;");
    }

    #[test]
    fn test_other_fences_are_ignored() {
        let doc = "```rust\nfn main() {}\n```";
        assert_eq!(DiagramSource::extract(doc).as_str(), doc);
    }

    #[test]
    fn test_empty_block_falls_back_to_raw_text() {
        let doc = "```mermaid\n```";
        assert_eq!(DiagramSource::extract(doc).as_str(), doc);
    }

    #[test]
    fn test_is_blank() {
        assert!(DiagramSource::extract("").is_blank());
        assert!(DiagramSource::extract(" \n\t").is_blank());
        assert!(!DiagramSource::extract("graph TD;").is_blank());
    }
}
