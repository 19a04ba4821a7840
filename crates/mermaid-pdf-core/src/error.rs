//! Error types for SVG normalization.

use thiserror::Error;

/// Errors produced while reading or normalizing a rendered diagram.
#[derive(Debug, Error)]
pub enum Error {
    /// The rendered output could not be parsed as XML.
    #[error("Malformed SVG: {0}")]
    Xml(#[from] roxmltree::Error),

    /// The rendered output has no `<svg>` root element.
    #[error("No rendered SVG tree (root element is `{0}`)")]
    NotSvg(String),
}
