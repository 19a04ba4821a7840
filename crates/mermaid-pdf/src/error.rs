//! Error types for Mermaid PDF conversion.
//!
//! This module provides the main error type [`MermaidPdfError`], one variant
//! per way a conversion can fail. The HTTP surface maps each variant to a
//! status code and the CLI renders them as diagnostics.

use std::io;

use thiserror::Error;

use crate::{export::ExportError, process::ToolError};

/// The main error type for conversion operations.
#[derive(Debug, Error)]
pub enum MermaidPdfError {
    /// Neither a file nor code was submitted, or the submission is blank.
    #[error("No Mermaid code or file provided")]
    MissingInput,

    /// The uploaded file is not a Mermaid or markdown file.
    #[error("Unsupported file `{0}`: expected a .mmd or .md file")]
    UnsupportedFile(String),

    /// The request body could not be read (malformed form or JSON).
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// The renderer rejected the diagram source.
    #[error("Invalid Mermaid syntax: {message}")]
    SyntaxInvalid {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Export was attempted without a rendered SVG tree.
    #[error("Renderer produced no SVG tree: {0}")]
    RenderMissing(#[from] mermaid_pdf_core::Error),

    /// The external converter could not be run or failed.
    #[error("External converter failed: {0}")]
    ExternalTool(#[from] ToolError),

    /// The exporter rejected the normalized tree.
    #[error("PDF export failed: {0}")]
    Export(#[from] ExportError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The request did not finish within its time budget.
    #[error("Conversion timed out after {0} seconds")]
    Timeout(u64),

    #[error("Server error: {0}")]
    Server(String),
}

impl MermaidPdfError {
    /// Create a new `SyntaxInvalid` error from a renderer failure.
    pub fn new_syntax_error(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        let source = source.into();
        Self::SyntaxInvalid {
            message: source.to_string(),
            source,
        }
    }

    /// Returns `true` for errors caused by what the user submitted.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingInput
                | Self::UnsupportedFile(_)
                | Self::MalformedRequest(_)
                | Self::SyntaxInvalid { .. }
        )
    }
}
