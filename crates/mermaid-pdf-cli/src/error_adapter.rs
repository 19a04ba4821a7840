//! Error adapter for converting MermaidPdfError to miette diagnostics.
//!
//! This module provides the bridge between the library's error type and
//! miette's rich diagnostic formatting used in the CLI. Every error gets a
//! stable `mermaid_pdf::*` code, and the ones a user can fix get a hint.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan};

use mermaid_pdf::{MermaidPdfError, process::ToolError};

/// Adapter giving a [`MermaidPdfError`] a diagnostic code and help text.
pub struct ErrorAdapter<'a>(pub &'a MermaidPdfError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            MermaidPdfError::MissingInput => "mermaid_pdf::missing_input",
            MermaidPdfError::UnsupportedFile(_) => "mermaid_pdf::unsupported_file",
            MermaidPdfError::MalformedRequest(_) => "mermaid_pdf::request",
            MermaidPdfError::SyntaxInvalid { .. } => "mermaid_pdf::syntax",
            MermaidPdfError::RenderMissing(_) => "mermaid_pdf::render",
            MermaidPdfError::ExternalTool(_) => "mermaid_pdf::external_tool",
            MermaidPdfError::Export(_) => "mermaid_pdf::export",
            MermaidPdfError::Io(_) => "mermaid_pdf::io",
            MermaidPdfError::Config(_) => "mermaid_pdf::config",
            MermaidPdfError::Timeout(_) => "mermaid_pdf::timeout",
            MermaidPdfError::Server(_) => "mermaid_pdf::server",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match &self.0 {
            MermaidPdfError::MissingInput => {
                "pass a non-empty .mmd file, or a .md file with a ```mermaid block"
            }
            MermaidPdfError::UnsupportedFile(_) => "only .mmd and .md files can be converted",
            MermaidPdfError::SyntaxInvalid { .. } => {
                "check the diagram type on the first line and the arrow syntax"
            }
            MermaidPdfError::ExternalTool(ToolError::Spawn { .. }) => {
                "install the Mermaid CLI (npm install -g @mermaid-js/mermaid-cli) or set `converter.command`"
            }
            MermaidPdfError::ExternalTool(ToolError::Timeout { .. }) => {
                "raise `converter.timeout_secs` for large diagrams"
            }
            MermaidPdfError::Timeout(_) => "raise `server.request_timeout_secs` for large diagrams",
            _ => return None,
        };
        Some(Box::new(help))
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        None
    }
}
