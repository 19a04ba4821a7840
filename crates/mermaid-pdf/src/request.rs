//! Conversion requests and their results.

use log::debug;

use mermaid_pdf_core::source::DiagramSource;

use crate::MermaidPdfError;

const ACCEPTED_EXTENSIONS: [&str; 2] = [".mmd", ".md"];

/// File name used when the diagram was not uploaded as a file.
pub const DEFAULT_STEM: &str = "diagram";

/// An uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    file_name: String,
    contents: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            contents: contents.into(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The file name without its `.mmd`/`.md` extension, if it has one.
    fn stem(&self) -> Option<&str> {
        let lower = self.file_name.to_ascii_lowercase();
        ACCEPTED_EXTENSIONS
            .iter()
            .find(|extension| lower.ends_with(*extension))
            .map(|extension| &self.file_name[..self.file_name.len() - extension.len()])
    }
}

/// A submitted diagram: an uploaded file, inline code, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertRequest {
    file: Option<Upload>,
    code: Option<String>,
}

impl ConvertRequest {
    pub fn new(file: Option<Upload>, code: Option<String>) -> Self {
        Self { file, code }
    }

    pub fn from_code(code: impl Into<String>) -> Self {
        Self::new(None, Some(code.into()))
    }

    pub fn from_file(file: Upload) -> Self {
        Self::new(Some(file), None)
    }

    /// Validates the request and extracts the diagram.
    ///
    /// The file takes priority over the code. Returns the diagram source and
    /// the stem of the download name.
    ///
    /// # Errors
    ///
    /// - [`MermaidPdfError::MissingInput`] if nothing was submitted or the
    ///   diagram is blank.
    /// - [`MermaidPdfError::UnsupportedFile`] if the file is not `.mmd` or `.md`.
    pub fn resolve(&self) -> Result<(DiagramSource, String), MermaidPdfError> {
        let (text, stem) = match (&self.file, &self.code) {
            (Some(file), _) => {
                let stem = file
                    .stem()
                    .ok_or_else(|| MermaidPdfError::UnsupportedFile(file.file_name.clone()))?;
                let stem = if stem.trim().is_empty() {
                    DEFAULT_STEM
                } else {
                    stem
                };
                (String::from_utf8_lossy(&file.contents).into_owned(), stem.to_string())
            }
            (None, Some(code)) => (code.clone(), DEFAULT_STEM.to_string()),
            (None, None) => return Err(MermaidPdfError::MissingInput),
        };

        let source = DiagramSource::extract(&text);
        if source.is_blank() {
            return Err(MermaidPdfError::MissingInput);
        }

        debug!(stem, len = source.as_str().len(); "Resolved conversion request");
        Ok((source, stem))
    }
}

/// A finished PDF ready to be downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfDocument {
    file_name: String,
    bytes: Vec<u8>,
}

impl PdfDocument {
    /// Creates a document named `<stem>.pdf`.
    pub fn new(stem: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: format!("{stem}.pdf"),
            bytes,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
