//! Mermaid PDF - convert Mermaid diagrams to downloadable PDFs.
//!
//! A submission (inline code or an uploaded `.mmd`/`.md` file) is validated
//! and converted along one of two paths:
//!
//! - **Vector**: render to SVG, measure it, normalize it for standalone
//!   renderers and convert the page to PDF in process.
//! - **External**: let the Mermaid CLI print the PDF through a headless browser.
//!
//! [`Converter`] ties the paths together; [`server`] exposes it over HTTP.

pub mod config;
pub mod export;
pub mod mmdc;
pub mod process;
pub mod render;
pub mod request;
pub mod scratch;
pub mod server;

mod error;

pub use mermaid_pdf_core::{color, geometry, normalize, source, tree};

pub use error::MermaidPdfError;
pub use request::{ConvertRequest, PdfDocument, Upload};

use log::{debug, info};

use mermaid_pdf_core::{normalize::NormalizedDiagram, normalize::Normalizer, source::DiagramSource};

use config::{AppConfig, Backend};
use export::{DocumentExporter, PdfExporter};
use mmdc::{MermaidCli, OutputFormat};
use render::Renderer;

/// Converts diagram submissions into PDF documents.
///
/// A converter holds no per-request state and can be shared between
/// concurrent requests.
///
/// # Examples
///
/// ```rust,no_run
/// use mermaid_pdf::{ConvertRequest, Converter, config::AppConfig};
///
/// # async fn example() -> Result<(), mermaid_pdf::MermaidPdfError> {
/// let converter = Converter::new(AppConfig::default())?;
/// let document = converter
///     .convert(&ConvertRequest::from_code("graph TD;\n A-->B;"))
///     .await?;
/// assert_eq!(document.file_name(), "diagram.pdf");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Converter {
    config: AppConfig,
    renderer: Renderer,
    exporter: PdfExporter,
    normalizer: Normalizer,
    cli: MermaidCli,
}

impl Converter {
    /// Create a converter from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MermaidPdfError::Config`] if the configuration is invalid.
    pub fn new(config: AppConfig) -> Result<Self, MermaidPdfError> {
        config.validate().map_err(MermaidPdfError::Config)?;

        let renderer = Renderer::from_config(&config)?;
        let exporter = PdfExporter::new(config.export())?;
        let normalizer = Normalizer::new(config.export().margin())
            .with_rich_text_defaults(config.export().rich_text_defaults());
        let cli = MermaidCli::from_config(&config)?;

        info!(
            backend:? = config.converter().backend(),
            renderer:? = renderer.kind();
            "Converter ready"
        );

        Ok(Self {
            config,
            renderer,
            exporter,
            normalizer,
            cli,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Converts a submission along the configured backend.
    ///
    /// # Errors
    ///
    /// Returns [`MermaidPdfError::MissingInput`] or
    /// [`MermaidPdfError::UnsupportedFile`] for invalid submissions, before any
    /// scratch file is created, and the errors of the selected path otherwise.
    pub async fn convert(&self, request: &ConvertRequest) -> Result<PdfDocument, MermaidPdfError> {
        let (source, stem) = request.resolve()?;

        let bytes = match self.config.converter().backend() {
            Backend::Vector => self.vector_pdf(&source).await?,
            Backend::External => {
                self.cli
                    .convert(&source, self.config.render(), OutputFormat::Pdf)
                    .await?
            }
        };

        Ok(PdfDocument::new(&stem, bytes))
    }

    /// Converts a submission along the vector path, whatever the backend.
    ///
    /// # Errors
    ///
    /// See [`Converter::convert`].
    pub async fn convert_vector(
        &self,
        request: &ConvertRequest,
    ) -> Result<PdfDocument, MermaidPdfError> {
        let (source, stem) = request.resolve()?;
        let bytes = self.vector_pdf(&source).await?;
        Ok(PdfDocument::new(&stem, bytes))
    }

    /// Renders diagram source to SVG text with the configured renderer.
    ///
    /// # Errors
    ///
    /// Returns [`MermaidPdfError::SyntaxInvalid`] if the source is rejected.
    pub async fn render(&self, source: &DiagramSource) -> Result<String, MermaidPdfError> {
        self.renderer.render(source, self.config.render()).await
    }

    /// Measures and normalizes rendered SVG text.
    ///
    /// # Errors
    ///
    /// Returns [`MermaidPdfError::RenderMissing`] if the text is not an SVG
    /// document, and [`MermaidPdfError::Export`] if it cannot be measured.
    pub fn normalize(&self, svg: &str) -> Result<NormalizedDiagram, MermaidPdfError> {
        normalize_svg(&self.exporter, &self.normalizer, svg)
    }

    /// Exports a normalized diagram with `exporter`.
    ///
    /// # Errors
    ///
    /// Returns [`MermaidPdfError::Export`] if the exporter rejects the tree.
    pub fn export(
        &self,
        diagram: &NormalizedDiagram,
        exporter: &dyn DocumentExporter,
    ) -> Result<Vec<u8>, MermaidPdfError> {
        Ok(exporter.export(diagram)?)
    }

    async fn vector_pdf(&self, source: &DiagramSource) -> Result<Vec<u8>, MermaidPdfError> {
        let svg = self.render(source).await?;

        let exporter = self.exporter.clone();
        let normalizer = self.normalizer.clone();
        run_blocking(move || {
            let diagram = normalize_svg(&exporter, &normalizer, &svg)?;
            Ok(exporter.export(&diagram)?)
        })
        .await
    }
}

fn normalize_svg(
    exporter: &PdfExporter,
    normalizer: &Normalizer,
    svg: &str,
) -> Result<NormalizedDiagram, MermaidPdfError> {
    let document = mermaid_pdf_core::tree::parse_document(svg)
        .map_err(|err| MermaidPdfError::RenderMissing(err.into()))?;
    if !document.root_element().has_tag_name("svg") {
        let name = document.root_element().tag_name().name().to_string();
        return Err(MermaidPdfError::RenderMissing(
            mermaid_pdf_core::Error::NotSvg(name),
        ));
    }

    let bbox = exporter.measure(&document)?;
    let diagram = normalizer.normalize(&document, bbox)?;
    debug!(
        replaced = diagram.replaced(),
        removed = diagram.removed();
        "Rich-text labels normalized"
    );
    Ok(diagram)
}

/// Runs CPU-bound conversion work on the blocking pool, so that callers can
/// race it against a deadline.
///
/// An abandoned task runs to completion in the background; its result is
/// discarded.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T, MermaidPdfError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, MermaidPdfError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| MermaidPdfError::Server(format!("conversion task failed: {err}")))?
}
