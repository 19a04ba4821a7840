//! Diagram renderers: diagram source in, SVG text out.
//!
//! Two renderers exist:
//!
//! - [`Renderer::Native`] renders in process through `mermaid-rs-renderer`.
//! - [`Renderer::Mmdc`] asks the Mermaid CLI for SVG output.
//!
//! The [`RenderConfig`] is handed over on every call; renderers keep no
//! global state between diagrams.

mod native;

use log::{debug, info};

use mermaid_pdf_core::source::DiagramSource;

use crate::{
    MermaidPdfError,
    config::{AppConfig, RenderConfig, RendererKind},
    mmdc::{MermaidCli, OutputFormat},
};

/// A configured diagram renderer.
#[derive(Debug, Clone)]
pub enum Renderer {
    Native,
    Mmdc(MermaidCli),
}

impl Renderer {
    /// Builds the renderer selected in the `render` section.
    ///
    /// # Errors
    ///
    /// Returns [`MermaidPdfError::Config`] if the CLI renderer is selected with
    /// an incomplete browser profile.
    pub fn from_config(config: &AppConfig) -> Result<Self, MermaidPdfError> {
        match config.render().renderer() {
            RendererKind::Native => Ok(Self::Native),
            RendererKind::Mmdc => Ok(Self::Mmdc(MermaidCli::from_config(config)?)),
        }
    }

    pub fn kind(&self) -> RendererKind {
        match self {
            Self::Native => RendererKind::Native,
            Self::Mmdc(_) => RendererKind::Mmdc,
        }
    }

    /// Renders `source` to SVG text.
    ///
    /// # Errors
    ///
    /// Returns [`MermaidPdfError::SyntaxInvalid`] if the source is rejected,
    /// and [`MermaidPdfError::ExternalTool`] or [`MermaidPdfError::Io`] for
    /// CLI failures.
    pub async fn render(
        &self,
        source: &DiagramSource,
        config: &RenderConfig,
    ) -> Result<String, MermaidPdfError> {
        info!(renderer:? = self.kind(); "Rendering diagram");

        let svg = match self {
            Self::Native => {
                let source = source.as_str().to_string();
                let config = config.clone();
                crate::run_blocking(move || native::render(&source, &config)).await?
            }
            Self::Mmdc(cli) => {
                let bytes = cli.convert(source, config, OutputFormat::Svg).await?;
                String::from_utf8(bytes).map_err(|err| {
                    MermaidPdfError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
                })?
            }
        };

        debug!(bytes = svg.len(); "Diagram rendered");
        Ok(svg)
    }
}
