//! The Mermaid CLI (`mmdc`) conversion path.
//!
//! Each call writes the diagram, a browser launch profile and a Mermaid
//! configuration to uuid-named scratch files, runs the CLI once and reads the
//! output file back. The scratch files are removed when the call returns,
//! also on failure or when the calling future is dropped.

use std::{ffi::OsString, path::PathBuf};

use log::{debug, info};

use mermaid_pdf_core::source::DiagramSource;

use crate::{
    MermaidPdfError,
    config::{AppConfig, RenderConfig},
    process::{ToolCommand, ToolError},
    scratch::ScratchFiles,
};

/// Diagnostics the CLI prints when it rejects the diagram source.
const SYNTAX_MARKERS: [&str; 3] = ["parse error", "syntax error", "lexical error"];

/// What the CLI is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// A PDF page cropped to the diagram (`--pdfFit`).
    Pdf,
    /// The rendered SVG.
    Svg,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Svg => "svg",
        }
    }
}

/// A configured Mermaid CLI.
#[derive(Debug, Clone)]
pub struct MermaidCli {
    tool: ToolCommand,
    scratch_dir: PathBuf,
    launch_options: serde_json::Value,
}

impl MermaidCli {
    /// Creates the CLI wrapper from the `converter` and `browser` sections.
    ///
    /// # Errors
    ///
    /// Returns [`MermaidPdfError::Config`] if the browser profile is incomplete.
    pub fn from_config(config: &AppConfig) -> Result<Self, MermaidPdfError> {
        let converter = config.converter();
        let launch_options = config
            .browser()
            .to_launch_options()
            .map_err(MermaidPdfError::Config)?;

        Ok(Self {
            tool: ToolCommand::new(
                converter.command(),
                converter.args().to_vec(),
                converter.timeout(),
            ),
            scratch_dir: converter.scratch_dir(),
            launch_options,
        })
    }

    pub fn tool(&self) -> &ToolCommand {
        &self.tool
    }

    /// Converts `source` into `format` and returns the output file's bytes.
    ///
    /// # Errors
    ///
    /// - [`MermaidPdfError::SyntaxInvalid`] if the CLI reports a parse error.
    /// - [`MermaidPdfError::ExternalTool`] if the CLI cannot be started, fails
    ///   otherwise, times out or leaves the output file empty.
    /// - [`MermaidPdfError::Io`] if the scratch files cannot be written or read.
    pub async fn convert(
        &self,
        source: &DiagramSource,
        render: &RenderConfig,
        format: OutputFormat,
    ) -> Result<Vec<u8>, MermaidPdfError> {
        let files = ScratchFiles::create(&self.scratch_dir, format.extension())?;
        info!(id:% = files.id(), format = format.extension(); "Converting with Mermaid CLI");

        tokio::fs::write(files.input(), source.as_str()).await?;
        tokio::fs::write(files.browser_config(), to_json(&self.launch_options)?).await?;
        tokio::fs::write(files.mermaid_config(), to_json(&render.to_mermaid_json())?).await?;

        self.tool
            .run(arguments(&files, format))
            .await
            .map_err(classify)?;

        let output = tokio::fs::read(files.output()).await?;
        if output.is_empty() {
            return Err(ToolError::EmptyOutput(self.tool.program().to_string()).into());
        }

        debug!(id:% = files.id(), bytes = output.len(); "Mermaid CLI output read");
        Ok(output)
    }
}

fn to_json(value: &serde_json::Value) -> std::io::Result<Vec<u8>> {
    serde_json::to_vec_pretty(value).map_err(std::io::Error::other)
}

/// `-i <in> -o <out> [--pdfFit] -p <launch options> -c <mermaid config>`
fn arguments(files: &ScratchFiles, format: OutputFormat) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-i".into(),
        files.input().into(),
        "-o".into(),
        files.output().into(),
    ];
    if format == OutputFormat::Pdf {
        args.push("--pdfFit".into());
    }
    args.extend([
        "-p".into(),
        files.browser_config().into(),
        "-c".into(),
        files.mermaid_config().into(),
    ]);
    args
}

/// Separates rejected diagram source from tool failures.
fn classify(err: ToolError) -> MermaidPdfError {
    let is_syntax = err.stderr().is_some_and(|stderr| {
        let stderr = stderr.to_lowercase();
        SYNTAX_MARKERS.iter().any(|marker| stderr.contains(marker))
    });

    if is_syntax {
        MermaidPdfError::new_syntax_error(err)
    } else {
        MermaidPdfError::ExternalTool(err)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_pdf_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let files = ScratchFiles::create(dir.path(), "pdf").unwrap();
        let args = arguments(&files, OutputFormat::Pdf);

        let expected: Vec<OsString> = vec![
            "-i".into(),
            files.input().into(),
            "-o".into(),
            files.output().into(),
            "--pdfFit".into(),
            "-p".into(),
            files.browser_config().into(),
            "-c".into(),
            files.mermaid_config().into(),
        ];
        assert_eq!(args, expected);
    }

    #[test]
    fn test_svg_arguments_do_not_fit_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let files = ScratchFiles::create(dir.path(), "svg").unwrap();
        let args = arguments(&files, OutputFormat::Svg);

        assert!(!args.iter().any(|arg| arg == "--pdfFit"));
        assert_eq!(args[3], OsString::from(files.output()));
        assert!(files.output().to_string_lossy().ends_with(".svg"));
    }

    #[test]
    fn test_classify_syntax_error() {
        let err = classify(ToolError::Exit {
            tool: "mmdc".to_string(),
            code: Some(1),
            stderr: "Error: Parse error on line 2:\n...".to_string(),
        });
        assert!(matches!(err, MermaidPdfError::SyntaxInvalid { .. }));
        assert!(err.to_string().contains("Parse error on line 2"));
    }

    #[test]
    fn test_classify_other_failures() {
        let err = classify(ToolError::Exit {
            tool: "mmdc".to_string(),
            code: Some(1),
            stderr: "Failed to launch the browser process".to_string(),
        });
        assert!(matches!(err, MermaidPdfError::ExternalTool(_)));

        let err = classify(ToolError::Timeout {
            tool: "mmdc".to_string(),
            timeout: Duration::from_secs(1),
        });
        assert!(matches!(err, MermaidPdfError::ExternalTool(ToolError::Timeout { .. })));
    }
}
