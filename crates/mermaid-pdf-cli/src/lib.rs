//! CLI logic for the Mermaid PDF converter.
//!
//! `convert` turns one `.mmd`/`.md` file into a PDF next to it (or at
//! `--output`); `serve` runs the HTTP API.

pub mod error_adapter;

mod args;
mod config;

pub use args::{Args, BackendArg, Command, ConvertArgs, RendererArg, ServeArgs};

use std::{fs, path::PathBuf};

use log::{debug, info};

use mermaid_pdf::{
    ConvertRequest, Converter, MermaidPdfError, Upload, config::AppConfig, export::SvgExporter,
    server,
};

/// Run the Mermaid PDF CLI application
///
/// # Errors
///
/// Returns `MermaidPdfError` for:
/// - Configuration loading errors
/// - File I/O errors
/// - Invalid submissions and syntax errors
/// - Rendering, export and external converter errors
/// - Server startup errors
pub async fn run(args: &Args) -> Result<(), MermaidPdfError> {
    let app_config = config::load_config(args.config.as_ref())?;

    match &args.command {
        Command::Convert(convert_args) => convert(app_config, convert_args).await,
        Command::Serve(serve_args) => serve(app_config, serve_args).await,
    }
}

async fn convert(mut app_config: AppConfig, args: &ConvertArgs) -> Result<(), MermaidPdfError> {
    if let Some(backend) = args.backend {
        app_config.converter_mut().set_backend(backend.into());
    }
    if let Some(renderer) = args.renderer {
        app_config.render_mut().set_renderer(renderer.into());
    }

    let output = output_path(args);
    info!(
        input_path = args.input.display().to_string(),
        output_path = output.display().to_string();
        "Converting diagram"
    );

    let contents = fs::read(&args.input)?;
    let file_name = args
        .input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let request = ConvertRequest::from_file(Upload::new(file_name, contents));

    let converter = Converter::new(app_config)?;
    let document = converter.convert(&request).await?;
    fs::write(&output, document.bytes())?;
    info!(output_file = output.display().to_string(), bytes = document.bytes().len(); "PDF exported successfully");

    if let Some(svg_path) = &args.normalized_svg {
        let (source, _) = request.resolve()?;
        let svg = converter.render(&source).await?;
        let diagram = converter.normalize(&svg)?;
        let background = converter
            .config()
            .export()
            .background_color()
            .map_err(MermaidPdfError::Config)?;
        let bytes = converter.export(&diagram, &SvgExporter::new(background))?;
        fs::write(svg_path, bytes)?;
        debug!(output_file = svg_path.display().to_string(); "Normalized SVG written");
    }

    Ok(())
}

async fn serve(mut app_config: AppConfig, args: &ServeArgs) -> Result<(), MermaidPdfError> {
    if let Some(bind) = &args.bind {
        app_config.server_mut().set_bind(bind.as_str());
    }
    let converter = Converter::new(app_config)?;
    server::serve(converter).await
}

/// The `--output` path, or the input path with a `.pdf` extension.
fn output_path(args: &ConvertArgs) -> PathBuf {
    args.output
        .clone()
        .unwrap_or_else(|| args.input.with_extension("pdf"))
}
