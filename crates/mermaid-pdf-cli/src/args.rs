//! Command-line argument definitions for the Mermaid PDF CLI.
//!
//! [`Args`] holds the global options (configuration file and logging
//! verbosity) and one [`Command`]: convert a single file, or serve the HTTP
//! API.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use mermaid_pdf::config::{Backend, RendererKind};

/// Command-line arguments for the Mermaid PDF converter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert a .mmd or .md file to PDF
    Convert(ConvertArgs),

    /// Serve the conversion API over HTTP
    Serve(ServeArgs),
}

#[derive(clap::Args, Debug)]
pub struct ConvertArgs {
    /// Path to the input Mermaid or markdown file
    pub input: PathBuf,

    /// Path to the output PDF file [default: input with a .pdf extension]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Conversion backend, overriding the configuration
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,

    /// Diagram renderer for the vector backend, overriding the configuration
    #[arg(long, value_enum)]
    pub renderer: Option<RendererArg>,

    /// Also write the normalized SVG page to this path
    #[arg(long)]
    pub normalized_svg: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on, overriding the configuration
    #[arg(short, long)]
    pub bind: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendArg {
    Vector,
    External,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Vector => Backend::Vector,
            BackendArg::External => Backend::External,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererArg {
    Native,
    Mmdc,
}

impl From<RendererArg> for RendererKind {
    fn from(arg: RendererArg) -> Self {
        match arg {
            RendererArg::Native => RendererKind::Native,
            RendererArg::Mmdc => RendererKind::Mmdc,
        }
    }
}
