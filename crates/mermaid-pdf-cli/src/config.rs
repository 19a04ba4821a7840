//! Configuration file discovery for the CLI.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use thiserror::Error;

use mermaid_pdf::{MermaidPdfError, config::AppConfig};

const LOCAL_CONFIG: &str = "mermaid-pdf/config.toml";

/// Configuration-related errors for CLI
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML configuration {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Missing configuration file: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Invalid configuration {}: {message}", .path.display())]
    Invalid { path: PathBuf, message: String },
}

impl From<ConfigError> for MermaidPdfError {
    fn from(err: ConfigError) -> Self {
        MermaidPdfError::Config(err.to_string())
    }
}

/// Where the configuration file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigSource {
    Explicit,
    Local,
    System,
}

/// Loads the configuration, or the defaults when no file is found.
///
/// An explicit path must exist. Otherwise `mermaid-pdf/config.toml` in the
/// working directory is tried, then `config.toml` in the platform config
/// directory.
///
/// # Errors
///
/// Returns [`MermaidPdfError::Config`] if the file is missing (explicit path
/// only), is not valid TOML, or holds invalid settings.
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> Result<AppConfig, MermaidPdfError> {
    let found = match explicit_path {
        Some(path) => Some((ConfigSource::Explicit, path.as_ref().to_path_buf())),
        None => discover(),
    };
    let Some((source, path)) = found else {
        debug!("No configuration file found, using default configuration");
        return Ok(AppConfig::default());
    };

    info!(source:?, path = path.display().to_string(); "Loading configuration");
    let config = read_config(&path)?;
    config.validate().map_err(|message| ConfigError::Invalid {
        path: path.clone(),
        message,
    })?;

    Ok(config)
}

fn discover() -> Option<(ConfigSource, PathBuf)> {
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.is_file() {
        return Some((ConfigSource::Local, local));
    }

    let Some(dirs) = ProjectDirs::from("com", "mermaid-pdf", "mermaid-pdf") else {
        debug!("Could not determine platform-specific config directory");
        return None;
    };
    let system = dirs.config_dir().join("config.toml");
    if system.is_file() {
        return Some((ConfigSource::System, system));
    }

    debug!(path = system.display().to_string(); "System configuration file not found");
    None
}

fn read_config(path: &Path) -> Result<AppConfig, MermaidPdfError> {
    let content = fs::read_to_string(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => ConfigError::MissingFile(path.to_path_buf()).into(),
        _ => MermaidPdfError::Io(err),
    })?;

    toml::from_str(&content).map_err(|err| {
        ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.message().to_string(),
        }
        .into()
    })
}
