//! Configuration types for Mermaid PDF conversion.
//!
//! All types implement [`serde::Deserialize`] so they can be loaded from a
//! TOML file; every field has a default, so a partial (or empty) file is valid.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining the sections below.
//! - [`RenderConfig`] - Which renderer draws the diagram and with which theme.
//! - [`ExportConfig`] - Page margin, background and fonts of the exported PDF.
//! - [`ConverterConfig`] - Backend selection and the external converter command.
//! - [`BrowserConfig`] - Headless browser launch profile for the external converter.
//! - [`ServerConfig`] - HTTP listener settings.
//!
//! # Example
//!
//! ```
//! # use mermaid_pdf::config::{AppConfig, Backend};
//! let config = AppConfig::default();
//! assert_eq!(config.converter().backend(), Backend::Vector);
//! assert!(config.validate().is_ok());
//! ```

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_json::json;

use mermaid_pdf_core::{color::Color, geometry::DEFAULT_PAGE_MARGIN, normalize::RichTextDefaults};

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    render: RenderConfig,

    #[serde(default)]
    export: ExportConfig,

    #[serde(default)]
    converter: ConverterConfig,

    #[serde(default)]
    browser: BrowserConfig,

    #[serde(default)]
    server: ServerConfig,
}

impl AppConfig {
    pub fn render(&self) -> &RenderConfig {
        &self.render
    }

    pub fn export(&self) -> &ExportConfig {
        &self.export
    }

    pub fn converter(&self) -> &ConverterConfig {
        &self.converter
    }

    pub fn browser(&self) -> &BrowserConfig {
        &self.browser
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    /// Mutable access for command-line overrides.
    pub fn render_mut(&mut self) -> &mut RenderConfig {
        &mut self.render
    }

    pub fn converter_mut(&mut self) -> &mut ConverterConfig {
        &mut self.converter
    }

    pub fn server_mut(&mut self) -> &mut ServerConfig {
        &mut self.server
    }

    /// Checks values that cannot be validated while deserializing.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid setting.
    pub fn validate(&self) -> Result<(), String> {
        self.export.background_color()?;
        self.browser.to_launch_options()?;
        if self.converter.command.trim().is_empty() {
            return Err("converter.command must not be empty".to_string());
        }
        if self.converter.timeout_secs == 0 {
            return Err("converter.timeout_secs must be greater than zero".to_string());
        }
        if !self.export.margin.is_finite() || self.export.margin < 0.0 {
            return Err(format!(
                "export.margin must be a non-negative number, got {}",
                self.export.margin
            ));
        }
        Ok(())
    }
}

/// Which renderer turns diagram source into SVG.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// In-process rendering.
    #[default]
    Native,
    /// The Mermaid CLI, writing SVG.
    Mmdc,
}

/// Renderer settings, passed to the renderer on every call.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    renderer: RendererKind,
    theme: String,
    html_labels: bool,
    font_family: Option<String>,
    background: Option<String>,
    primary_color: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            renderer: RendererKind::default(),
            theme: "default".to_string(),
            html_labels: false,
            font_family: None,
            background: None,
            primary_color: None,
        }
    }
}

impl RenderConfig {
    pub fn renderer(&self) -> RendererKind {
        self.renderer
    }

    pub fn set_renderer(&mut self, renderer: RendererKind) {
        self.renderer = renderer;
    }

    /// Mermaid theme name (`default`, `neutral`, `dark`, `forest`).
    pub fn theme(&self) -> &str {
        &self.theme
    }

    /// Whether labels may be rendered as HTML inside `<foreignObject>`.
    pub fn html_labels(&self) -> bool {
        self.html_labels
    }

    pub fn font_family(&self) -> Option<&str> {
        self.font_family.as_deref()
    }

    pub fn background(&self) -> Option<&str> {
        self.background.as_deref()
    }

    pub fn primary_color(&self) -> Option<&str> {
        self.primary_color.as_deref()
    }

    /// Builds the Mermaid configuration file handed to the CLI with `-c`.
    ///
    /// Labels default to plain SVG text and diagrams keep their natural width
    /// so the PDF page can be fitted to them.
    pub fn to_mermaid_json(&self) -> serde_json::Value {
        let mut config = json!({
            "theme": self.theme,
            "flowchart": { "htmlLabels": self.html_labels, "useMaxWidth": false },
            "class": { "htmlLabels": self.html_labels },
            "sequence": { "useMaxWidth": false },
            "journey": { "useMaxWidth": false },
            "pie": { "textPosition": 0.5 },
        });

        let mut variables = serde_json::Map::new();
        if let Some(font_family) = &self.font_family {
            config["fontFamily"] = json!(font_family);
            variables.insert("fontFamily".to_string(), json!(font_family));
        }
        if let Some(background) = &self.background {
            variables.insert("background".to_string(), json!(background));
        }
        if let Some(primary_color) = &self.primary_color {
            variables.insert("primaryColor".to_string(), json!(primary_color));
        }
        if !variables.is_empty() {
            config["themeVariables"] = serde_json::Value::Object(variables);
        }

        config
    }
}

/// Settings for the exported page.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    margin: f32,
    background_color: Option<String>,
    font_dirs: Vec<PathBuf>,
    label_font_size: f32,
    label_font_family: String,
    label_color: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        let labels = RichTextDefaults::default();
        Self {
            margin: DEFAULT_PAGE_MARGIN,
            background_color: None,
            font_dirs: Vec::new(),
            label_font_size: labels.font_size(),
            label_font_family: labels.font_family().to_string(),
            label_color: labels.color().to_string(),
        }
    }
}

impl ExportConfig {
    /// Margin around the diagram on every side, in points.
    pub fn margin(&self) -> f32 {
        self.margin
    }

    /// Returns the parsed background [`Color`], or `None` for a transparent page.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured color string cannot be parsed.
    pub fn background_color(&self) -> Result<Option<Color>, String> {
        self.background_color
            .as_ref()
            .map(|color| Color::new(color))
            .transpose()
            .map_err(|err| format!("Invalid background color in config: {err}"))
    }

    /// Extra directories searched for fonts, in addition to system fonts.
    pub fn font_dirs(&self) -> &[PathBuf] {
        &self.font_dirs
    }

    /// Text style for HTML labels that carry no style of their own.
    pub fn rich_text_defaults(&self) -> RichTextDefaults {
        RichTextDefaults::new(
            self.label_font_size,
            self.label_font_family.clone(),
            self.label_color.clone(),
        )
    }
}

/// Which conversion path produces the PDF.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Render to SVG, normalize, convert to PDF in process.
    #[default]
    Vector,
    /// Let the Mermaid CLI print the PDF through a headless browser.
    External,
}

/// Settings of the external converter.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    backend: Backend,
    command: String,
    args: Vec<String>,
    timeout_secs: u64,
    scratch_dir: Option<PathBuf>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            command: "mmdc".to_string(),
            args: Vec::new(),
            timeout_secs: 60,
            scratch_dir: None,
        }
    }
}

impl ConverterConfig {
    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn set_backend(&mut self, backend: Backend) {
        self.backend = backend;
    }

    /// The converter executable.
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn set_command(&mut self, command: impl Into<String>, args: Vec<String>) {
        self.command = command.into();
        self.args = args;
    }

    /// Arguments placed before the per-request arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout_secs = timeout.as_secs().max(1);
    }

    /// Directory for per-request scratch files; the system temp dir by default.
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn set_scratch_dir(&mut self, dir: impl Into<PathBuf>) {
        self.scratch_dir = Some(dir.into());
    }
}

/// How the headless browser behind the external converter is launched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserProfile {
    /// The browser bundled with the converter; suitable for development.
    #[default]
    Bundled,
    /// An explicitly provided browser binary with sandboxing disabled.
    Serverless,
}

const SERVERLESS_ARGS: [&str; 2] = ["--no-sandbox", "--disable-dev-shm-usage"];

/// Browser launch settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    profile: BrowserProfile,
    executable_path: Option<PathBuf>,
    args: Option<Vec<String>>,
}

impl BrowserConfig {
    pub fn profile(&self) -> BrowserProfile {
        self.profile
    }

    /// Builds the launch options file handed to the CLI with `-p`.
    ///
    /// # Errors
    ///
    /// Returns an error if the serverless profile has no executable path.
    pub fn to_launch_options(&self) -> Result<serde_json::Value, String> {
        match self.profile {
            BrowserProfile::Bundled => Ok(json!({ "headless": true })),
            BrowserProfile::Serverless => {
                let executable = self.executable_path.as_ref().ok_or_else(|| {
                    "browser.executable_path is required for the serverless profile".to_string()
                })?;
                let args = self.args.clone().unwrap_or_else(|| {
                    SERVERLESS_ARGS.iter().map(|arg| arg.to_string()).collect()
                });
                Ok(json!({
                    "headless": true,
                    "executablePath": executable,
                    "args": args,
                }))
            }
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    bind: String,
    max_upload_bytes: usize,
    request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            request_timeout_secs: 60,
        }
    }
}

impl ServerConfig {
    /// Socket address to listen on.
    pub fn bind(&self) -> &str {
        &self.bind
    }

    pub fn set_bind(&mut self, bind: impl Into<String>) {
        self.bind = bind.into();
    }

    /// Largest accepted request body.
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Wall-clock budget for one request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn set_request_timeout(&mut self, timeout: Duration) {
        self.request_timeout_secs = timeout.as_secs().max(1);
    }
}
