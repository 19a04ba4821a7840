//! HTTP surface.
//!
//! - `POST /api/convert` takes a multipart form with a `file` and/or `code`
//!   field and converts along the configured backend.
//! - `POST /api/generate-pdf` takes `{"code": "..."}` and always uses the
//!   vector path.
//!
//! Both answer with the PDF as an attachment, or with `{"error": "..."}` and a
//! 4xx/5xx status.

use std::{future::Future, sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::json;

use crate::{
    ConvertRequest, Converter, MermaidPdfError, PdfDocument, Upload, process::ToolError,
};

/// Download name of diagrams submitted to `/api/generate-pdf`.
const GENERATED_STEM: &str = "mermaid-diagram";

/// Builds the application router around a shared converter.
pub fn router(converter: Arc<Converter>) -> Router {
    let body_limit = converter.config().server().max_upload_bytes();

    Router::new()
        .route("/api/convert", post(convert))
        .route("/api/generate-pdf", post(generate_pdf))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(converter)
}

/// Serves the API until Ctrl-C is received.
///
/// # Errors
///
/// Returns [`MermaidPdfError::Server`] if the address cannot be bound, and
/// [`MermaidPdfError::Io`] if the server fails while running.
pub async fn serve(converter: Converter) -> Result<(), MermaidPdfError> {
    let bind = converter.config().server().bind().to_string();
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .map_err(|err| MermaidPdfError::Server(format!("failed to bind {bind}: {err}")))?;
    info!(address = bind; "Listening for conversion requests");

    axum::serve(listener, router(Arc::new(converter)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(err) => {
            warn!(err:%; "Cannot listen for Ctrl-C; running until killed");
            std::future::pending::<()>().await;
        }
    }
}

async fn convert(
    State(converter): State<Arc<Converter>>,
    multipart: Multipart,
) -> Result<PdfDocument, MermaidPdfError> {
    let request = read_form(multipart).await?;
    within_budget(
        converter.config().server().request_timeout(),
        converter.convert(&request),
    )
    .await
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    #[serde(default)]
    code: Option<String>,
}

async fn generate_pdf(
    State(converter): State<Arc<Converter>>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<PdfDocument, MermaidPdfError> {
    let Json(body) = body.map_err(|err| MermaidPdfError::MalformedRequest(err.body_text()))?;
    let request = ConvertRequest::new(None, body.code);

    let document = within_budget(
        converter.config().server().request_timeout(),
        converter.convert_vector(&request),
    )
    .await?;
    Ok(PdfDocument::new(GENERATED_STEM, document.into_bytes()))
}

/// Reads the `file` and `code` fields of a conversion form.
///
/// A file part without a name and without content is what browsers send when
/// no file was chosen; it counts as no file.
async fn read_form(mut multipart: Multipart) -> Result<ConvertRequest, MermaidPdfError> {
    let mut file = None;
    let mut code = None;

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let contents = field.bytes().await.map_err(malformed)?;
                if !file_name.is_empty() || !contents.is_empty() {
                    file = Some(Upload::new(file_name, contents.to_vec()));
                }
            }
            Some("code") => code = Some(field.text().await.map_err(malformed)?),
            _ => {}
        }
    }

    Ok(ConvertRequest::new(file, code))
}

fn malformed(err: MultipartError) -> MermaidPdfError {
    MermaidPdfError::MalformedRequest(err.body_text())
}

/// Runs `work` within the per-request budget. Dropping the work on timeout
/// kills any running subprocess and removes its scratch files; vector work on
/// the blocking pool is abandoned.
async fn within_budget<T>(
    budget: Duration,
    work: impl Future<Output = Result<T, MermaidPdfError>>,
) -> Result<T, MermaidPdfError> {
    tokio::time::timeout(budget, work)
        .await
        .map_err(|_| MermaidPdfError::Timeout(budget.as_secs()))?
}

impl MermaidPdfError {
    /// HTTP status reported for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            _ if self.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Timeout(_) | Self::ExternalTool(ToolError::Timeout { .. }) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MermaidPdfError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();
        if status.is_server_error() {
            error!(status = status.as_u16(), message; "Conversion failed");
        } else {
            warn!(status = status.as_u16(), message; "Conversion rejected");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl IntoResponse for PdfDocument {
    fn into_response(self) -> Response {
        let disposition = format!(
            "attachment; filename=\"{}\"",
            header_safe(self.file_name())
        );
        (
            [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            self.into_bytes(),
        )
            .into_response()
    }
}

/// Keeps a file name representable in a quoted header parameter.
fn header_safe(name: &str) -> String {
    name.chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
