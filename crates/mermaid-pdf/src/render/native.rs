//! In-process rendering through `mermaid-rs-renderer`.

use log::{debug, trace};

use crate::{MermaidPdfError, config::RenderConfig};

const FONT_FAMILY_ATTR: &str = "font-family=\"";

/// Renders diagram source to SVG text.
pub(super) fn render(source: &str, config: &RenderConfig) -> Result<String, MermaidPdfError> {
    let svg = mermaid_rs_renderer::render_with_options(source, render_options(config))
        .map_err(MermaidPdfError::new_syntax_error)?;
    trace!(bytes = svg.len(); "Native renderer output");
    Ok(sanitize_font_family(&svg))
}

/// Maps the renderer settings onto the renderer's theme.
fn render_options(config: &RenderConfig) -> mermaid_rs_renderer::RenderOptions {
    let mut theme = mermaid_rs_renderer::Theme::modern();
    if let Some(font_family) = config.font_family() {
        theme.font_family = font_family.to_string();
    }
    if let Some(background) = config.background() {
        theme.background = background.to_string();
    }
    if let Some(primary_color) = config.primary_color() {
        theme.primary_color = primary_color.to_string();
    }
    debug!(font_family = theme.font_family; "Native render theme");

    mermaid_rs_renderer::RenderOptions {
        theme,
        layout: mermaid_rs_renderer::LayoutConfig::default(),
    }
}

/// Repairs `font-family` attributes that contain unescaped double quotes,
/// such as `font-family="Inter, "Segoe UI", sans-serif"`, which is not
/// well-formed XML.
///
/// Inside the attribute value, a `"` followed by whitespace, `/`, `>` or the
/// end of input closes the value; any other `"` becomes `'`.
fn sanitize_font_family(svg: &str) -> String {
    let mut result = String::with_capacity(svg.len());
    let mut rest = svg;

    while let Some(start) = rest.find(FONT_FAMILY_ATTR) {
        let value_start = start + FONT_FAMILY_ATTR.len();
        result.push_str(&rest[..value_start]);
        rest = &rest[value_start..];

        let mut chars = rest.char_indices().peekable();
        let mut consumed = rest.len();
        while let Some((index, c)) = chars.next() {
            if c != '"' {
                result.push(c);
                continue;
            }
            let closes = chars
                .peek()
                .is_none_or(|&(_, next)| next.is_whitespace() || next == '/' || next == '>');
            if closes {
                result.push('"');
                consumed = index + 1;
                break;
            }
            result.push('\'');
        }
        rest = &rest[consumed..];
    }

    result.push_str(rest);
    result
}
