//! Mermaid PDF Core
//!
//! This crate provides the I/O-free pieces of the Mermaid-to-PDF pipeline:
//!
//! - **Source**: Extraction of diagram source from pasted text or markdown ([`source`] module)
//! - **Geometry**: Bounding boxes and page layout ([`geometry`] module)
//! - **Colors**: CSS color validation ([`color::Color`])
//! - **Tree**: An owned, serializable SVG element tree ([`tree`] module)
//! - **Style**: Computed-style resolution over a rendered SVG document ([`style`] module)
//! - **Normalize**: The SVG export normalizer ([`normalize::Normalizer`])

pub mod color;
pub mod geometry;
pub mod normalize;
pub mod source;
pub mod style;
pub mod tree;

mod error;

pub use error::Error;
