//! PDF content stream generation for the clause.
//!
//! This module provides:
//! - Text rendering of positioned lines with a registered font
//! - Glyph id encoding for Identity-H fonts
//! - Number formatting and stream compression

use anyhow::Result;
use std::io::Write;

use crate::layout::PositionedLine;

/// Builder for the overlay content stream drawn on top of the page
pub struct ContentBuilder {
    content_parts: Vec<String>,
    font_name: String,
    origin: (f64, f64),
}

impl ContentBuilder {
    /// Create a new ContentBuilder drawing with the font registered as `font_name`
    pub fn new(font_name: String) -> Self {
        Self {
            content_parts: Vec::new(),
            font_name,
            origin: (0.0, 0.0),
        }
    }

    /// Shift every line by the page's MediaBox origin
    pub fn with_origin(mut self, x: f64, y: f64) -> Self {
        self.origin = (x, y);
        self
    }

    /// Add one line; `operand` is the already encoded string for `Tj`
    pub fn add_line(&mut self, line: &PositionedLine, operand: &str) {
        self.content_parts.push(format!(
            "BT 0 g /{} {} Tf {} TL {} {} Td {} Tj ET\n",
            self.font_name,
            pdf_number(line.font_size),
            pdf_number(line.line_height),
            pdf_number(line.x),
            pdf_number(line.y),
            operand
        ));
    }

    pub fn line_count(&self) -> usize {
        self.content_parts.len()
    }

    /// Build the final content bytes.
    ///
    /// The page's own content is expected to be wrapped in `q`, so the
    /// overlay restores the initial graphics state before drawing.
    pub fn build_content_bytes(&self) -> Vec<u8> {
        let mut content = String::from("\nQ\nq\n");
        let (x, y) = self.origin;
        if x != 0.0 || y != 0.0 {
            content.push_str(&format!("1 0 0 1 {} {} cm\n", pdf_number(x), pdf_number(y)));
        }
        content.push_str(&self.content_parts.join(""));
        content.push_str("Q\n");
        content.into_bytes()
    }
}

/// Format a number for a content stream: no exponent, at most 3 decimals
pub fn pdf_number(value: f64) -> String {
    let formatted = format!("{:.3}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Encode glyph ids as a hex string operand for Identity-H fonts
///
/// Each glyph id becomes two big-endian bytes.
pub fn encode_glyph_ids(glyph_ids: impl IntoIterator<Item = u16>) -> String {
    let hex: String = glyph_ids
        .into_iter()
        .map(|gid| format!("{:04X}", gid))
        .collect();
    format!("<{}>", hex)
}

/// Compress data using zlib/flate2
pub fn compress_data(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
