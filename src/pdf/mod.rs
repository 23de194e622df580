//! PDF side of stamping: fonts, content streams and page resources.

mod content;
mod document;
mod fonts;
mod resources;

pub use document::{save_document, stamp_clause};
pub use fonts::{load_font_source, ClauseFont, EmbeddedFont};
#[cfg(test)]
pub use fonts::find_system_font;
