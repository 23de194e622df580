use anyhow::{anyhow, Context, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, warn};

use super::content::{compress_data, ContentBuilder};
use super::fonts::ClauseFont;
use super::resources::{page_box, register_font};
use crate::config::ClauseStyle;
use crate::layout::{place, wrap, LayoutConfig, PositionedLine};

/// Wrap and position `text` with the metrics of `font`
pub fn layout_lines<F: ClauseFont + ?Sized>(
    text: &str,
    font: &F,
    config: &LayoutConfig,
) -> Vec<PositionedLine> {
    let lines = wrap(
        text,
        |candidate, size| font.width_of_text_at_size(candidate, size),
        config.max_width,
        config.font_size,
    );
    place(lines, config)
}

/// Wrap the page's existing content in q/Q and append the overlay after it
fn append_overlay(doc: &mut Document, page_id: ObjectId, overlay: &[u8]) -> Result<()> {
    let existing = doc.get_page_contents(page_id);

    let save_state_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));

    let mut overlay_dict = Dictionary::new();
    overlay_dict.set("Filter", "FlateDecode");
    let overlay_id = doc.add_object(Stream::new(overlay_dict, compress_data(overlay)?));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(save_state_id));
    contents.extend(existing.into_iter().map(Object::Reference));
    contents.push(Object::Reference(overlay_id));

    doc.get_dictionary_mut(page_id)
        .with_context(|| "Failed to update page contents")?
        .set("Contents", contents);

    Ok(())
}

/// Load a fresh copy of `template` and draw `clause` on page `page_number`
/// (1-based) at the bottom margin.
pub fn stamp_clause<F: ClauseFont + ?Sized>(
    template: &[u8],
    page_number: u32,
    clause: &str,
    font: &F,
    style: &ClauseStyle,
) -> Result<Document> {
    let mut doc = Document::load_mem(template)
        .with_context(|| "Failed to load the input PDF")?;

    let pages = doc.get_pages();
    let page_id = *pages.get(&page_number).ok_or_else(|| {
        anyhow!(
            "Page {} not found, the input PDF has {} page(s)",
            page_number,
            pages.len()
        )
    })?;

    let page_box = page_box(&doc, page_id)?;
    debug!(page = page_number, width = page_box.width, height = page_box.height, "page size");
    let config = LayoutConfig::for_page(style, page_box.width);
    if config.max_width <= 0.0 {
        warn!(
            page_width = page_box.width,
            margin_sides = style.margin_sides,
            "side margins leave no room for the clause, every word will overflow"
        );
    }

    let lines = layout_lines(clause, font, &config);

    let font_id = font.embed(&mut doc, clause)?;
    let font_name = register_font(&mut doc, page_id, font_id)?;

    let mut builder = ContentBuilder::new(font_name).with_origin(page_box.x, page_box.y);
    for line in &lines {
        debug!(
            text = %line.line.text,
            x = line.x,
            y = line.y,
            width = line.line.width,
            "placed clause line"
        );
        builder.add_line(line, &font.encode(&line.line.text));
    }
    debug!(page = page_number, lines = builder.line_count(), "drawing clause");

    append_overlay(&mut doc, page_id, &builder.build_content_bytes())?;

    Ok(doc)
}

/// Serialize a document to PDF bytes
pub fn save_document(doc: &mut Document) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .with_context(|| "Failed to serialize the stamped PDF")?;
    Ok(bytes)
}
