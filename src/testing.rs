//! Test fixtures: a metrics-only Courier font and generated template PDFs.

use anyhow::Result;
use lopdf::{Dictionary, Document, Object, ObjectId};
use printpdf::{BuiltinFont, Mm, PdfDocument};
use std::fs::File;
use std::io::BufWriter;

use crate::pdf::{find_system_font, ClauseFont};

/// Families tried first when a test needs a real font
const PREFERRED_FAMILIES: &[&str] = &["DejaVu Sans", "Liberation Sans", "Noto Sans", "FreeSans"];

/// Standard Type1 Courier. Every glyph advances 600/1000 em, so no font
/// file is needed to measure it.
pub struct Courier;

impl ClauseFont for Courier {
    fn width_of_text_at_size(&self, text: &str, size: f64) -> f64 {
        text.chars().count() as f64 * 0.6 * size
    }

    fn encode(&self, text: &str) -> String {
        format!("({})", escape_pdf_string(text))
    }

    fn embed(&self, doc: &mut Document, _text: &str) -> Result<ObjectId> {
        let mut font_dict = Dictionary::new();
        font_dict.set("Type", "Font");
        font_dict.set("Subtype", "Type1");
        font_dict.set("BaseFont", "Courier");
        Ok(doc.add_object(Object::Dictionary(font_dict)))
    }
}

/// Escape special characters in PDF strings
fn escape_pdf_string(s: &str) -> String {
    let mut result = String::new();
    for c in s.chars() {
        match c {
            '(' => result.push_str(r"\("),
            ')' => result.push_str(r"\)"),
            '\\' => result.push_str(r"\\"),
            _ => result.push(c),
        }
    }
    result
}

/// Whether a single (non-collection) font in `data` has a glyph for every
/// character of `text`
fn covers(data: &[u8], index: u32, text: &str) -> bool {
    if ttf_parser::fonts_in_collection(data).is_some() {
        return false;
    }
    match ttf_parser::Face::parse(data, index) {
        Ok(face) => text
            .chars()
            .filter(|c| !c.is_whitespace())
            .all(|c| face.glyph_index(c).is_some()),
        Err(_) => false,
    }
}

/// An installed font able to draw `text`, looked up through fontdb
///
/// Returns `None` on machines without a suitable font.
pub fn system_font(text: &str) -> Option<(Vec<u8>, u32)> {
    for family in PREFERRED_FAMILIES {
        if let Some((data, index)) = find_system_font(family) {
            if covers(&data, index, text) {
                return Some((data, index));
            }
        }
    }

    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    let ids: Vec<fontdb::ID> = db.faces().map(|face| face.id).collect();
    ids.into_iter()
        .filter_map(|id| db.with_face_data(id, |data, index| (data.to_vec(), index)))
        .find(|(data, index)| covers(data, *index, text))
}

/// An A4 PDF with `pages` pages and a heading on the first one
pub fn template_pdf(pages: usize) -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("base.pdf");

    let (doc, page1, layer1) = PdfDocument::new("Clause Template", Mm(210.0), Mm(297.0), "Layer 1");
    let font = doc.add_builtin_font(BuiltinFont::Helvetica).unwrap();
    doc.get_page(page1)
        .get_layer(layer1)
        .use_text("Curriculum Vitae", 24.0, Mm(20.0), Mm(270.0), &font);
    for _ in 1..pages {
        doc.add_page(Mm(210.0), Mm(297.0), "Layer 1");
    }

    {
        let file = File::create(&path).unwrap();
        let mut writer = BufWriter::new(file);
        doc.save(&mut writer).unwrap();
    }
    std::fs::read(&path).unwrap()
}

#[test]
fn test_escape_pdf_string() {
    assert_eq!(escape_pdf_string("hello"), "hello");
    assert_eq!(escape_pdf_string("(hello)"), r"\(hello\)");
    assert_eq!(escape_pdf_string("hello\\world"), r"hello\\world");
}
