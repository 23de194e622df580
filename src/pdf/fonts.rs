use anyhow::{anyhow, Context, Result};
use fontdb::Database;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use ttf_parser::{name_id, Face, GlyphId};

use super::content::{compress_data, encode_glyph_ids};
use crate::config::{load_file, FontSource};

/// ToUnicode CMaps allow at most 100 entries per bfchar block
const BFCHAR_BLOCK: usize = 100;

/// A font the clause can be measured and drawn with
pub trait ClauseFont {
    /// Width of `text` in points at `size`
    fn width_of_text_at_size(&self, text: &str, size: f64) -> f64;

    /// Encode `text` as a string operand for `Tj`
    fn encode(&self, text: &str) -> String;

    /// Add the font objects needed to show `text` and return the font
    /// dictionary id
    fn embed(&self, doc: &mut Document, text: &str) -> Result<ObjectId>;
}

/// A TrueType or OpenType font embedded whole as a Type0 font with
/// Identity-H encoding. Text is written as glyph ids.
pub struct EmbeddedFont<'a> {
    face: Face<'a>,
    data: &'a [u8],
    name: String,
}

impl<'a> EmbeddedFont<'a> {
    /// Parse face `index` of `data` (0 unless `data` is a collection)
    pub fn parse(data: &'a [u8], index: u32) -> Result<Self> {
        let face = Face::parse(data, index)
            .with_context(|| format!("Failed to parse font face {}", index))?;
        let name = base_font_name(&face);
        if ttf_parser::fonts_in_collection(data).is_some() {
            warn!(font = %name, "font collections are embedded whole, some viewers may not render them");
        }

        debug!(
            font = %name,
            units_per_em = face.units_per_em(),
            glyphs = face.number_of_glyphs(),
            cff = face.tables().cff.is_some(),
            "parsed clause font"
        );

        Ok(Self { face, data, name })
    }

    /// PostScript name used as BaseFont
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Glyphs without an entry in the cmap fall back to .notdef
    fn glyph_id(&self, ch: char) -> GlyphId {
        self.face.glyph_index(ch).unwrap_or(GlyphId(0))
    }

    fn advance(&self, glyph: GlyphId) -> u16 {
        self.face.glyph_hor_advance(glyph).unwrap_or(0)
    }

    /// Convert font units to the 1000-unit glyph space used by PDF
    fn to_glyph_space(&self, value: f64) -> i64 {
        (value * 1000.0 / f64::from(self.face.units_per_em())).round() as i64
    }

    /// Glyphs needed for `text`, with the first character mapped to each
    fn used_glyphs(&self, text: &str) -> BTreeMap<u16, char> {
        let mut glyphs = BTreeMap::new();
        for ch in text.chars() {
            glyphs.entry(self.glyph_id(ch).0).or_insert(ch);
        }
        glyphs
    }

    fn add_descriptor(&self, doc: &mut Document, is_cff: bool) -> Result<ObjectId> {
        let bbox = self.face.global_bounding_box();
        let ascent = self.to_glyph_space(f64::from(self.face.ascender()));
        let cap_height = self
            .face
            .capital_height()
            .map(|h| self.to_glyph_space(f64::from(h)))
            .unwrap_or(ascent);

        let mut font_descriptor = Dictionary::new();
        font_descriptor.set("Type", "FontDescriptor");
        font_descriptor.set("FontName", self.name.as_str());
        font_descriptor.set("Flags", 4i64); // Symbolic
        font_descriptor.set(
            "FontBBox",
            [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max]
                .into_iter()
                .map(|v| Object::Integer(self.to_glyph_space(f64::from(v))))
                .collect::<Vec<_>>(),
        );
        font_descriptor.set("ItalicAngle", 0i64);
        font_descriptor.set("Ascent", ascent);
        font_descriptor.set("Descent", self.to_glyph_space(f64::from(self.face.descender())));
        font_descriptor.set("CapHeight", cap_height);
        font_descriptor.set("StemV", 80i64);

        // Embed the font program
        let mut font_stream_dict = Dictionary::new();
        font_stream_dict.set("Filter", "FlateDecode");
        if is_cff {
            font_stream_dict.set("Subtype", "OpenType");
        } else {
            font_stream_dict.set("Length1", self.data.len() as i64);
        }
        let font_stream = Stream::new(font_stream_dict, compress_data(self.data)?);
        let font_stream_id = doc.add_object(font_stream);

        let file_key = if is_cff { "FontFile3" } else { "FontFile2" };
        font_descriptor.set(file_key, Object::Reference(font_stream_id));

        Ok(doc.add_object(Object::Dictionary(font_descriptor)))
    }

    /// `[gid [width] gid [width] ...]` for the glyphs in use
    fn width_array(&self, glyphs: &BTreeMap<u16, char>) -> Vec<Object> {
        let mut widths = Vec::with_capacity(glyphs.len() * 2);
        for gid in glyphs.keys() {
            let width = self.to_glyph_space(f64::from(self.advance(GlyphId(*gid))));
            widths.push(Object::Integer(i64::from(*gid)));
            widths.push(Object::Array(vec![Object::Integer(width)]));
        }
        widths
    }
}

impl ClauseFont for EmbeddedFont<'_> {
    fn width_of_text_at_size(&self, text: &str, size: f64) -> f64 {
        let units: f64 = text
            .chars()
            .map(|ch| f64::from(self.advance(self.glyph_id(ch))))
            .sum();
        units * size / f64::from(self.face.units_per_em())
    }

    fn encode(&self, text: &str) -> String {
        encode_glyph_ids(text.chars().map(|ch| self.glyph_id(ch).0))
    }

    fn embed(&self, doc: &mut Document, text: &str) -> Result<ObjectId> {
        let is_cff = self.face.tables().cff.is_some();
        let glyphs = self.used_glyphs(text);
        let descriptor_id = self.add_descriptor(doc, is_cff)?;

        // CIDFont descendant, CIDs are glyph ids
        let mut cid_font = Dictionary::new();
        cid_font.set("Type", "Font");
        cid_font.set("Subtype", if is_cff { "CIDFontType0" } else { "CIDFontType2" });
        cid_font.set("BaseFont", self.name.as_str());
        cid_font.set("CIDSystemInfo", {
            let mut cid_system = Dictionary::new();
            cid_system.set("Registry", Object::String("Adobe".into(), StringFormat::Literal));
            cid_system.set("Ordering", Object::String("Identity".into(), StringFormat::Literal));
            cid_system.set("Supplement", 0i64);
            Object::Dictionary(cid_system)
        });
        cid_font.set("FontDescriptor", Object::Reference(descriptor_id));
        cid_font.set("DW", self.to_glyph_space(f64::from(self.advance(GlyphId(0)))));
        cid_font.set("W", self.width_array(&glyphs));
        if !is_cff {
            cid_font.set("CIDToGIDMap", "Identity");
        }
        let cid_font_id = doc.add_object(Object::Dictionary(cid_font));

        let cmap = to_unicode_cmap(&glyphs);
        let to_unicode_id = doc.add_object(Stream::new(Dictionary::new(), cmap.into_bytes()));

        let mut type0_font = Dictionary::new();
        type0_font.set("Type", "Font");
        type0_font.set("Subtype", "Type0");
        type0_font.set("BaseFont", self.name.as_str());
        type0_font.set("Encoding", "Identity-H");
        type0_font.set("DescendantFonts", vec![Object::Reference(cid_font_id)]);
        type0_font.set("ToUnicode", Object::Reference(to_unicode_id));

        debug!(font = %self.name, glyphs = glyphs.len(), "embedded clause font");
        Ok(doc.add_object(Object::Dictionary(type0_font)))
    }
}

/// PostScript name of the face, reduced to characters safe in a PDF name
fn base_font_name(face: &Face) -> String {
    let name = [name_id::POST_SCRIPT_NAME, name_id::FULL_NAME]
        .into_iter()
        .find_map(|id| {
            face.names()
                .into_iter()
                .find(|name| name.name_id == id && name.is_unicode())
                .and_then(|name| name.to_string())
        })
        .unwrap_or_default();

    let safe: String = name
        .chars()
        .map(|c| if c == ' ' { '-' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if safe.is_empty() {
        "ClauseFont".to_string()
    } else {
        safe
    }
}

/// ToUnicode CMap mapping each glyph id back to its character
fn to_unicode_cmap(glyphs: &BTreeMap<u16, char>) -> String {
    let entries: Vec<String> = glyphs
        .iter()
        .filter(|(gid, _)| **gid != 0)
        .map(|(gid, ch)| {
            let mut units = [0u16; 2];
            let unicode: String = ch
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{:04X}", u))
                .collect();
            format!("<{:04X}> <{}>", gid, unicode)
        })
        .collect();

    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n\
         <0000> <FFFF>\n\
         endcodespacerange\n",
    );
    for block in entries.chunks(BFCHAR_BLOCK) {
        cmap.push_str(&format!("{} beginbfchar\n", block.len()));
        for entry in block {
            cmap.push_str(entry);
            cmap.push('\n');
        }
        cmap.push_str("endbfchar\n");
    }
    cmap.push_str(
        "endcmap\n\
         CMapName currentdict /CMap defineresource pop\n\
         end\n\
         end\n",
    );
    cmap
}

/// Read the font bytes and face index for `source`
pub fn load_font_source(source: &FontSource) -> Result<(Vec<u8>, u32)> {
    match source {
        FontSource::File(path) => Ok((load_file(path, "font file")?, 0)),
        FontSource::Family(family) => find_system_font(family).ok_or_else(|| {
            anyhow!("Font not found: {:?} is neither a file nor an installed font family", family)
        }),
    }
}

/// Find an installed font by family name
///
/// Returns the font data and the face index within it
pub fn find_system_font(family: &str) -> Option<(Vec<u8>, u32)> {
    let mut db = Database::new();
    db.load_system_fonts();

    let families = [fontdb::Family::Name(family)];
    let query = fontdb::Query {
        families: &families,
        ..Default::default()
    };
    let id = db.query(&query)?;
    debug!(family, ?id, "resolved system font");
    db.with_face_data(id, |data, index| (data.to_vec(), index))
}
