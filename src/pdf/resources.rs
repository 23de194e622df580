use anyhow::{anyhow, Context, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Page attributes may be inherited through at most this many parents
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Page rectangle from the MediaBox, in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Look up an inheritable page attribute, walking the /Parent chain
fn inherited_attribute<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        let parent_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent_id).ok()?;
    }
    None
}

/// Follow a reference, or return the object itself
fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Result<&'a Object> {
    match object {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

/// Read the page's MediaBox
pub fn page_box(doc: &Document, page_id: ObjectId) -> Result<PageBox> {
    let media_box = inherited_attribute(doc, page_id, b"MediaBox")
        .ok_or_else(|| anyhow!("Page {:?} has no MediaBox", page_id))?;
    let corners = resolve(doc, media_box)?
        .as_array()
        .with_context(|| "MediaBox is not an array")?;
    if corners.len() != 4 {
        return Err(anyhow!("MediaBox has {} entries, expected 4", corners.len()));
    }

    let mut values = [0.0f64; 4];
    for (value, corner) in values.iter_mut().zip(corners) {
        *value = f64::from(resolve(doc, corner)?.as_float()?);
    }
    let [x1, y1, x2, y2] = values;

    Ok(PageBox {
        x: x1.min(x2),
        y: y1.min(y2),
        width: (x2 - x1).abs(),
        height: (y2 - y1).abs(),
    })
}

/// Register `font_id` in the page's font resources
///
/// Existing fonts are kept. Resources held by reference are updated in
/// place; inline or inherited resources are copied onto the page.
/// Returns the resource name to use with `Tf`.
pub fn register_font(doc: &mut Document, page_id: ObjectId, font_id: ObjectId) -> Result<String> {
    let page = doc.get_dictionary(page_id)?;
    let resources_ref = page.get(b"Resources").and_then(Object::as_reference).ok();

    // Clone everything we need before the mutable borrow
    let mut resources = match inherited_attribute(doc, page_id, b"Resources") {
        Some(object) => resolve(doc, object)?
            .as_dict()
            .with_context(|| "Resources is not a dictionary")?
            .clone(),
        None => Dictionary::new(),
    };
    let mut fonts = match resources.get(b"Font") {
        Ok(object) => resolve(doc, object)?
            .as_dict()
            .with_context(|| "Font resources are not a dictionary")?
            .clone(),
        Err(_) => Dictionary::new(),
    };

    let mut index = font_id.0;
    let mut name = format!("FCl{}", index);
    while fonts.has(name.as_bytes()) {
        index += 1;
        name = format!("FCl{}", index);
    }

    fonts.set(name.clone(), Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    match resources_ref {
        Some(resources_id) => {
            doc.objects.insert(resources_id, Object::Dictionary(resources));
        }
        None => {
            doc.get_dictionary_mut(page_id)?
                .set("Resources", Object::Dictionary(resources));
        }
    }

    Ok(name)
}
