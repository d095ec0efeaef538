//! Worksheet page normalization
//!
//! Loads the first page of a worksheet PDF, strips its links and embedded
//! external objects, and scales it uniformly so it sits centered on the
//! workbook canvas. The remaining page resources are deep-copied into the
//! workbook document.

use std::collections::HashMap;
use std::path::Path;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use crate::error::{Error, Result};
use crate::layout::{fit_and_center, PageSize, Placement};
use crate::pdf::page::Page;
use crate::pdf::workbook::Workbook;

/// Page size assumed when a page carries no usable MediaBox (US Letter)
const FALLBACK_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Maximum depth followed up the page tree for inherited attributes
const MAX_INHERIT_DEPTH: usize = 32;

/// Resources of a page after links and external objects were removed
#[derive(Debug, Clone)]
pub struct CleanedResources {
    /// Resources without the XObject category
    pub resources: Dictionary,
    /// Names of the XObjects that were dropped
    pub removed_xobjects: Vec<Vec<u8>>,
}

/// Rebuild a resources dictionary without its XObject category
///
/// Images and form XObjects are discarded entirely; every other category
/// is kept as is. The input dictionary is left untouched.
pub fn clean_resources(resources: &Dictionary) -> CleanedResources {
    let mut cleaned = Dictionary::new();
    let mut removed_xobjects = Vec::new();

    for (key, value) in resources.iter() {
        if key.as_slice() == b"XObject" {
            if let Object::Dictionary(xobjects) = value {
                removed_xobjects.extend(xobjects.iter().map(|(name, _)| name.clone()));
            }
            continue;
        }
        cleaned.set(key.clone(), value.clone());
    }

    CleanedResources {
        resources: cleaned,
        removed_xobjects,
    }
}

/// Drop `Do` operators that invoke any of the `removed` XObjects
///
/// Content that cannot be decoded is returned unchanged.
pub fn strip_xobject_invocations(content: Vec<u8>, removed: &[Vec<u8>]) -> Vec<u8> {
    if removed.is_empty() {
        return content;
    }

    let mut decoded = match Content::decode(&content) {
        Ok(decoded) => decoded,
        Err(e) => {
            log::warn!("Keeping undecodable content stream as is: {}", e);
            return content;
        }
    };

    decoded.operations.retain(|op| {
        if op.operator != "Do" {
            return true;
        }
        match op.operands.first() {
            Some(Object::Name(name)) => !removed.iter().any(|r| r == name),
            _ => true,
        }
    });

    match decoded.encode() {
        Ok(encoded) => encoded,
        Err(e) => {
            log::warn!("Keeping content stream after failed re-encode: {}", e);
            content
        }
    }
}

/// Load the first page of `path` and fit it onto the workbook canvas
pub fn normalize_page(path: &Path, book: &mut Workbook) -> Result<Page> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let source = Document::load(path)?;
    let page_id = match source.get_pages().values().next() {
        Some(id) => *id,
        None => return Err(Error::EmptyPdf(path.to_path_buf())),
    };

    let media_box = effective_media_box(&source, page_id);
    let width = media_box[2] - media_box[0];
    let height = media_box[3] - media_box[1];
    if width <= 0.0 || height <= 0.0 {
        return Err(Error::General(format!(
            "Invalid page size {}x{} in {}",
            width,
            height,
            path.display()
        )));
    }

    let cleaned = clean_resources(&effective_resources(&source, page_id));
    let content = strip_xobject_invocations(page_content(&source, page_id)?, &cleaned.removed_xobjects);

    let canvas = book.canvas();
    let placement = fit_and_center(width, height, canvas);
    log::debug!(
        "{}: {}x{} scaled by {:.4} to ({:.2}, {:.2})",
        path.display(),
        width,
        height,
        placement.scale,
        placement.x,
        placement.y
    );

    let mut importer = ObjectImporter::new(&source);
    let resources = importer.import_dict(book.document_mut(), &cleaned.resources);

    Ok(Page {
        size: canvas,
        content: transformed_content(&content, placement, media_box),
        resources,
        annotations: Vec::new(),
    })
}

/// Wrap `content` in a scale-then-translate transform
///
/// The source MediaBox origin is folded into the translation so the box
/// itself, not the coordinate origin, ends up centered.
fn transformed_content(content: &[u8], placement: Placement, media_box: [f32; 4]) -> Vec<u8> {
    let s = placement.scale;
    let tx = placement.x - media_box[0] * s;
    let ty = placement.y - media_box[1] * s;

    let mut wrapped = format!("q\n{:.6} 0 0 {:.6} {:.4} {:.4} cm\n", s, s, tx, ty).into_bytes();
    wrapped.extend_from_slice(content);
    wrapped.extend_from_slice(b"\nQ\n");
    wrapped
}

/// A page's content streams joined in order, each followed by a newline
///
/// Streams in a `/Contents` array may split anywhere between tokens, so the
/// separator keeps the last operator of one stream apart from the first of
/// the next.
fn page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>> {
    let page = doc.get_dictionary(page_id)?;
    let contents = match page.get(b"Contents") {
        Ok(contents) => contents,
        Err(_) => return Ok(Vec::new()),
    };

    let parts = match contents {
        Object::Reference(id) => match doc.get_object(*id)? {
            Object::Array(arr) => arr.clone(),
            _ => vec![contents.clone()],
        },
        Object::Array(arr) => arr.clone(),
        other => vec![other.clone()],
    };

    let mut content = Vec::new();
    for part in &parts {
        let stream = match part {
            Object::Reference(id) => doc.get_object(*id)?,
            other => other,
        }
        .as_stream()?;
        match stream.decompressed_content() {
            Ok(data) => content.extend_from_slice(&data),
            Err(_) => content.extend_from_slice(&stream.content),
        }
        content.push(b'\n');
    }
    Ok(content)
}

/// Resolve an object that may be an indirect reference to a dictionary
fn resolve_dict(doc: &Document, object: &Object) -> Option<Dictionary> {
    match object {
        Object::Dictionary(dict) => Some(dict.clone()),
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok().cloned(),
        _ => None,
    }
}

/// Find an attribute on the page or inherited from its ancestors
fn inherited_attribute<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_object(page_id).ok()?.as_dict().ok()?;

    for _ in 0..MAX_INHERIT_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        match current.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => {
                current = doc.get_object(*parent_id).ok()?.as_dict().ok()?;
            }
            _ => return None,
        }
    }

    None
}

/// The page's MediaBox, following inheritance and indirect arrays
fn effective_media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let array = match inherited_attribute(doc, page_id, b"MediaBox") {
        Some(Object::Array(arr)) => Some(arr.clone()),
        Some(Object::Reference(id)) => doc.get_object(*id).ok().and_then(|o| o.as_array().ok().cloned()),
        _ => None,
    };

    let values: Vec<f32> = array
        .unwrap_or_default()
        .iter()
        .filter_map(|o| o.as_float().ok())
        .collect();

    if values.len() == 4 {
        // Normalize corner order so width and height come out positive
        [
            values[0].min(values[2]),
            values[1].min(values[3]),
            values[0].max(values[2]),
            values[1].max(values[3]),
        ]
    } else {
        log::warn!("Page {:?} has no usable MediaBox, assuming US Letter", page_id);
        FALLBACK_MEDIA_BOX
    }
}

/// The page's Resources with each category dereferenced to a dictionary
fn effective_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    let resources = inherited_attribute(doc, page_id, b"Resources")
        .and_then(|obj| resolve_dict(doc, obj))
        .unwrap_or_default();

    let mut resolved = Dictionary::new();
    for (key, value) in resources.iter() {
        let value = match value {
            Object::Reference(_) => resolve_dict(doc, value).map(Object::Dictionary).unwrap_or_else(|| value.clone()),
            _ => value.clone(),
        };
        resolved.set(key.clone(), value);
    }
    resolved
}

/// Deep-copies objects from a source document, renumbering references
struct ObjectImporter<'a> {
    source: &'a Document,
    id_map: HashMap<ObjectId, ObjectId>,
}

impl<'a> ObjectImporter<'a> {
    fn new(source: &'a Document) -> Self {
        Self {
            source,
            id_map: HashMap::new(),
        }
    }

    fn import_dict(&mut self, target: &mut Document, dict: &Dictionary) -> Dictionary {
        let mut copied = Dictionary::new();
        for (key, value) in dict.iter() {
            // Never pull page-tree nodes along with a resource
            if key.as_slice() == b"Parent" {
                continue;
            }
            copied.set(key.clone(), self.import(target, value));
        }
        copied
    }

    fn import(&mut self, target: &mut Document, object: &Object) -> Object {
        match object {
            Object::Reference(id) => Object::Reference(self.import_reference(target, *id)),
            Object::Array(arr) => Object::Array(arr.iter().map(|o| self.import(target, o)).collect()),
            Object::Dictionary(dict) => Object::Dictionary(self.import_dict(target, dict)),
            Object::Stream(stream) => Object::Stream(Stream {
                dict: self.import_dict(target, &stream.dict),
                content: stream.content.clone(),
                allows_compression: stream.allows_compression,
                start_position: None,
            }),
            _ => object.clone(),
        }
    }

    fn import_reference(&mut self, target: &mut Document, id: ObjectId) -> ObjectId {
        if let Some(new_id) = self.id_map.get(&id) {
            return *new_id;
        }

        // Register before copying so reference cycles terminate
        let new_id = target.new_object_id();
        self.id_map.insert(id, new_id);

        let source = self.source;
        let copied = match source.get_object(id) {
            Ok(object) => self.import(target, object),
            Err(_) => Object::Null,
        };
        target.objects.insert(new_id, copied);

        new_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_dict(entries: &[(&str, ObjectId)]) -> Object {
        let mut dict = Dictionary::new();
        for (name, id) in entries {
            dict.set(*name, Object::Reference(*id));
        }
        Object::Dictionary(dict)
    }

    #[test]
    fn test_clean_resources_drops_xobjects_only() {
        let mut resources = Dictionary::new();
        resources.set("Font", name_dict(&[("F1", (4, 0))]));
        resources.set("XObject", name_dict(&[("Im1", (5, 0)), ("Fm1", (6, 0))]));

        let cleaned = clean_resources(&resources);
        assert!(cleaned.resources.get(b"XObject").is_err());
        assert!(cleaned.resources.get(b"Font").is_ok());
        assert_eq!(cleaned.removed_xobjects, vec![b"Im1".to_vec(), b"Fm1".to_vec()]);

        // The input dictionary is left as is
        assert!(resources.get(b"XObject").is_ok());
    }

    #[test]
    fn test_strip_xobject_invocations() {
        let content = b"q 100 0 0 100 0 0 cm /Im1 Do Q BT /F1 12 Tf (Hi) Tj ET /Keep Do".to_vec();
        let stripped = strip_xobject_invocations(content, &[b"Im1".to_vec()]);

        let decoded = Content::decode(&stripped).unwrap();
        let invoked: Vec<Vec<u8>> = decoded
            .operations
            .iter()
            .filter(|op| op.operator == "Do")
            .map(|op| op.operands[0].as_name().unwrap().to_vec())
            .collect();
        assert_eq!(invoked, vec![b"Keep".to_vec()]);
        assert!(decoded.operations.iter().any(|op| op.operator == "Tj"));
    }

    #[test]
    fn test_strip_without_removals_keeps_bytes() {
        let content = b"not even valid ((( content".to_vec();
        assert_eq!(strip_xobject_invocations(content.clone(), &[]), content);
    }

    #[test]
    fn test_transformed_content_centers_with_origin_offset() {
        let placement = Placement { scale: 2.0, x: 10.0, y: 20.0 };
        let content = transformed_content(b"0 0 m", placement, [5.0, 5.0, 105.0, 105.0]);
        let text = String::from_utf8(content).unwrap();
        assert!(text.starts_with("q\n2.000000 0 0 2.000000 0.0000 10.0000 cm\n0 0 m"));
        assert!(text.ends_with("\nQ\n"));
    }

    #[test]
    fn test_importer_renumbers_and_deduplicates() {
        let mut source = Document::with_version("1.5");
        let shared = source.add_object(Object::Integer(42));
        let list = source.add_object(Object::Array(vec![
            Object::Reference(shared),
            Object::Reference(shared),
        ]));

        let mut target = Document::with_version("1.5");
        target.add_object(Object::Null);

        let mut importer = ObjectImporter::new(&source);
        let copied = importer.import(&mut target, &Object::Reference(list));

        let new_list_id = copied.as_reference().unwrap();
        let items = target.get_object(new_list_id).unwrap().as_array().unwrap();
        let new_shared = items[0].as_reference().unwrap();
        assert_eq!(items[1].as_reference().unwrap(), new_shared);
        assert_eq!(target.get_object(new_shared).unwrap().as_i64().unwrap(), 42);
        assert_eq!(target.objects.len(), 3);
    }

    #[test]
    fn test_page_content_separates_streams() {
        let mut doc = Document::with_version("1.5");
        let fill = doc.add_object(Stream::new(Dictionary::new(), b"0 0 1 rg 10 10 50 50 re f".to_vec()));
        let mut compressed = Stream::new(Dictionary::new(), b"q 1 0 0 1 5 5 cm Q".to_vec());
        compressed.compress().unwrap();
        let nested = doc.add_object(compressed);
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Contents", Object::Array(vec![Object::Reference(fill), Object::Reference(nested)])),
        ]));

        let content = page_content(&doc, page_id).unwrap();
        let operators: Vec<String> = Content::decode(&content)
            .unwrap()
            .operations
            .into_iter()
            .map(|op| op.operator)
            .collect();
        assert_eq!(operators, vec!["rg", "re", "f", "q", "cm", "Q"]);
    }

    #[test]
    fn test_page_content_without_contents_is_empty() {
        let mut doc = Document::with_version("1.5");
        let page_id = doc.add_object(Dictionary::from_iter(vec![("Type", Object::Name(b"Page".to_vec()))]));
        assert!(page_content(&doc, page_id).unwrap().is_empty());
    }

    #[test]
    fn test_normalize_missing_file() {
        let fonts = crate::fonts::FontRegistry::builtin();
        let mut book = Workbook::new(PageSize::a4(), &fonts);
        let result = normalize_page(Path::new("missing/1.pdf"), &mut book);
        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }
}
