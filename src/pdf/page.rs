//! In-memory page surfaces and overlay merging

use lopdf::content::Content;
use lopdf::{Dictionary, Object};
use crate::layout::PageSize;

/// A single drawable page waiting to be appended to a workbook
///
/// `content` holds uncompressed content-stream operators, and `resources`
/// may reference objects already added to the target document.
#[derive(Debug, Clone)]
pub struct Page {
    /// Page size (becomes the MediaBox)
    pub size: PageSize,
    /// Content stream operators
    pub content: Vec<u8>,
    /// Resources dictionary (Font, ExtGState, XObject, ...)
    pub resources: Dictionary,
    /// Annotation references carried by the page
    pub annotations: Vec<Object>,
}

impl Page {
    /// Create a blank page of the given size
    pub fn blank(size: PageSize) -> Self {
        Self {
            size,
            content: Vec::new(),
            resources: Dictionary::new(),
            annotations: Vec::new(),
        }
    }

    /// Draw `overlay` on top of this page
    ///
    /// The overlay's operators run after the page's own, and its resources
    /// are merged into the page's resources dictionary. Overlay resources
    /// whose names the page already uses are renamed first.
    pub fn merge_overlay(&mut self, mut overlay: Page) {
        let renames = conflicting_names(&self.resources, &overlay.resources);
        if !renames.is_empty() {
            match rename_operands(&overlay.content, &renames) {
                Ok(content) => {
                    overlay.content = content;
                    overlay.resources = rename_entries(&overlay.resources, &renames);
                }
                Err(e) => log::warn!("Overlay resources replace page resources of the same name: {}", e),
            }
        }

        if !self.content.is_empty() && !self.content.ends_with(b"\n") {
            self.content.push(b'\n');
        }
        self.content.extend_from_slice(&overlay.content);
        self.resources = merge_resources(&self.resources, &overlay.resources);
        self.annotations.extend(overlay.annotations);
    }

    /// Number of entries in the named resource category (e.g. `XObject`)
    pub fn resource_count(&self, category: &[u8]) -> usize {
        match self.resources.get(category) {
            Ok(Object::Dictionary(dict)) => dict.len(),
            _ => 0,
        }
    }
}

/// Merge two resources dictionaries into a new one
///
/// Subdictionaries present in both (Font, ExtGState, ...) are merged entry by
/// entry with `overlay` winning on name clashes; any other value from
/// `overlay` replaces the base value.
pub fn merge_resources(base: &Dictionary, overlay: &Dictionary) -> Dictionary {
    let mut merged = base.clone();

    for (key, value) in overlay.iter() {
        let existing = match merged.get(key) {
            Ok(Object::Dictionary(dict)) => Some(dict.clone()),
            _ => None,
        };

        match (existing, value) {
            (Some(mut subdict), Object::Dictionary(extra)) => {
                for (subkey, subvalue) in extra.iter() {
                    subdict.set(subkey.clone(), subvalue.clone());
                }
                merged.set(key.clone(), Object::Dictionary(subdict));
            }
            _ => merged.set(key.clone(), value.clone()),
        }
    }

    merged
}

/// Overlay resource names already used by `base`, each paired with a free name
fn conflicting_names(base: &Dictionary, overlay: &Dictionary) -> Vec<(Vec<u8>, Vec<u8>)> {
    let used = resource_names(base);
    let mut taken: Vec<Vec<u8>> = used.iter().cloned().chain(resource_names(overlay)).collect();
    let mut renames: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();

    for name in resource_names(overlay) {
        if !used.contains(&name) || renames.iter().any(|(old, _)| *old == name) {
            continue;
        }
        let mut suffix = 1;
        let fresh = loop {
            let candidate = [name.as_slice(), suffix.to_string().as_bytes()].concat();
            if !taken.contains(&candidate) {
                break candidate;
            }
            suffix += 1;
        };
        taken.push(fresh.clone());
        renames.push((name, fresh));
    }

    renames
}

/// Every entry name across the categories of a resources dictionary
fn resource_names(resources: &Dictionary) -> Vec<Vec<u8>> {
    resources
        .iter()
        .filter_map(|(_, category)| category.as_dict().ok())
        .flat_map(|entries| entries.iter().map(|(name, _)| name.clone()))
        .collect()
}

fn renamed<'a>(renames: &'a [(Vec<u8>, Vec<u8>)], name: &[u8]) -> Option<&'a Vec<u8>> {
    renames
        .iter()
        .find(|(old, _)| old.as_slice() == name)
        .map(|(_, new)| new)
}

fn rename_entries(resources: &Dictionary, renames: &[(Vec<u8>, Vec<u8>)]) -> Dictionary {
    let mut result = Dictionary::new();
    for (category, value) in resources.iter() {
        let value = match value {
            Object::Dictionary(entries) => {
                let mut dict = Dictionary::new();
                for (name, entry) in entries.iter() {
                    let name = renamed(renames, name).unwrap_or(name);
                    dict.set(name.clone(), entry.clone());
                }
                Object::Dictionary(dict)
            }
            other => other.clone(),
        };
        result.set(category.clone(), value);
    }
    result
}

/// Rewrite name operands in a content stream according to `renames`
fn rename_operands(content: &[u8], renames: &[(Vec<u8>, Vec<u8>)]) -> lopdf::Result<Vec<u8>> {
    let mut decoded = Content::decode(content)?;
    for operation in decoded.operations.iter_mut() {
        for operand in operation.operands.iter_mut() {
            if let Object::Name(name) = operand {
                if let Some(new_name) = renamed(renames, name) {
                    *name = new_name.clone();
                }
            }
        }
    }
    decoded.encode()
}

/// Escape special characters in PDF literal strings
pub fn escape_pdf_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
        .replace('\r', "\\r")
        .replace('\n', "\\n")
}

/// Hex string body for a PDF `<...>` string
pub fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font_resources(name: &str, id: u32) -> Dictionary {
        let mut fonts = Dictionary::new();
        fonts.set(name, Object::Reference((id, 0)));
        Dictionary::from_iter(vec![("Font", Object::Dictionary(fonts))])
    }

    #[test]
    fn test_merge_resources_combines_subdictionaries() {
        let base = font_resources("F1", 10);
        let overlay = font_resources("WbLatin", 20);

        let merged = merge_resources(&base, &overlay);
        let fonts = merged.get(b"Font").unwrap().as_dict().unwrap();
        assert_eq!(fonts.len(), 2);
        assert_eq!(fonts.get(b"F1").unwrap().as_reference().unwrap(), (10, 0));
        assert_eq!(fonts.get(b"WbLatin").unwrap().as_reference().unwrap(), (20, 0));
    }

    #[test]
    fn test_merge_resources_leaves_inputs_untouched() {
        let base = font_resources("F1", 10);
        let overlay = font_resources("F2", 20);

        let _ = merge_resources(&base, &overlay);
        assert_eq!(base.get(b"Font").unwrap().as_dict().unwrap().len(), 1);
    }

    #[test]
    fn test_merge_overlay_appends_content() {
        let mut page = Page::blank(PageSize::a4());
        page.content = b"q 1 0 0 1 0 0 cm Q".to_vec();

        let mut overlay = Page::blank(PageSize::a4());
        overlay.content = b"BT ET\n".to_vec();
        overlay.resources = font_resources("WbLatin", 3);

        page.merge_overlay(overlay);
        assert_eq!(page.content, b"q 1 0 0 1 0 0 cm Q\nBT ET\n".to_vec());
        assert_eq!(page.resource_count(b"Font"), 1);
    }

    #[test]
    fn test_merge_overlay_renames_clashing_resources() {
        let mut page = Page::blank(PageSize::a4());
        page.content = b"BT /WbNumber 10 Tf (sheet) Tj ET".to_vec();
        page.resources = font_resources("WbNumber", 9);

        let mut overlay = Page::blank(PageSize::a4());
        overlay.content = b"BT /WbNumber 12 Tf (1) Tj ET".to_vec();
        overlay.resources = font_resources("WbNumber", 3);

        page.merge_overlay(overlay);

        let fonts = page.resources.get(b"Font").unwrap().as_dict().unwrap();
        assert_eq!(fonts.get(b"WbNumber").unwrap().as_reference().unwrap(), (9, 0));
        assert_eq!(fonts.get(b"WbNumber1").unwrap().as_reference().unwrap(), (3, 0));

        let decoded = Content::decode(&page.content).unwrap();
        let selected: Vec<Vec<u8>> = decoded
            .operations
            .iter()
            .filter(|op| op.operator == "Tf")
            .map(|op| op.operands[0].as_name().unwrap().to_vec())
            .collect();
        assert_eq!(selected, vec![b"WbNumber".to_vec(), b"WbNumber1".to_vec()]);
    }

    #[test]
    fn test_escape_pdf_string() {
        assert_eq!(escape_pdf_string("a(b)c\\"), "a\\(b\\)c\\\\");
    }

    #[test]
    fn test_hex_string() {
        assert_eq!(hex_string(&[0x58, 0xF9]), "58F9");
    }
}
