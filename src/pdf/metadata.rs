//! PDF metadata extraction

use std::path::Path;
use lopdf::{Document, Object, ObjectId};
use crate::error::{Error, Result};

/// Count pages by reading the Count field from the Pages dictionary
fn count_pages_from_catalog(doc: &Document) -> Result<usize> {
    let catalog = doc.catalog()?;

    let pages_id = match catalog.get(b"Pages") {
        Ok(Object::Reference(id)) => *id,
        _ => return Err(Error::General("Pages is not a reference".to_string())),
    };

    let count = doc.get_object(pages_id)?.as_dict()?.get(b"Count")
        .map_err(|_| Error::General("No Count in Pages".to_string()))?;

    match count {
        Object::Integer(n) => Ok(*n as usize),
        _ => Err(Error::General("Count is not an integer".to_string())),
    }
}

/// Per-page facts useful for checking a generated workbook
#[derive(Debug, Clone, PartialEq)]
pub struct PageInfo {
    /// MediaBox width in points
    pub width: f32,
    /// MediaBox height in points
    pub height: f32,
    /// Number of entries in the page's Annots array
    pub annotation_count: usize,
    /// Number of entries in the page's XObject resources
    pub xobject_count: usize,
}

/// PDF metadata
#[derive(Debug, Clone)]
pub struct PdfMetadata {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Document title (if present)
    pub title: Option<String>,
    /// Producer (if present)
    pub producer: Option<String>,
    /// Facts about each page, in order
    pub pages: Vec<PageInfo>,
}

/// Extract metadata from a PDF file
pub fn extract_metadata(path: &Path) -> Result<PdfMetadata> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    let page_count = count_pages_from_catalog(&doc)?;

    if page_count == 0 {
        return Err(Error::EmptyPdf(path.to_path_buf()));
    }

    let pages = doc
        .get_pages()
        .values()
        .map(|id| page_info(&doc, *id))
        .collect::<Result<Vec<_>>>()?;

    Ok(PdfMetadata {
        page_count,
        title: info_string(&doc, b"Title"),
        producer: info_string(&doc, b"Producer"),
        pages,
    })
}

/// Count the number of pages in a PDF file
///
/// This is a quick operation that reads the Count field from the Pages dictionary.
pub fn count_pages(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    let page_count = count_pages_from_catalog(&doc)?;

    if page_count == 0 {
        return Err(Error::EmptyPdf(path.to_path_buf()));
    }

    Ok(page_count)
}

fn info_string(doc: &Document, key: &[u8]) -> Option<String> {
    let info_id = doc.trailer.get(b"Info").ok()?.as_reference().ok()?;
    let info = doc.get_object(info_id).ok()?.as_dict().ok()?;
    let bytes = info.get(key).ok()?.as_str().ok()?;
    String::from_utf8(bytes.to_vec()).ok()
}

/// Dereference an object if it is an indirect reference
fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        _ => object,
    }
}

fn page_info(doc: &Document, page_id: ObjectId) -> Result<PageInfo> {
    let page = doc.get_object(page_id)?.as_dict()?;

    let media_box = page
        .get(b"MediaBox")
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_array())
        .map_err(|_| Error::General(format!("Page {:?} has no MediaBox", page_id)))?;
    let corners: Vec<f32> = media_box.iter().filter_map(|o| o.as_float().ok()).collect();
    if corners.len() != 4 {
        return Err(Error::General(format!("Page {:?} has a malformed MediaBox", page_id)));
    }

    let annotation_count = match page.get(b"Annots").map(|o| resolve(doc, o)) {
        Ok(Object::Array(annots)) => annots.len(),
        _ => 0,
    };

    let xobject_count = page
        .get(b"Resources")
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_dict())
        .and_then(|res| res.get(b"XObject"))
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_dict())
        .map(|xobjects| xobjects.len())
        .unwrap_or(0);

    Ok(PageInfo {
        width: (corners[2] - corners[0]).abs(),
        height: (corners[3] - corners[1]).abs(),
        annotation_count,
        xobject_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_pages_nonexistent_file() {
        let result = count_pages(Path::new("nonexistent.pdf"));
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), Error::FileNotFound(_)));
    }

    #[test]
    fn test_extract_metadata_nonexistent_file() {
        let result = extract_metadata(Path::new("nonexistent.pdf"));
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), Error::FileNotFound(_)));
    }

    // Generated workbooks are inspected in tests/integration.rs
}
