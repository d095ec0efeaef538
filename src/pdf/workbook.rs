//! Output document assembly using lopdf

use std::path::Path;
use chrono::Utc;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use crate::error::{Error, Result};
use crate::fonts::FontRegistry;
use crate::layout::PageSize;
use crate::pdf::page::Page;

/// Tolerance in points when checking that a page matches the canvas
const SIZE_TOLERANCE: f32 = 0.01;

/// An append-only output document whose pages all share one canvas size
///
/// Pages are added in order with [`Workbook::append`] and the whole document
/// is written once by [`Workbook::save`]. The Helvetica-Bold font dictionary
/// is added on creation and shared by every page that draws Latin text.
pub struct Workbook {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    canvas: PageSize,
    latin_font: ObjectId,
    title: Option<String>,
}

impl Workbook {
    /// Start an empty workbook
    pub fn new(canvas: PageSize, fonts: &FontRegistry) -> Self {
        let mut doc = Document::with_version("1.5");

        // Reserve the page tree id so pages can point at their parent
        let pages_id = doc.new_object_id();
        let latin_font = fonts.embed_latin(&mut doc);

        Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
            canvas,
            latin_font,
            title: None,
        }
    }

    /// Canvas size shared by every page
    pub fn canvas(&self) -> PageSize {
        self.canvas
    }

    /// Object id of the shared Helvetica-Bold font
    pub fn latin_font(&self) -> ObjectId {
        self.latin_font
    }

    /// Mutable access to the document under construction
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Set the title written to the document information dictionary
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    /// Number of pages appended so far
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Append a page at the end of the document
    pub fn append(&mut self, page: Page) -> Result<ObjectId> {
        if !self.canvas.approx_eq(page.size.width, page.size.height, SIZE_TOLERANCE) {
            return Err(Error::General(format!(
                "Page size {}x{} does not match canvas {}x{}",
                page.size.width, page.size.height, self.canvas.width, self.canvas.height
            )));
        }

        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), page.content));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(self.pages_id));
        page_dict.set(
            "MediaBox",
            Object::Array(self.canvas.media_box().iter().map(|v| Object::Real(*v)).collect()),
        );
        page_dict.set("Resources", Object::Dictionary(page.resources));
        page_dict.set("Contents", Object::Reference(content_id));
        if !page.annotations.is_empty() {
            page_dict.set("Annots", Object::Array(page.annotations));
        }

        let page_id = self.doc.add_object(Object::Dictionary(page_dict));
        self.page_ids.push(page_id);

        Ok(page_id)
    }

    /// Finish the page tree and catalog and return the completed document
    pub fn finish(self) -> Result<Document> {
        if self.page_ids.is_empty() {
            return Err(Error::General("Workbook has no pages".to_string()));
        }

        let mut doc = self.doc;

        let kids: Vec<Object> = self.page_ids.iter().map(|&id| Object::Reference(id)).collect();

        let mut pages_object = Dictionary::new();
        pages_object.set("Type", Object::Name(b"Pages".to_vec()));
        pages_object.set("Count", Object::Integer(self.page_ids.len() as i64));
        pages_object.set("Kids", Object::Array(kids));
        doc.objects.insert(self.pages_id, Object::Dictionary(pages_object));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(self.pages_id));
        let catalog_id = doc.add_object(Object::Dictionary(catalog));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut info = Dictionary::new();
        if let Some(title) = self.title {
            info.set("Title", Object::String(title.into_bytes(), StringFormat::Literal));
        }
        info.set(
            "Producer",
            Object::String(
                format!("pdf-workbook {}", env!("CARGO_PKG_VERSION")).into_bytes(),
                StringFormat::Literal,
            ),
        );
        info.set(
            "CreationDate",
            Object::String(
                Utc::now().format("D:%Y%m%d%H%M%SZ").to_string().into_bytes(),
                StringFormat::Literal,
            ),
        );
        let info_id = doc.add_object(Object::Dictionary(info));
        doc.trailer.set("Info", Object::Reference(info_id));

        doc.compress();
        Ok(doc)
    }

    /// Serialize the finished document to bytes
    pub fn to_bytes(self) -> Result<Vec<u8>> {
        let mut doc = self.finish()?;
        let mut output = Vec::new();
        doc.save_to(&mut output)?;
        Ok(output)
    }

    /// Write the finished document to `path`, returning the page count
    ///
    /// The document is serialized in memory first so that a failure never
    /// leaves a partially written file behind.
    pub fn save(self, path: &Path) -> Result<usize> {
        let page_count = self.page_count();
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(page_count)
    }
}
