//! Page-number overlays

use lopdf::{Dictionary, Object, ObjectId};
use crate::fonts::FontRegistry;
use crate::layout::PageSize;
use crate::pdf::page::Page;

/// Resource name of the Helvetica-Bold font inside overlays
pub const NUMBER_FONT_RESOURCE: &str = "WbNumber";

/// Font size of page numbers in points
pub const NUMBER_FONT_SIZE: f32 = 12.0;

/// Distance from the top edge to the number baseline in points
pub const NUMBER_TOP_OFFSET: f32 = 25.0;

/// Render an overlay page carrying only the 1-based page `index`
///
/// The number is centered horizontally using its measured width and sits
/// near the top margin.
pub fn page_number_overlay(
    index: usize,
    canvas: PageSize,
    fonts: &FontRegistry,
    latin_font: ObjectId,
) -> Page {
    let text = index.to_string();
    let text_width = fonts.latin_width(&text, NUMBER_FONT_SIZE);
    let x = (canvas.width - text_width) / 2.0;
    let y = canvas.height - NUMBER_TOP_OFFSET;

    let mut content = String::new();
    content.push_str("q\n0 g\n");
    content.push_str("BT\n");
    content.push_str(&format!("/{} {} Tf\n", NUMBER_FONT_RESOURCE, NUMBER_FONT_SIZE));
    content.push_str(&format!("1 0 0 1 {:.4} {:.4} Tm\n", x, y));
    content.push_str(&format!("({}) Tj\n", text));
    content.push_str("ET\nQ\n");

    let mut font_dict = Dictionary::new();
    font_dict.set(NUMBER_FONT_RESOURCE, Object::Reference(latin_font));

    let mut page = Page::blank(canvas);
    page.content = content.into_bytes();
    page.resources.set("Font", Object::Dictionary(font_dict));
    page
}
