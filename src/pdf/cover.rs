//! Cover page rendering
//!
//! The cover is drawn back to front: cream background, black sidebar, the
//! centered artwork, an opaque patch behind the title block, the title lines
//! with a single glyph set snugly after the label, and an underline rule.

use std::path::Path;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use crate::error::{Error, Result};
use crate::fonts::FontRegistry;
use crate::layout::{place_artwork, PageSize, Placement};
use crate::pdf::page::{escape_pdf_string, hex_string, Page};
use crate::pdf::workbook::Workbook;

const LATIN_RESOURCE: &str = "WbLatin";
const GLYPH_RESOURCE: &str = "WbGlyph";
const ARTWORK_RESOURCE: &str = "WbArtwork";

/// An RGB fill or stroke colour with components in 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);
    pub const CREAM: Rgb = Rgb(0.99, 0.98, 0.94);

    fn fill(&self) -> String {
        format!("{:.3} {:.3} {:.3} rg\n", self.0, self.1, self.2)
    }

    fn stroke(&self) -> String {
        format!("{:.3} {:.3} {:.3} RG\n", self.0, self.1, self.2)
    }
}

/// One line of the title block
#[derive(Debug, Clone, PartialEq)]
pub struct TitleLine {
    pub text: String,
    /// Font size in points
    pub size: f32,
    /// Baseline distance from the top edge of the page
    pub top_offset: f32,
}

impl TitleLine {
    fn new(text: &str, size: f32, top_offset: f32) -> Self {
        Self {
            text: text.to_string(),
            size,
            top_offset,
        }
    }
}

/// Static styling of the cover page
#[derive(Debug, Clone)]
pub struct CoverStyle {
    pub background: Rgb,
    pub sidebar_color: Rgb,
    pub ink: Rgb,
    /// Width of the full-height band at the left edge
    pub sidebar_width: f32,
    /// Margin bounding the artwork region on every side
    pub artwork_margin: f32,
    /// Extra downward shift applied after centering the artwork
    pub artwork_shift: f32,
    /// Minimum gap kept between the artwork and the bottom edge
    pub artwork_min_bottom: f32,
    /// Size of the opaque patch behind the title block
    pub title_patch_width: f32,
    pub title_patch_height: f32,
    /// Distance from the top edge to the bottom of the title patch
    pub title_patch_top_offset: f32,
    /// Title x position measured from the sidebar's right edge
    pub title_indent: f32,
    pub heading: TitleLine,
    /// Latin label followed by the glyph
    pub label: TitleLine,
    pub subheading: TitleLine,
    /// Non-Latin glyph drawn after the label in the glyph font
    pub glyph: String,
    /// Gap between the label and the glyph
    pub glyph_padding: f32,
    pub rule_top_offset: f32,
    pub rule_length: f32,
    pub rule_width: f32,
}

impl Default for CoverStyle {
    fn default() -> Self {
        Self {
            background: Rgb::CREAM,
            sidebar_color: Rgb::BLACK,
            ink: Rgb::BLACK,
            sidebar_width: 55.0,
            artwork_margin: 70.0,
            artwork_shift: 100.0,
            artwork_min_bottom: 20.0,
            title_patch_width: 300.0,
            title_patch_height: 200.0,
            title_patch_top_offset: 270.0,
            title_indent: 35.0,
            heading: TitleLine::new("MY", 44.0, 130.0),
            label: TitleLine::new("HSK1", 44.0, 190.0),
            subheading: TitleLine::new("NOTEBOOK", 36.0, 245.0),
            glyph: "壹".to_string(),
            glyph_padding: 8.0,
            rule_top_offset: 255.0,
            rule_length: 235.0,
            rule_width: 3.0,
        }
    }
}

impl CoverStyle {
    /// Left edge of every title line
    pub fn title_x(&self) -> f32 {
        self.sidebar_width + self.title_indent
    }

    /// Left edge of the glyph that follows the label
    pub fn glyph_x(&self, fonts: &FontRegistry) -> f32 {
        self.title_x() + fonts.latin_width(&self.label.text, self.label.size) + self.glyph_padding
    }
}

/// Decoded cover artwork ready to embed
#[derive(Debug, Clone)]
pub struct Artwork {
    pub width: u32,
    pub height: u32,
    /// 8-bit RGB samples
    pub rgb: Vec<u8>,
    /// 8-bit alpha samples, present only for images with transparency
    pub alpha: Option<Vec<u8>>,
}

impl Artwork {
    /// Read and decode an image file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let image = image::open(path)?;
        let has_alpha = image.color().has_alpha();
        let rgba = image.to_rgba8();
        let (width, height) = (rgba.width(), rgba.height());

        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for pixel in rgba.pixels() {
            let [r, g, b, a] = pixel.0;
            rgb.extend_from_slice(&[r, g, b]);
            alpha.push(a);
        }

        Ok(Self {
            width,
            height,
            rgb,
            alpha: if has_alpha { Some(alpha) } else { None },
        })
    }

    /// Add the image (and its soft mask) to `doc` as an Image XObject
    pub fn embed(&self, doc: &mut Document) -> ObjectId {
        let mut image = image_dict(self.width, self.height, b"DeviceRGB");

        if let Some(alpha) = &self.alpha {
            let mask_id = doc.add_object(Stream::new(
                image_dict(self.width, self.height, b"DeviceGray"),
                alpha.clone(),
            ));
            image.set("SMask", Object::Reference(mask_id));
        }

        doc.add_object(Stream::new(image, self.rgb.clone()))
    }
}

fn image_dict(width: u32, height: u32, color_space: &[u8]) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(color_space.to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict
}

/// Render the cover page
///
/// Fails if the artwork cannot be read or decoded.
pub fn render_cover(
    book: &mut Workbook,
    fonts: &FontRegistry,
    style: &CoverStyle,
    artwork_path: &Path,
) -> Result<Page> {
    let artwork = Artwork::load(artwork_path)?;
    let canvas = book.canvas();
    let latin_font = book.latin_font();

    let artwork_id = artwork.embed(book.document_mut());
    let glyph = fonts.embed_glyph_text(book.document_mut(), &style.glyph)?;

    let placement = place_artwork(
        artwork.width as f32,
        artwork.height as f32,
        canvas,
        style.artwork_margin,
        style.artwork_shift,
        style.artwork_min_bottom,
    );
    log::debug!(
        "Cover artwork {}x{} scaled by {:.4} at ({:.2}, {:.2})",
        artwork.width,
        artwork.height,
        placement.scale,
        placement.x,
        placement.y
    );

    let content = cover_content(canvas, fonts, style, &artwork, placement, &glyph.bytes);

    let mut font_dict = Dictionary::new();
    font_dict.set(LATIN_RESOURCE, Object::Reference(latin_font));
    font_dict.set(GLYPH_RESOURCE, Object::Reference(glyph.font_id));

    let mut xobjects = Dictionary::new();
    xobjects.set(ARTWORK_RESOURCE, Object::Reference(artwork_id));

    let mut page = Page::blank(canvas);
    page.content = content.into_bytes();
    page.resources.set("Font", Object::Dictionary(font_dict));
    page.resources.set("XObject", Object::Dictionary(xobjects));
    Ok(page)
}

/// Content stream operators for the cover
fn cover_content(
    canvas: PageSize,
    fonts: &FontRegistry,
    style: &CoverStyle,
    artwork: &Artwork,
    placement: Placement,
    glyph_bytes: &[u8],
) -> String {
    let (width, height) = (canvas.width, canvas.height);
    let mut content = String::new();

    // Background and sidebar
    content.push_str(&style.background.fill());
    content.push_str(&format!("0 0 {:.4} {:.4} re f\n", width, height));
    content.push_str(&style.sidebar_color.fill());
    content.push_str(&format!("0 0 {:.4} {:.4} re f\n", style.sidebar_width, height));

    // Artwork
    let (draw_w, draw_h) = placement.scaled(artwork.width as f32, artwork.height as f32);
    content.push_str("q\n");
    content.push_str(&format!(
        "{:.4} 0 0 {:.4} {:.4} {:.4} cm\n",
        draw_w, draw_h, placement.x, placement.y
    ));
    content.push_str(&format!("/{} Do\n", ARTWORK_RESOURCE));
    content.push_str("Q\n");

    // Opaque patch so the artwork never shows through the title block
    content.push_str(&style.background.fill());
    content.push_str(&format!(
        "{:.4} {:.4} {:.4} {:.4} re f\n",
        style.sidebar_width,
        height - style.title_patch_top_offset,
        style.title_patch_width,
        style.title_patch_height
    ));

    // Title lines
    let title_x = style.title_x();
    content.push_str(&style.ink.fill());
    for line in [&style.heading, &style.label, &style.subheading] {
        content.push_str(&latin_text(line, title_x, height));
    }

    // Glyph set right after the measured label
    content.push_str("BT\n");
    content.push_str(&format!("/{} {} Tf\n", GLYPH_RESOURCE, style.label.size));
    content.push_str(&format!(
        "1 0 0 1 {:.4} {:.4} Tm\n",
        style.glyph_x(fonts),
        height - style.label.top_offset
    ));
    content.push_str(&format!("<{}> Tj\n", hex_string(glyph_bytes)));
    content.push_str("ET\n");

    // Underline rule
    let rule_y = height - style.rule_top_offset;
    content.push_str(&style.ink.stroke());
    content.push_str(&format!("{} w\n", style.rule_width));
    content.push_str(&format!(
        "{:.4} {:.4} m {:.4} {:.4} l S\n",
        title_x,
        rule_y,
        title_x + style.rule_length,
        rule_y
    ));

    content
}

fn latin_text(line: &TitleLine, x: f32, page_height: f32) -> String {
    format!(
        "BT\n/{} {} Tf\n1 0 0 1 {:.4} {:.4} Tm\n({}) Tj\nET\n",
        LATIN_RESOURCE,
        line.size,
        x,
        page_height - line.top_offset,
        escape_pdf_string(&line.text)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Content;
    use tempfile::TempDir;

    fn write_artwork(dir: &Path, width: u32, height: u32, alpha: bool) -> std::path::PathBuf {
        let path = dir.join("cover.png");
        if alpha {
            image::RgbaImage::from_pixel(width, height, image::Rgba([200, 10, 10, 128]))
                .save(&path)
                .unwrap();
        } else {
            image::RgbImage::from_pixel(width, height, image::Rgb([200, 10, 10]))
                .save(&path)
                .unwrap();
        }
        path
    }

    fn text_positions(page: &Page) -> Vec<(Vec<u8>, f32, f32)> {
        let content = Content::decode(&page.content).unwrap();
        let mut positions = Vec::new();
        let mut current = (0.0, 0.0);
        for op in content.operations {
            match op.operator.as_str() {
                "Tm" => {
                    current = (op.operands[4].as_float().unwrap(), op.operands[5].as_float().unwrap());
                }
                "Tj" => positions.push((op.operands[0].as_str().unwrap().to_vec(), current.0, current.1)),
                _ => {}
            }
        }
        positions
    }

    #[test]
    fn test_missing_artwork_is_fatal() {
        let fonts = FontRegistry::builtin();
        let mut book = Workbook::new(PageSize::a4(), &fonts);
        let result = render_cover(&mut book, &fonts, &CoverStyle::default(), Path::new("no/cover.png"));
        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }

    #[test]
    fn test_glyph_follows_label_with_padding() {
        let temp_dir = TempDir::new().unwrap();
        let artwork = write_artwork(temp_dir.path(), 40, 20, false);
        let fonts = FontRegistry::builtin();
        let style = CoverStyle::default();
        let mut book = Workbook::new(PageSize::a4(), &fonts);

        let page = render_cover(&mut book, &fonts, &style, &artwork).unwrap();
        let positions = text_positions(&page);
        let texts: Vec<&[u8]> = positions.iter().map(|(t, _, _)| t.as_slice()).collect();
        assert_eq!(texts, vec![&b"MY"[..], &b"HSK1"[..], &b"NOTEBOOK"[..], &[0x58u8, 0xF9][..]]);

        let label_x = positions[1].1;
        let glyph_x = positions[3].1;
        let expected = label_x + fonts.latin_width("HSK1", 44.0) + 8.0;
        assert!((glyph_x - expected).abs() < 1e-3);
        assert!((positions[3].2 - positions[1].2).abs() < 1e-3);
        assert!((label_x - 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_cover_references_artwork_and_fonts() {
        let temp_dir = TempDir::new().unwrap();
        let artwork = write_artwork(temp_dir.path(), 10, 10, true);
        let fonts = FontRegistry::builtin();
        let mut book = Workbook::new(PageSize::a4(), &fonts);

        let page = render_cover(&mut book, &fonts, &CoverStyle::default(), &artwork).unwrap();
        assert_eq!(page.resource_count(b"Font"), 2);
        assert_eq!(page.resource_count(b"XObject"), 1);

        let xobjects = page.resources.get(b"XObject").unwrap().as_dict().unwrap();
        let image_id = xobjects.get(ARTWORK_RESOURCE.as_bytes()).unwrap().as_reference().unwrap();
        let image = book.document_mut().get_object(image_id).unwrap().as_stream().unwrap();
        assert_eq!(image.dict.get(b"Width").unwrap().as_i64().unwrap(), 10);
        assert!(image.dict.get(b"SMask").is_ok());
    }

    #[test]
    fn test_artwork_without_alpha_has_no_mask() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_artwork(temp_dir.path(), 3, 2, false);
        let artwork = Artwork::load(&path).unwrap();
        assert_eq!((artwork.width, artwork.height), (3, 2));
        assert_eq!(artwork.rgb.len(), 18);
        assert!(artwork.alpha.is_none());
    }
}
