//! Font resolution, metrics and embedding
//!
//! Two logical fonts are used by the workbook: Helvetica-Bold for all Latin
//! text, and a glyph font for the single non-Latin character on the cover.
//! The glyph font is resolved once at startup from an ordered list of
//! candidate files; when none exists the built-in `STSong-Light` CID font is
//! used, so resolution itself never fails.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use crate::error::{Error, Result};

/// Standard PDF font used for every Latin string
pub const LATIN_BOLD: &str = "Helvetica-Bold";

/// Built-in Simplified Chinese CID font, always available to PDF readers
pub const BUILTIN_GLYPH_FONT: &str = "STSong-Light";

/// File name of the preferred glyph font
pub const GLYPH_FONT_FILE: &str = "HanyiSentyPagoda.ttf";

/// Helvetica-Bold advance widths for characters 32-126 (1/1000 em)
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // space - /
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0 - 9
    333, 333, 584, 584, 584, 611, 975, // : - @
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // A - M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N - Z
    333, 278, 333, 584, 556, 333, // [ - `
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // a - m
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // n - z
    389, 280, 389, 584, // { - ~
];

/// Width used for characters outside the printable ASCII table
const HELVETICA_BOLD_DEFAULT_WIDTH: u16 = 556;

/// The resolved font for the non-Latin cover glyph
#[derive(Debug, Clone)]
pub enum GlyphFont {
    /// A TrueType file found on disk, embedded into the output
    TrueType {
        name: String,
        path: PathBuf,
        data: Vec<u8>,
    },
    /// The non-embedded `STSong-Light` CID font
    Builtin,
}

/// A string encoded for a Type0 font, together with the font object drawing it
#[derive(Debug, Clone)]
pub struct EncodedText {
    pub font_id: ObjectId,
    pub bytes: Vec<u8>,
}

/// Immutable table of resolved fonts, built once and passed to every renderer
#[derive(Debug, Clone)]
pub struct FontRegistry {
    glyph: GlyphFont,
}

/// Candidate locations for the glyph font, most preferred first
///
/// A bundled `fonts/` directory next to the executable or in the working
/// directory wins over platform install locations.
pub fn default_glyph_font_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        candidates.push(exe_dir.join("fonts").join(GLYPH_FONT_FILE));
    }
    candidates.push(PathBuf::from("fonts").join(GLYPH_FONT_FILE));

    if cfg!(windows) {
        candidates.push(PathBuf::from(r"C:\Windows\Fonts\HanyiSentyPagoda.ttf"));
        candidates.push(PathBuf::from(r"C:\Windows\Fonts\HanyiSentyPagoda_Regular.ttf"));
    } else if cfg!(target_os = "macos") {
        candidates.push(PathBuf::from("/Library/Fonts/HanyiSentyPagoda.ttf"));
        candidates.push(PathBuf::from("/System/Library/Fonts/Supplemental/HanyiSentyPagoda.ttf"));
    } else {
        candidates.push(PathBuf::from("/usr/share/fonts/truetype/hanyi/HanyiSentyPagoda.ttf"));
        candidates.push(PathBuf::from("/usr/local/share/fonts/HanyiSentyPagoda.ttf"));
    }

    candidates
}

impl FontRegistry {
    /// Registry that always uses the built-in glyph font
    pub fn builtin() -> Self {
        Self { glyph: GlyphFont::Builtin }
    }

    /// Resolve the glyph font from `candidates`; the first existing file wins
    ///
    /// A candidate that exists but cannot be read or parsed is an error.
    pub fn resolve(candidates: &[PathBuf]) -> Result<Self> {
        for path in candidates {
            if !path.is_file() {
                continue;
            }

            let data = std::fs::read(path)?;
            if rustybuzz::Face::from_slice(&data, 0).is_none() {
                return Err(Error::Font(format!("Unable to parse font file {}", path.display())));
            }

            log::debug!("Using glyph font {}", path.display());
            return Ok(Self {
                glyph: GlyphFont::TrueType {
                    name: postscript_name(path),
                    path: path.clone(),
                    data,
                },
            });
        }

        log::debug!("No glyph font file found, falling back to {}", BUILTIN_GLYPH_FONT);
        Ok(Self::builtin())
    }

    /// The resolved glyph font
    pub fn glyph(&self) -> &GlyphFont {
        &self.glyph
    }

    /// Name of the resolved glyph font
    pub fn glyph_font_name(&self) -> &str {
        match &self.glyph {
            GlyphFont::TrueType { name, .. } => name,
            GlyphFont::Builtin => BUILTIN_GLYPH_FONT,
        }
    }

    /// Width of `text` in Helvetica-Bold at `font_size` points
    pub fn latin_width(&self, text: &str, font_size: f32) -> f32 {
        let units: u32 = text
            .chars()
            .map(|c| {
                let code = c as u32;
                if (32..=126).contains(&code) {
                    HELVETICA_BOLD_WIDTHS[(code - 32) as usize] as u32
                } else {
                    HELVETICA_BOLD_DEFAULT_WIDTH as u32
                }
            })
            .sum();

        units as f32 * font_size / 1000.0
    }

    /// Add the Helvetica-Bold font dictionary to `doc`
    pub fn embed_latin(&self, doc: &mut Document) -> ObjectId {
        let mut font = Dictionary::new();
        font.set("Type", Object::Name(b"Font".to_vec()));
        font.set("Subtype", Object::Name(b"Type1".to_vec()));
        font.set("BaseFont", Object::Name(LATIN_BOLD.as_bytes().to_vec()));
        font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));

        doc.add_object(Object::Dictionary(font))
    }

    /// Add a glyph font able to draw `text` to `doc` and encode `text` for it
    pub fn embed_glyph_text(&self, doc: &mut Document, text: &str) -> Result<EncodedText> {
        match &self.glyph {
            GlyphFont::TrueType { name, data, .. } => embed_truetype(doc, name, data, text),
            GlyphFont::Builtin => embed_builtin_cid(doc, text),
        }
    }
}

/// Derive a PDF-safe font name from a font file path
fn postscript_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name: String = stem.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '-').collect();

    if name.is_empty() {
        "GlyphFont".to_string()
    } else {
        name
    }
}

fn parse_face(data: &[u8]) -> Result<rustybuzz::Face<'_>> {
    rustybuzz::Face::from_slice(data, 0)
        .ok_or_else(|| Error::Font("Unable to parse glyph font".to_string()))
}

/// Shape `text`, returning (glyph id, advance in font units, source char)
fn shape(face: &rustybuzz::Face<'_>, text: &str) -> Vec<(u16, i32, char)> {
    let mut buffer = rustybuzz::UnicodeBuffer::new();
    buffer.push_str(text);
    let shaped = rustybuzz::shape(face, &[], buffer);

    shaped
        .glyph_infos()
        .iter()
        .zip(shaped.glyph_positions())
        .map(|(info, pos)| {
            let source = text[info.cluster as usize..].chars().next().unwrap_or('\u{FFFD}');
            (info.glyph_id as u16, pos.x_advance, source)
        })
        .collect()
}

/// Embed a TrueType font as a Type0 / Identity-H font
fn embed_truetype(doc: &mut Document, name: &str, data: &[u8], text: &str) -> Result<EncodedText> {
    let face = parse_face(data)?;
    let scale = 1000.0 / face.units_per_em() as f32;

    let mut bytes = Vec::new();
    let mut glyphs: BTreeMap<u16, (i64, char)> = BTreeMap::new();
    for (glyph_id, advance, source) in shape(&face, text) {
        if glyph_id == 0 {
            log::warn!("Font {} has no glyph for {:?}", name, source);
        }
        bytes.extend_from_slice(&glyph_id.to_be_bytes());
        glyphs.insert(glyph_id, ((advance as f32 * scale).round() as i64, source));
    }

    let font_file_id = doc.add_object(Stream::new(
        Dictionary::from_iter(vec![("Length1", Object::Integer(data.len() as i64))]),
        data.to_vec(),
    ));

    let bbox = face.global_bounding_box();
    let scaled = |v: i16| Object::Integer((v as f32 * scale).round() as i64);

    let mut descriptor = Dictionary::new();
    descriptor.set("Type", Object::Name(b"FontDescriptor".to_vec()));
    descriptor.set("FontName", Object::Name(name.as_bytes().to_vec()));
    descriptor.set("Flags", Object::Integer(4)); // Symbolic
    descriptor.set("FontBBox", Object::Array(vec![
        scaled(bbox.x_min),
        scaled(bbox.y_min),
        scaled(bbox.x_max),
        scaled(bbox.y_max),
    ]));
    descriptor.set("ItalicAngle", Object::Integer(0));
    descriptor.set("Ascent", scaled(face.ascender()));
    descriptor.set("Descent", scaled(face.descender()));
    descriptor.set("CapHeight", scaled(face.capital_height().unwrap_or_else(|| face.ascender())));
    descriptor.set("StemV", Object::Integer(80));
    descriptor.set("FontFile2", Object::Reference(font_file_id));
    let descriptor_id = doc.add_object(Object::Dictionary(descriptor));

    let mut widths = Vec::new();
    for (glyph_id, (width, _)) in &glyphs {
        widths.push(Object::Integer(*glyph_id as i64));
        widths.push(Object::Array(vec![Object::Integer(*width)]));
    }

    let mut cid_font = Dictionary::new();
    cid_font.set("Type", Object::Name(b"Font".to_vec()));
    cid_font.set("Subtype", Object::Name(b"CIDFontType2".to_vec()));
    cid_font.set("BaseFont", Object::Name(name.as_bytes().to_vec()));
    cid_font.set("CIDSystemInfo", cid_system_info("Identity", 0));
    cid_font.set("FontDescriptor", Object::Reference(descriptor_id));
    cid_font.set("DW", Object::Integer(1000));
    cid_font.set("W", Object::Array(widths));
    cid_font.set("CIDToGIDMap", Object::Name(b"Identity".to_vec()));
    let cid_font_id = doc.add_object(Object::Dictionary(cid_font));

    let to_unicode_id = doc.add_object(Stream::new(
        Dictionary::new(),
        to_unicode_cmap(&glyphs).into_bytes(),
    ));

    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type0".to_vec()));
    font.set("BaseFont", Object::Name(name.as_bytes().to_vec()));
    font.set("Encoding", Object::Name(b"Identity-H".to_vec()));
    font.set("DescendantFonts", Object::Array(vec![Object::Reference(cid_font_id)]));
    font.set("ToUnicode", Object::Reference(to_unicode_id));

    Ok(EncodedText {
        font_id: doc.add_object(Object::Dictionary(font)),
        bytes,
    })
}

/// Reference the built-in `STSong-Light` font with UCS-2 encoding
fn embed_builtin_cid(doc: &mut Document, text: &str) -> Result<EncodedText> {
    let mut bytes = Vec::new();
    for c in text.chars() {
        let mut units = [0u16; 2];
        let encoded = c.encode_utf16(&mut units);
        if encoded.len() != 1 {
            return Err(Error::Font(format!(
                "{} cannot encode {:?} outside the Basic Multilingual Plane",
                BUILTIN_GLYPH_FONT, c
            )));
        }
        bytes.extend_from_slice(&encoded[0].to_be_bytes());
    }

    let mut descriptor = Dictionary::new();
    descriptor.set("Type", Object::Name(b"FontDescriptor".to_vec()));
    descriptor.set("FontName", Object::Name(BUILTIN_GLYPH_FONT.as_bytes().to_vec()));
    descriptor.set("Flags", Object::Integer(6));
    descriptor.set("FontBBox", Object::Array(vec![
        Object::Integer(-25),
        Object::Integer(-254),
        Object::Integer(1000),
        Object::Integer(880),
    ]));
    descriptor.set("ItalicAngle", Object::Integer(0));
    descriptor.set("Ascent", Object::Integer(880));
    descriptor.set("Descent", Object::Integer(-120));
    descriptor.set("CapHeight", Object::Integer(880));
    descriptor.set("StemV", Object::Integer(93));
    let descriptor_id = doc.add_object(Object::Dictionary(descriptor));

    let mut cid_font = Dictionary::new();
    cid_font.set("Type", Object::Name(b"Font".to_vec()));
    cid_font.set("Subtype", Object::Name(b"CIDFontType0".to_vec()));
    cid_font.set("BaseFont", Object::Name(BUILTIN_GLYPH_FONT.as_bytes().to_vec()));
    cid_font.set("CIDSystemInfo", cid_system_info("GB1", 2));
    cid_font.set("FontDescriptor", Object::Reference(descriptor_id));
    cid_font.set("DW", Object::Integer(1000));
    let cid_font_id = doc.add_object(Object::Dictionary(cid_font));

    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type0".to_vec()));
    font.set("BaseFont", Object::Name(BUILTIN_GLYPH_FONT.as_bytes().to_vec()));
    font.set("Encoding", Object::Name(b"UniGB-UCS2-H".to_vec()));
    font.set("DescendantFonts", Object::Array(vec![Object::Reference(cid_font_id)]));

    Ok(EncodedText {
        font_id: doc.add_object(Object::Dictionary(font)),
        bytes,
    })
}

fn cid_system_info(ordering: &str, supplement: i64) -> Object {
    Object::Dictionary(Dictionary::from_iter(vec![
        ("Registry", Object::String(b"Adobe".to_vec(), StringFormat::Literal)),
        ("Ordering", Object::String(ordering.as_bytes().to_vec(), StringFormat::Literal)),
        ("Supplement", Object::Integer(supplement)),
    ]))
}

/// ToUnicode CMap mapping each used glyph id back to its character
fn to_unicode_cmap(glyphs: &BTreeMap<u16, (i64, char)>) -> String {
    let mut entries = String::new();
    for (glyph_id, (_, source)) in glyphs {
        let mut units = [0u16; 2];
        let hex: String = source
            .encode_utf16(&mut units)
            .iter()
            .map(|u| format!("{:04X}", u))
            .collect();
        entries.push_str(&format!("<{:04X}> <{}>\n", glyph_id, hex));
    }

    format!(
        "/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo
<< /Registry (Adobe)
/Ordering (UCS)
/Supplement 0
>> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
{} beginbfchar
{}endbfchar
endcmap
CMapName currentdict /CMap defineresource pop
end
end
",
        glyphs.len(),
        entries
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_latin_width_matches_afm() {
        let fonts = FontRegistry::builtin();
        // H 722 + S 667 + K 722 + 1 556
        let width = fonts.latin_width("HSK1", 44.0);
        assert!((width - 2667.0 * 44.0 / 1000.0).abs() < 1e-3);
    }

    #[test]
    fn test_digits_share_one_width() {
        let fonts = FontRegistry::builtin();
        assert_eq!(fonts.latin_width("7", 12.0), fonts.latin_width("0", 12.0));
        assert!((fonts.latin_width("10", 12.0) - 2.0 * 0.556 * 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_resolve_without_candidates_falls_back() {
        let fonts = FontRegistry::resolve(&[]).unwrap();
        assert!(matches!(fonts.glyph(), GlyphFont::Builtin));
        assert_eq!(fonts.glyph_font_name(), BUILTIN_GLYPH_FONT);
    }

    #[test]
    fn test_resolve_skips_missing_candidates() {
        let candidates = vec![
            PathBuf::from("does/not/exist.ttf"),
            PathBuf::from("also/missing.ttf"),
        ];
        let fonts = FontRegistry::resolve(&candidates).unwrap();
        assert!(matches!(fonts.glyph(), GlyphFont::Builtin));
    }

    #[test]
    fn test_resolve_rejects_unparsable_font() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.ttf");
        std::fs::write(&path, b"definitely not a font").unwrap();

        let result = FontRegistry::resolve(&[path]);
        assert!(matches!(result, Err(Error::Font(_))));
    }

    #[test]
    fn test_builtin_glyph_encoding_is_ucs2() {
        let fonts = FontRegistry::builtin();
        let mut doc = Document::with_version("1.5");

        let encoded = fonts.embed_glyph_text(&mut doc, "壹").unwrap();
        assert_eq!(encoded.bytes, vec![0x58, 0xF9]);

        let font = doc.get_object(encoded.font_id).unwrap().as_dict().unwrap();
        assert_eq!(font.get(b"Encoding").unwrap().as_name().unwrap(), b"UniGB-UCS2-H");
    }

    #[test]
    fn test_postscript_name_strips_punctuation() {
        assert_eq!(postscript_name(Path::new("/fonts/My Font_Regular.ttf")), "MyFontRegular");
        assert_eq!(postscript_name(Path::new("___.ttf")), "GlyphFont");
    }
}
