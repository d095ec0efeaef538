//! Workbook build configuration

use std::path::PathBuf;
use crate::fonts::default_glyph_font_candidates;
use crate::layout::PageSize;
use crate::pdf::cover::CoverStyle;

/// Directory holding the numbered worksheet PDFs
pub const DEFAULT_INPUT_DIR: &str = "./worksheets";

/// Where the combined workbook is written
pub const DEFAULT_OUTPUT_FILE: &str = "Chinese_Workbook_A4.pdf";

/// Artwork centered on the cover
pub const DEFAULT_COVER_IMAGE: &str = "cover.png";

/// Title stored in the document information dictionary
pub const DEFAULT_TITLE: &str = "MY HSK1 NOTEBOOK";

/// Everything a workbook build needs
#[derive(Debug, Clone)]
pub struct WorkbookConfig {
    /// Directory scanned for `<integer>.pdf` worksheets
    pub input_dir: PathBuf,
    /// Output PDF path
    pub output_path: PathBuf,
    /// Cover artwork image
    pub cover_image: PathBuf,
    /// Size of every output page
    pub canvas: PageSize,
    /// Glyph font files tried in order before the built-in font
    pub glyph_font_candidates: Vec<PathBuf>,
    /// Cover layout and text
    pub cover: CoverStyle,
    /// Document title
    pub title: String,
}

impl Default for WorkbookConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output_path: PathBuf::from(DEFAULT_OUTPUT_FILE),
            cover_image: PathBuf::from(DEFAULT_COVER_IMAGE),
            canvas: PageSize::a4(),
            glyph_font_candidates: default_glyph_font_candidates(),
            cover: CoverStyle::default(),
            title: DEFAULT_TITLE.to_string(),
        }
    }
}
