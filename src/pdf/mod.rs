//! PDF composition module

pub mod page;
pub mod workbook;
pub mod cover;
pub mod numbering;
pub mod normalize;
pub mod metadata;

// Re-export commonly used items
pub use page::{merge_resources, Page};
pub use workbook::Workbook;
pub use cover::{render_cover, Artwork, CoverStyle, Rgb, TitleLine};
pub use numbering::page_number_overlay;
pub use normalize::{clean_resources, normalize_page, CleanedResources};
pub use metadata::{count_pages, extract_metadata, PageInfo, PdfMetadata};
