//! PDF Workbook Library
//!
//! Assembles numbered single-page worksheet PDFs into one workbook.
//! This library provides functionality to:
//! - Render a styled cover page with centered artwork
//! - Scale and center each worksheet onto a fixed canvas, stripping links and images
//! - Stamp a centered page number on every worksheet
//! - Write cover and worksheets as one document
//!
//! # Example
//!
//! ```no_run
//! use pdf_workbook::config::WorkbookConfig;
//! use pdf_workbook::fonts::FontRegistry;
//! use pdf_workbook::pipeline::build_workbook;
//!
//! let config = WorkbookConfig::default();
//! let fonts = FontRegistry::resolve(&config.glyph_font_candidates).expect("Failed to load fonts");
//!
//! build_workbook(&config, &fonts, &mut |event: pdf_workbook::Progress<'_>| println!("{:?}", event))
//!     .expect("Failed to build workbook");
//! ```

pub mod error;
pub mod config;
pub mod fonts;
pub mod layout;
pub mod pdf;
pub mod pipeline;

// Re-export commonly used items
pub use error::{Error, Result};
pub use pipeline::{build_workbook, BuildOutcome, Progress};
