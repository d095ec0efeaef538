//! Error types for the workbook library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the workbook library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Artwork decoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Worksheet file whose stem is not an integer
    #[error("Worksheet file name is not a number: {}", .0.display())]
    InvalidFileName(PathBuf),

    /// Invalid input directory pattern
    #[error("Invalid input pattern: {0}")]
    InvalidGlob(String),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {}", .0.display())]
    EmptyPdf(PathBuf),

    /// Font error
    #[error("Font error: {0}")]
    Font(String),

    /// General error
    #[error("{0}")]
    General(String),
}
