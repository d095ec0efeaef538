//! Workbook build pipeline
//!
//! Lists the numbered worksheets, renders the cover, then normalizes,
//! numbers and appends each worksheet before writing the document once.

use std::path::{Path, PathBuf};
use glob::{glob_with, MatchOptions, Pattern};
use crate::config::WorkbookConfig;
use crate::error::{Error, Result};
use crate::fonts::FontRegistry;
use crate::pdf::cover::render_cover;
use crate::pdf::normalize::normalize_page;
use crate::pdf::numbering::page_number_overlay;
use crate::pdf::workbook::Workbook;

/// Progress events reported while building
#[derive(Debug, Clone, PartialEq)]
pub enum Progress<'a> {
    /// No worksheets were found; nothing will be written
    NoInputs { dir: &'a Path },
    /// Worksheets were found and the build is starting
    Found { count: usize },
    /// A worksheet is being processed (1-based position)
    Processing { position: usize, path: &'a Path },
}

/// Result of a build that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    /// The input directory held no worksheets
    NoInputs,
    /// The workbook was written
    Written { path: PathBuf, pages: usize },
}

/// List the worksheet PDFs in `dir` ordered by the number in their file name
///
/// The `.pdf` extension is matched case-insensitively. A file whose stem is
/// not an integer is an error.
pub fn list_worksheets(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::FileNotFound(dir.to_path_buf()));
    }

    let pattern = format!("{}/*.pdf", Pattern::escape(&dir.to_string_lossy()));
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let entries = glob_with(&pattern, options).map_err(|e| Error::InvalidGlob(e.to_string()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| Error::Io(e.into_error()))?;
        if path.is_file() {
            paths.push(path);
        }
    }

    sort_by_worksheet_number(paths)
}

/// Sort paths by the integer value of their file stem, ascending
pub fn sort_by_worksheet_number(paths: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    let mut keyed = paths
        .into_iter()
        .map(|path| worksheet_number(&path).map(|number| (number, path)))
        .collect::<Result<Vec<_>>>()?;

    keyed.sort_by_key(|(number, _)| *number);
    Ok(keyed.into_iter().map(|(_, path)| path).collect())
}

/// The integer value of a worksheet's file stem
pub fn worksheet_number(path: &Path) -> Result<i64> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.trim().parse::<i64>().ok())
        .ok_or_else(|| Error::InvalidFileName(path.to_path_buf()))
}

/// Build the workbook described by `config`
///
/// Reports progress through `report`. When the input directory holds no
/// worksheets this returns [`BuildOutcome::NoInputs`] without writing.
pub fn build_workbook(
    config: &WorkbookConfig,
    fonts: &FontRegistry,
    report: &mut dyn FnMut(Progress<'_>),
) -> Result<BuildOutcome> {
    let worksheets = list_worksheets(&config.input_dir)?;

    if worksheets.is_empty() {
        report(Progress::NoInputs { dir: config.input_dir.as_path() });
        return Ok(BuildOutcome::NoInputs);
    }

    report(Progress::Found { count: worksheets.len() });

    let mut book = Workbook::new(config.canvas, fonts);
    book.set_title(config.title.clone());

    let cover = render_cover(&mut book, fonts, &config.cover, &config.cover_image)?;
    book.append(cover)?;

    for (i, path) in worksheets.iter().enumerate() {
        let position = i + 1;
        report(Progress::Processing { position, path: path.as_path() });

        let mut page = normalize_page(path, &mut book)?;
        let overlay = page_number_overlay(position, book.canvas(), fonts, book.latin_font());
        page.merge_overlay(overlay);
        book.append(page)?;
    }

    let pages = book.save(&config.output_path)?;
    log::info!("Wrote {} pages to {}", pages, config.output_path.display());

    Ok(BuildOutcome::Written {
        path: config.output_path.clone(),
        pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_numeric_not_lexicographic_order() {
        let paths = vec![
            PathBuf::from("2.pdf"),
            PathBuf::from("10.pdf"),
            PathBuf::from("1.pdf"),
        ];
        let sorted = sort_by_worksheet_number(paths).unwrap();
        assert_eq!(names(&sorted), vec!["1.pdf", "2.pdf", "10.pdf"]);
    }

    #[test]
    fn test_non_numeric_stem_is_an_error() {
        let paths = vec![PathBuf::from("1.pdf"), PathBuf::from("intro.pdf")];
        let result = sort_by_worksheet_number(paths);
        assert!(matches!(result, Err(Error::InvalidFileName(p)) if p == PathBuf::from("intro.pdf")));
    }

    #[test]
    fn test_list_worksheets_filters_extension_case_insensitively() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["3.PDF", "1.pdf", "2.Pdf", "notes.txt", "4.pdf.bak"] {
            std::fs::write(temp_dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(temp_dir.path().join("5.pdf")).unwrap();

        let listed = list_worksheets(temp_dir.path()).unwrap();
        assert_eq!(names(&listed), vec!["1.pdf", "2.Pdf", "3.PDF"]);
    }

    #[test]
    fn test_list_worksheets_missing_directory() {
        let result = list_worksheets(Path::new("no/such/worksheets"));
        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }

    #[test]
    fn test_empty_directory_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let config = WorkbookConfig {
            input_dir: temp_dir.path().to_path_buf(),
            output_path: temp_dir.path().join("out.pdf"),
            cover_image: temp_dir.path().join("missing-cover.png"),
            ..WorkbookConfig::default()
        };

        let mut events = Vec::new();
        let outcome = build_workbook(&config, &FontRegistry::builtin(), &mut |event: Progress<'_>| {
            events.push(format!("{:?}", event))
        })
        .unwrap();

        assert_eq!(outcome, BuildOutcome::NoInputs);
        assert_eq!(events.len(), 1);
        assert!(events[0].starts_with("NoInputs"));
        assert!(!config.output_path.exists());
    }
}
