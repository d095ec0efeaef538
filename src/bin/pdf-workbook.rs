//! PDF Workbook CLI tool
//!
//! Combines numbered worksheet PDFs into one workbook with a cover page.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use pdf_workbook::config::{
    WorkbookConfig, DEFAULT_COVER_IMAGE, DEFAULT_INPUT_DIR, DEFAULT_OUTPUT_FILE, DEFAULT_TITLE,
};
use pdf_workbook::fonts::{FontRegistry, GlyphFont};
use pdf_workbook::layout::PageSize;
use pdf_workbook::pdf::extract_metadata;
use pdf_workbook::{build_workbook, BuildOutcome, Progress};

/// PDF Workbook - Combine numbered worksheets into one workbook
#[derive(Parser)]
#[command(name = "pdf-workbook")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Build from ./worksheets with cover.png into Chinese_Workbook_A4.pdf
    pdf-workbook build

    # Use another directory and output file
    pdf-workbook build --input-dir sheets -o workbook.pdf

    # Show page count and page sizes of the result
    pdf-workbook info Chinese_Workbook_A4.pdf")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the workbook from a directory of numbered worksheet PDFs
    Build {
        /// Directory holding 1.pdf, 2.pdf, ...
        #[arg(long, default_value = DEFAULT_INPUT_DIR)]
        input_dir: PathBuf,

        /// Output PDF file path
        #[arg(short, long, default_value = DEFAULT_OUTPUT_FILE)]
        output: PathBuf,

        /// Artwork image centered on the cover
        #[arg(long, default_value = DEFAULT_COVER_IMAGE)]
        cover_image: PathBuf,

        /// TrueType font for the cover glyph, tried before the default locations
        #[arg(long)]
        glyph_font: Option<PathBuf>,

        /// Document title stored in the PDF metadata
        #[arg(long, default_value = DEFAULT_TITLE)]
        title: String,

        /// Use US Letter pages instead of A4
        #[arg(long)]
        letter: bool,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build { input_dir, output, cover_image, glyph_font, title, letter } => {
            cmd_build(input_dir, output, cover_image, glyph_font, title, letter)
        }
        Commands::Info { input } => {
            cmd_info(input)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Print one progress line
fn report(event: Progress<'_>) {
    match event {
        Progress::NoInputs { dir } => {
            eprintln!("Warning: No PDFs found in {}", dir.display());
        }
        Progress::Found { count } => {
            println!("Found {} files. Creating workbook with centered cover...\n", count);
        }
        Progress::Processing { position, path } => {
            let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            println!("  {}. {}", position, name);
        }
    }
}

/// Build the workbook
fn cmd_build(
    input_dir: PathBuf,
    output: PathBuf,
    cover_image: PathBuf,
    glyph_font: Option<PathBuf>,
    title: String,
    letter: bool,
) -> Result<()> {
    let mut config = WorkbookConfig {
        input_dir,
        output_path: output,
        cover_image,
        title,
        ..WorkbookConfig::default()
    };
    if letter {
        config.canvas = PageSize::letter();
    }
    if let Some(font) = glyph_font {
        config.glyph_font_candidates.insert(0, font);
    }

    let fonts = FontRegistry::resolve(&config.glyph_font_candidates)
        .context("Failed to load the cover glyph font")?;
    match fonts.glyph() {
        GlyphFont::TrueType { name, path, .. } => {
            log::info!("Cover glyph font: {} ({})", name, path.display())
        }
        GlyphFont::Builtin => log::info!("Cover glyph font: {} (not embedded)", fonts.glyph_font_name()),
    }

    let outcome = build_workbook(&config, &fonts, &mut report)
        .with_context(|| format!("Failed to build {}", config.output_path.display()))?;

    if let BuildOutcome::Written { path, pages } = outcome {
        println!("\nSaved: {} ({} pages)", path.display(), pages);
    }

    Ok(())
}

/// Show information about a PDF
fn cmd_info(input: PathBuf) -> Result<()> {
    let metadata = extract_metadata(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    println!("File: {}", input.display());
    println!("Pages: {}", metadata.page_count);

    if let Some(title) = metadata.title {
        println!("Title: {}", title);
    }
    if let Some(producer) = metadata.producer {
        println!("Producer: {}", producer);
    }

    for (i, page) in metadata.pages.iter().enumerate() {
        println!(
            "  {}. {:.2} x {:.2} pt, {} annotations, {} XObjects",
            i + 1,
            page.width,
            page.height,
            page.annotation_count,
            page.xobject_count
        );
    }

    Ok(())
}
