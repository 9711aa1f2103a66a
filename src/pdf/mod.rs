//! Markdown report to PDF conversion.
//!
//! [`Report`] ties the pieces together: it reads the Markdown source, resolves and
//! loads the font, renders every block into a [`Document`], stamps the page footers
//! once the page count is known and writes the file.

pub mod config;
pub mod document;
pub mod fonts;
pub mod images;
pub mod layout;
pub mod rendering;

pub use config::{LayoutConfig, PageGeometry, PlacedImage, RenderStats};
pub use document::Document;
pub use rendering::RenderContext;

use crate::error::{ReportError, Result};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use indicatif::ProgressBar;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One conversion job.
#[derive(Debug, Clone)]
pub struct Report {
    /// Markdown source
    pub source: PathBuf,
    /// PDF destination
    pub output: PathBuf,
    /// Screenshot directory
    pub images: Option<PathBuf>,
    /// `auto` or a font file path
    pub font: String,
    pub layout: LayoutConfig,
}

impl Report {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(source: P, output: Q) -> Report {
        Report {
            source: source.into(),
            output: output.into(),
            images: None,
            font: fonts::AUTO.to_string(),
            layout: LayoutConfig::default(),
        }
    }

    /// The directory image references are resolved against.
    pub fn report_dir(&self) -> PathBuf {
        match self.source.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    pub fn render(&self, progress: &ProgressBar) -> Result<RenderStats> {
        let markdown =
            std::fs::read_to_string(&self.source).map_err(|source| ReportError::SourceRead {
                path: self.source.clone(),
                source,
            })?;

        let report_dir = self.report_dir();
        let search_root: &Path = self.images.as_deref().unwrap_or(&report_dir);
        let font = fonts::load(&self.font, Some(search_root))?;

        let blocks = crate::markdown::parse(&markdown);
        log::debug!("parsed {} blocks from {}", blocks.len(), self.source.display());
        progress.set_length(blocks.len() as u64);

        let mut doc = Document::new(self.layout.clone(), font);
        let ctx = RenderContext {
            report_dir: &report_dir,
            images_dir: self.images.as_deref(),
            strip_emoji: self.layout.strip_emoji,
        };
        let mut stats = rendering::render(&mut doc, &blocks, &ctx, progress);

        progress.set_message("Adding footers...");
        rendering::render_footers(&mut doc, &self.layout.footer_template);
        stats.page_count = doc.page_count();

        progress.set_message("Writing PDF...");
        doc.save(&self.output)?;
        Ok(stats)
    }
}

/// Zlib-compress a stream for `FlateDecode`.
pub(crate) fn deflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::ZlibDecoder;
    use std::io::Read;

    #[test]
    fn deflated_streams_inflate_back() {
        let data = b"BT /F1 10 Tf 42.5 800 Td (Report) Tj ET".repeat(20);
        let compressed = deflate(&data).expect("can deflate");
        assert!(compressed.len() < data.len());

        let mut inflated = Vec::new();
        ZlibDecoder::new(compressed.as_slice())
            .read_to_end(&mut inflated)
            .expect("can inflate");
        assert_eq!(inflated, data);
    }

    #[test]
    fn report_dir_defaults_to_the_working_directory() {
        assert_eq!(Report::new("report.md", "out.pdf").report_dir(), PathBuf::from("."));
        assert_eq!(
            Report::new("runs/1/report.md", "out.pdf").report_dir(),
            PathBuf::from("runs/1")
        );
    }

    #[test]
    fn unreadable_source_is_a_source_error() {
        let dir = tempfile::tempdir().expect("can create temp dir");
        let report = Report::new(dir.path().join("missing.md"), dir.path().join("out.pdf"));
        let err = report
            .render(&ProgressBar::hidden())
            .expect_err("source is missing");
        assert!(matches!(err, ReportError::SourceRead { .. }));
        assert!(!dir.path().join("out.pdf").exists());
    }
}
