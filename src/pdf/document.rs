//! Page-oriented document builder.
//!
//! Content is appended top to bottom through a single vertical cursor measured from
//! the top edge of the current page. Before a block is drawn its height is checked
//! against the space left; if it does not fit, a new page is started first. Only
//! paragraphs and list items are split, one wrapped line at a time. Tables longer
//! than a full page break between rows.
//!
//! Nothing is serialised until [`Document::save`], which consumes the builder.

use super::config::{LayoutConfig, PageGeometry};
use super::fonts::{LoadedFont, FONT_RESOURCE};
use super::images::{fit, EncodedImage, ImageAsset};
use super::layout::{clip_text, wrap_text};
use crate::error::{ReportError, Result};
use crate::markdown::ListMarker;
use chrono::{Datelike, Timelike};
use pdf_writer::types::LineCapStyle;
use pdf_writer::{Content, Date, Filter, Name, Pdf, Rect, Ref, Str, TextStr};
use std::io::Write;
use std::path::Path;

const TEXT_GREY: f32 = 0.1;
const PLACEHOLDER_GREY: f32 = 0.5;
const FOOTER_GREY: f32 = 0.5;
const RULE_GREY: f32 = 0.78;
const HEADER_FILL_GREY: f32 = 0.92;
const BORDER_GREY: f32 = 0.3;

const UNDERLINE_GAP: f32 = 6.0;
const RULE_GAP: f32 = 4.0;
const CELL_PADDING_H: f32 = 3.0;
const CELL_PADDING_V: f32 = 2.0;
const LIST_INDENT: f32 = 12.0;
const MAX_LIST_DEPTH: usize = 6;
const EPSILON: f32 = 0.01;

struct PageContent {
    content: Content,
    /// indices into `Document::images` drawn on this page
    images: Vec<usize>,
}

impl PageContent {
    fn new() -> PageContent {
        PageContent {
            content: Content::new(),
            images: Vec::new(),
        }
    }
}

struct EmbeddedImage {
    width: u32,
    height: u32,
    encoded: EncodedImage,
}

pub struct Document {
    config: LayoutConfig,
    geometry: PageGeometry,
    font: LoadedFont,
    pages: Vec<PageContent>,
    cursor: f32,
    images: Vec<EmbeddedImage>,
    title: Option<String>,
}

impl Document {
    /// Start a document with one empty page.
    pub fn new(config: LayoutConfig, font: LoadedFont) -> Document {
        let geometry = config.geometry();
        Document {
            config,
            geometry,
            font,
            pages: vec![PageContent::new()],
            cursor: geometry.margin,
            images: Vec::new(),
            title: None,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn geometry(&self) -> PageGeometry {
        self.geometry
    }

    pub fn font(&self) -> &LoadedFont {
        &self.font
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Distance of the cursor below the top edge of the current page.
    pub fn cursor(&self) -> f32 {
        self.cursor
    }

    /// Sets the PDF title, keeping the first one given.
    pub fn set_title<S: Into<String>>(&mut self, title: S) {
        if self.title.is_none() {
            self.title = Some(title.into());
        }
    }

    pub fn new_page(&mut self) {
        self.pages.push(PageContent::new());
        self.cursor = self.geometry.margin;
    }

    fn bottom(&self) -> f32 {
        self.geometry.height - self.geometry.margin
    }

    fn remaining(&self) -> f32 {
        self.bottom() - self.cursor
    }

    /// Whether nothing has been drawn on the current page yet.
    pub fn at_page_top(&self) -> bool {
        (self.cursor - self.geometry.margin).abs() < EPSILON
    }

    /// Break the page unless `height` fits below the cursor. A fresh page is never
    /// broken again, so oversized content simply overflows it.
    pub fn ensure_space(&mut self, height: f32) -> bool {
        if height > self.remaining() + EPSILON && !self.at_page_top() {
            self.new_page();
            true
        } else {
            false
        }
    }

    fn current_page(&mut self) -> &mut PageContent {
        self.pages
            .last_mut()
            .expect("document always has at least one page")
    }

    fn wrap(&self, text: &str, size: f32, width: f32) -> Vec<String> {
        wrap_text(text, width, |c| self.font.char_width(c, size))
    }

    fn clip(&self, text: &str, size: f32, width: f32) -> String {
        clip_text(text, width, |c| self.font.char_width(c, size))
    }

    /// Baseline position for a line box starting at `top`.
    fn baseline(&self, top: f32, size: f32, line_height: f32) -> f32 {
        let ascent = self.font.ascent(size);
        let descent = self.font.descent(size);
        top + ((line_height - ascent - descent) / 2.0).max(0.0) + ascent
    }

    fn draw_text_on(&mut self, page: usize, x: f32, baseline: f32, size: f32, grey: f32, text: &str) {
        let bytes = self.font.encode(text);
        let y = self.geometry.height - baseline;
        let Some(page) = self.pages.get_mut(page) else {
            return;
        };
        page.content
            .set_fill_gray(grey)
            .begin_text()
            .set_font(Name(FONT_RESOURCE), size)
            .next_line(x, y)
            .show(Str(&bytes))
            .end_text();
    }

    fn draw_text(&mut self, x: f32, baseline: f32, size: f32, grey: f32, text: &str) {
        let page = self.pages.len() - 1;
        self.draw_text_on(page, x, baseline, size, grey, text);
    }

    fn draw_hline(&mut self, y_from_top: f32, thickness: f32, grey: f32) {
        let x1 = self.geometry.margin;
        let x2 = self.geometry.width - self.geometry.margin;
        let y = self.geometry.height - y_from_top;
        self.current_page()
            .content
            .set_stroke_gray(grey)
            .set_line_cap(LineCapStyle::ButtCap)
            .set_line_width(thickness)
            .move_to(x1, y)
            .line_to(x2, y)
            .stroke();
    }

    /// Draw wrapped lines at `x`, breaking the page between lines as needed.
    fn draw_lines(&mut self, lines: &[String], x: f32, size: f32, grey: f32) {
        let line_height = self.config.line_height(size);
        for line in lines {
            self.ensure_space(line_height);
            let baseline = self.baseline(self.cursor, size, line_height);
            self.draw_text(x, baseline, size, grey, line);
            self.cursor += line_height;
        }
    }

    /// Returns the font size the heading was drawn at.
    pub fn add_heading(&mut self, level: u8, text: &str) -> f32 {
        let size = self.config.heading_size(level);
        let line_height = self.config.line_height(size);
        let lines = self.wrap(text, size, self.geometry.content_width());
        let space_before = if self.at_page_top() { 0.0 } else { size * 0.4 };
        let underline = if level <= 1 { UNDERLINE_GAP } else { 0.0 };

        let height = space_before + lines.len() as f32 * line_height + underline;
        if !self.ensure_space(height) {
            self.cursor += space_before;
        }

        let x = self.geometry.margin;
        for line in &lines {
            let baseline = self.baseline(self.cursor, size, line_height);
            self.draw_text(x, baseline, size, TEXT_GREY, line);
            self.cursor += line_height;
        }

        if level <= 1 {
            self.draw_hline(self.cursor + 1.0, 0.5, 0.2);
            self.cursor += UNDERLINE_GAP;
        }
        size
    }

    pub fn add_paragraph(&mut self, text: &str) {
        self.add_text_block(text, TEXT_GREY);
    }

    /// A grey line standing in for content that could not be drawn.
    pub fn add_placeholder(&mut self, text: &str) {
        self.add_text_block(text, PLACEHOLDER_GREY);
    }

    fn add_text_block(&mut self, text: &str, grey: f32) {
        let size = self.config.font_size_body_pt;
        let lines = self.wrap(text, size, self.geometry.content_width());
        self.draw_lines(&lines, self.geometry.margin, size, grey);
    }

    pub fn add_list_item(&mut self, marker: ListMarker, depth: usize, text: &str) {
        let size = self.config.font_size_body_pt;
        let line_height = self.config.line_height(size);
        let indent = depth.min(MAX_LIST_DEPTH) as f32 * LIST_INDENT;

        let label = match marker {
            ListMarker::Bullet if self.font.has_glyph('・') => "・".to_string(),
            ListMarker::Bullet => "-".to_string(),
            ListMarker::Number(n) => format!("{n}."),
        };
        let label_width = (self.font.text_width(&label, size) + size * 0.5).max(LIST_INDENT * 1.4);

        let x = self.geometry.margin + indent;
        let text_x = x + label_width;
        let lines = self.wrap(text, size, self.geometry.content_width() - indent - label_width);

        self.ensure_space(line_height);
        let baseline = self.baseline(self.cursor, size, line_height);
        self.draw_text(x, baseline, size, TEXT_GREY, &label);
        self.draw_lines(&lines, text_x, size, TEXT_GREY);
    }

    /// Draw a table whose first row is the header. Returns the number of rows drawn.
    ///
    /// Columns share the content width evenly; the header decides how many there are.
    pub fn add_table(&mut self, rows: &[Vec<String>]) -> usize {
        if rows.is_empty() {
            return 0;
        }

        let size = self.config.font_size_table_pt;
        let line_height = self.config.line_height(size);
        let row_height = line_height + 2.0 * CELL_PADDING_V;
        let columns = rows[0].len().max(1);
        let column_width = self.geometry.content_width() / columns as f32;

        let total = row_height * rows.len() as f32;
        if total <= self.geometry.content_height() {
            self.ensure_space(total);
        }

        for (index, row) in rows.iter().enumerate() {
            self.ensure_space(row_height);
            let top = self.cursor;
            let y = self.geometry.height - top - row_height;

            let cells: Vec<String> = (0..columns)
                .map(|col| {
                    let cell = row.get(col).map(String::as_str).unwrap_or("");
                    self.clip(cell, size, column_width - 2.0 * CELL_PADDING_H)
                })
                .collect();
            let baseline = self.baseline(top + CELL_PADDING_V, size, line_height);

            for (col, cell) in cells.iter().enumerate() {
                let x = self.geometry.margin + col as f32 * column_width;
                {
                    let content = &mut self.current_page().content;
                    if index == 0 {
                        content
                            .set_fill_gray(HEADER_FILL_GREY)
                            .rect(x, y, column_width, row_height)
                            .fill_nonzero();
                    }
                    content
                        .set_stroke_gray(BORDER_GREY)
                        .set_line_width(0.5)
                        .rect(x, y, column_width, row_height)
                        .stroke();
                }
                self.draw_text(x + CELL_PADDING_H, baseline, size, TEXT_GREY, cell);
            }

            self.cursor += row_height;
        }

        self.cursor += CELL_PADDING_V;
        rows.len()
    }

    /// Place an image at the left margin. Returns its size on the page in points.
    pub fn add_image(&mut self, asset: ImageAsset) -> (f32, f32) {
        let (width, height) = fit(
            asset.width,
            asset.height,
            self.geometry.content_width(),
            self.geometry.content_height(),
        );
        self.ensure_space(height);

        let index = self.images.len();
        self.images.push(EmbeddedImage {
            width: asset.width,
            height: asset.height,
            encoded: asset.encoded,
        });

        let x = self.geometry.margin;
        let y = self.geometry.height - self.cursor - height;
        let name = image_name(index);
        let page = self.current_page();
        page.images.push(index);
        page.content
            .save_state()
            .transform([width, 0.0, 0.0, height, x, y])
            .x_object(Name(name.as_bytes()))
            .restore_state();

        self.cursor += height + self.config.image_spacing_pt;
        (width, height)
    }

    pub fn add_rule(&mut self) {
        self.ensure_space(2.0 * RULE_GAP);
        self.cursor += RULE_GAP;
        self.draw_hline(self.cursor, 0.3, RULE_GREY);
        self.cursor += RULE_GAP;
    }

    /// Vertical whitespace; swallowed at the top of a page.
    pub fn add_spacing(&mut self, height: f32) {
        if self.at_page_top() {
            return;
        }
        self.cursor = (self.cursor + height).min(self.bottom());
    }

    /// Centre a line of small grey text in the bottom margin of a page.
    pub fn add_footer(&mut self, page: usize, text: &str) {
        let size = self.config.font_size_footer_pt;
        let x = (self.geometry.width - self.font.text_width(text, size)) / 2.0;
        let baseline = self.geometry.height - self.geometry.margin / 2.0;
        self.draw_text_on(page, x, baseline, size, FOOTER_GREY, text);
    }

    /// Serialise the document.
    pub fn finish(self) -> std::io::Result<Vec<u8>> {
        let mut pdf = Pdf::new();
        let mut next_id = 1;
        let mut alloc = || {
            let r = Ref::new(next_id);
            next_id += 1;
            r
        };

        let catalog_id = alloc();
        let pages_id = alloc();
        let info_id = alloc();

        let font_ref = self.font.write(&mut pdf, &mut alloc);
        let mut image_refs = Vec::with_capacity(self.images.len());
        for image in &self.images {
            image_refs.push(write_image(&mut pdf, &mut alloc, image));
        }

        let page_ids: Vec<Ref> = self.pages.iter().map(|_| alloc()).collect();
        let content_ids: Vec<Ref> = self.pages.iter().map(|_| alloc()).collect();
        let (width, height) = (self.geometry.width, self.geometry.height);

        for (i, page) in self.pages.into_iter().enumerate() {
            let raw = page.content.finish();
            let compressed = super::deflate(&raw)?;
            pdf.stream(content_ids[i], &compressed)
                .filter(Filter::FlateDecode);

            let mut pdf_page = pdf.page(page_ids[i]);
            pdf_page
                .media_box(Rect::new(0.0, 0.0, width, height))
                .parent(pages_id)
                .contents(content_ids[i]);
            let mut resources = pdf_page.resources();
            resources.fonts().pair(Name(FONT_RESOURCE), font_ref);
            if !page.images.is_empty() {
                let mut x_objects = resources.x_objects();
                for index in page.images {
                    x_objects.pair(Name(image_name(index).as_bytes()), image_refs[index]);
                }
            }
        }

        pdf.catalog(catalog_id).pages(pages_id);
        pdf.pages(pages_id)
            .kids(page_ids.iter().copied())
            .count(page_ids.len() as i32);

        let now = chrono::Utc::now();
        let mut info = pdf.document_info(info_id);
        if let Some(title) = &self.title {
            info.title(TextStr(title));
        }
        info.creator(TextStr(concat!("report-pdf v", env!("CARGO_PKG_VERSION"))));
        info.creation_date(
            Date::new(now.year() as u16)
                .month(now.month() as u8)
                .day(now.day() as u8)
                .hour(now.hour() as u8)
                .minute(now.minute() as u8)
                .second(now.second() as u8)
                .utc_offset_hour(0),
        );
        drop(info);

        Ok(pdf.finish())
    }

    /// Write the PDF to `path`; the terminal operation of every run.
    pub fn save(self, path: &Path) -> Result<()> {
        let write_error = |source: std::io::Error| ReportError::OutputWrite {
            path: path.to_path_buf(),
            source,
        };
        let bytes = self.finish().map_err(write_error)?;
        let file = std::fs::File::create(path).map_err(write_error)?;
        let mut file = std::io::BufWriter::new(file);
        file.write_all(&bytes).map_err(write_error)?;
        file.flush().map_err(write_error)?;
        Ok(())
    }
}

fn image_name(index: usize) -> String {
    format!("Im{}", index + 1)
}

fn write_image(pdf: &mut Pdf, alloc: &mut impl FnMut() -> Ref, image: &EmbeddedImage) -> Ref {
    let image_ref = alloc();
    let (width, height) = (image.width as i32, image.height as i32);

    match &image.encoded {
        EncodedImage::Jpeg { data, grey } => {
            let mut xobject = pdf.image_xobject(image_ref, data);
            xobject.filter(Filter::DctDecode);
            xobject.width(width);
            xobject.height(height);
            if *grey {
                xobject.color_space().device_gray();
            } else {
                xobject.color_space().device_rgb();
            }
            xobject.bits_per_component(8);
        }
        EncodedImage::Flate { rgb, alpha } => {
            let mask_ref = if let Some(alpha) = alpha {
                let mask_ref = alloc();
                let mut mask = pdf.image_xobject(mask_ref, alpha);
                mask.filter(Filter::FlateDecode);
                mask.width(width);
                mask.height(height);
                mask.color_space().device_gray();
                mask.bits_per_component(8);
                Some(mask_ref)
            } else {
                None
            };

            let mut xobject = pdf.image_xobject(image_ref, rgb);
            xobject.filter(Filter::FlateDecode);
            xobject.width(width);
            xobject.height(height);
            xobject.color_space().device_rgb();
            xobject.bits_per_component(8);
            if let Some(mask_ref) = mask_ref {
                xobject.s_mask(mask_ref);
            }
        }
    }

    image_ref
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn document() -> Document {
        Document::new(LayoutConfig::default(), LoadedFont::Builtin)
    }

    fn jpeg(dir: &Path, name: &str, width: u32, height: u32) -> ImageAsset {
        let path = dir.join(name);
        RgbImage::from_pixel(width, height, Rgb([10, 120, 200]))
            .save(&path)
            .expect("can write jpeg");
        ImageAsset::load(&path).expect("can load jpeg")
    }

    #[test]
    fn starts_with_one_page_at_the_top_margin() {
        let doc = document();
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.cursor(), doc.geometry().margin);
    }

    #[test]
    fn heading_sizes_strictly_decrease() {
        let mut doc = document();
        let h1 = doc.add_heading(1, "Report");
        let h2 = doc.add_heading(2, "Summary");
        let h3 = doc.add_heading(3, "Details");
        assert!(h1 > h2 && h2 > h3);
    }

    #[test]
    fn long_paragraphs_continue_on_the_next_page() {
        let mut doc = document();
        let text = "verification step passed ".repeat(1200);
        doc.add_paragraph(&text);
        assert!(doc.page_count() > 1);
        assert!(doc.cursor() <= doc.geometry().height - doc.geometry().margin + EPSILON);
    }

    #[test]
    fn table_moves_to_a_new_page_instead_of_splitting() {
        let mut doc = document();
        // leave a sliver of space at the bottom of the first page
        let line_height = doc.config().line_height(doc.config().font_size_body_pt);
        while doc.remaining() > line_height * 2.0 {
            doc.add_paragraph("filler");
        }
        let rows = vec![
            vec!["#".to_string(), "Result".to_string()],
            vec!["1".to_string(), "OK".to_string()],
            vec!["2".to_string(), "NG".to_string()],
        ];
        assert_eq!(doc.add_table(&rows), 3);
        assert_eq!(doc.page_count(), 2);
    }

    #[test]
    fn images_are_never_wider_than_the_content_area() {
        let dir = tempfile::tempdir().expect("can create temp dir");
        let mut doc = document();

        let (w, h) = doc.add_image(jpeg(dir.path(), "small.jpg", 200, 100));
        assert_eq!((w, h), (200.0, 100.0));

        let content_width = doc.geometry().content_width();
        let (w, h) = doc.add_image(jpeg(dir.path(), "wide.jpg", 1200, 600));
        assert!((w - content_width).abs() < 1e-3);
        assert!((w / h - 2.0).abs() < 1e-3);
    }

    #[test]
    fn spacing_is_swallowed_at_the_top_of_a_page() {
        let mut doc = document();
        doc.add_spacing(20.0);
        assert_eq!(doc.cursor(), doc.geometry().margin);
        doc.add_paragraph("text");
        let before = doc.cursor();
        doc.add_spacing(20.0);
        assert_eq!(doc.cursor(), before + 20.0);
    }

    #[test]
    fn finishes_into_a_pdf() {
        let dir = tempfile::tempdir().expect("can create temp dir");
        let mut doc = document();
        doc.set_title("Report");
        doc.add_heading(1, "Report");
        doc.add_list_item(ListMarker::Number(1), 0, "first");
        doc.add_rule();
        doc.add_image(jpeg(dir.path(), "shot.jpg", 40, 20));
        doc.add_footer(0, "Page 1/1");

        let bytes = doc.finish().expect("can serialise");
        assert!(bytes.starts_with(b"%PDF-"));
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Helvetica"));
        assert!(text.contains("/DCTDecode"));
    }

    #[test]
    fn save_reports_unwritable_paths() {
        let dir = tempfile::tempdir().expect("can create temp dir");
        let path = dir.path().join("missing-dir/report.pdf");
        let err = document().save(&path).expect_err("parent directory is missing");
        assert!(matches!(err, ReportError::OutputWrite { .. }));
    }
}
