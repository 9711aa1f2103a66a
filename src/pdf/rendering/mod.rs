//! Block rendering.
//!
//! Walks the parsed blocks in source order and hands each to the [`Document`].
//! Consecutive table rows are gathered first and drawn as one table. All text passes
//! through the emoji sanitizer before it is measured.
//!
//! Images never fail the run: an unresolvable or undecodable reference becomes a grey
//! placeholder line, a warning in the log and an entry in
//! [`RenderStats::missing_images`].
//!
//! When the report embeds no images at all, every screenshot in the images directory
//! is appended on a page of its own section (see [`appendix`]).

mod appendix;
mod footer;

pub use footer::{expand_template, render_footers};

use super::config::{PlacedImage, RenderStats};
use super::document::Document;
use super::images::{self, ImageAsset, Resolution};
use crate::emoji;
use crate::error::ImageWarning;
use crate::markdown::{Block, ImageRef};
use indicatif::ProgressBar;
use std::path::Path;

/// Where images are looked up and how text is cleaned.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Directory of the Markdown file
    pub report_dir: &'a Path,
    pub images_dir: Option<&'a Path>,
    pub strip_emoji: bool,
}

impl RenderContext<'_> {
    /// Replace mapped emoji, and drop the rest when stripping is enabled.
    pub fn clean(&self, text: &str) -> String {
        let text = emoji::sanitize(text);
        if self.strip_emoji {
            emoji::strip_unmapped(&text).into_owned()
        } else {
            text.into_owned()
        }
    }
}

pub fn render(
    doc: &mut Document,
    blocks: &[Block],
    ctx: &RenderContext,
    progress: &ProgressBar,
) -> RenderStats {
    let mut stats = RenderStats {
        font_family: doc.font().family().to_string(),
        ..RenderStats::default()
    };

    let mut index = 0;
    while index < blocks.len() {
        if let Block::TableRow(_) = &blocks[index] {
            let rows: Vec<Vec<String>> = blocks[index..]
                .iter()
                .map_while(|block| match block {
                    Block::TableRow(cells) => {
                        Some(cells.iter().map(|cell| ctx.clean(cell)).collect())
                    }
                    _ => None,
                })
                .collect();
            progress.set_message(format!("table ({} rows)", rows.len()));
            stats.table_rows += doc.add_table(&rows);
            stats.tables += 1;
            index += rows.len();
            progress.inc(rows.len() as u64);
            continue;
        }

        render_block(doc, &blocks[index], ctx, &mut stats);
        index += 1;
        progress.inc(1);
    }

    let has_images = blocks.iter().any(|block| matches!(block, Block::Image(_)));
    if !has_images {
        if let Some(images_dir) = ctx.images_dir {
            appendix::render(doc, images_dir, ctx, &mut stats);
        }
    }

    stats
}

fn render_block(doc: &mut Document, block: &Block, ctx: &RenderContext, stats: &mut RenderStats) {
    match block {
        Block::Heading { level, text } => {
            let text = ctx.clean(text);
            let size = doc.add_heading(*level, &text);
            if *level == 1 {
                doc.set_title(text);
            }
            stats.headings.push((*level, size));
        }
        Block::ListItem {
            marker,
            depth,
            text,
        } => doc.add_list_item(*marker, *depth, &ctx.clean(text)),
        Block::Paragraph(text) => doc.add_paragraph(&ctx.clean(text)),
        Block::Image(image) => {
            let asset = load_reference(image, ctx);
            place_image(doc, asset, &ctx.clean(image.label()), stats);
        }
        Block::Rule => doc.add_rule(),
        Block::Blank => {
            let spacing = doc.config().blank_line_pt;
            doc.add_spacing(spacing);
        }
        Block::TableRow(_) => unreachable!("table rows are gathered by `render`"),
    }
}

fn load_reference(image: &ImageRef, ctx: &RenderContext) -> Result<ImageAsset, ImageWarning> {
    match images::resolve(image, ctx.report_dir, ctx.images_dir) {
        Resolution::Found(path) => ImageAsset::load(&path),
        Resolution::Missing => Err(ImageWarning::NotFound {
            reference: image.path.clone(),
        }),
    }
}

/// Draw a loaded image, or a placeholder line naming `label` if it could not be loaded.
fn place_image(
    doc: &mut Document,
    asset: Result<ImageAsset, ImageWarning>,
    label: &str,
    stats: &mut RenderStats,
) {
    match asset {
        Ok(asset) => {
            let path = asset.path.clone();
            let pixels = (asset.width, asset.height);
            let placed = doc.add_image(asset);
            log::debug!(
                "placed {} at {:.1}x{:.1}pt",
                path.display(),
                placed.0,
                placed.1
            );
            stats.images.push(PlacedImage {
                path,
                pixels,
                placed,
            });
        }
        Err(warning) => {
            log::warn!("{warning}");
            let placeholder = match &warning {
                ImageWarning::NotFound { .. } => format!("[Image not found: {label}]"),
                ImageWarning::Unreadable { reason, .. }
                | ImageWarning::Undecodable { reason, .. } => {
                    format!("[Image load error: {label}: {reason}]")
                }
            };
            doc.add_placeholder(&placeholder);
            stats.missing_images.push(warning);
        }
    }
}
