//! Screenshot appendix for reports that reference no images themselves.

use super::{place_image, RenderContext};
use crate::pdf::config::RenderStats;
use crate::pdf::document::Document;
use crate::pdf::images::{collect_images, ImageAsset};
use std::path::Path;

const HEADING: &str = "Screenshots";

/// Append every image in `images_dir` under its own heading, each preceded by its
/// file name. Does nothing when the directory holds no images.
pub fn render(
    doc: &mut Document,
    images_dir: &Path,
    ctx: &RenderContext,
    stats: &mut RenderStats,
) {
    let images = collect_images(images_dir);
    if images.is_empty() {
        return;
    }
    log::info!(
        "report embeds no images, appending {} screenshots from {}",
        images.len(),
        images_dir.display()
    );

    if !doc.at_page_top() {
        doc.new_page();
    }
    let size = doc.add_heading(2, HEADING);
    stats.headings.push((2, size));

    let spacing = doc.config().blank_line_pt;
    for path in images {
        let name = path
            .file_name()
            .map(|name| ctx.clean(&name.to_string_lossy()))
            .unwrap_or_else(|| ctx.clean(&path.display().to_string()));
        doc.add_paragraph(&name);
        place_image(doc, ImageAsset::load(&path), &name, stats);
        doc.add_spacing(spacing);
    }
}
