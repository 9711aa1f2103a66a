//! Screenshot resolution, decoding and sizing.
//!
//! References are resolved against the report's own directory first and the
//! screenshot directory second. Decoded images are kept only in the form they will
//! be embedded in: JPEGs are passed through untouched, everything else is flattened
//! to deflated RGB with an optional alpha mask.

use crate::error::ImageWarning;
use crate::markdown::ImageRef;
use image::{ColorType, DynamicImage, ImageFormat};
use std::path::{Path, PathBuf};

/// File extensions collected for the screenshot appendix.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Outcome of looking an image reference up on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(PathBuf),
    Missing,
}

/// Find the file an image reference points to.
pub fn resolve(image: &ImageRef, report_dir: &Path, images_dir: Option<&Path>) -> Resolution {
    let reference = Path::new(&image.path);

    if reference.is_absolute() {
        if reference.is_file() {
            return Resolution::Found(reference.to_path_buf());
        }
    } else {
        let relative = report_dir.join(reference);
        if relative.is_file() {
            return Resolution::Found(relative);
        }
    }

    if let (Some(dir), Some(file_name)) = (images_dir, reference.file_name()) {
        let candidate = dir.join(file_name);
        if candidate.is_file() {
            return Resolution::Found(candidate);
        }
    }

    Resolution::Missing
}

/// Image files in `dir`, sorted by file name.
pub fn collect_images(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        log::warn!("cannot list screenshot directory {}", dir.display());
        return Vec::new();
    };

    let mut images: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        })
        .collect();
    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    images
}

/// Pixel data in the shape it is written to the PDF.
pub(crate) enum EncodedImage {
    /// Original JPEG bytes for a `DCTDecode` stream
    Jpeg { data: Vec<u8>, grey: bool },
    /// Zlib-compressed RGB samples and optional alpha mask
    Flate { rgb: Vec<u8>, alpha: Option<Vec<u8>> },
}

/// A loaded screenshot with its intrinsic size in pixels.
pub struct ImageAsset {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub(crate) encoded: EncodedImage,
}

impl ImageAsset {
    pub fn load(path: &Path) -> Result<ImageAsset, ImageWarning> {
        let bytes = std::fs::read(path).map_err(|e| ImageWarning::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let undecodable = |reason: String| ImageWarning::Undecodable {
            path: path.to_path_buf(),
            reason,
        };

        let format = image::guess_format(&bytes).map_err(|e| undecodable(e.to_string()))?;
        let decoded = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| undecodable(e.to_string()))?;
        let (width, height) = (decoded.width(), decoded.height());
        if width == 0 || height == 0 {
            return Err(undecodable("image has no pixels".to_string()));
        }

        let encoded = match (format, decoded.color()) {
            (ImageFormat::Jpeg, ColorType::Rgb8) => EncodedImage::Jpeg {
                data: bytes,
                grey: false,
            },
            (ImageFormat::Jpeg, ColorType::L8) => EncodedImage::Jpeg {
                data: bytes,
                grey: true,
            },
            _ => flatten(&decoded).map_err(|e| undecodable(e.to_string()))?,
        };

        log::debug!(
            "loaded {} ({width}x{height} {:?})",
            path.display(),
            decoded.color()
        );

        Ok(ImageAsset {
            path: path.to_path_buf(),
            width,
            height,
            encoded,
        })
    }
}

fn flatten(decoded: &DynamicImage) -> std::io::Result<EncodedImage> {
    let rgba = decoded.to_rgba8();
    let rgb: Vec<u8> = rgba
        .pixels()
        .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
        .collect();
    let alpha = if rgba.pixels().any(|p| p.0[3] < 255) {
        let alpha: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
        Some(super::deflate(&alpha)?)
    } else {
        None
    };
    Ok(EncodedImage::Flate {
        rgb: super::deflate(&rgb)?,
        alpha,
    })
}

/// Placed size in points for an image of `width`×`height` pixels.
///
/// One pixel maps to one point. The image is shrunk uniformly to the content width,
/// and further if it would be taller than a whole page of content; it is never
/// enlarged.
pub fn fit(width: u32, height: u32, max_width: f32, max_height: f32) -> (f32, f32) {
    let (width, height) = (width as f32, height as f32);
    let scale = (max_width / width).min(max_height / height).min(1.0);
    (width * scale, height * scale)
}
