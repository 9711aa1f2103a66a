use crate::error::{ImageWarning, ReportError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Points per millimetre.
pub const MM: f32 = 72.0 / 25.4;

/// A4 portrait in points.
pub const A4: (f32, f32) = (595.28, 841.89);

/// Page size and margins in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl PageGeometry {
    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    pub fn content_height(&self) -> f32 {
        self.height - 2.0 * self.margin
    }
}

/// Layout settings, optionally loaded from a TOML file.
///
/// The page is always A4; everything else can be tuned. Missing keys take their
/// defaults so a config file only needs the values it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Uniform margin on all four sides, in millimetres
    #[serde(default = "default_margin_mm")]
    pub margin_mm: f32,
    #[serde(default = "default_font_size_h1")]
    pub font_size_h1_pt: f32,
    #[serde(default = "default_font_size_h2")]
    pub font_size_h2_pt: f32,
    #[serde(default = "default_font_size_h3")]
    pub font_size_h3_pt: f32,
    /// Used for `####` and deeper
    #[serde(default = "default_font_size_minor_heading")]
    pub font_size_minor_heading_pt: f32,
    #[serde(default = "default_font_size_body")]
    pub font_size_body_pt: f32,
    #[serde(default = "default_font_size_table")]
    pub font_size_table_pt: f32,
    #[serde(default = "default_font_size_footer")]
    pub font_size_footer_pt: f32,
    /// Line height as a multiple of the font size
    #[serde(default = "default_line_spacing")]
    pub line_spacing: f32,
    /// Vertical space left by an empty Markdown line
    #[serde(default = "default_blank_line")]
    pub blank_line_pt: f32,
    /// Space below every placed image
    #[serde(default = "default_image_spacing")]
    pub image_spacing_pt: f32,
    /// Footer text; `{n}` is the page number and `{total}` the page count. Empty disables it.
    #[serde(default = "default_footer_template")]
    pub footer_template: String,
    /// Remove pictographs that have no text replacement
    #[serde(default)]
    pub strip_emoji: bool,
}

fn default_margin_mm() -> f32 {
    15.0
}
fn default_font_size_h1() -> f32 {
    18.0
}
fn default_font_size_h2() -> f32 {
    14.0
}
fn default_font_size_h3() -> f32 {
    12.0
}
fn default_font_size_minor_heading() -> f32 {
    11.0
}
fn default_font_size_body() -> f32 {
    10.0
}
fn default_font_size_table() -> f32 {
    9.0
}
fn default_font_size_footer() -> f32 {
    8.0
}
fn default_line_spacing() -> f32 {
    1.4
}
fn default_blank_line() -> f32 {
    5.0
}
fn default_image_spacing() -> f32 {
    11.0
}
fn default_footer_template() -> String {
    "Page {n}/{total}".to_string()
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            margin_mm: default_margin_mm(),
            font_size_h1_pt: default_font_size_h1(),
            font_size_h2_pt: default_font_size_h2(),
            font_size_h3_pt: default_font_size_h3(),
            font_size_minor_heading_pt: default_font_size_minor_heading(),
            font_size_body_pt: default_font_size_body(),
            font_size_table_pt: default_font_size_table(),
            font_size_footer_pt: default_font_size_footer(),
            line_spacing: default_line_spacing(),
            blank_line_pt: default_blank_line(),
            image_spacing_pt: default_image_spacing(),
            footer_template: default_footer_template(),
            strip_emoji: false,
        }
    }
}

impl LayoutConfig {
    pub fn load(path: &Path) -> Result<LayoutConfig> {
        let config_error = |reason: String| ReportError::Config {
            path: path.to_path_buf(),
            reason,
        };
        let contents = std::fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        let config: LayoutConfig =
            toml::from_str(&contents).map_err(|e| config_error(e.to_string()))?;
        config.validate().map_err(config_error)?;
        Ok(config)
    }

    /// Reject settings that would leave no room to draw or break heading order.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.margin_mm < 0.0 || self.geometry().content_width() <= 0.0 {
            return Err(format!("margin of {}mm leaves no content area", self.margin_mm));
        }
        let sizes = [
            self.font_size_h1_pt,
            self.font_size_h2_pt,
            self.font_size_h3_pt,
            self.font_size_minor_heading_pt,
        ];
        if sizes.windows(2).any(|pair| pair[0] <= pair[1]) {
            return Err("heading sizes must strictly decrease from h1 to minor headings".into());
        }
        let others = [
            self.font_size_body_pt,
            self.font_size_table_pt,
            self.font_size_footer_pt,
            self.line_spacing,
        ];
        if sizes.iter().chain(others.iter()).any(|size| *size <= 0.0) {
            return Err("font sizes and line spacing must be positive".into());
        }
        Ok(())
    }

    pub fn geometry(&self) -> PageGeometry {
        PageGeometry {
            width: A4.0,
            height: A4.1,
            margin: self.margin_mm * MM,
        }
    }

    /// Font size for a heading; larger for lower levels.
    pub fn heading_size(&self, level: u8) -> f32 {
        match level {
            0 | 1 => self.font_size_h1_pt,
            2 => self.font_size_h2_pt,
            3 => self.font_size_h3_pt,
            _ => self.font_size_minor_heading_pt,
        }
    }

    pub fn line_height(&self, size: f32) -> f32 {
        size * self.line_spacing
    }
}

/// An image drawn into the document.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedImage {
    pub path: PathBuf,
    /// Intrinsic size in pixels
    pub pixels: (u32, u32),
    /// Size on the page in points
    pub placed: (f32, f32),
}

/// Statistics from rendering, for reporting to the user.
#[derive(Debug, Clone, Default)]
pub struct RenderStats {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Level and font size of every heading drawn, in order
    pub headings: Vec<(u8, f32)>,
    /// Number of tables drawn
    pub tables: usize,
    /// Table rows drawn across all tables, header rows included
    pub table_rows: usize,
    pub images: Vec<PlacedImage>,
    /// Image references that ended up as placeholders
    pub missing_images: Vec<ImageWarning>,
    /// Font the text was set in
    pub font_family: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn can_serialize_config() {
        let config = LayoutConfig::default();
        toml::to_string(&config).expect("can serialize config to TOML");
    }

    #[test]
    fn partial_config_uses_defaults() {
        let config: LayoutConfig =
            toml::from_str("font_size_body_pt = 11.0\nstrip_emoji = true").expect("can parse");
        assert_eq!(config.font_size_body_pt, 11.0);
        assert!(config.strip_emoji);
        assert_eq!(config.margin_mm, 15.0);
        assert_eq!(config.footer_template, "Page {n}/{total}");
    }

    #[test]
    fn heading_sizes_decrease_with_level() {
        let config = LayoutConfig::default();
        assert!(config.heading_size(1) > config.heading_size(2));
        assert!(config.heading_size(2) > config.heading_size(3));
        assert!(config.heading_size(3) > config.heading_size(4));
        assert_eq!(config.heading_size(6), config.heading_size(4));
    }

    #[test]
    fn a4_geometry_has_15mm_margins() {
        let geometry = LayoutConfig::default().geometry();
        assert!((geometry.margin - 42.52).abs() < 0.01);
        assert!((geometry.content_width() - 510.24).abs() < 0.01);
    }

    #[test]
    fn rejects_inverted_heading_sizes() {
        let config = LayoutConfig {
            font_size_h2_pt: 20.0,
            ..LayoutConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(LayoutConfig::default().validate().is_ok());
    }

    #[test]
    fn load_reports_bad_files() {
        let dir = tempfile::tempdir().expect("can create temp dir");
        let path = dir.path().join("layout.toml");
        std::fs::write(&path, "margin_mm = \"wide\"").expect("can write config");
        let err = LayoutConfig::load(&path).expect_err("config is invalid");
        assert!(matches!(err, ReportError::Config { .. }));
    }
}
