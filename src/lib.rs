//! Convert Markdown verification reports with screenshots into A4 PDFs.
//!
//! The conversion is driven by [`Report`]:
//!
//! ```no_run
//! use indicatif::ProgressBar;
//! use report_pdf::Report;
//!
//! let mut report = Report::new("report.md", "report.pdf");
//! report.images = Some("screenshots".into());
//! let stats = report.render(&ProgressBar::hidden())?;
//! println!("{} pages", stats.page_count);
//! # Ok::<(), report_pdf::ReportError>(())
//! ```

pub mod emoji;
pub mod error;
pub mod markdown;
pub mod pdf;

pub use error::{ImageWarning, ReportError, Result};
pub use pdf::{LayoutConfig, RenderStats, Report};
