use clap::Parser;
use report_pdf::pdf::fonts::AUTO;
use report_pdf::{LayoutConfig, Report, ReportError};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
pub struct Cli {
    /// The Markdown report to convert
    #[clap(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Where to write the PDF
    #[clap(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Directory of screenshots referenced by the report
    #[clap(long, value_name = "DIR")]
    pub images: Option<PathBuf>,

    /// `auto` to search for a Japanese font, or the path of a TrueType/OpenType file
    #[clap(long, value_name = "FONT", default_value = AUTO, env = "REPORT_PDF_FONT")]
    pub font: String,

    /// TOML file overriding layout settings
    #[clap(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Also remove emoji that have no text replacement
    #[clap(long)]
    pub strip_emoji: bool,

    /// Don't show the progress bar
    #[clap(long, short)]
    pub quiet: bool,
}

impl Cli {
    /// Check the arguments and turn them into a conversion job.
    pub fn into_report(self) -> Result<Report, ReportError> {
        let source = self.report.ok_or(ReportError::MissingArgument("report"))?;
        let output = self.output.ok_or(ReportError::MissingArgument("output"))?;

        let mut layout = match &self.config {
            Some(path) => LayoutConfig::load(path)?,
            None => LayoutConfig::default(),
        };
        layout.strip_emoji |= self.strip_emoji;

        Ok(Report {
            source,
            output,
            images: self.images,
            font: self.font,
            layout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("report-pdf").chain(args.iter().copied()))
            .expect("arguments parse")
    }

    #[test]
    fn missing_report_is_reported_by_name() {
        let err = parse(&["--output", "out.pdf"])
            .into_report()
            .expect_err("report is required");
        assert_eq!(err.to_string(), "Missing required argument: --report");
    }

    #[test]
    fn missing_output_is_reported_by_name() {
        let err = parse(&["--report", "report.md"])
            .into_report()
            .expect_err("output is required");
        assert!(matches!(err, ReportError::MissingArgument("output")));
    }

    #[test]
    fn defaults_to_automatic_font_search() {
        let cli = parse(&["--report", "report.md", "--output", "out.pdf"]);
        assert_eq!(cli.font, AUTO);
        let report = cli.into_report().expect("arguments are complete");
        assert_eq!(report.images, None);
        assert!(!report.layout.strip_emoji);
    }

    #[test]
    fn strip_emoji_flag_overrides_config() {
        let dir = tempfile::tempdir().expect("can create temp dir");
        let config = dir.path().join("layout.toml");
        std::fs::write(&config, "font_size_body_pt = 11.0\n").expect("can write config");

        let report = parse(&[
            "--report",
            "report.md",
            "--output",
            "out.pdf",
            "--config",
            config.to_str().expect("utf-8 path"),
            "--strip-emoji",
        ])
        .into_report()
        .expect("arguments are complete");
        assert!(report.layout.strip_emoji);
        assert_eq!(report.layout.font_size_body_pt, 11.0);
    }
}
