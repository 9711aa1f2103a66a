//! Exit status and messages of the `report-pdf` binary.

use std::path::Path;
use std::process::{Command, Output};

fn report_pdf(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_report-pdf"))
        .current_dir(dir)
        .env_remove("REPORT_PDF_FONT")
        .env("RUST_LOG", "off")
        .args(args)
        .output()
        .expect("can run report-pdf")
}

#[test]
fn missing_images_still_exit_successfully() {
    let dir = tempfile::tempdir().expect("can create temp dir");
    std::fs::write(
        dir.path().join("report.md"),
        "# Report\n\n![login](screenshots/01.png)\n",
    )
    .expect("can write report");

    let output = report_pdf(
        dir.path(),
        &["--report", "report.md", "--output", "report.pdf", "--quiet"],
    );

    assert!(output.status.success(), "{output:?}");
    assert!(dir.path().join("report.pdf").exists());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("PDF written: report.pdf"), "{stdout}");
    assert!(stdout.contains("1 image(s) could not be embedded"), "{stdout}");
    assert!(stdout.contains("screenshots/01.png"), "{stdout}");
}

#[test]
fn missing_report_flag_fails_with_a_message() {
    let dir = tempfile::tempdir().expect("can create temp dir");
    let output = report_pdf(dir.path(), &["--output", "report.pdf"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error"), "{stderr}");
    assert!(stderr.contains("Missing required argument: --report"), "{stderr}");
    assert!(!dir.path().join("report.pdf").exists());
}

#[test]
fn missing_explicit_font_fails_with_a_message() {
    let dir = tempfile::tempdir().expect("can create temp dir");
    std::fs::write(dir.path().join("report.md"), "# Report\n").expect("can write report");

    let output = report_pdf(
        dir.path(),
        &[
            "--report",
            "report.md",
            "--output",
            "report.pdf",
            "--font",
            "NoSuchFont.ttf",
            "-q",
        ],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Font file not found: NoSuchFont.ttf"), "{stderr}");
    assert!(!dir.path().join("report.pdf").exists());
}

#[test]
fn unreadable_report_fails_with_a_message() {
    let dir = tempfile::tempdir().expect("can create temp dir");
    let output = report_pdf(
        dir.path(),
        &["--report", "nope.md", "--output", "report.pdf", "-q"],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to read report nope.md"), "{stderr}");
}
