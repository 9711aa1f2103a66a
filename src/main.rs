use anyhow::{Context, Result};
use cli::Cli;
use indicatif::{ProgressBar, ProgressStyle};
use std::process::ExitCode;

mod cli;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = try_main() {
        eprintln!("{}: {e:#}", console::style("Error").red());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn try_main() -> Result<()> {
    use clap::Parser;
    let cli = Cli::parse();

    let quiet = cli.quiet;
    let report = cli.into_report()?;

    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        let progress = ProgressBar::new(0);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("can parse progress style")
                .progress_chars("#>-"),
        );
        progress
    };
    progress.set_message("Rendering PDF...");

    let stats = report
        .render(&progress)
        .with_context(|| format!("Failed to convert {}", report.source.display()))?;
    progress.finish_and_clear();

    println!("PDF written: {}", report.output.display());
    println!("  Pages:  {}", stats.page_count);
    println!("  Font:   {}", stats.font_family);
    println!("  Images: {}", stats.images.len());
    if !stats.missing_images.is_empty() {
        println!(
            "  {} {} image(s) could not be embedded:",
            console::style("Warning:").yellow(),
            stats.missing_images.len()
        );
        for warning in &stats.missing_images {
            println!("    - {warning}");
        }
    }

    Ok(())
}
