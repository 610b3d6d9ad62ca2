//! Statistics reporting.

use console::style;

use crate::download::RunSummary;
use crate::pipeline::{RunReport, RunStatus};

/// Print statistics for a finished run.
pub fn print_run_stats(profile: &str, report: &RunReport) {
    let summary = &report.summary;

    println!();
    println!("{}", style("═".repeat(50)).dim());
    println!("{}", style(format!("Statistics for {}:", profile)).bold());
    println!("  Status:   {}", status_label(report.status));
    println!("  Pages:    {}", summary.pages);
    println!("  Photos:   {}", summary.photos);
    println!("  Videos:   {}", summary.videos);
    if summary.adopted > 0 {
        println!("  On disk:  {} (already downloaded)", summary.adopted);
    }
    if summary.failed > 0 {
        println!("  Failed:   {}", style(summary.failed).red());
    }
    if summary.not_dispatched > 0 {
        println!("  Pending:  {} (not started)", style(summary.not_dispatched).yellow());
    }
    println!("  Skipped:  {} (duplicates)", summary.duplicates);
    println!("  Manifest: {}", report.manifest_path.display());
    println!("{}", style("═".repeat(50)).dim());
}

/// Print a summary line for quick viewing.
pub fn print_summary(summary: &RunSummary) {
    println!(
        "Downloaded: {} photos, {} videos ({} failed, {} skipped)",
        style(summary.photos).green(),
        style(summary.videos).green(),
        style(summary.failed).red(),
        style(summary.duplicates).yellow()
    );
}

fn status_label(status: RunStatus) -> String {
    match status {
        RunStatus::Completed => style(status).green().to_string(),
        RunStatus::CompletedWithFailures | RunStatus::Cancelled => {
            style(status).yellow().to_string()
        }
        RunStatus::Failed => style(status).red().to_string(),
    }
}
