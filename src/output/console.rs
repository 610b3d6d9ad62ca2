//! Console output utilities.

use console::style;

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", style("INFO").cyan().bold(), message);
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", style("OK").green().bold(), message);
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", style("WARN").yellow().bold(), message);
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", style("ERROR").red().bold(), message);
}

/// Print the application banner.
pub fn print_banner() {
    let banner = concat!(
        "\n  timeline-downloader ",
        env!("CARGO_PKG_VERSION"),
        "\n  Photos and videos from a profile timeline\n"
    );
    println!("{}", style(banner).cyan());
}

/// Print configuration summary.
pub fn print_config_summary(profile: &str, output_dir: &str, concurrency: usize, backend: &str) {
    println!();
    println!("{}", style("Configuration:").bold());
    println!("  Profile:     {}", profile);
    println!("  Directory:   {}", output_dir);
    println!("  Concurrency: {}", concurrency);
    println!("  Videos via:  {}", backend);
    println!();
}
