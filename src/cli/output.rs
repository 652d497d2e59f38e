//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::Colorize;

use crate::domain::{ShareRecord, FULL_BUDGET};

/// Width of the share bar at 100%.
const BAR_WIDTH: f64 = 40.0;

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print warning (yellow "Warning:" prefix) to stderr
pub fn warning(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

/// Print success status (green checkmark)
pub fn success(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// Print failure status (red X)
pub fn failure(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{} {}", "✗".red(), msg);
}

/// Print completed action (green label)
pub fn action(label: &str, msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}: {}", label.green(), msg);
}

/// Print section header (cyan bold)
pub fn header(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Print indented detail (no color)
pub fn detail(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {}", msg);
}

/// Print plain output (no color, for JSON and scripting)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

/// Print one share as `id  share%  bar`
pub fn share_row(record: &ShareRecord) {
    println!("  {}", format_share_row(record));
}

/// Print the total, green when it is 100%, red otherwise
pub fn total(value: f64, balanced: bool) {
    let text = format!("{:.2}%", value);
    if balanced {
        println!("  {} {}", "total".bold(), text.green());
    } else {
        println!("  {} {}", "total".bold(), text.red().bold());
    }
}

fn format_share_row(record: &ShareRecord) -> String {
    let cells = (record.share.clamp(0.0, FULL_BUDGET) / FULL_BUDGET * BAR_WIDTH).round() as usize;
    format!("{:>8}  {:>6.2}%  {}", record.id, record.share, "█".repeat(cells))
}
