//! Report Module
//!
//! Box-style summary reports printed at the end of a batch.

use crate::progress::{format_bytes, format_duration};
use console::style;
use std::path::PathBuf;
use std::time::Duration;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Per-bucket counts of a conversion batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonSummary {
    pub total: usize,
    pub converted: usize,
    pub skipped: usize,
    pub unreadable: usize,
    pub collided: usize,
    pub write_failed: usize,
    pub cancelled: usize,
    pub deleted: usize,
    pub delete_failed: usize,
    pub input_bytes: u64,
    pub duration: Duration,
}

fn row(icon: &str, label: &str, value: impl std::fmt::Display) -> String {
    format!("║  {} {:<20}{:>14}  ║", icon, label, value.to_string())
}

/// Renders the summary box without printing it.
pub fn render_canon_summary(summary: &CanonSummary, operation_name: &str) -> String {
    let mut lines = vec![
        "╔════════════════════════════════════════════╗".to_string(),
        format!("║  📊 {:<38} ║", format!("{} Summary", operation_name)),
        "╠════════════════════════════════════════════╣".to_string(),
        row("📁", "Files found:", summary.total),
        row("✅", "Converted:", summary.converted),
        row("⏭️ ", "Already canonical:", summary.skipped),
        row("❓", "Unreadable:", summary.unreadable),
        row("⚠️ ", "Collided:", summary.collided),
        row("❌", "Write failed:", summary.write_failed),
    ];
    if summary.cancelled > 0 {
        lines.push(row("🛑", "Cancelled:", summary.cancelled));
    }
    lines.push("╠════════════════════════════════════════════╣".to_string());
    lines.push(row("🗑️ ", "Sources deleted:", summary.deleted));
    if summary.delete_failed > 0 {
        lines.push(row("🛡️ ", "Deletes refused:", summary.delete_failed));
    }
    lines.push(row("💾", "Input size:", format_bytes(summary.input_bytes)));
    lines.push(row("⏱️ ", "Total time:", format_duration(summary.duration)));
    lines.push("╚════════════════════════════════════════════╝".to_string());
    lines.join("\n")
}

pub fn print_canon_summary(summary: &CanonSummary, operation_name: &str) {
    println!();
    println!("{}", render_canon_summary(summary, operation_name));
}

/// Prints a titled list of `path → detail` lines; nothing when empty.
pub fn print_issue_list(title: &str, entries: &[(PathBuf, String)]) {
    if entries.is_empty() {
        return;
    }
    println!();
    println!("{}", style(title).yellow().bold());
    println!("{}", RULE);
    for (path, detail) in entries {
        if detail.is_empty() {
            println!("   {}", path.display());
        } else {
            println!("   {} → {}", path.display(), style(detail).dim());
        }
    }
}

pub fn print_simple_summary(operation_name: &str, succeeded: usize, failed: usize, skipped: usize) {
    let total = succeeded + failed + skipped;
    let mark = if failed == 0 {
        style("✅").green()
    } else {
        style("⚠️").yellow()
    };
    println!(
        "\n{} {} complete: {} succeeded, {} failed, {} skipped (total: {})",
        mark, operation_name, succeeded, failed, skipped, total
    );
}
