//! Shared output formatting for check results.

use anyhow::Result;
use modbound_core::CheckResult;

use crate::OutputFormat;

/// Print check results in the specified format.
pub fn print(result: &CheckResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print_text(result),
        OutputFormat::Json => return print_json(result),
        OutputFormat::Compact => print_compact(result),
    }
    Ok(())
}

fn print_text(result: &CheckResult) {
    for violation in &result.violations {
        println!(
            "{} {} at {}:{}",
            violation.kind.code(),
            violation.kind.name(),
            violation.location.file.display(),
            violation.location.line,
        );
        println!("  \x1b[31merror\x1b[0m: {}", violation.kind.message());
        println!();
    }

    for diagnostic in &result.diagnostics {
        println!(
            "  \x1b[33mwarning\x1b[0m: {}: file skipped, failed to parse: {}",
            diagnostic.file.display(),
            diagnostic.message
        );
    }

    let summary_color = if result.violations.is_empty() {
        "\x1b[32m"
    } else {
        "\x1b[31m"
    };
    let cached = if result.from_cache { " (cached)" } else { "" };

    println!(
        "{}Found {} violation(s) in {} file(s){}\x1b[0m",
        summary_color,
        result.violations.len(),
        result.files_checked,
        cached
    );
}

fn print_json(result: &CheckResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    println!("{json}");
    Ok(())
}

fn print_compact(result: &CheckResult) {
    for violation in &result.violations {
        println!(
            "{}:{}: [{}] {}",
            violation.location.file.display(),
            violation.location.line,
            violation.kind.code(),
            violation.kind.message(),
        );
    }
}
