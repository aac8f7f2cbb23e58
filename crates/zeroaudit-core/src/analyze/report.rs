use std::fmt::Write;

use owo_colors::OwoColorize;

use super::AuditOutcome;

const OFFSETS_SHOWN: usize = 8;

/// Render the audit outcome as a human-readable report.
///
/// Verbosity is explicit: verbose output lists every match offset, the
/// default truncates long offset lists to keep the table readable.
pub fn render_report(outcome: &AuditOutcome, verbose: bool) -> String {
    let mut out = String::new();

    let label_width = outcome
        .rows
        .iter()
        .map(|row| row.label().len() + row.encoding().to_string().len() + 3)
        .chain(std::iter::once("Pattern".len()))
        .max()
        .unwrap_or(0);

    let _ = writeln!(
        out,
        "{:<label_width$}  {:>9}  {:>9}  {}",
        "Pattern", "Initial", "Final", "Status"
    );

    for row in &outcome.rows {
        let name = format!("{} ({})", row.label(), row.encoding());
        let status = if row.ok {
            format!("{}", "OK".green())
        } else {
            format!("{}", "FAIL".red())
        };
        let _ = writeln!(
            out,
            "{:<label_width$}  {:>9}  {:>9}  {}",
            name,
            row.initial.count(),
            row.r#final.count(),
            status
        );

        if verbose || !row.ok {
            if !row.initial.offsets.is_empty() {
                let _ = writeln!(
                    out,
                    "    initial offsets: {}",
                    format_offsets(&row.initial.offsets, verbose)
                );
            }
            if !row.r#final.offsets.is_empty() {
                let _ = writeln!(
                    out,
                    "    final offsets:   {}",
                    format_offsets(&row.r#final.offsets, verbose)
                );
            }
        }
    }

    if !outcome.verdict.violations.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Violations:");
        for violation in &outcome.verdict.violations {
            let _ = writeln!(out, "  - {violation}");
        }
    }

    let _ = writeln!(out);
    if outcome.verdict.passed {
        let _ = writeln!(out, "Verdict: {}", "PASS".green());
    } else {
        let _ = writeln!(
            out,
            "Verdict: {} ({} violation(s))",
            "FAIL".red(),
            outcome.verdict.violations.len()
        );
    }

    out
}

fn format_offsets(offsets: &[usize], verbose: bool) -> String {
    let shown: Vec<String> = offsets
        .iter()
        .take(if verbose { offsets.len() } else { OFFSETS_SHOWN })
        .map(|o| format!("0x{o:X}"))
        .collect();

    let mut text = shown.join(", ");
    if !verbose && offsets.len() > OFFSETS_SHOWN {
        let _ = write!(text, ", ... ({} total)", offsets.len());
    }
    text
}
