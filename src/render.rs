//! Plain-text rendering of a table's displayed view

use crate::table::controller::{TableController, TableState};
use crate::table::record::Record;
use std::fmt::Write;

/// Cells wider than this are truncated
const MAX_CELL_WIDTH: usize = 28;

const COLUMN_GAP: &str = "  ";

/// Render the displayed view with its header, footer and stats line
pub fn render_table<R: Record>(table: &TableController<R>) -> String {
    let spec = table.spec();
    let mut out = String::new();

    if table.state() == TableState::Empty {
        out.push_str("No results yet.\n");
        return out;
    }

    let sort = table.sort_config();
    let headers: Vec<String> = spec
        .columns
        .iter()
        .map(|column| {
            if sort.is_active(column.key) {
                format!("{} {}", column.label, sort.direction.arrow())
            } else {
                column.label.to_string()
            }
        })
        .collect();

    let rows: Vec<Vec<String>> = table
        .displayed()
        .iter()
        .map(|record| {
            spec.columns
                .iter()
                .map(|column| {
                    let text = record
                        .field(column.key)
                        .map(|value| value.to_string())
                        .unwrap_or_default();
                    truncate(&text, MAX_CELL_WIDTH)
                })
                .collect()
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    push_row(&mut out, &headers, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, &rule, &widths);

    if rows.is_empty() {
        out.push_str("No results match your filters.\n");
    }
    for row in &rows {
        push_row(&mut out, row, &widths);
    }

    let _ = writeln!(
        out,
        "\nShowing {} of {} results",
        table.displayed().len(),
        table.records().len()
    );
    let _ = writeln!(out, "{}", table.stats());
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join(COLUMN_GAP);
    out.push_str(line.trim_end());
    out.push('\n');
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}
