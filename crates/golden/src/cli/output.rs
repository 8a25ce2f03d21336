//! Output formatting utilities for CLI commands

use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use golden_core::{ComparisonOutcome, LabelColor};

/// Format a duration in milliseconds
///
/// Examples:
/// - 850 -> "850 ms"
/// - 12_400 -> "12.4 s"
/// - 185_000 -> "3m 05s"
pub fn format_duration_ms(ms: u64) -> String {
    if ms < 1_000 {
        format!("{} ms", ms)
    } else if ms < 60_000 {
        format!("{:.1} s", ms as f64 / 1_000.0)
    } else {
        let secs = ms / 1_000;
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}

/// Table color for an outcome row
pub fn color_for_outcome(outcome: ComparisonOutcome) -> Option<Color> {
    match outcome {
        ComparisonOutcome::Unchanged => Some(Color::Green),
        ComparisonOutcome::Changed => Some(Color::Yellow),
        ComparisonOutcome::MissingInSubject => Some(Color::Red),
        ComparisonOutcome::Incomparable => Some(Color::Magenta),
        ComparisonOutcome::Skipped => None,
    }
}

/// Closest terminal color for a label color
pub fn color_for_label(color: LabelColor) -> Option<Color> {
    match color {
        LabelColor::None => None,
        LabelColor::White => Some(Color::White),
        LabelColor::Silver | LabelColor::Gray => Some(Color::Grey),
        LabelColor::Black => Some(Color::DarkGrey),
        LabelColor::Red => Some(Color::Red),
        LabelColor::Maroon => Some(Color::DarkRed),
        LabelColor::Yellow => Some(Color::Yellow),
        LabelColor::Olive => Some(Color::DarkYellow),
        LabelColor::Lime => Some(Color::Green),
        LabelColor::Green => Some(Color::DarkGreen),
        LabelColor::Aqua => Some(Color::Cyan),
        LabelColor::Teal => Some(Color::DarkCyan),
        LabelColor::Blue => Some(Color::Blue),
        LabelColor::Navy => Some(Color::DarkBlue),
        LabelColor::Fuchsia => Some(Color::Magenta),
        LabelColor::Purple => Some(Color::DarkMagenta),
    }
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(h).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);
    table
}

/// Print a simple table with headers
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut table = new_table(headers);
    for row in rows {
        table.add_row(row);
    }
    println!("{}", table);
}

/// Print a table with custom column colors
pub fn print_table_colored(headers: &[&str], rows: Vec<Vec<(String, Option<Color>)>>) {
    let mut table = new_table(headers);
    for row in rows {
        let cells: Vec<Cell> = row
            .into_iter()
            .map(|(text, color)| match color {
                Some(c) => Cell::new(text).fg(c),
                None => Cell::new(text),
            })
            .collect();
        table.add_row(cells);
    }
    println!("{}", table);
}
