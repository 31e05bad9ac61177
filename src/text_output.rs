//! Text renderings for CLI output.
//!
//! This module formats display documents and prediction outcomes as
//! human-readable lines for the non-interactive modes.

use crate::model::{Cell, DisplayDocument};
use crate::orchestrator::{ConsoleOutput, PredictionOutcome};

/// Cells wider than this are truncated in text mode.
const MAX_CELL_WIDTH: usize = 120;

/// Format a display document as printable lines.
pub fn document_lines(doc: &DisplayDocument) -> Vec<String> {
    match doc {
        DisplayDocument::NoResults => vec!["No results found.".into()],
        DisplayDocument::Error { message } => vec![format!("Error: {message}")],
        DisplayDocument::Table { columns, rows } => table_lines(columns, rows),
    }
}

/// Format a console run: the document plus a row-count line when the
/// response was an array.
pub fn console_lines(out: &ConsoleOutput) -> Vec<String> {
    let mut lines = document_lines(&out.document);
    if let Some(n) = out.row_count {
        lines.push(format!("{n} rows found"));
    }
    lines
}

/// Format a prediction outcome as a ranked list, top entry marked.
pub fn prediction_lines(outcome: &PredictionOutcome) -> Vec<String> {
    match outcome {
        PredictionOutcome::Invalid { message } => vec![message.clone()],
        PredictionOutcome::Failed { message } => vec![format!("Error: {message}")],
        PredictionOutcome::NoRecommendations => {
            vec!["No recommendations for this client.".into()]
        }
        PredictionOutcome::Ranked(items) => {
            let mut lines = vec!["Recommendations (best match first):".into()];
            for (i, item) in items.iter().enumerate() {
                let marker = if i == 0 { "=>" } else { "  " };
                lines.push(format!(
                    "{marker} {:>2}. {} [{}] {}",
                    i + 1,
                    item.short_name(),
                    item.score_percent(),
                    item.label
                ));
            }
            lines
        }
    }
}

fn table_lines(columns: &[String], rows: &[Vec<Cell>]) -> Vec<String> {
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            body.iter()
                .map(|row| row.get(i).map(|c| c.chars().count()).unwrap_or(0))
                .chain(std::iter::once(col.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format_row(columns.iter().map(String::as_str), &widths));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in &body {
        lines.push(format_row(row.iter().map(String::as_str), &widths));
    }
    lines
}

fn format_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths.iter().copied())
        .map(|(cell, w)| format!("{cell:<w$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn cell_text(cell: &Cell) -> String {
    match cell {
        Cell::Empty => "\u{2014}".into(),
        Cell::Image { url } => format!("[img] {}", clamp(url)),
        Cell::Link { url, label } => format!("{label} <{}>", clamp(url)),
        Cell::LongText { text } => clamp(text),
        Cell::Text { text } => clamp(text),
    }
}

fn clamp(text: &str) -> String {
    if text.chars().count() <= MAX_CELL_WIDTH {
        return text.to_string();
    }
    let mut out: String = text.chars().take(MAX_CELL_WIDTH - 3).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecommendationItem;

    #[test]
    fn no_results_and_error_documents() {
        assert_eq!(
            document_lines(&DisplayDocument::NoResults),
            vec!["No results found."]
        );
        assert_eq!(
            document_lines(&DisplayDocument::Error {
                message: "boom".into()
            }),
            vec!["Error: boom"]
        );
    }

    #[test]
    fn table_is_aligned_with_header_and_separator() {
        let doc = DisplayDocument::Table {
            columns: vec!["label".into(), "elevation".into()],
            rows: vec![
                vec![
                    Cell::Text {
                        text: "Ventoux".into(),
                    },
                    Cell::Text {
                        text: "1909".into(),
                    },
                ],
                vec![
                    Cell::Text {
                        text: "Galibier".into(),
                    },
                    Cell::Empty,
                ],
            ],
        };
        let lines = document_lines(&doc);
        assert_eq!(lines[0], "label     elevation");
        assert_eq!(lines[1], "--------  ---------");
        assert_eq!(lines[2], "Ventoux   1909");
        assert_eq!(lines[3], "Galibier  \u{2014}");
    }

    #[test]
    fn console_output_appends_row_count() {
        let out = ConsoleOutput {
            document: DisplayDocument::NoResults,
            row_count: Some(0),
        };
        assert_eq!(
            console_lines(&out),
            vec!["No results found.", "0 rows found"]
        );

        let err = ConsoleOutput {
            document: DisplayDocument::Error {
                message: "bad".into(),
            },
            row_count: None,
        };
        assert_eq!(console_lines(&err), vec!["Error: bad"]);
    }

    #[test]
    fn prediction_list_marks_top_entry() {
        let outcome = PredictionOutcome::Ranked(vec![
            RecommendationItem {
                tour_uri: "http://x#Tour_A".into(),
                label: "Alps".into(),
                score: 0.97,
            },
            RecommendationItem {
                tour_uri: "http://x#Tour_B".into(),
                label: "Brittany".into(),
                score: 0.64,
            },
        ]);
        let lines = prediction_lines(&outcome);
        assert_eq!(lines[1], "=>  1. Tour_A [97.0%] Alps");
        assert_eq!(lines[2], "    2. Tour_B [64.0%] Brittany");
    }

    #[test]
    fn empty_prediction_is_distinct_from_failure() {
        assert_eq!(
            prediction_lines(&PredictionOutcome::NoRecommendations),
            vec!["No recommendations for this client."]
        );
    }
}
