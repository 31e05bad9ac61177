//! Result-set rendering.
//!
//! Turns the loosely-typed payloads returned by the query endpoints into a
//! [`DisplayDocument`]: the column schema is inferred from the rows and every
//! cell is classified into an explicit display treatment. Rendering is a pure
//! function of the payload; nothing is cached between calls and the input is
//! never mutated.

use crate::model::{Cell, DisplayDocument};
use serde_json::Value;

/// File suffixes treated as image URLs.
const IMAGE_SUFFIXES: [&str; 6] = [".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp"];

/// Hosting-domain fragments whose URLs are images regardless of suffix.
const IMAGE_HOSTS: [&str; 2] = ["commons.wikimedia.org", "upload.wikimedia.org"];

/// Description cells longer than this many characters are clamped.
const LONG_TEXT_THRESHOLD: usize = 100;

/// Render a backend payload into a display document.
///
/// Empty, absent, or malformed payloads yield [`DisplayDocument::NoResults`];
/// a mapping carrying an `error` field yields [`DisplayDocument::Error`];
/// anything else is treated as a result set.
pub fn render(payload: &Value) -> DisplayDocument {
    let rows = match payload {
        Value::Array(rows) => rows,
        Value::Object(map) => {
            if let Some(err) = map.get("error") {
                return DisplayDocument::Error {
                    message: error_message(err),
                };
            }
            // An object without an error field is neither rows nor a
            // recognizable failure; treat it like an empty result.
            return DisplayDocument::NoResults;
        }
        _ => return DisplayDocument::NoResults,
    };

    if rows.is_empty() {
        return DisplayDocument::NoResults;
    }

    let columns = column_schema(rows);
    let body = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|col| classify_cell(col, row.get(col).unwrap_or(&Value::Null)))
                .collect()
        })
        .collect();

    DisplayDocument::Table {
        columns,
        rows: body,
    }
}

/// Ordered, de-duplicated union of the field names across all rows, in order
/// of first appearance, with "image" promoted to the front when present.
pub fn column_schema(rows: &[Value]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        if let Value::Object(map) = row {
            for key in map.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
    }

    if let Some(pos) = columns.iter().position(|c| c == "image") {
        let image = columns.remove(pos);
        columns.insert(0, image);
    }

    columns
}

/// Classify one cell value. The checks run in a fixed priority order:
/// empty, image, link, long text, plain text. Order matters: an image URL is
/// also an HTTP URL, and an "image" column wins over every string heuristic.
pub fn classify_cell(column: &str, value: &Value) -> Cell {
    let text = match value {
        Value::Null => return Cell::Empty,
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    if column == "image" || is_image_url(&text) {
        return Cell::Image { url: text };
    }

    if text.starts_with("http://") || text.starts_with("https://") {
        let label = link_label(&text);
        return Cell::Link { url: text, label };
    }

    if column == "description" && text.chars().count() > LONG_TEXT_THRESHOLD {
        return Cell::LongText { text };
    }

    Cell::Text { text }
}

fn is_image_url(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    IMAGE_SUFFIXES.iter().any(|s| lower.ends_with(s))
        || IMAGE_HOSTS.iter().any(|h| lower.contains(h))
}

/// Visible label for a link: the final non-empty token after splitting the
/// URL on `/` and `#`, or "link" when no such token exists.
pub(crate) fn link_label(url: &str) -> String {
    url.rsplit(['/', '#'])
        .find(|seg| !seg.is_empty())
        .unwrap_or("link")
        .to_string()
}

fn error_message(err: &Value) -> String {
    match err {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
