//! Markdown to ratatui text.
//!
//! A small line-oriented transform covering what the assistant actually
//! sends back: headings, bullet and numbered lists, fenced code blocks, and
//! inline bold/italic/code spans. Anything else passes through as plain text.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

/// Transform markdown source into styled lines.
pub fn to_lines(source: &str) -> Vec<Line<'static>> {
    let mut out = Vec::new();
    let mut in_code_block = false;

    for raw in source.lines() {
        if raw.trim_start().starts_with("```") {
            // Fence lines toggle the block; the language tag is dropped.
            in_code_block = !in_code_block;
            continue;
        }

        if in_code_block {
            out.push(Line::from(Span::styled(
                format!("  {raw}"),
                Style::default().fg(Color::Yellow),
            )));
            continue;
        }

        let trimmed = raw.trim_start();
        if let Some(heading) = trimmed
            .strip_prefix("### ")
            .or_else(|| trimmed.strip_prefix("## "))
            .or_else(|| trimmed.strip_prefix("# "))
        {
            out.push(Line::from(Span::styled(
                heading.to_string(),
                Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            )));
            continue;
        }

        if let Some(item) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        {
            let mut spans = vec![Span::raw("  \u{2022} ")];
            spans.extend(inline_spans(item));
            out.push(Line::from(spans));
            continue;
        }

        out.push(Line::from(inline_spans(trimmed)));
    }

    out
}

/// Split one line into styled spans for `**bold**`, `*italic*` and
/// `` `code` `` markers. Unterminated markers render literally.
fn inline_spans(text: &str) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut plain = String::new();
    let mut rest = text;

    while !rest.is_empty() {
        let marker = ["**", "`", "*"]
            .iter()
            .filter_map(|m| rest.find(m).map(|i| (i, *m)))
            .min_by_key(|(i, _)| *i);

        let Some((start, marker)) = marker else {
            plain.push_str(rest);
            break;
        };

        let after = &rest[start + marker.len()..];
        let Some(end) = after.find(marker) else {
            // No closing marker: keep everything literal.
            plain.push_str(rest);
            break;
        };

        plain.push_str(&rest[..start]);
        if !plain.is_empty() {
            spans.push(Span::raw(std::mem::take(&mut plain)));
        }

        let inner = after[..end].to_string();
        let style = match marker {
            "**" => Style::default().add_modifier(Modifier::BOLD),
            "*" => Style::default().add_modifier(Modifier::ITALIC),
            _ => Style::default().fg(Color::Yellow),
        };
        spans.push(Span::styled(inner, style));

        rest = &after[end + marker.len()..];
    }

    if !plain.is_empty() {
        spans.push(Span::raw(plain));
    }
    if spans.is_empty() {
        spans.push(Span::raw(String::new()));
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(line: &Line) -> Vec<String> {
        line.spans.iter().map(|s| s.content.to_string()).collect()
    }

    #[test]
    fn bold_and_code_spans_are_split_out() {
        let lines = to_lines("ride **hard** on `gravel` roads");
        assert_eq!(
            texts(&lines[0]),
            vec!["ride ", "hard", " on ", "gravel", " roads"]
        );
        assert!(lines[0].spans[1]
            .style
            .add_modifier
            .contains(Modifier::BOLD));
    }

    #[test]
    fn bullets_get_a_dot_prefix() {
        let lines = to_lines("- climb\n- recover");
        assert_eq!(texts(&lines[0])[0], "  \u{2022} ");
        assert_eq!(texts(&lines[0])[1], "climb");
    }

    #[test]
    fn fenced_code_blocks_are_styled_not_echoed() {
        let lines = to_lines("before\n```sparql\nSELECT ?x\n```\nafter");
        assert_eq!(lines.len(), 3);
        assert_eq!(texts(&lines[1])[0], "  SELECT ?x");
        assert_eq!(lines[1].spans[0].style.fg, Some(Color::Yellow));
    }

    #[test]
    fn headings_are_emphasized() {
        let lines = to_lines("## Training plan");
        assert_eq!(texts(&lines[0])[0], "Training plan");
        assert!(lines[0].spans[0]
            .style
            .add_modifier
            .contains(Modifier::UNDERLINED));
    }

    #[test]
    fn unterminated_markers_stay_literal() {
        let lines = to_lines("a * b");
        assert_eq!(texts(&lines[0]), vec!["a * b"]);
    }
}
