use std::collections::BTreeMap;

use serde::Serialize;

use crate::extract::PdfToken;

/// Character span of one source token inside `Line::text`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinePart {
    pub x: f32,
    /// Byte offset where the token starts.
    pub start: usize,
    /// Byte offset one past the token's last byte.
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub page: u32,
    pub y: f32,
    pub min_x: f32,
    pub text: String,
    pub parts: Vec<LinePart>,
}

/// Groups tokens into visual lines by `(page, round(y / tolerance))` and joins
/// each group in x order with single spaces. Lines come back top-to-bottom.
pub fn build_lines(tokens: &[PdfToken], y_tolerance: f32) -> Vec<Line> {
    let tolerance = if y_tolerance > 0.0 { y_tolerance } else { 2.0 };

    let mut buckets: BTreeMap<(u32, i64), Vec<&PdfToken>> = BTreeMap::new();
    for token in tokens {
        if token.text.trim().is_empty() {
            continue;
        }
        let key = (token.page, (token.y / tolerance).round() as i64);
        buckets.entry(key).or_default().push(token);
    }

    let mut lines: Vec<Line> = buckets
        .into_values()
        .map(|mut group| {
            group.sort_by(|a, b| a.x.total_cmp(&b.x));

            let mut text = String::new();
            let mut parts = Vec::with_capacity(group.len());
            for token in &group {
                if !text.is_empty() {
                    text.push(' ');
                }
                let start = text.len();
                text.push_str(token.text.trim());
                parts.push(LinePart {
                    x: token.x,
                    start,
                    end: text.len(),
                });
            }

            let y = group.iter().map(|t| t.y).sum::<f32>() / group.len() as f32;
            Line {
                page: group[0].page,
                y,
                min_x: group[0].x,
                text,
                parts,
            }
        })
        .collect();

    lines.sort_by(|a, b| a.page.cmp(&b.page).then(b.y.total_cmp(&a.y)));
    lines
}

/// Maps a byte offset in `line.text` back to an x-coordinate: the span that
/// contains it, else the nearest span, else the line's left edge.
pub fn x_at(line: &Line, idx: usize) -> f32 {
    if let Some(part) = line.parts.iter().find(|p| p.start <= idx && idx < p.end) {
        return part.x;
    }

    line.parts
        .iter()
        .min_by_key(|p| p.start.abs_diff(idx).min(p.end.abs_diff(idx)))
        .map(|p| p.x)
        .unwrap_or(line.min_x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(page: u32, x: f32, y: f32, text: &str) -> PdfToken {
        PdfToken {
            page,
            x,
            y,
            text: text.to_string(),
        }
    }

    #[test]
    fn groups_by_row_and_orders_top_down() {
        let tokens = vec![
            token(1, 200.0, 500.0, "LT19A"),
            token(1, 10.0, 700.4, "MON"),
            token(1, 10.0, 500.3, "SC2006"),
            token(1, 90.0, 699.8, "TUE"),
            token(2, 10.0, 900.0, "WED"),
        ];

        let lines = build_lines(&tokens, 2.0);
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["MON TUE", "SC2006 LT19A", "WED"]);
        assert_eq!(lines[0].min_x, 10.0);
        assert_eq!(lines[2].page, 2);
    }

    #[test]
    fn spans_are_monotonic_and_map_back_to_x() {
        let tokens = vec![
            token(1, 0.0, 100.0, "SC2006"),
            token(1, 50.0, 100.0, "LEC"),
            token(1, 90.0, 100.0, "SCL2"),
        ];
        let line = &build_lines(&tokens, 2.0)[0];

        for pair in line.parts.windows(2) {
            assert!(pair[0].end < pair[1].start);
        }
        assert_eq!(&line.text[line.parts[1].start..line.parts[1].end], "LEC");
        assert_eq!(x_at(line, 0), 0.0);
        assert_eq!(x_at(line, 8), 50.0);
        // the separator after "LEC" is nearest to the end of that span
        assert_eq!(x_at(line, 10), 50.0);
        assert_eq!(x_at(line, 99), 90.0);
    }
}
