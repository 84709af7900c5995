use std::collections::{BTreeMap, HashMap};

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use super::lines::{x_at, Line};
use crate::extract::PdfToken;

lazy_static! {
    static ref DAY_LABEL_RE: Regex = Regex::new(
        r"(?i)\b(MON|TUE|WED|THU|FRI|SAT|SUN)(?:DAY|SDAY|NESDAY|RSDAY|URDAY)?\b"
    )
    .unwrap();
}

/// A weekday header cell. `day` is 1 = Monday .. 6 = Saturday.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayColumn {
    pub day: u8,
    pub label: String,
    pub x: f32,
}

/// ISO weekday of a label such as "Mon", "TUESDAY" or "thu".
fn day_number(label: &str) -> Option<u8> {
    let upper = label.to_ascii_uppercase();
    let prefix = upper.get(..3)?;
    match prefix {
        "MON" => Some(1),
        "TUE" => Some(2),
        "WED" => Some(3),
        "THU" => Some(4),
        "FRI" => Some(5),
        "SAT" => Some(6),
        "SUN" => Some(7),
        _ => None,
    }
}

/// First hit per weekday, Monday to Saturday. Sunday never becomes a column,
/// so it does not count towards the header threshold either.
fn collect_hits<'a>(hits: impl Iterator<Item = (&'a str, f32)>) -> HashMap<u8, (String, f32)> {
    let mut by_day = HashMap::new();
    for (label, x) in hits {
        if let Some(day) = day_number(label).filter(|day| *day <= 6) {
            by_day
                .entry(day)
                .or_insert_with(|| (label.to_ascii_uppercase(), x));
        }
    }
    by_day
}

fn into_columns(hits: HashMap<u8, (String, f32)>) -> Vec<DayColumn> {
    let mut columns: Vec<DayColumn> = hits
        .into_iter()
        .map(|(day, (label, x))| DayColumn { day, label, x })
        .collect();
    columns.sort_by(|a, b| a.x.total_cmp(&b.x));
    columns
}

/// Picks the reconstructed line with the most distinct weekday labels.
pub fn detect_from_lines(lines: &[Line], min_columns: usize) -> Option<Vec<DayColumn>> {
    let mut best: Option<HashMap<u8, (String, f32)>> = None;

    for line in lines {
        let hits = collect_hits(
            DAY_LABEL_RE
                .find_iter(&line.text)
                .map(|m| (m.as_str(), x_at(line, m.start()))),
        );
        if hits.len() > best.as_ref().map_or(0, HashMap::len) {
            best = Some(hits);
        }
    }

    let best = best.filter(|hits| hits.len() >= min_columns)?;
    let columns = into_columns(best);
    (!columns.is_empty()).then_some(columns)
}

/// Scans raw tokens for standalone weekday labels, buckets them by row and
/// keeps the row with the most hits. Covers headers that did not reconstruct
/// into one line.
pub fn detect_from_tokens(
    tokens: &[PdfToken],
    y_tolerance: f32,
    min_columns: usize,
) -> Option<Vec<DayColumn>> {
    let tolerance = if y_tolerance > 0.0 { y_tolerance } else { 2.0 };
    let mut rows: BTreeMap<(u32, i64), Vec<(&str, f32)>> = BTreeMap::new();

    for token in tokens {
        let text = token.text.trim();
        let is_label = DAY_LABEL_RE
            .find(text)
            .map_or(false, |m| m.start() == 0 && m.end() == text.len());
        if is_label {
            let key = (token.page, (token.y / tolerance).round() as i64);
            rows.entry(key).or_default().push((text, token.x));
        }
    }

    let best = rows
        .into_values()
        .map(|row| collect_hits(row.into_iter()))
        .fold(None::<HashMap<u8, (String, f32)>>, |best, hits| match best {
            Some(current) if current.len() >= hits.len() => Some(current),
            _ => Some(hits),
        })?;

    if best.len() < min_columns {
        return None;
    }
    let columns = into_columns(best);
    (!columns.is_empty()).then_some(columns)
}

/// Line-based detection first, then the raw-token scan.
pub fn detect_day_columns(
    lines: &[Line],
    tokens: &[PdfToken],
    y_tolerance: f32,
    min_columns: usize,
) -> Option<Vec<DayColumn>> {
    detect_from_lines(lines, min_columns)
        .or_else(|| detect_from_tokens(tokens, y_tolerance, min_columns))
}

/// Weekday of the column nearest to `x`.
pub fn pick_day_by_x(columns: &[DayColumn], x: f32) -> Option<u8> {
    columns
        .iter()
        .min_by(|a, b| (a.x - x).abs().total_cmp(&(b.x - x).abs()))
        .map(|c| c.day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::lines::build_lines;

    fn token(x: f32, y: f32, text: &str) -> PdfToken {
        PdfToken {
            page: 1,
            x,
            y,
            text: text.to_string(),
        }
    }

    #[test]
    fn header_line_yields_sorted_columns() {
        let tokens = vec![
            token(0.0, 800.0, "Time"),
            token(100.0, 800.0, "MON"),
            token(200.0, 800.0, "TUE"),
            token(300.0, 800.0, "WED"),
            token(400.0, 800.0, "THU"),
            token(500.0, 800.0, "FRI"),
            token(600.0, 800.0, "SUN"),
            token(100.0, 700.0, "SC2006"),
        ];
        let lines = build_lines(&tokens, 2.0);
        let columns = detect_day_columns(&lines, &tokens, 2.0, 3).unwrap();

        let days: Vec<u8> = columns.iter().map(|c| c.day).collect();
        assert_eq!(days, vec![1, 2, 3, 4, 5]);
        assert_eq!(columns[2].label, "WED");
        assert_eq!(columns[2].x, 300.0);
    }

    #[test]
    fn too_few_labels_is_none() {
        let tokens = vec![token(100.0, 800.0, "MON"), token(200.0, 800.0, "TUE")];
        let lines = build_lines(&tokens, 2.0);
        assert!(detect_day_columns(&lines, &tokens, 2.0, 3).is_none());
    }

    #[test]
    fn sunday_does_not_count_towards_the_threshold() {
        let tokens = vec![
            token(100.0, 800.0, "THU"),
            token(200.0, 800.0, "FRI"),
            token(300.0, 800.0, "SUN"),
        ];
        let lines = build_lines(&tokens, 2.0);
        assert!(detect_from_lines(&lines, 3).is_none());
        assert!(detect_day_columns(&lines, &tokens, 2.0, 3).is_none());

        let columns = detect_from_lines(&lines, 2).unwrap();
        let days: Vec<u8> = columns.iter().map(|c| c.day).collect();
        assert_eq!(days, vec![4, 5]);
    }

    #[test]
    fn token_scan_recovers_a_staggered_header() {
        // slightly different baselines split the header across lines at a
        // tight tolerance; a looser row bucket in the token scan rejoins it
        let tokens = vec![
            token(100.0, 800.0, "Mon"),
            token(200.0, 801.2, "Tue"),
            token(300.0, 800.4, "Wed"),
        ];
        let lines = build_lines(&tokens, 0.5);
        assert!(detect_from_lines(&lines, 3).is_none());

        let columns = detect_from_tokens(&tokens, 4.0, 3).unwrap();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].label, "MON");
    }

    #[test]
    fn nearest_column_wins() {
        let columns = vec![
            DayColumn { day: 1, label: "MON".into(), x: 100.0 },
            DayColumn { day: 2, label: "TUE".into(), x: 200.0 },
        ];
        assert_eq!(pick_day_by_x(&columns, 40.0), Some(1));
        assert_eq!(pick_day_by_x(&columns, 160.0), Some(2));
        assert_eq!(pick_day_by_x(&[], 160.0), None);
    }
}
