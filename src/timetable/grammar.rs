//! Structured class-block grammar over reconstructed lines.
//!
//! A block is a header line (`CODE COMPONENT GROUP VENUE`), a time line and
//! one or more week lines. Planner exports also put a whole class on one row
//! (`CODE COMPONENT GROUP VENUE HHMMtoHHMM- WkRANGES;`); those are taken as-is.
//! When weekday columns are known every cell keeps its own block state, so
//! blocks that share a visual row do not interfere.

use std::collections::HashMap;
use std::ops::Range;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::weeks::{expand_weeks, hhmm_to_clock};
use crate::db::models::{ClassComponent, DeliveryMode};
use crate::layout::{pick_day_by_x, x_at, DayColumn, Line};

lazy_static! {
    pub(crate) static ref INLINE_CLASS_RE: Regex = Regex::new(
        r"(?:\b([A-Z]{2}\d{4})\s+)?\b(LEC/STU|LEC|TUT|LAB|SEM)\s+([A-Z0-9+/-]+)\s+(.+?)\s+(\d{3,4})\s*to\s*(\d{3,4})\s*-+\s*Wk\s*(\d+(?:\s*[-,]\s*\d+)*)\s*;?"
    )
    .unwrap();
    static ref HEADER_RE: Regex =
        Regex::new(r"\b([A-Z]{2,}\d{4,})\s+([A-Z]{3})/?[A-Z]*\s+(\S+)\s+(\S+)").unwrap();
    static ref TIME_RE: Regex =
        Regex::new(r"(?i)\b(\d{3,4}|\d{2}:\d{2})\s*(?:to|-)\s*(\d{3,4}|\d{2}:\d{2})").unwrap();
    static ref WEEK_RE: Regex =
        Regex::new(r"(?i)\b(?:Wk|Week)\s*(\d+(?:\s*[-,]\s*\d+)*)\s*;?").unwrap();
}

/// One class session as read from the document, before persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedClass {
    pub course_code: String,
    pub component: ClassComponent,
    pub group_index: String,
    pub location: Option<String>,
    pub delivery: DeliveryMode,
    /// `None` when no weekday column could be attributed.
    pub day_of_week: Option<u8>,
    pub start_time: String,
    pub end_time: String,
    pub weeks: Vec<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredResult {
    pub classes: Vec<ParsedClass>,
    pub day_columns: Vec<DayColumn>,
}

/// Location and delivery mode of a venue cell. An "ONLINE" venue is not a
/// place.
pub(crate) fn venue_fields(venue: &str) -> (Option<String>, DeliveryMode) {
    let venue = venue.trim();
    match DeliveryMode::from_venue(venue) {
        DeliveryMode::Online => (None, DeliveryMode::Online),
        mode if venue.is_empty() => (None, mode),
        mode => (Some(venue.to_string()), mode),
    }
}

/// Builds a class from an inline-row match. `fallback_code` is used when the
/// row omits the course code.
pub(crate) fn class_from_inline(
    caps: &Captures,
    fallback_code: Option<&str>,
    day_of_week: Option<u8>,
) -> Option<ParsedClass> {
    let course_code = caps
        .get(1)
        .map(|m| m.as_str())
        .or(fallback_code)?
        .to_string();
    let start_time = hhmm_to_clock(&caps[5])?;
    let end_time = hhmm_to_clock(&caps[6])?;
    let (location, delivery) = venue_fields(&caps[4]);

    Some(ParsedClass {
        course_code,
        component: ClassComponent::from_label(&caps[2]),
        group_index: caps[3].to_string(),
        location,
        delivery,
        day_of_week,
        start_time,
        end_time,
        weeks: expand_weeks(&caps[7]),
    })
}

#[derive(Debug, Clone)]
struct Header {
    code: String,
    component: String,
    group: String,
    venue: String,
}

#[derive(Debug, Default)]
struct CellState {
    pending: Option<Header>,
    last_time: Option<(String, String)>,
}

#[derive(Debug)]
enum LineEvent {
    Inline(ParsedClass, Option<String>),
    Header(Header),
    Time(String, String),
    Week(Vec<u32>),
}

fn mask(text: &mut String, range: Range<usize>) {
    let blanks = " ".repeat(range.len());
    text.replace_range(range, &blanks);
}

/// Recognized fragments of one line, in reading order, each tagged with the
/// byte offset it starts at. Earlier patterns claim their text first.
fn scan_line(text: &str) -> Vec<(usize, LineEvent)> {
    let mut events = Vec::new();
    let mut rest = text.to_string();

    let inline: Vec<(Range<usize>, Option<ParsedClass>, Option<String>)> = INLINE_CLASS_RE
        .captures_iter(&rest)
        .map(|caps| {
            let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
            let explicit = caps.get(1).map(|m| m.as_str().to_string());
            // code-less rows borrow the cell's pending header code later
            let class = class_from_inline(&caps, Some(""), None);
            (whole, class, explicit)
        })
        .collect();
    for (range, class, explicit) in inline {
        if let Some(class) = class {
            events.push((range.start, LineEvent::Inline(class, explicit)));
        }
        mask(&mut rest, range);
    }

    let headers: Vec<(Range<usize>, Header)> = HEADER_RE
        .captures_iter(&rest)
        .filter_map(|caps| {
            Some((
                caps.get(0)?.range(),
                Header {
                    code: caps[1].to_string(),
                    component: caps[2].to_string(),
                    group: caps[3].to_string(),
                    venue: caps[4].to_string(),
                },
            ))
        })
        .collect();
    for (range, header) in headers {
        events.push((range.start, LineEvent::Header(header)));
        mask(&mut rest, range);
    }

    let weeks: Vec<(Range<usize>, Vec<u32>)> = WEEK_RE
        .captures_iter(&rest)
        .filter_map(|caps| Some((caps.get(0)?.range(), expand_weeks(&caps[1]))))
        .collect();
    for (range, spec) in weeks {
        events.push((range.start, LineEvent::Week(spec)));
        mask(&mut rest, range);
    }

    for caps in TIME_RE.captures_iter(&rest) {
        let (Some(whole), Some(start), Some(end)) = (
            caps.get(0),
            hhmm_to_clock(&caps[1]),
            hhmm_to_clock(&caps[2]),
        ) else {
            continue;
        };
        events.push((whole.start(), LineEvent::Time(start, end)));
    }

    events.sort_by_key(|(offset, _)| *offset);
    events
}

/// Runs the block grammar over `lines`. With `day_columns` each fragment is
/// assigned to the nearest column by its x-offset; without, every class is
/// left without a weekday.
pub fn parse_structured(lines: &[Line], day_columns: &[DayColumn]) -> StructuredResult {
    let mut cells: HashMap<u8, CellState> = HashMap::new();
    let mut classes = Vec::new();

    for line in lines {
        for (offset, event) in scan_line(&line.text) {
            let day = if day_columns.is_empty() {
                None
            } else {
                pick_day_by_x(day_columns, x_at(line, offset))
            };
            let cell = cells.entry(day.unwrap_or(0)).or_default();

            match event {
                LineEvent::Inline(mut class, explicit_code) => {
                    if explicit_code.is_none() {
                        match &cell.pending {
                            Some(header) => class.course_code = header.code.clone(),
                            None => continue,
                        }
                    }
                    class.day_of_week = day;
                    classes.push(class);
                }
                LineEvent::Header(header) => {
                    cell.pending = Some(header);
                    cell.last_time = None;
                }
                LineEvent::Time(start, end) => {
                    cell.last_time = Some((start, end));
                }
                LineEvent::Week(weeks) => {
                    let Some(header) = &cell.pending else {
                        continue;
                    };
                    let Some((start, end)) = cell.last_time.take() else {
                        continue;
                    };
                    let (location, delivery) = venue_fields(&header.venue);
                    classes.push(ParsedClass {
                        course_code: header.code.clone(),
                        component: ClassComponent::from_label(&header.component),
                        group_index: header.group.clone(),
                        location,
                        delivery,
                        day_of_week: day,
                        start_time: start,
                        end_time: end,
                        weeks,
                    });
                }
            }
        }
    }

    StructuredResult {
        classes,
        day_columns: day_columns.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::tokens_from_text;
    use crate::layout::{build_lines, detect_day_columns};

    fn lines_of(text: &str) -> Vec<Line> {
        build_lines(&tokens_from_text(text), 2.0)
    }

    #[test]
    fn three_line_block_without_columns() {
        let lines = lines_of("SC2006 LEC SCL2 LT19A\n0830to0920-\nWk1-9,11-13;");
        let result = parse_structured(&lines, &[]);

        assert_eq!(result.classes.len(), 1);
        let class = &result.classes[0];
        assert_eq!(class.course_code, "SC2006");
        assert_eq!(class.component, ClassComponent::Lec);
        assert_eq!(class.group_index, "SCL2");
        assert_eq!(class.location.as_deref(), Some("LT19A"));
        assert_eq!(class.delivery, DeliveryMode::Physical);
        assert_eq!(class.day_of_week, None);
        assert_eq!((class.start_time.as_str(), class.end_time.as_str()), ("08:30", "09:20"));
        assert_eq!(class.weeks, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 11, 12, 13]);
    }

    #[test]
    fn header_survives_multiple_time_and_week_pairs() {
        let lines = lines_of(
            "SC2005 TUT T3 ONLINE\n1030to1120-\nWk2-4;\n1330to1420-\nWk5-7;\nWk8;",
        );
        let result = parse_structured(&lines, &[]);

        assert_eq!(result.classes.len(), 2);
        assert_eq!(result.classes[0].weeks, vec![2, 3, 4]);
        assert_eq!(result.classes[1].start_time, "13:30");
        assert_eq!(result.classes[1].delivery, DeliveryMode::Online);
        assert_eq!(result.classes[1].location, None);
    }

    #[test]
    fn week_without_time_emits_nothing() {
        let lines = lines_of("SC2006 LEC SCL2 LT19A\nWk1-13;");
        assert!(parse_structured(&lines, &[]).classes.is_empty());
    }

    #[test]
    fn cells_on_one_row_follow_their_columns() {
        let text = [
            "MON                     TUE                     WED",
            "SC2006 LEC SCL2 LT19A   CZ2001 TUT T1 TR+12",
            "0830to0920-             1030to1120-",
            "Wk1-13;                 Wk2-13;",
        ]
        .join("\n");
        let tokens = tokens_from_text(&text);
        let lines = build_lines(&tokens, 2.0);
        let columns = detect_day_columns(&lines, &tokens, 2.0, 3).unwrap();

        let result = parse_structured(&lines, &columns);
        assert_eq!(result.classes.len(), 2);

        let lec = result.classes.iter().find(|c| c.course_code == "SC2006").unwrap();
        let tut = result.classes.iter().find(|c| c.course_code == "CZ2001").unwrap();
        assert_eq!(lec.day_of_week, Some(1));
        assert_eq!(lec.start_time, "08:30");
        assert_eq!(tut.day_of_week, Some(2));
        assert_eq!(tut.start_time, "10:30");
        assert_eq!(tut.weeks.first(), Some(&2));
    }

    #[test]
    fn inline_rows_are_taken_directly() {
        let lines = lines_of("SC2006 LEC/STU SCL2 LT19A 0830to0920- Wk1-9,11-13;");
        let result = parse_structured(&lines, &[]);
        assert_eq!(result.classes.len(), 1);
        assert_eq!(result.classes[0].component, ClassComponent::Lec);
        assert_eq!(result.classes[0].weeks.len(), 12);
    }
}
