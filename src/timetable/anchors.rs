//! Fallback grammar for flat text: course codes act as anchors and every
//! inline class row between two anchors belongs to the first one.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use super::grammar::{class_from_inline, ParsedClass, INLINE_CLASS_RE};

lazy_static! {
    static ref CODE_ANCHOR_RE: Regex = Regex::new(r"\b([A-Z]{2}\d{4})\b").unwrap();
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackResult {
    pub classes: Vec<ParsedClass>,
}

/// Flat text carries no coordinates, so every class comes back without a
/// weekday.
pub fn parse_by_anchors(text: &str) -> FallbackResult {
    let anchors: Vec<(usize, &str)> = CODE_ANCHOR_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let m = caps.get(1)?;
            Some((m.start(), m.as_str()))
        })
        .collect();

    let mut classes = Vec::new();
    for (i, (start, code)) in anchors.iter().enumerate() {
        let end = anchors.get(i + 1).map_or(text.len(), |(next, _)| *next);
        let block = &text[*start..end];

        for caps in INLINE_CLASS_RE.captures_iter(block) {
            if let Some(mut class) = class_from_inline(&caps, Some(code), None) {
                class.course_code = code.to_string();
                classes.push(class);
            }
        }
    }

    FallbackResult { classes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{ClassComponent, DeliveryMode};

    #[test]
    fn three_line_block_is_read_as_flat_text() {
        let result = parse_by_anchors("SC2006 LEC SCL2 LT19A\n0830to0920-\nWk1-9,11-13;");
        assert_eq!(result.classes.len(), 1);
        let class = &result.classes[0];
        assert_eq!(class.course_code, "SC2006");
        assert_eq!(class.location.as_deref(), Some("LT19A"));
        assert_eq!(class.day_of_week, None);
        assert_eq!(class.weeks.len(), 12);
    }

    #[test]
    fn rows_attach_to_their_anchor() {
        let text = "SC2005 Operating Systems\n\
                    LEC/STU SCL1 LT2A 1430to1620- Wk1-13;\n\
                    TUT T3 ONLINE 1030to1120- Wk2-13;\n\
                    SC2006 Software Engineering\n\
                    LAB SCL2 SWLAB3 0830to1020- Wk3,5,7;";
        let result = parse_by_anchors(text);

        let codes: Vec<&str> = result.classes.iter().map(|c| c.course_code.as_str()).collect();
        assert_eq!(codes, vec!["SC2005", "SC2005", "SC2006"]);
        assert_eq!(result.classes[1].component, ClassComponent::Tut);
        assert_eq!(result.classes[1].delivery, DeliveryMode::Online);
        assert_eq!(result.classes[1].location, None);
        assert_eq!(result.classes[2].weeks, vec![3, 5, 7]);
    }

    #[test]
    fn text_without_rows_yields_nothing() {
        assert!(parse_by_anchors("SC2006 Software Engineering 3 AU").classes.is_empty());
    }
}
