//! Folds every parser output shape into one canonical timetable.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::anchors::FallbackResult;
use super::grammar::{venue_fields, ParsedClass, StructuredResult};
use super::resolver::{needs_resolution, resolve_weekdays};
use super::weeks::{expand_weeks, hhmm_to_clock, is_valid_week};
use crate::db::models::{ClassComponent, DeliveryMode};
use crate::log_info;

const ENABLE_LOGS: bool = true;

const DEFAULT_START: &str = "08:30";
const DEFAULT_END: &str = "09:20";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParseStrategy {
    Structured,
    AnchorFallback,
    External,
}

impl ParseStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseStrategy::Structured => "STRUCTURED",
            ParseStrategy::AnchorFallback => "ANCHOR_FALLBACK",
            ParseStrategy::External => "EXTERNAL",
        }
    }
}

/// Week list as external parsers send it: an array, a compact spec string,
/// or an object wrapping the array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExternalWeeks {
    List(Vec<u32>),
    Spec(String),
    Wrapped { weeks: Vec<u32> },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalCourse {
    pub code: String,
    #[serde(default, alias = "title")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalClass {
    #[serde(default, alias = "code")]
    pub course_code: Option<String>,
    #[serde(default, alias = "type")]
    pub component: Option<String>,
    #[serde(default, alias = "index", alias = "group")]
    pub group_index: Option<String>,
    #[serde(default, alias = "day")]
    pub day_of_week: Option<u8>,
    #[serde(default, alias = "start")]
    pub start_time: Option<String>,
    #[serde(default, alias = "end")]
    pub end_time: Option<String>,
    #[serde(default, alias = "weekSpec")]
    pub weeks: Option<ExternalWeeks>,
    #[serde(default, alias = "venue")]
    pub location: Option<String>,
    #[serde(default)]
    pub delivery: Option<String>,
}

/// Output of a parser outside this crate, deserialized leniently.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalTimetable {
    #[serde(default)]
    pub courses: Vec<ExternalCourse>,
    #[serde(default)]
    pub classes: Vec<ExternalClass>,
}

/// Every shape a timetable parser can hand to the normalizer.
#[derive(Debug, Clone)]
pub enum ParserOutput {
    Structured(StructuredResult),
    Fallback(FallbackResult),
    External(ExternalTimetable),
}

impl ParserOutput {
    pub fn strategy(&self) -> ParseStrategy {
        match self {
            ParserOutput::Structured(_) => ParseStrategy::Structured,
            ParserOutput::Fallback(_) => ParseStrategy::AnchorFallback,
            ParserOutput::External(_) => ParseStrategy::External,
        }
    }

    pub fn class_count(&self) -> usize {
        match self {
            ParserOutput::Structured(result) => result.classes.len(),
            ParserOutput::Fallback(result) => result.classes.len(),
            ParserOutput::External(result) => result.classes.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedExam {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedCourse {
    pub code: String,
    /// Equals `code` until a course table supplies the real title.
    pub name: String,
    pub exam: Option<NormalizedExam>,
}

impl NormalizedCourse {
    pub fn has_placeholder_name(&self) -> bool {
        self.name.trim().is_empty() || self.name == self.code
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedClass {
    pub course_code: String,
    pub index: String,
    pub component: ClassComponent,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    pub weeks: Vec<u32>,
    pub location: Option<String>,
    pub delivery: DeliveryMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTimetable {
    pub strategy: ParseStrategy,
    pub courses: Vec<NormalizedCourse>,
    pub classes: Vec<NormalizedClass>,
    pub day_columns: usize,
    pub weekdays_resolved: bool,
    pub forced_clashes: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    pub default_day_of_week: u8,
    pub resolve_weekdays: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            default_day_of_week: 1,
            resolve_weekdays: true,
        }
    }
}

fn delivery_from_label(raw: &str) -> DeliveryMode {
    let upper = raw.trim().to_ascii_uppercase();
    if upper.contains("HYBRID") {
        DeliveryMode::Hybrid
    } else if upper.contains("ONLINE") {
        DeliveryMode::Online
    } else {
        DeliveryMode::Physical
    }
}

fn external_class(raw: ExternalClass) -> Option<ParsedClass> {
    let course_code = raw.course_code?.trim().to_string();
    if course_code.is_empty() {
        return None;
    }

    let (mut location, venue_delivery) = venue_fields(raw.location.as_deref().unwrap_or(""));
    let delivery = match raw.delivery.as_deref() {
        Some(label) => delivery_from_label(label),
        None => venue_delivery,
    };
    if delivery == DeliveryMode::Online && location.as_deref() == Some("ONLINE") {
        location = None;
    }

    let weeks = match raw.weeks {
        Some(ExternalWeeks::List(mut weeks)) | Some(ExternalWeeks::Wrapped { mut weeks }) => {
            weeks.retain(|w| is_valid_week(*w));
            weeks.sort_unstable();
            weeks.dedup();
            weeks
        }
        Some(ExternalWeeks::Spec(spec)) => {
            expand_weeks(spec.trim_start_matches(|c: char| c.is_ascii_alphabetic()))
        }
        None => Vec::new(),
    };

    Some(ParsedClass {
        course_code,
        component: raw
            .component
            .as_deref()
            .map(ClassComponent::from_label)
            .unwrap_or_default(),
        group_index: raw
            .group_index
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| "1".to_string()),
        location,
        delivery,
        day_of_week: raw.day_of_week.filter(|d| (1..=7).contains(d)),
        start_time: raw
            .start_time
            .as_deref()
            .and_then(hhmm_to_clock)
            .unwrap_or_else(|| DEFAULT_START.to_string()),
        end_time: raw
            .end_time
            .as_deref()
            .and_then(hhmm_to_clock)
            .unwrap_or_else(|| DEFAULT_END.to_string()),
        weeks,
    })
}

/// Canonical `{courses, classes}` from any parser output.
///
/// Classes without a weekday go through the weekday resolver when enabled;
/// whatever is still missing gets `default_day_of_week`. Courses come from
/// the explicit list when there is one, plus every code a class references,
/// named by their code until enriched.
pub fn normalize(output: ParserOutput, options: NormalizeOptions) -> NormalizedTimetable {
    let strategy = output.strategy();
    let (mut classes, hints, day_columns) = match output {
        ParserOutput::Structured(result) => (result.classes, Vec::new(), result.day_columns.len()),
        ParserOutput::Fallback(result) => (result.classes, Vec::new(), 0),
        ParserOutput::External(result) => {
            let hints: Vec<(String, Option<String>)> = result
                .courses
                .into_iter()
                .map(|c| (c.code.trim().to_string(), c.name))
                .collect();
            let classes = result.classes.into_iter().filter_map(external_class).collect();
            (classes, hints, 0)
        }
    };

    let mut report = None;
    if options.resolve_weekdays && needs_resolution(&classes) {
        report = Some(resolve_weekdays(&mut classes));
    }
    let forced_clashes = report.map_or(0, |r| r.forced_clashes);
    if let Some(report) = report {
        log_info!(
            "Weekday resolver placed {} class groups ({} forced clashes)",
            report.groups,
            report.forced_clashes
        );
    }

    let mut seen = HashSet::new();
    let mut courses = Vec::new();
    let referenced = classes.iter().map(|c| (c.course_code.clone(), None));
    for (code, name) in hints.into_iter().chain(referenced) {
        if code.is_empty() || !seen.insert(code.clone()) {
            continue;
        }
        let name = name
            .map(|n| n.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| code.clone());
        courses.push(NormalizedCourse {
            code,
            name,
            exam: None,
        });
    }

    let classes = classes
        .into_iter()
        .map(|c| NormalizedClass {
            course_code: c.course_code,
            index: c.group_index,
            component: c.component,
            day_of_week: c.day_of_week.unwrap_or(options.default_day_of_week),
            start_time: c.start_time,
            end_time: c.end_time,
            weeks: c.weeks,
            location: c.location,
            delivery: c.delivery,
        })
        .collect();

    NormalizedTimetable {
        strategy,
        courses,
        classes,
        day_columns,
        weekdays_resolved: report.is_some(),
        forced_clashes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timetable::anchors::parse_by_anchors;

    #[test]
    fn fallback_output_gets_placeholder_courses_and_default_day() {
        let fallback = parse_by_anchors("SC2006 LEC SCL2 LT19A\n0830to0920-\nWk1-9,11-13;");
        let normalized = normalize(
            ParserOutput::Fallback(fallback),
            NormalizeOptions {
                default_day_of_week: 1,
                resolve_weekdays: false,
            },
        );

        assert_eq!(normalized.strategy, ParseStrategy::AnchorFallback);
        assert_eq!(normalized.courses.len(), 1);
        assert_eq!(normalized.courses[0].name, "SC2006");
        assert!(normalized.courses[0].has_placeholder_name());
        assert_eq!(normalized.classes[0].day_of_week, 1);
        assert!(!normalized.weekdays_resolved);
    }

    #[test]
    fn missing_days_trigger_the_resolver() {
        let fallback = parse_by_anchors(
            "SC2006 LEC SCL2 LT19A 0830to0920- Wk1-13;\nSC2005 TUT T3 TR+5 0830to0920- Wk2-13;",
        );
        let normalized = normalize(ParserOutput::Fallback(fallback), NormalizeOptions::default());
        assert!(normalized.weekdays_resolved);
        assert_eq!(normalized.classes.len(), 2);
        assert!(normalized
            .classes
            .iter()
            .all(|c| (1..=6).contains(&c.day_of_week)));
        // same start time, so the two groups end up on different days
        assert_ne!(
            normalized.classes[0].day_of_week,
            normalized.classes[1].day_of_week
        );
    }

    #[test]
    fn external_shapes_are_defaulted() {
        let raw = serde_json::json!({
            "courses": [{ "code": "SC2006", "title": "Software   Engineering" }],
            "classes": [
                { "code": "SC2006", "type": "Lecture", "index": "SCL2", "day": 2,
                  "start": "0830", "end": "09:20", "weekSpec": "Wk1-3", "venue": "LT19A" },
                { "courseCode": "MH1810", "weeks": { "weeks": [3, 1, 3] }, "venue": "ONLINE" },
                { "component": "LAB" }
            ]
        });
        let external: ExternalTimetable = serde_json::from_value(raw).unwrap();
        let normalized = normalize(
            ParserOutput::External(external),
            NormalizeOptions {
                default_day_of_week: 1,
                resolve_weekdays: false,
            },
        );

        assert_eq!(normalized.strategy, ParseStrategy::External);
        assert_eq!(normalized.classes.len(), 2);
        assert_eq!(normalized.courses[0].name, "Software Engineering");
        assert_eq!(normalized.courses[1].code, "MH1810");

        let lec = &normalized.classes[0];
        assert_eq!(lec.component, ClassComponent::Lec);
        assert_eq!(lec.day_of_week, 2);
        assert_eq!(lec.start_time, "08:30");
        assert_eq!(lec.weeks, vec![1, 2, 3]);

        let other = &normalized.classes[1];
        assert_eq!(other.component, ClassComponent::Other);
        assert_eq!(other.delivery, DeliveryMode::Online);
        assert_eq!(other.location, None);
        assert_eq!(other.index, "1");
        assert_eq!(other.weeks, vec![1, 3]);
        assert_eq!((other.start_time.as_str(), other.end_time.as_str()), (DEFAULT_START, DEFAULT_END));
    }
}
