//! Timetable parsing: layout-aware block grammar, anchor fallback, weekday
//! resolution, normalization and materialization.

pub mod anchors;
pub mod course_table;
pub mod grammar;
pub mod materialize;
pub mod normalize;
pub mod resolver;
pub mod weeks;

pub use anchors::{parse_by_anchors, FallbackResult};
pub use grammar::{parse_structured, ParsedClass, StructuredResult};
pub use materialize::{variant_suffix, MaterializeReport, SchemaUpsertReport};
pub use normalize::{
    normalize, NormalizeOptions, NormalizedClass, NormalizedCourse, NormalizedExam,
    NormalizedTimetable, ParseStrategy, ParserOutput,
};
pub use weeks::expand_weeks;

use crate::extract::ExtractedDocument;
use crate::layout::{build_lines, detect_day_columns};
use crate::settings::IngestSettings;
use crate::{log_debug, log_info};

const ENABLE_LOGS: bool = true;

/// Picks the first strategy that yields classes: the structured grammar over
/// reconstructed lines, then the anchor grammar over plain text.
pub fn run_grammars(document: &ExtractedDocument, settings: &IngestSettings) -> ParserOutput {
    let lines = build_lines(&document.tokens, settings.line_y_tolerance);
    let columns = detect_day_columns(
        &lines,
        &document.tokens,
        settings.line_y_tolerance,
        settings.min_day_columns,
    )
    .unwrap_or_default();
    log_debug!(
        "Reconstructed {} lines, {} day columns",
        lines.len(),
        columns.len()
    );

    let structured = parse_structured(&lines, &columns);
    if !structured.classes.is_empty() {
        return ParserOutput::Structured(structured);
    }

    ParserOutput::Fallback(parse_by_anchors(&document.text))
}

/// Full parse of one timetable document into its canonical form.
pub fn parse_timetable(document: &ExtractedDocument, settings: &IngestSettings) -> NormalizedTimetable {
    let output = run_grammars(document, settings);
    log_info!(
        "Timetable strategy {} produced {} classes",
        output.strategy().as_str(),
        output.class_count()
    );

    let mut timetable = normalize(
        output,
        NormalizeOptions {
            default_day_of_week: settings.default_day_of_week,
            resolve_weekdays: settings.resolve_weekdays,
        },
    );

    if course_table::has_course_table(&document.text) {
        let rows = course_table::extract_course_table(&document.text);
        if !rows.is_empty() {
            log_debug!("Course table supplied {} rows", rows.len());
            course_table::merge_course_meta(&mut timetable, rows);
        }
    }

    timetable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_document;

    fn no_resolver() -> IngestSettings {
        IngestSettings {
            resolve_weekdays: false,
            ..IngestSettings::default()
        }
    }

    #[test]
    fn column_layout_uses_structured_strategy() {
        let text = [
            "MON                     TUE                     WED",
            "SC2006 LEC SCL2 LT19A                           MH1810 TUT T2 TR+5",
            "0830to0920-                                     1130to1220-",
            "Wk1-13;                                         Wk2-13;",
        ]
        .join("\n");
        let doc = extract_document(text.as_bytes(), "text/plain").unwrap();
        let timetable = parse_timetable(&doc, &IngestSettings::default());

        assert_eq!(timetable.strategy, ParseStrategy::Structured);
        assert_eq!(timetable.day_columns, 3);
        assert!(!timetable.weekdays_resolved);
        let days: Vec<u8> = timetable.classes.iter().map(|c| c.day_of_week).collect();
        assert_eq!(days, vec![1, 3]);
    }

    #[test]
    fn flat_text_without_blocks_falls_back_to_anchors() {
        let doc = extract_document(
            b"Course SC2006 LEC SCL2 LT19A 0830to0920- Wk1-9,11-13; trailing notes",
            "text/plain",
        )
        .unwrap();
        // one visual line, so the structured grammar also sees the inline row
        let timetable = parse_timetable(&doc, &no_resolver());
        assert_eq!(timetable.classes.len(), 1);
        assert_eq!(timetable.classes[0].weeks.len(), 12);

        let empty_layout = ExtractedDocument {
            tokens: Vec::new(),
            ..doc
        };
        let timetable = parse_timetable(&empty_layout, &no_resolver());
        assert_eq!(timetable.strategy, ParseStrategy::AnchorFallback);
        assert_eq!(timetable.classes[0].day_of_week, 1);
    }

    #[test]
    fn course_table_enriches_names() {
        let text = "SC2006 LEC SCL2 LT19A\n0830to0920-\nWk1-13;\n\
                    Index Course Title AU Status Exam\n\
                    10234 SC2006 SOFTWARE ENGINEERING 3 Registered Not Applicable";
        let doc = extract_document(text.as_bytes(), "text/plain").unwrap();
        let timetable = parse_timetable(&doc, &no_resolver());
        assert_eq!(timetable.courses.len(), 1);
        assert_eq!(timetable.courses[0].name, "SOFTWARE ENGINEERING");
    }
}
