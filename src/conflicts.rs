//! Overlap detection between calendar events.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::models::CalendarEvent;

/// The time window of one event, as seen by the detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventWindow {
    pub id: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl From<&CalendarEvent> for EventWindow {
    fn from(event: &CalendarEvent) -> Self {
        Self {
            id: event.id.clone(),
            starts_at: event.starts_at,
            ends_at: event.ends_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    /// The earlier-starting event.
    pub a_id: String,
    pub b_id: String,
    pub overlap_ms: i64,
}

/// Every pair of overlapping windows. Windows are half-open, so back-to-back
/// events do not conflict.
pub fn detect_conflicts(windows: &[EventWindow]) -> Vec<Conflict> {
    let mut sorted: Vec<&EventWindow> = windows.iter().collect();
    sorted.sort_by_key(|window| window.starts_at);

    let mut conflicts = Vec::new();
    for (idx, current) in sorted.iter().enumerate() {
        for next in &sorted[idx + 1..] {
            // Sorted by start: nothing later can overlap `current` either.
            if next.starts_at >= current.ends_at {
                break;
            }
            let overlap_start = current.starts_at.max(next.starts_at);
            let overlap_end = current.ends_at.min(next.ends_at);
            let overlap_ms = (overlap_end - overlap_start).num_milliseconds();
            if overlap_ms > 0 {
                conflicts.push(Conflict {
                    a_id: current.id.clone(),
                    b_id: next.id.clone(),
                    overlap_ms,
                });
            }
        }
    }

    conflicts
}
