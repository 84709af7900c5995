//! Visual layout recovered from positioned tokens: lines and weekday columns.

pub mod columns;
pub mod lines;

pub use columns::{detect_day_columns, pick_day_by_x, DayColumn};
pub use lines::{build_lines, x_at, Line, LinePart};
