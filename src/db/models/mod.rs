pub mod academic;
pub mod calendar;
pub mod course;
pub mod file;
pub mod semester;

pub use academic::{AcademicCalEvent, AcademicKind};
pub use calendar::{CalendarEvent, EventSource, UnifiedCalendarEntry};
pub use course::{ClassComponent, Course, CourseClass, CourseExam, DeliveryMode};
pub use file::{FileKind, IngestedFile};
pub use semester::{Semester, SemesterInput, Student};
