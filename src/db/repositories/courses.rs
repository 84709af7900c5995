use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{
        format_datetime, new_id, parse_component, parse_datetime, parse_delivery, weeks_from_json,
        weeks_to_json,
    },
    models::{ClassComponent, Course, CourseClass, CourseExam, DeliveryMode},
};

const CLASS_COLUMNS: &str = "id, course_id, semester_id, class_index, component, day_of_week,
    start_time, end_time, weeks_json, location, delivery";

/// Natural key of a `CourseClass` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSlotKey {
    pub semester_id: String,
    pub index: String,
    pub component: ClassComponent,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
}

/// A class the student is enrolled in, joined with its course.
#[derive(Debug, Clone)]
pub struct EnrolledClass {
    pub class: CourseClass,
    pub course_code: String,
    pub course_name: String,
}

fn row_to_course(row: &Row) -> Result<Course> {
    Ok(Course {
        id: row.get("id")?,
        code: row.get("code")?,
        name: row.get("name")?,
    })
}

fn row_to_class(row: &Row) -> Result<CourseClass> {
    let component: String = row.get("component")?;
    let delivery: String = row.get("delivery")?;
    let weeks_json: String = row.get("weeks_json")?;
    let day_of_week: i64 = row.get("day_of_week")?;

    Ok(CourseClass {
        id: row.get("id")?,
        course_id: row.get("course_id")?,
        semester_id: row.get("semester_id")?,
        index: row.get("class_index")?,
        component: parse_component(&component)?,
        day_of_week: u8::try_from(day_of_week)
            .map_err(|_| anyhow!("day_of_week {day_of_week} out of range"))?,
        start_time: row.get("start_time")?,
        end_time: row.get("end_time")?,
        weeks: weeks_from_json(&weeks_json)?,
        location: row.get("location")?,
        delivery: parse_delivery(&delivery)?,
    })
}

fn row_to_exam(row: &Row) -> Result<CourseExam> {
    let starts_at: String = row.get("starts_at")?;
    let ends_at: String = row.get("ends_at")?;

    Ok(CourseExam {
        id: row.get("id")?,
        course_id: row.get("course_id")?,
        semester_id: row.get("semester_id")?,
        starts_at: parse_datetime(&starts_at, "starts_at")?,
        ends_at: parse_datetime(&ends_at, "ends_at")?,
        location: row.get("location")?,
    })
}

pub(crate) fn find_course_by_code(conn: &Connection, code: &str) -> Result<Option<Course>> {
    let mut stmt = conn.prepare("SELECT id, code, name FROM courses WHERE code = ?1")?;
    let mut rows = stmt.query(params![code])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_course(row)?)),
        None => Ok(None),
    }
}

pub(crate) fn insert_course(conn: &Connection, code: &str, name: &str) -> Result<Course> {
    let id = new_id();
    conn.execute(
        "INSERT INTO courses (id, code, name) VALUES (?1, ?2, ?3)",
        params![id, code, name],
    )?;
    Ok(Course {
        id,
        code: code.to_string(),
        name: name.to_string(),
    })
}

pub(crate) fn rename_course(conn: &Connection, course_id: &str, name: &str) -> Result<()> {
    conn.execute(
        "UPDATE courses SET name = ?1 WHERE id = ?2",
        params![name, course_id],
    )?;
    Ok(())
}

pub(crate) fn find_class_by_key(conn: &Connection, key: &ClassSlotKey) -> Result<Option<CourseClass>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CLASS_COLUMNS}
         FROM course_classes
         WHERE semester_id = ?1
           AND class_index = ?2
           AND component = ?3
           AND day_of_week = ?4
           AND start_time = ?5
           AND end_time = ?6"
    ))?;
    let mut rows = stmt.query(params![
        key.semester_id,
        key.index,
        key.component.as_str(),
        key.day_of_week,
        key.start_time,
        key.end_time,
    ])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_class(row)?)),
        None => Ok(None),
    }
}

pub(crate) fn insert_class(
    conn: &Connection,
    key: &ClassSlotKey,
    course_id: &str,
    weeks: &[u32],
    location: Option<&str>,
    delivery: DeliveryMode,
) -> Result<CourseClass> {
    let id = new_id();
    conn.execute(
        "INSERT INTO course_classes (
            id,
            course_id,
            semester_id,
            class_index,
            component,
            day_of_week,
            start_time,
            end_time,
            weeks_json,
            location,
            delivery
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            id,
            course_id,
            key.semester_id,
            key.index,
            key.component.as_str(),
            key.day_of_week,
            key.start_time,
            key.end_time,
            weeks_to_json(weeks)?,
            location,
            delivery.as_str(),
        ],
    )?;

    Ok(CourseClass {
        id,
        course_id: course_id.to_string(),
        semester_id: key.semester_id.clone(),
        index: key.index.clone(),
        component: key.component,
        day_of_week: key.day_of_week,
        start_time: key.start_time.clone(),
        end_time: key.end_time.clone(),
        weeks: weeks.to_vec(),
        location: location.map(str::to_string),
        delivery,
    })
}

/// Rewrites the non-key attributes of an existing class row.
pub(crate) fn update_class(
    conn: &Connection,
    class_id: &str,
    course_id: &str,
    weeks: &[u32],
    location: Option<&str>,
    delivery: DeliveryMode,
) -> Result<()> {
    conn.execute(
        "UPDATE course_classes
         SET course_id = ?1,
             weeks_json = ?2,
             location = ?3,
             delivery = ?4
         WHERE id = ?5",
        params![
            course_id,
            weeks_to_json(weeks)?,
            location,
            delivery.as_str(),
            class_id,
        ],
    )?;
    Ok(())
}

/// Upserts an exam by `(course_id, semester_id, starts_at)`.
pub(crate) fn upsert_exam(
    conn: &Connection,
    course_id: &str,
    semester_id: &str,
    starts_at: &DateTime<Utc>,
    ends_at: &DateTime<Utc>,
    location: Option<&str>,
) -> Result<CourseExam> {
    let starts_text = format_datetime(starts_at);
    let existing_id: Option<String> = conn
        .query_row(
            "SELECT id FROM course_exams
             WHERE course_id = ?1 AND semester_id = ?2 AND starts_at = ?3",
            params![course_id, semester_id, starts_text],
            |row| row.get(0),
        )
        .optional()?;

    let id = match existing_id {
        Some(id) => {
            conn.execute(
                "UPDATE course_exams SET ends_at = ?1, location = ?2 WHERE id = ?3",
                params![format_datetime(ends_at), location, id],
            )?;
            id
        }
        None => {
            let id = new_id();
            conn.execute(
                "INSERT INTO course_exams (id, course_id, semester_id, starts_at, ends_at, location)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    course_id,
                    semester_id,
                    starts_text,
                    format_datetime(ends_at),
                    location,
                ],
            )?;
            id
        }
    };

    Ok(CourseExam {
        id,
        course_id: course_id.to_string(),
        semester_id: semester_id.to_string(),
        starts_at: *starts_at,
        ends_at: *ends_at,
        location: location.map(str::to_string),
    })
}

pub(crate) fn enroll(conn: &Connection, student_id: &str, class: &CourseClass) -> Result<()> {
    conn.execute(
        "INSERT INTO timetable_enrollments (student_id, class_id, course_id)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(student_id, class_id) DO UPDATE SET course_id = excluded.course_id",
        params![student_id, class.id, class.course_id],
    )?;
    Ok(())
}

pub(crate) fn list_enrolled_classes(
    conn: &Connection,
    student_id: &str,
    semester_id: &str,
) -> Result<Vec<EnrolledClass>> {
    let mut stmt = conn.prepare(
        "SELECT
            cc.id,
            cc.course_id,
            cc.semester_id,
            cc.class_index,
            cc.component,
            cc.day_of_week,
            cc.start_time,
            cc.end_time,
            cc.weeks_json,
            cc.location,
            cc.delivery,
            c.code AS course_code,
            c.name AS course_name
        FROM timetable_enrollments te
        JOIN course_classes cc ON cc.id = te.class_id
        JOIN courses c ON c.id = cc.course_id
        WHERE te.student_id = ?1 AND cc.semester_id = ?2
        ORDER BY c.code ASC, cc.day_of_week ASC, cc.start_time ASC, cc.class_index ASC",
    )?;

    let mut rows = stmt.query(params![student_id, semester_id])?;
    let mut classes = Vec::new();
    while let Some(row) = rows.next()? {
        classes.push(EnrolledClass {
            class: row_to_class(row)?,
            course_code: row.get("course_code")?,
            course_name: row.get("course_name")?,
        });
    }
    Ok(classes)
}

impl Database {
    pub async fn list_courses(&self) -> Result<Vec<Course>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare("SELECT id, code, name FROM courses ORDER BY code ASC")?;
            let mut rows = stmt.query([])?;
            let mut courses = Vec::new();
            while let Some(row) = rows.next()? {
                courses.push(row_to_course(row)?);
            }
            Ok(courses)
        })
        .await
    }

    pub async fn get_course_by_code(&self, code: &str) -> Result<Option<Course>> {
        let code = code.to_string();
        self.execute(move |conn| find_course_by_code(conn, &code))
            .await
    }

    /// All classes of a semester, ordered by slot.
    pub async fn list_classes_for_semester(&self, semester_id: &str) -> Result<Vec<CourseClass>> {
        let semester_id = semester_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CLASS_COLUMNS}
                 FROM course_classes
                 WHERE semester_id = ?1
                 ORDER BY day_of_week ASC, start_time ASC, class_index ASC"
            ))?;
            let mut rows = stmt.query(params![semester_id])?;
            let mut classes = Vec::new();
            while let Some(row) = rows.next()? {
                classes.push(row_to_class(row)?);
            }
            Ok(classes)
        })
        .await
    }

    pub async fn list_exams_for_semester(&self, semester_id: &str) -> Result<Vec<CourseExam>> {
        let semester_id = semester_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, course_id, semester_id, starts_at, ends_at, location
                 FROM course_exams
                 WHERE semester_id = ?1
                 ORDER BY starts_at ASC",
            )?;
            let mut rows = stmt.query(params![semester_id])?;
            let mut exams = Vec::new();
            while let Some(row) = rows.next()? {
                exams.push(row_to_exam(row)?);
            }
            Ok(exams)
        })
        .await
    }

    pub async fn list_enrolled_classes(
        &self,
        student_id: &str,
        semester_id: &str,
    ) -> Result<Vec<EnrolledClass>> {
        let student_id = student_id.to_string();
        let semester_id = semester_id.to_string();
        self.execute(move |conn| list_enrolled_classes(conn, &student_id, &semester_id))
            .await
    }
}
