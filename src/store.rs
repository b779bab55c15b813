//! Student and course persistence on top of the workspace connection.
//!
//! Every function takes the connection explicitly; callers that need several
//! operations to land together pass a `Transaction` (it derefs to `Connection`).

use crate::calc::SummaryRow;
use crate::error::{GpaError, GpaResult};
use crate::grades::{self, CourseDraft};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub index_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermCourse {
    pub id: String,
    pub course_name: String,
    pub grade: String,
    pub credits: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub year: String,
    pub semester: String,
    pub course_name: String,
    pub grade: String,
    pub credits: f64,
}

/// Unvalidated course line as typed into the term editor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseInput {
    pub course_name: String,
    pub grade: String,
    pub credits: String,
}

impl CourseInput {
    pub fn is_blank(&self) -> bool {
        self.course_name.trim().is_empty() && self.credits.trim().is_empty()
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn require_identity(name: &str, index_number: &str) -> GpaResult<(String, String)> {
    let name = name.trim();
    let index_number = index_number.trim();
    if name.is_empty() || index_number.is_empty() {
        return Err(GpaError::Validation(
            "both name and index number are required".to_string(),
        ));
    }
    Ok((name.to_string(), index_number.to_string()))
}

pub fn add_student(conn: &Connection, name: &str, index_number: &str) -> GpaResult<String> {
    let (name, index_number) = require_identity(name, index_number)?;
    let id = Uuid::new_v4().to_string();
    let ts = now();
    conn.execute(
        "INSERT INTO students(id, name, index_number, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?)",
        (&id, &name, &index_number, &ts, &ts),
    )?;
    tracing::info!(student_id = %id, %index_number, "student added");
    Ok(id)
}

pub fn get_student(conn: &Connection, student_id: &str) -> GpaResult<Student> {
    conn.query_row(
        "SELECT id, name, index_number FROM students WHERE id = ?",
        [student_id],
        |r| {
            Ok(Student {
                id: r.get(0)?,
                name: r.get(1)?,
                index_number: r.get(2)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| GpaError::NotFound("student not found".to_string()))
}

/// Returns whether anything changed.
pub fn update_student(
    conn: &Connection,
    student_id: &str,
    new_name: &str,
    new_index_number: &str,
) -> GpaResult<bool> {
    let current = get_student(conn, student_id)?;
    let (name, index_number) = require_identity(new_name, new_index_number)?;
    if current.name == name && current.index_number == index_number {
        return Ok(false);
    }

    let clash: Option<String> = conn
        .query_row(
            "SELECT id FROM students WHERE index_number = ? AND id <> ?",
            (&index_number, student_id),
            |r| r.get(0),
        )
        .optional()?;
    if clash.is_some() {
        return Err(GpaError::DuplicateKey(format!(
            "index number '{index_number}' belongs to another student"
        )));
    }

    conn.execute(
        "UPDATE students SET name = ?, index_number = ?, updated_at = ? WHERE id = ?",
        (&name, &index_number, now(), student_id),
    )?;
    tracing::info!(%student_id, %index_number, "student updated");
    Ok(true)
}

/// Deletes the student and every course it owns. Returns the number of courses removed.
pub fn delete_student(conn: &Connection, student_id: &str) -> GpaResult<usize> {
    get_student(conn, student_id)?;

    let tx = conn.unchecked_transaction()?;
    let courses = tx.execute("DELETE FROM courses WHERE student_id = ?", [student_id])?;
    tx.execute("DELETE FROM students WHERE id = ?", [student_id])?;
    tx.commit()?;

    tracing::info!(%student_id, courses, "student deleted");
    Ok(courses)
}

pub fn list_students(conn: &Connection) -> GpaResult<Vec<Student>> {
    let mut stmt =
        conn.prepare("SELECT id, name, index_number FROM students ORDER BY name, index_number")?;
    let rows = stmt
        .query_map([], |r| {
            Ok(Student {
                id: r.get(0)?,
                name: r.get(1)?,
                index_number: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Case-insensitive substring match on name or index number; a blank query matches all.
pub fn filter_students(conn: &Connection, query: &str) -> GpaResult<Vec<Student>> {
    let needle = query.trim().to_lowercase();
    let all = list_students(conn)?;
    if needle.is_empty() {
        return Ok(all);
    }
    Ok(all
        .into_iter()
        .filter(|s| {
            s.name.to_lowercase().contains(&needle)
                || s.index_number.to_lowercase().contains(&needle)
        })
        .collect())
}

pub fn find_student_id(conn: &Connection, name: &str, index_number: &str) -> GpaResult<String> {
    conn.query_row(
        "SELECT id FROM students WHERE name = ? AND index_number = ?",
        (name.trim(), index_number.trim()),
        |r| r.get(0),
    )
    .optional()?
    .ok_or_else(|| {
        GpaError::NotFound(format!(
            "no student '{}' with index number '{}'",
            name.trim(),
            index_number.trim()
        ))
    })
}

/// Replaces the whole course list of one term. All lines are validated before
/// anything is touched, and the delete and inserts share one transaction, so a
/// failure leaves the previously saved courses in place.
pub fn replace_courses_for_term(
    conn: &Connection,
    student_id: &str,
    year: &str,
    semester: &str,
    courses: &[CourseInput],
) -> GpaResult<usize> {
    grades::validate_term(year, semester)?;
    get_student(conn, student_id)?;

    let mut drafts: Vec<CourseDraft> = Vec::with_capacity(courses.len());
    for (i, c) in courses.iter().enumerate() {
        if c.is_blank() {
            continue;
        }
        let draft = grades::validate_course(&c.course_name, &c.grade, &c.credits).map_err(|e| {
            tracing::warn!(%student_id, year, semester, line = i + 1, error = %e, "term save rejected");
            e
        })?;
        drafts.push(draft);
    }

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM courses WHERE student_id = ? AND year = ? AND semester = ?",
        (student_id, year, semester),
    )?;
    for d in &drafts {
        insert_course(&tx, student_id, year, semester, d)?;
    }
    tx.commit()?;

    tracing::info!(%student_id, year, semester, saved = drafts.len(), "term courses replaced");
    Ok(drafts.len())
}

fn insert_course(
    conn: &Connection,
    student_id: &str,
    year: &str,
    semester: &str,
    draft: &CourseDraft,
) -> GpaResult<String> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO courses(id, student_id, year, semester, course_name, grade, credits, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &id,
            student_id,
            year,
            semester,
            &draft.course_name,
            &draft.grade,
            draft.credits,
            now(),
        ),
    )?;
    Ok(id)
}

/// Adds one course without touching the rest of the term.
pub fn append_course(
    conn: &Connection,
    student_id: &str,
    year: &str,
    semester: &str,
    draft: &CourseDraft,
) -> GpaResult<String> {
    grades::validate_term(year, semester)?;
    grades::validate_draft(draft)?;
    get_student(conn, student_id)?;
    let id = insert_course(conn, student_id, year, semester, draft)?;
    tracing::debug!(%student_id, course_id = %id, year, semester, "course appended");
    Ok(id)
}

pub fn list_courses_for_term(
    conn: &Connection,
    student_id: &str,
    year: &str,
    semester: &str,
) -> GpaResult<Vec<TermCourse>> {
    let mut stmt = conn.prepare(
        "SELECT id, course_name, grade, credits FROM courses
         WHERE student_id = ? AND year = ? AND semester = ?
         ORDER BY rowid",
    )?;
    let rows = stmt
        .query_map((student_id, year, semester), |r| {
            Ok(TermCourse {
                id: r.get(0)?,
                course_name: r.get(1)?,
                grade: r.get(2)?,
                credits: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_all_courses(conn: &Connection, student_id: &str) -> GpaResult<Vec<Course>> {
    let mut stmt = conn.prepare(
        "SELECT id, year, semester, course_name, grade, credits FROM courses
         WHERE student_id = ?
         ORDER BY rowid",
    )?;
    let rows = stmt
        .query_map([student_id], |r| {
            Ok(Course {
                id: r.get(0)?,
                year: r.get(1)?,
                semester: r.get(2)?,
                course_name: r.get(3)?,
                grade: r.get(4)?,
                credits: r.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn delete_course(conn: &Connection, course_id: &str) -> GpaResult<()> {
    let n = conn.execute("DELETE FROM courses WHERE id = ?", [course_id])?;
    if n == 0 {
        return Err(GpaError::NotFound("course not found".to_string()));
    }
    tracing::info!(%course_id, "course deleted");
    Ok(())
}

pub fn delete_courses_for_term(
    conn: &Connection,
    student_id: &str,
    year: &str,
    semester: &str,
) -> GpaResult<usize> {
    get_student(conn, student_id)?;
    let n = conn.execute(
        "DELETE FROM courses WHERE student_id = ? AND year = ? AND semester = ?",
        (student_id, year, semester),
    )?;
    tracing::info!(%student_id, year, semester, deleted = n, "term courses cleared");
    Ok(n)
}

/// Every course of every student, students ordered by name and courses in
/// insertion order, flattened for the summary report.
pub fn summary_rows(conn: &Connection) -> GpaResult<Vec<SummaryRow>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.name, s.index_number, c.year, c.semester, c.grade, c.credits
         FROM students s
         JOIN courses c ON c.student_id = s.id
         ORDER BY s.name, s.index_number, c.rowid",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(SummaryRow {
                student_id: r.get(0)?,
                name: r.get(1)?,
                index_number: r.get(2)?,
                year: r.get(3)?,
                semester: r.get(4)?,
                grade: r.get(5)?,
                credits: r.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn mem() -> Connection {
        let conn = Connection::open_in_memory().expect("open");
        db::init_schema(&conn).expect("schema");
        conn
    }

    fn input(name: &str, grade: &str, credits: &str) -> CourseInput {
        CourseInput {
            course_name: name.to_string(),
            grade: grade.to_string(),
            credits: credits.to_string(),
        }
    }

    fn draft(name: &str, grade: &str, credits: f64) -> CourseDraft {
        CourseDraft {
            course_name: name.to_string(),
            grade: grade.to_string(),
            credits,
        }
    }

    #[test]
    fn duplicate_index_number_is_rejected_without_side_effects() {
        let conn = mem();
        add_student(&conn, "Ama", "IX-1").expect("add");
        let e = add_student(&conn, "Kofi", "IX-1").expect_err("duplicate");
        assert_eq!(e.code(), "duplicate_key");
        let all = list_students(&conn).expect("list");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Ama");
    }

    #[test]
    fn students_are_listed_by_name() {
        let conn = mem();
        add_student(&conn, "Zed", "3").expect("add");
        add_student(&conn, "Abe", "2").expect("add");
        add_student(&conn, "Mia", "1").expect("add");
        let names: Vec<String> = list_students(&conn)
            .expect("list")
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Abe", "Mia", "Zed"]);
    }

    #[test]
    fn filter_matches_name_or_index_case_insensitively() {
        let conn = mem();
        add_student(&conn, "Grace Hopper", "CS-100").expect("add");
        add_student(&conn, "Alan Turing", "MA-200").expect("add");
        assert_eq!(filter_students(&conn, "hop").expect("f").len(), 1);
        assert_eq!(filter_students(&conn, "ma-").expect("f")[0].name, "Alan Turing");
        assert_eq!(filter_students(&conn, "  ").expect("f").len(), 2);
        assert!(filter_students(&conn, "xyz").expect("f").is_empty());
    }

    #[test]
    fn update_student_checks_collisions_and_detects_noop() {
        let conn = mem();
        let a = add_student(&conn, "Ama", "1").expect("add");
        add_student(&conn, "Kofi", "2").expect("add");

        assert!(!update_student(&conn, &a, "Ama", "1").expect("noop"));
        let e = update_student(&conn, &a, "Ama", "2").expect_err("clash");
        assert_eq!(e.code(), "duplicate_key");

        assert!(update_student(&conn, &a, "Ama Mensah", "9").expect("update"));
        assert_eq!(find_student_id(&conn, "Ama Mensah", "9").expect("find"), a);
        assert_eq!(
            find_student_id(&conn, "Ama", "1").expect_err("old key").code(),
            "not_found"
        );
        assert_eq!(
            update_student(&conn, "missing", "x", "y").expect_err("missing").code(),
            "not_found"
        );
    }

    #[test]
    fn replace_twice_keeps_only_second_list() {
        let conn = mem();
        let s = add_student(&conn, "Ama", "1").expect("add");
        replace_courses_for_term(
            &conn,
            &s,
            "Year 1",
            "Semester 1",
            &[input("Algebra", "A", "3"), input("Physics", "B", "4")],
        )
        .expect("first save");
        replace_courses_for_term(&conn, &s, "Year 1", "Semester 1", &[input("Chemistry", "C+", "2")])
            .expect("second save");

        let rows = list_courses_for_term(&conn, &s, "Year 1", "Semester 1").expect("list");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].course_name, "Chemistry");
        assert_eq!(rows[0].credits, 2.0);
    }

    #[test]
    fn failed_replace_preserves_previous_courses() {
        let conn = mem();
        let s = add_student(&conn, "Ama", "1").expect("add");
        replace_courses_for_term(&conn, &s, "Year 2", "Summer", &[input("Algebra", "A", "3")])
            .expect("save");

        let e = replace_courses_for_term(
            &conn,
            &s,
            "Year 2",
            "Summer",
            &[input("Physics", "B", "4"), input("Bad", "A", "-1")],
        )
        .expect_err("invalid credits");
        assert_eq!(e.code(), "validation_error");

        let rows = list_courses_for_term(&conn, &s, "Year 2", "Summer").expect("list");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].course_name, "Algebra");
    }

    #[test]
    fn replace_skips_blank_lines_but_rejects_half_filled_ones() {
        let conn = mem();
        let s = add_student(&conn, "Ama", "1").expect("add");
        let saved = replace_courses_for_term(
            &conn,
            &s,
            "Year 1",
            "Semester 2",
            &[input("Algebra", "A", "3"), input("", "A", "")],
        )
        .expect("save");
        assert_eq!(saved, 1);

        let e = replace_courses_for_term(&conn, &s, "Year 1", "Semester 2", &[input("Algebra", "A", "")])
            .expect_err("missing credits");
        assert_eq!(e.code(), "validation_error");
    }

    #[test]
    fn replace_only_touches_its_own_term() {
        let conn = mem();
        let s = add_student(&conn, "Ama", "1").expect("add");
        replace_courses_for_term(&conn, &s, "Year 1", "Semester 1", &[input("A1", "A", "3")])
            .expect("save");
        replace_courses_for_term(&conn, &s, "Year 1", "Semester 2", &[input("B1", "B", "3")])
            .expect("save");
        replace_courses_for_term(&conn, &s, "Year 1", "Semester 1", &[]).expect("clear");
        let all = list_all_courses(&conn, &s).expect("all");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].semester, "Semester 2");
    }

    #[test]
    fn deleting_student_cascades_to_courses() {
        let conn = mem();
        let s = add_student(&conn, "Ama", "1").expect("add");
        append_course(&conn, &s, "Year 1", "Semester 1", &draft("Algebra", "A", 3.0)).expect("append");
        append_course(&conn, &s, "Year 3", "Summer", &draft("Lab", "B", 1.0)).expect("append");

        assert_eq!(delete_student(&conn, &s).expect("delete"), 2);
        assert!(list_all_courses(&conn, &s).expect("all").is_empty());
        let left: i64 = conn
            .query_row("SELECT COUNT(*) FROM courses", [], |r| r.get(0))
            .expect("count");
        assert_eq!(left, 0);
        assert_eq!(delete_student(&conn, &s).expect_err("gone").code(), "not_found");
    }

    #[test]
    fn append_keeps_existing_rows_and_validates() {
        let conn = mem();
        let s = add_student(&conn, "Ama", "1").expect("add");
        replace_courses_for_term(&conn, &s, "Year 1", "Semester 1", &[input("Algebra", "A", "3")])
            .expect("save");
        append_course(&conn, &s, "Year 1", "Semester 1", &draft("Physics", "B", 4.0)).expect("append");
        assert_eq!(list_courses_for_term(&conn, &s, "Year 1", "Semester 1").expect("list").len(), 2);

        let e = append_course(&conn, &s, "Year 1", "Semester 1", &draft("X", "Q", 1.0))
            .expect_err("bad grade");
        assert_eq!(e.code(), "validation_error");
        let e = append_course(&conn, &s, "Year 1", "Semester 1", &draft("  ", "A", 1.0))
            .expect_err("blank name");
        assert_eq!(e.code(), "validation_error");
        let e = append_course(&conn, &s, "Year 1", "Semester 1", &draft("X", "A", 0.0))
            .expect_err("zero credits");
        assert_eq!(e.code(), "validation_error");
        assert_eq!(list_courses_for_term(&conn, &s, "Year 1", "Semester 1").expect("list").len(), 2);
        let e = append_course(&conn, &s, "Year 9", "Semester 1", &draft("X", "A", 1.0))
            .expect_err("bad year");
        assert_eq!(e.code(), "validation_error");
        let e = append_course(&conn, "nobody", "Year 1", "Semester 1", &draft("X", "A", 1.0))
            .expect_err("no student");
        assert_eq!(e.code(), "not_found");
    }

    #[test]
    fn single_and_term_course_deletion() {
        let conn = mem();
        let s = add_student(&conn, "Ama", "1").expect("add");
        let c = append_course(&conn, &s, "Year 1", "Semester 1", &draft("Algebra", "A", 3.0))
            .expect("append");
        append_course(&conn, &s, "Year 1", "Semester 1", &draft("Physics", "B", 3.0)).expect("append");
        append_course(&conn, &s, "Year 2", "Semester 1", &draft("Optics", "B", 3.0)).expect("append");

        delete_course(&conn, &c).expect("delete one");
        assert_eq!(delete_course(&conn, &c).expect_err("again").code(), "not_found");
        assert_eq!(delete_courses_for_term(&conn, &s, "Year 1", "Semester 1").expect("clear"), 1);
        assert_eq!(list_all_courses(&conn, &s).expect("all").len(), 1);
    }

    #[test]
    fn summary_rows_follow_student_name_order() {
        let conn = mem();
        let z = add_student(&conn, "Zed", "2").expect("add");
        let a = add_student(&conn, "Abe", "1").expect("add");
        append_course(&conn, &z, "Year 1", "Semester 1", &draft("Z1", "A", 3.0)).expect("append");
        append_course(&conn, &a, "Year 1", "Semester 1", &draft("A1", "B", 3.0)).expect("append");
        let rows = summary_rows(&conn).expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Abe");
        assert_eq!(rows[1].student_id, z);
    }
}
