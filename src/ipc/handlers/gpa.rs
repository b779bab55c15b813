use crate::calc;
use crate::ipc::error::ok;
use crate::ipc::helpers::{db, optional_str, resolve_student, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store;
use serde_json::{json, Value};

/// Cumulative GPA over every course, plus the GPA of one term when it is given.
fn gpa_student(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let conn = db(state)?;
    let student_id = resolve_student(conn, params)?;
    let courses = store::list_all_courses(conn, &student_id)?;
    let cumulative = calc::compute_gpa(courses.iter().map(|c| (c.grade.as_str(), c.credits)));

    let term = match (optional_str(params, "year"), optional_str(params, "semester")) {
        (Some(year), Some(semester)) => {
            let r = calc::compute_gpa(
                courses
                    .iter()
                    .filter(|c| c.year == year && c.semester == semester)
                    .map(|c| (c.grade.as_str(), c.credits)),
            );
            Some(json!({ "year": year, "semester": semester, "gpa": r.gpa, "totalCredits": r.total_credits }))
        }
        (None, None) => None,
        _ => return Err(HandlerErr::bad_params("year and semester go together")),
    };

    Ok(json!({
        "studentId": student_id,
        "cumulative": cumulative,
        "term": term,
    }))
}

fn gpa_summary(state: &AppState) -> Result<Value, HandlerErr> {
    let conn = db(state)?;
    let records = calc::term_summaries(&store::summary_rows(conn)?);
    Ok(json!({ "records": records }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "gpa.student" => gpa_student(state, &req.params),
        "gpa.summary" => gpa_summary(state),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
