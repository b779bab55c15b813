use crate::grades;
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    credits_text, db, required_str, resolve_student, term_params, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, CourseInput};
use serde_json::{json, Value};

fn courses_list_term(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let conn = db(state)?;
    let student_id = resolve_student(conn, params)?;
    let (year, semester) = term_params(params)?;
    let courses = store::list_courses_for_term(conn, &student_id, year, semester)?;
    Ok(json!({ "studentId": student_id, "courses": courses }))
}

fn courses_list_all(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let conn = db(state)?;
    let student_id = resolve_student(conn, params)?;
    let courses = store::list_all_courses(conn, &student_id)?;
    Ok(json!({ "studentId": student_id, "courses": courses }))
}

fn parse_course_inputs(params: &Value) -> Result<Vec<CourseInput>, HandlerErr> {
    let Some(rows) = params.get("courses").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::bad_params("missing courses"));
    };
    Ok(rows
        .iter()
        .map(|r| CourseInput {
            course_name: r
                .get("courseName")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
            grade: r
                .get("grade")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
            credits: credits_text(r.get("credits")),
        })
        .collect())
}

fn courses_save_term(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let conn = db(state)?;
    let student_id = resolve_student(conn, params)?;
    let (year, semester) = term_params(params)?;
    let inputs = parse_course_inputs(params)?;
    let saved = store::replace_courses_for_term(conn, &student_id, year, semester, &inputs)?;
    Ok(json!({ "studentId": student_id, "saved": saved }))
}

fn courses_append(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let conn = db(state)?;
    let student_id = resolve_student(conn, params)?;
    let (year, semester) = term_params(params)?;
    let draft = grades::validate_course(
        required_str(params, "courseName")?,
        required_str(params, "grade")?,
        &credits_text(params.get("credits")),
    )?;
    let course_id = store::append_course(conn, &student_id, year, semester, &draft)?;
    Ok(json!({ "courseId": course_id }))
}

fn courses_delete(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let conn = db(state)?;
    let course_id = required_str(params, "courseId")?;
    store::delete_course(conn, course_id)?;
    Ok(json!({ "courseId": course_id }))
}

fn courses_clear_term(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let conn = db(state)?;
    let student_id = resolve_student(conn, params)?;
    let (year, semester) = term_params(params)?;
    let deleted = store::delete_courses_for_term(conn, &student_id, year, semester)?;
    Ok(json!({ "studentId": student_id, "deleted": deleted }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "courses.listTerm" => courses_list_term(state, &req.params),
        "courses.listAll" => courses_list_all(state, &req.params),
        "courses.saveTerm" => courses_save_term(state, &req.params),
        "courses.append" => courses_append(state, &req.params),
        "courses.delete" => courses_delete(state, &req.params),
        "courses.clearTerm" => courses_clear_term(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
