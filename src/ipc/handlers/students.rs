use crate::ipc::error::ok;
use crate::ipc::helpers::{db, optional_str, required_str, resolve_student, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store;
use serde_json::{json, Value};

fn students_list(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let Some(conn) = state.db.as_ref() else {
        return Ok(json!({ "students": [] }));
    };
    let students = match optional_str(params, "query") {
        Some(q) => store::filter_students(conn, q)?,
        None => store::list_students(conn)?,
    };
    Ok(json!({ "students": students }))
}

fn students_create(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let conn = db(state)?;
    let name = required_str(params, "name")?;
    let index_number = required_str(params, "indexNumber")?;
    let student_id = store::add_student(conn, name, index_number)?;
    Ok(json!({ "studentId": student_id }))
}

fn students_update(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let conn = db(state)?;
    let student_id = resolve_student(conn, params)?;
    let new_name = required_str(params, "newName")?;
    let new_index_number = required_str(params, "newIndexNumber")?;
    let changed = store::update_student(conn, &student_id, new_name, new_index_number)?;
    Ok(json!({ "studentId": student_id, "changed": changed }))
}

fn students_delete(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let conn = db(state)?;
    let student_id = resolve_student(conn, params)?;
    let deleted_courses = store::delete_student(conn, &student_id)?;
    Ok(json!({ "studentId": student_id, "deletedCourses": deleted_courses }))
}

fn students_find(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let conn = db(state)?;
    let name = required_str(params, "name")?;
    let index_number = required_str(params, "indexNumber")?;
    let student_id = store::find_student_id(conn, name, index_number)?;
    Ok(json!({ "studentId": student_id }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "students.list" => students_list(state, &req.params),
        "students.create" => students_create(state, &req.params),
        "students.update" => students_update(state, &req.params),
        "students.delete" => students_delete(state, &req.params),
        "students.find" => students_find(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
