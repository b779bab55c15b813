use crate::ipc::error::ok;
use crate::ipc::helpers::{db, required_str, resolve_student, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::transfer;
use serde_json::{json, Value};
use std::path::PathBuf;

fn export_student(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let conn = db(state)?;
    let student_id = resolve_student(conn, params)?;
    let out = PathBuf::from(required_str(params, "outPath")?);
    let rows = transfer::export_student_courses(conn, &student_id, &out)?;
    Ok(json!({ "rows": rows, "path": out.to_string_lossy() }))
}

fn export_summary(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let conn = db(state)?;
    let out = PathBuf::from(required_str(params, "outPath")?);
    let rows = transfer::export_summary(conn, &out)?;
    Ok(json!({ "rows": rows, "path": out.to_string_lossy() }))
}

/// Row-level failures come back inside a successful result; only a file,
/// header, or student problem fails the request. The header is checked
/// before the student is looked up.
fn import_student(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let conn = db(state)?;
    let input = PathBuf::from(required_str(params, "inPath")?);
    let sheet = transfer::read_course_sheet(&input)?;
    let student_id = resolve_student(conn, params)?;
    let report = transfer::import_course_sheet(conn, &student_id, &sheet)?;
    Ok(json!({
        "studentId": student_id,
        "imported": report.imported,
        "errors": report.errors,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "transfer.exportStudent" => export_student(state, &req.params),
        "transfer.exportSummary" => export_summary(state, &req.params),
        "transfer.importStudent" => import_student(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
