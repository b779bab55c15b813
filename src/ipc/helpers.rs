use crate::error::GpaError;
use crate::ipc::error::err;
use crate::ipc::types::AppState;
use crate::store;
use rusqlite::Connection;
use serde_json::Value;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl HandlerErr {
    pub fn response(self, id: &str) -> Value {
        err(id, self.code, self.message, self.details)
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }
}

impl From<GpaError> for HandlerErr {
    fn from(e: GpaError) -> Self {
        tracing::warn!(code = e.code(), error = %e, "request failed");
        Self {
            code: e.code(),
            message: e.to_string(),
            details: e.details(),
        }
    }
}

pub fn db(state: &AppState) -> Result<&Connection, HandlerErr> {
    state.db.as_ref().ok_or_else(|| HandlerErr {
        code: "no_workspace",
        message: "select a workspace first".to_string(),
        details: None,
    })
}

pub fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn optional_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

/// Credits may arrive as a JSON number or as the raw text of an editor cell.
/// Anything else becomes blank text and is left to the validator.
pub fn credits_text(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Resolves `studentId`, or the `name` + `indexNumber` pair, to a student id.
pub fn resolve_student(conn: &Connection, params: &Value) -> Result<String, HandlerErr> {
    if let Some(id) = optional_str(params, "studentId") {
        return Ok(store::get_student(conn, id)?.id);
    }
    match (
        optional_str(params, "name"),
        optional_str(params, "indexNumber"),
    ) {
        (Some(name), Some(index_number)) => Ok(store::find_student_id(conn, name, index_number)?),
        _ => Err(HandlerErr::bad_params(
            "missing studentId (or name and indexNumber)",
        )),
    }
}

pub fn term_params(params: &Value) -> Result<(&str, &str), HandlerErr> {
    Ok((
        required_str(params, "year")?,
        required_str(params, "semester")?,
    ))
}
