use thiserror::Error;

pub type GpaResult<T> = Result<T, GpaError>;

#[derive(Debug, Error)]
pub enum GpaError {
    #[error("{0}")]
    DuplicateKey(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },
    #[error("{0}")]
    Io(String),
    #[error("database error: {0}")]
    Storage(rusqlite::Error),
}

impl GpaError {
    /// Stable code used on the IPC wire.
    pub fn code(&self) -> &'static str {
        match self {
            GpaError::DuplicateKey(_) => "duplicate_key",
            GpaError::NotFound(_) => "not_found",
            GpaError::Validation(_) => "validation_error",
            GpaError::Schema { .. } => "schema_error",
            GpaError::Io(_) => "io_error",
            GpaError::Storage(_) => "db_error",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            GpaError::Schema { missing } => Some(serde_json::json!({ "missingColumns": missing })),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for GpaError {
    fn from(e: rusqlite::Error) -> Self {
        // Only students carry a UNIQUE constraint.
        if let rusqlite::Error::SqliteFailure(code, msg) = &e {
            if code.code == rusqlite::ErrorCode::ConstraintViolation
                && msg.as_deref().map(|m| m.contains("UNIQUE")).unwrap_or(false)
            {
                return GpaError::DuplicateKey(
                    "student name or index number already exists".to_string(),
                );
            }
        }
        GpaError::Storage(e)
    }
}

impl From<std::io::Error> for GpaError {
    fn from(e: std::io::Error) -> Self {
        GpaError::Io(e.to_string())
    }
}

impl From<csv::Error> for GpaError {
    fn from(e: csv::Error) -> Self {
        GpaError::Io(format!("csv: {e}"))
    }
}

impl From<calamine::Error> for GpaError {
    fn from(e: calamine::Error) -> Self {
        GpaError::Io(format!("could not read workbook: {e}"))
    }
}
