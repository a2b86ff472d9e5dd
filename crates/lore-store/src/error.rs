use std::fmt;

use rusqlite::ErrorCode;

/// Code the guard recognizes as "row already exists".
pub const UNIQUE_VIOLATION_CODE: &str = "23505";

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    InvalidData(String),
    /// Failure reported by a non-SQLite backend with its own string code.
    Backend { code: String, message: String },
}

impl StoreError {
    /// Structured error code, when the backend provides one.
    ///
    /// SQLite unique and primary-key constraint failures report
    /// [`UNIQUE_VIOLATION_CODE`] so every backend speaks the same signal.
    pub fn code(&self) -> Option<&str> {
        match self {
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                match err.extended_code {
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => Some(UNIQUE_VIOLATION_CODE),
                    _ => None,
                }
            }
            StoreError::Backend { code, .. } => Some(code),
            _ => None,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Sqlite(e) => write!(f, "SQLite error: {e}"),
            StoreError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            StoreError::Backend { code, message } => write!(f, "store error {code}: {message}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Sqlite(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Sqlite(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::InvalidData(format!("JSON: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
