//! Error types for the hub.
//!
//! Every fallible operation in the crate returns [`HubError`]. The API layer
//! renders errors through [`HubError::status_code`], so each variant carries a
//! human-readable reason that is safe to show to clients.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the hub.
#[derive(Debug, Error)]
pub enum HubError {
    // Filter and sort errors
    #[error("{message}")]
    Lex { message: String },

    #[error("{message}")]
    Parse { message: String },

    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("'{name}' not supported.")]
    Sort { name: String },

    // Catalog errors
    #[error("Association error: {reason}")]
    Association {
        reason: String,
        /// The reason stems from the shape of caller input.
        user_input: bool,
    },

    #[error("{kind} id={id} not found.")]
    NotFound { kind: String, id: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("{message}")]
    BadRequest { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    // Database errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("YAML error: {message}")]
    Yaml {
        message: String,
        #[source]
        source: Option<serde_yaml::Error>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A persistent invariant could not be maintained (e.g. the PK counter
    /// could not be written).
    #[error("Fatal: {message}")]
    Fatal { message: String },
}

/// Result type alias for hub operations.
pub type Result<T> = std::result::Result<T, HubError>;

impl From<std::io::Error> for HubError {
    fn from(err: std::io::Error) -> Self {
        HubError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for HubError {
    fn from(err: serde_json::Error) -> Self {
        HubError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_yaml::Error> for HubError {
    fn from(err: serde_yaml::Error) -> Self {
        HubError::Yaml {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for HubError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, ref detail) = err {
            if matches!(
                failure.extended_code,
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            ) {
                return HubError::Conflict {
                    message: detail.clone().unwrap_or_else(|| err.to_string()),
                };
            }
            // Dangling references and rejected values come from request bodies.
            if matches!(
                failure.extended_code,
                rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
                    | rusqlite::ffi::SQLITE_CONSTRAINT_CHECK
                    | rusqlite::ffi::SQLITE_CONSTRAINT_NOTNULL
            ) {
                return HubError::BadRequest {
                    message: detail.clone().unwrap_or_else(|| err.to_string()),
                };
            }
        }
        HubError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl HubError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        HubError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a not-found error for an entity kind.
    pub fn not_found(kind: &str, id: impl ToString) -> Self {
        HubError::NotFound {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }

    /// Association error raised by a malformed schema or relation name.
    pub fn association(reason: impl Into<String>) -> Self {
        HubError::Association {
            reason: reason.into(),
            user_input: false,
        }
    }

    /// Association error raised by the shape of caller input.
    pub fn association_input(reason: impl Into<String>) -> Self {
        HubError::Association {
            reason: reason.into(),
            user_input: true,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        HubError::BadRequest {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        HubError::Forbidden {
            message: message.into(),
        }
    }

    /// Convert to an HTTP status code.
    ///
    /// - 400: filter, sort, validation and malformed-input errors
    /// - 403: writes to read-only resources
    /// - 404: entity not found
    /// - 409: unique / primary key conflicts
    /// - 500: everything else
    pub fn status_code(&self) -> u16 {
        match self {
            HubError::Lex { .. }
            | HubError::Parse { .. }
            | HubError::Validation { .. }
            | HubError::Sort { .. }
            | HubError::BadRequest { .. }
            | HubError::Json { .. } => 400,

            HubError::Association { user_input, .. } => {
                if *user_input {
                    400
                } else {
                    500
                }
            }

            HubError::Forbidden { .. } => 403,

            HubError::NotFound { .. } => 404,

            HubError::Conflict { .. } => 409,

            _ => 500,
        }
    }

    /// True when the error reports a missing entity.
    pub fn is_not_found(&self) -> bool {
        matches!(self, HubError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HubError::Sort {
            name: "color".into(),
        };
        assert_eq!(err.to_string(), "'color' not supported.");

        let err = HubError::not_found("Application", 42);
        assert_eq!(err.to_string(), "Application id=42 not found.");

        let err = HubError::Lex {
            message: "End (\") not found.".into(),
        };
        assert_eq!(err.to_string(), "End (\") not found.");
    }

    #[test]
    fn test_status_codes() {
        let err = HubError::Parse {
            message: "Syntax error.".into(),
        };
        assert_eq!(err.status_code(), 400);

        assert_eq!(HubError::not_found("Tag", 1).status_code(), 404);
        assert_eq!(
            HubError::Conflict {
                message: "dup".into()
            }
            .status_code(),
            409
        );
        assert_eq!(HubError::forbidden("builtin").status_code(), 403);
        assert_eq!(HubError::association("Association not found.").status_code(), 500);
        assert_eq!(HubError::association_input("Must be SLICE.").status_code(), 400);
        assert_eq!(
            HubError::Fatal {
                message: "pk".into()
            }
            .status_code(),
            500
        );
    }

    #[test]
    fn test_unique_violation_is_conflict() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (name TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();
        let err: HubError = conn
            .execute("INSERT INTO t VALUES ('a')", [])
            .unwrap_err()
            .into();
        assert_eq!(err.status_code(), 409);
    }
}
