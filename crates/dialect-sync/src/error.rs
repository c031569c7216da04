//! Error types for dialect resolution, SQL generation and polling.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration error (invalid YAML, missing fields, bad identifiers, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Statement preparation or execution failed on the database.
    ///
    /// `code` carries the vendor error code (SQLSTATE for PostgreSQL) when the
    /// driver reports one.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: Option<String>,
    },

    /// A logical type or primitive kind has no mapping.
    #[error("Unsupported type {type_name} for column {column}")]
    UnsupportedType { column: String, type_name: String },

    /// The caller broke an API contract (e.g. advancing a closed cursor).
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// Create a Database error without a vendor code.
    pub fn database(message: impl Into<String>) -> Self {
        SyncError::Database {
            message: message.into(),
            code: None,
        }
    }

    /// Create an UnsupportedType error.
    pub fn unsupported(column: impl Into<String>, type_name: impl Into<String>) -> Self {
        SyncError::UnsupportedType {
            column: column.into(),
            type_name: type_name.into(),
        }
    }

    /// Create a Precondition error.
    pub fn precondition(message: impl Into<String>) -> Self {
        SyncError::Precondition(message.into())
    }

    /// Whether the error came back from the database itself.
    pub fn is_database(&self) -> bool {
        matches!(self, SyncError::Database { .. })
    }

    /// Process exit code used by the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            SyncError::Config(_) | SyncError::Yaml(_) | SyncError::Json(_) => 1,
            SyncError::Database { .. } => 2,
            SyncError::UnsupportedType { .. } => 3,
            SyncError::Precondition(_) => 4,
            SyncError::Io(_) => 7,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

impl From<tokio_postgres::Error> for SyncError {
    fn from(err: tokio_postgres::Error) -> Self {
        // Keep the server's own message so signature matching sees the raw text.
        match err.as_db_error() {
            Some(db) => SyncError::Database {
                message: db.message().to_string(),
                code: Some(db.code().code().to_string()),
            },
            None => SyncError::Database {
                message: err.to_string(),
                code: None,
            },
        }
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, SyncError>;
