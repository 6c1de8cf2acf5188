//! Error types for vector parsing

use thiserror::Error;

/// Vector parsing error
#[derive(Error, Debug)]
pub enum VectorError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File-level shape problem (not an object, no tests)
    #[error("invalid vector file: {0}")]
    File(String),

    /// A case does not match the expected shape
    #[error("{case}: {message}")]
    Shape {
        /// Test case name
        case: String,
        /// Deserializer message (names the missing or mistyped field)
        message: String,
    },

    /// A field is present but its value is unusable
    #[error("{case}: field '{path}': {reason}")]
    Field {
        /// Test case name
        case: String,
        /// Dotted path to the field
        path: String,
        /// What is wrong with it
        reason: String,
    },
}

impl VectorError {
    pub(crate) fn field(case: &str, path: impl Into<String>, reason: impl ToString) -> Self {
        VectorError::Field {
            case: case.to_string(),
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Vector result type
pub type VectorResult<T> = Result<T, VectorError>;
