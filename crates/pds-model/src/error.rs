use thiserror::Error;

/// Errors that end validation of a single document.
///
/// Recoverable conditions (an unresolvable rule-set reference, a field value
/// that fails its type check) are reported as problems and never surface
/// here; these variants are reserved for conditions under which the current
/// document cannot be processed any further.
#[derive(Debug, Error)]
pub enum LabelError {
    /// Malformed markup. Unrecoverable for the document being parsed.
    #[error("malformed document at {line}:{column}: {message}")]
    Parse {
        message: String,
        line: i32,
        column: i32,
    },

    /// Document-schema mode requires a schema declaration that is absent.
    #[error("no schema(s) specified in the label")]
    MissingSchema,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A validation capability could not be set up.
    #[error("{0}")]
    Capability(String),

    #[error("unsupported url: {0}")]
    UnsupportedUrl(String),
}

pub type Result<T> = std::result::Result<T, LabelError>;
