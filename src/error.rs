//! Error types shared by the store, the editor and the session engine

/// Failures at the persistence boundary.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to encode `{key}`: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Stored value is not the shape the store promises for that key
    #[error("malformed data under `{key}`: {reason}")]
    MalformedStoredData { key: String, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by a live workout session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No template with this id (or its record could not be decoded)
    #[error("no such workout: {0}")]
    NotFound(String),

    #[error("no exercise at position {0}")]
    NoSuchExercise(usize),

    #[error("no set {set} in exercise {exercise}")]
    NoSuchSet { exercise: usize, set: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One editor rule violation, addressed by field path (`exercises.0.sets.1.reps`)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

/// Errors from saving a draft
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("workout is invalid: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Invalid(Vec<ValidationError>),

    #[error("no such workout: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
