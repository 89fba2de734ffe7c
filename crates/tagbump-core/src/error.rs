//! Error types for tagbump-core.

use std::path::PathBuf;

use crate::object::ObjectId;
use crate::store::StoreError;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while promoting a new version.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The version to promote is empty.
    #[error("new version must not be empty")]
    EmptyVersion,

    /// The configured file path does not exist in the tree.
    #[error("path not found in repository tree: {0}")]
    MissingPath(String),

    /// The blob is not valid YAML.
    #[error("failed to parse YAML: {0}")]
    YamlParse(#[source] serde_yaml::Error),

    /// A document could not be re-emitted as YAML.
    #[error("failed to serialize YAML: {0}")]
    YamlEmit(#[source] serde_yaml::Error),

    /// The dotted field path is malformed.
    #[error("invalid field path '{path}': {reason}")]
    InvalidFieldPath {
        /// The rejected path.
        path: String,
        /// Why the path is invalid.
        reason: String,
    },

    /// The field path does not resolve in any document.
    #[error("field not found: {0}")]
    FieldNotFound(String),

    /// The field path resolves to a mapping or sequence.
    #[error("field '{0}' is not a scalar value")]
    FieldNotScalar(String),

    /// The ref moved since it was read.
    #[error("reference {ref_name} moved away from {expected} during the update")]
    RefConflict {
        /// The contended ref.
        ref_name: String,
        /// The commit the attempt observed.
        expected: ObjectId,
    },

    /// Conflicts persisted past the retry budget.
    #[error("giving up after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The conflict reported by the final attempt.
        #[source]
        last: Box<Error>,
    },

    /// A hash string is not a valid object id.
    #[error("invalid object id: {0:?}")]
    InvalidObjectId(String),

    /// A mode string is not a valid git file mode.
    #[error("invalid file mode: {0:?}")]
    InvalidFileMode(String),

    /// Any other object-store failure.
    #[error("object store error: {0}")]
    Store(#[source] StoreError),

    /// Config file parsing error.
    #[error("failed to parse {file}: {message}")]
    ConfigParse { file: PathBuf, message: String },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether a fresh attempt could succeed where this one failed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RefConflict { .. })
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RefConflict { ref_name, expected } => {
                Self::RefConflict { ref_name, expected }
            }
            other => Self::Store(other),
        }
    }
}
