//! Error types for tagbump-github.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during GitHub API operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Authentication failed or token missing.
    #[error("GitHub authentication failed - check the token's repository permissions")]
    AuthenticationFailed,

    /// Token not found.
    #[error("no GitHub token found - pass --token or set GITHUB_TOKEN")]
    NoToken,

    /// API rate limit exceeded.
    #[error("GitHub API rate limit exceeded - wait and try again")]
    RateLimited,

    /// API error with status code.
    #[error("GitHub API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// Tree listing was cut short by the API.
    #[error("tree {0} is too large to list in one response")]
    TruncatedTree(String),

    /// Blob content in an encoding we cannot read.
    #[error("unsupported blob encoding: {0}")]
    UnsupportedEncoding(String),

    /// Object returned by the API failed validation.
    #[error("invalid object in GitHub response: {0}")]
    InvalidObject(#[from] tagbump_core::Error),

    /// Network error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("failed to parse GitHub response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Base64 blob content could not be decoded.
    #[error("failed to decode blob content: {0}")]
    Decode(#[from] base64::DecodeError),

    /// IO error (e.g., reading gh CLI token).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status of an API error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }
}
