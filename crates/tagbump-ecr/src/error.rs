//! Error types for tagbump-ecr.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while setting up the ECR client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Region not configured.
    #[error("no AWS region configured - pass --aws-region or set AWS_REGION")]
    MissingRegion,

    /// Access key given without its secret.
    #[error("AWS_SECRET_ACCESS_KEY must be set when an access key id is given")]
    MissingSecret,
}
