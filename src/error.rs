//! Error type shared by every compiler.

/// Errors raised while compiling conditions, updates and projections.
///
/// All variants describe malformed input: they are deterministic and a retry with
/// the same input fails the same way.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The condition tree is malformed.
    #[error("invalid condition: {0}")]
    InvalidCondition(String),
    /// The update directive set is malformed.
    #[error("invalid update: {0}")]
    InvalidUpdate(String),
    /// An attribute path could not be split into segments.
    #[error("invalid attribute path `{path}`: {reason}")]
    InvalidPath {
        /// The offending path.
        path: String,
        /// Explanation.
        reason: String,
    },
    /// A value could not be converted into a DynamoDB attribute value.
    #[error(transparent)]
    Serialization(#[from] serde_dynamo::Error),
}

/// Result alias defaulting to [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn invalid_path(path: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
