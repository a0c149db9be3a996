use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmbedError>;

/// Provider and engine failures, classified for the retry policy.
#[derive(Error, Debug)]
pub enum EmbedError {
    /// Transient provider overload (HTTP 5xx / 429). Retried with backoff.
    #[error("Provider overloaded (HTTP {status})")]
    Overloaded { status: u16 },

    /// Client-side rejection (other 4xx). Never retried.
    #[error("Provider rejected request (HTTP {status}): {message}")]
    Client { status: u16, message: String },

    /// Connection-level failure. Retried with backoff.
    #[error("Network error: {0}")]
    Network(String),

    /// Connect or total timeout elapsed. Retried with backoff.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The provider answered with something unparseable.
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    /// Terminal failure after the retry budget was spent.
    #[error("Failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: usize,
        #[source]
        last: Box<EmbedError>,
    },

    #[error("{0}")]
    Other(String),
}

impl EmbedError {
    /// Whether the retry policy should try again after backoff.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Overloaded { .. }
                | Self::Network(_)
                | Self::Timeout(_)
                | Self::InvalidResponse(_)
                | Self::Other(_)
        )
    }

    /// Whether this is the expected-transient overload case, reported
    /// distinctly from other failures.
    #[must_use]
    pub fn is_overload(&self) -> bool {
        match self {
            Self::Overloaded { .. } => true,
            Self::RetriesExhausted { last, .. } => last.is_overload(),
            _ => false,
        }
    }
}
