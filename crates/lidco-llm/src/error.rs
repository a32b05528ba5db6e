//! Error types for lidco-llm

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// One failed candidate inside a [`Error::ProviderExhausted`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFailure {
    /// Model id that was attempted
    pub model: String,
    /// Number of attempts made on this model
    pub attempts: u32,
    /// Rendered last error for this model
    pub error: String,
}

/// LLM error type
#[derive(Debug, Error)]
pub enum Error {
    /// Provider or client not configured for a model
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// Rate limit exceeded
    #[error("rate limit exceeded")]
    RateLimit,

    /// Request timed out
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// Provider-side 5xx failure
    #[error("server error: {0}")]
    Server(String),

    /// Authentication or authorization failure
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Request rejected by the provider
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Provider answered with something we could not parse
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Any other provider error
    #[error("API error: {0}")]
    Api(String),

    /// Every candidate in a model plan failed
    #[error("all models failed: {}", render_failures(.failures))]
    ProviderExhausted {
        /// Last error for each attempted candidate, in attempt order
        failures: Vec<CandidateFailure>,
    },
}

impl Error {
    /// Whether this error may succeed if the same request is repeated.
    ///
    /// Transient errors are retried on the same model before falling back;
    /// everything else advances to the next candidate immediately.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::Timeout(_) | Self::Network(_) | Self::Server(_)
        )
    }

    /// Whether this is the terminal "no model could answer" error
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::ProviderExhausted { .. })
    }
}

fn render_failures(failures: &[CandidateFailure]) -> String {
    if failures.is_empty() {
        return "no candidates".to_string();
    }
    failures
        .iter()
        .map(|f| format!("{} ({} attempts): {}", f.model, f.attempts, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(0)
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(Error::RateLimit.is_transient());
        assert!(Error::Timeout(30).is_transient());
        assert!(Error::Network("reset".into()).is_transient());
        assert!(Error::Server("502".into()).is_transient());

        assert!(!Error::Auth("bad key".into()).is_transient());
        assert!(!Error::InvalidRequest("bad".into()).is_transient());
        assert!(!Error::NotConfigured("x".into()).is_transient());
        assert!(!Error::ProviderExhausted { failures: vec![] }.is_transient());
    }

    #[test]
    fn test_exhausted_display_lists_each_candidate() {
        let err = Error::ProviderExhausted {
            failures: vec![
                CandidateFailure {
                    model: "a".into(),
                    attempts: 3,
                    error: "rate limit exceeded".into(),
                },
                CandidateFailure {
                    model: "b".into(),
                    attempts: 1,
                    error: "authentication failed: nope".into(),
                },
            ],
        };
        let text = err.to_string();
        assert!(text.contains("a (3 attempts): rate limit exceeded"));
        assert!(text.contains("b (1 attempts)"));
        assert!(err.is_exhausted());
    }
}
