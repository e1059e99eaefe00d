//! Error types for OpenAI client.

use thiserror::Error;

/// Result type for OpenAI client operations.
pub type Result<T> = std::result::Result<T, OpenAIError>;

/// Error code OpenAI uses for rate-limit rejections.
pub const RATE_LIMIT_CODE: &str = "rate_limit_exceeded";

/// OpenAI client errors.
#[derive(Debug, Error)]
pub enum OpenAIError {
    /// Configuration error (missing API key, invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout, body read failure)
    #[error("Network error: {0}")]
    Network(String),

    /// API error (non-2xx response)
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        kind: Option<String>,
        message: String,
    },

    /// Retry bound reached; carries the last failure seen
    #[error("Retry limit reached after {attempts} attempts: {message}")]
    RetryExhausted {
        attempts: u32,
        code: Option<String>,
        message: String,
    },

    /// Parse error (invalid JSON, unexpected response shape, unterminated fence)
    #[error("Parse error: {0}")]
    Parse(String),

    /// The request gate was closed before the request could be sent
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl OpenAIError {
    /// Whether this is a rate-limit rejection from the API.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::Api { code: Some(code), .. } if code == RATE_LIMIT_CODE)
    }

    /// Whether the client is allowed to resend the identical request.
    ///
    /// Malformed success bodies are never retried: resending the same prompt
    /// reproduces the same output.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Api { .. })
    }

    /// Short stage-independent label used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Network(_) => "transport",
            Self::Api { .. } if self.is_rate_limit() => "rate_limited",
            Self::Api { .. } => "service",
            Self::RetryExhausted { .. } => "retry_exhausted",
            Self::Parse(_) => "malformed_response",
            Self::Cancelled(_) => "cancelled",
        }
    }

    /// Convert a retryable failure into the terminal error reported once the
    /// retry bound is reached.
    pub(crate) fn exhausted(self, attempts: u32) -> Self {
        match self {
            Self::Api { code, message, .. } => Self::RetryExhausted {
                attempts,
                code,
                message,
            },
            Self::Network(message) => Self::RetryExhausted {
                attempts,
                code: None,
                message,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(code: Option<&str>) -> OpenAIError {
        OpenAIError::Api {
            status: 429,
            code: code.map(String::from),
            kind: Some("requests".into()),
            message: "slow down".into(),
        }
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(api(Some(RATE_LIMIT_CODE)).is_rate_limit());
        assert!(!api(Some("server_error")).is_rate_limit());
        assert!(!api(None).is_rate_limit());
        assert!(!OpenAIError::Network("reset".into()).is_rate_limit());
    }

    #[test]
    fn test_parse_errors_are_not_retryable() {
        assert!(!OpenAIError::Parse("bad".into()).is_retryable());
        assert!(!OpenAIError::Config("no key".into()).is_retryable());
        assert!(!OpenAIError::Cancelled("gate closed".into()).is_retryable());
        assert!(OpenAIError::Network("reset".into()).is_retryable());
        assert!(api(None).is_retryable());
    }

    #[test]
    fn test_exhausted_keeps_last_code() {
        match api(Some(RATE_LIMIT_CODE)).exhausted(4) {
            OpenAIError::RetryExhausted { attempts, code, .. } => {
                assert_eq!(attempts, 4);
                assert_eq!(code.as_deref(), Some(RATE_LIMIT_CODE));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
