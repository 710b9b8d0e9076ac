//! Push dispatch error types.

use thiserror::Error;

/// Result type for push operations.
pub type Result<T> = std::result::Result<T, PushError>;

/// Push dispatch errors.
#[derive(Debug, Error)]
pub enum PushError {
    /// Malformed base64url input.
    #[error("Invalid base64url input: {0}")]
    Decode(String),

    /// Malformed DER-encoded ECDSA signature.
    #[error("Invalid ECDSA signature encoding: {0}")]
    SignatureFormat(String),

    /// VAPID key missing, malformed or inconsistent.
    #[error("Failed to load VAPID key: {0}")]
    KeyLoad(String),

    /// The signing engine refused to sign.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Payload encryption failed.
    #[error("Payload encryption failed: {0}")]
    Encryption(String),

    /// Subscription endpoint or keys are unusable.
    #[error("Invalid subscription: {0}")]
    InvalidSubscription(String),

    /// Push service answered with a non-success status.
    #[error("Push service rejected the message with HTTP {status}")]
    Delivery {
        /// HTTP status code.
        status: u16,
    },

    /// Subscription no longer exists on the push service (404/410).
    #[error("Subscription gone (HTTP {status})")]
    Gone {
        /// HTTP status code.
        status: u16,
    },

    /// Rate limited by the push service.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Payload too large.
    #[error("Payload too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge {
        /// Actual size.
        size: usize,
        /// Maximum allowed size.
        limit: usize,
    },

    /// Transport failure (DNS, TLS, connection reset).
    #[error("Network error: {0}")]
    Network(String),

    /// Request or batch deadline elapsed.
    #[error("Operation timed out")]
    Timeout,

    /// Dispatch was cancelled before the request completed.
    #[error("Dispatch cancelled")]
    Cancelled,

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PushError {
    /// Check if this error indicates the subscription should be deleted.
    pub fn should_remove_subscription(&self) -> bool {
        matches!(self, Self::Gone { .. })
    }

    /// Check if this error is retryable by the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout | Self::RateLimited(_) => true,
            Self::Delivery { status } => *status >= 500,
            _ => false,
        }
    }

    /// Get retry-after duration if rate limited.
    pub fn retry_after(&self) -> Option<std::time::Duration> {
        if let Self::RateLimited(secs) = self {
            Some(std::time::Duration::from_secs(*secs))
        } else {
            None
        }
    }

    /// HTTP status reported by the push service, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Delivery { status } | Self::Gone { status } => Some(*status),
            Self::RateLimited(_) => Some(429),
            _ => None,
        }
    }

    /// Short category label used in log fields.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::SignatureFormat(_) => "signature_format",
            Self::KeyLoad(_) => "key_load",
            Self::Signing(_) => "signing",
            Self::Encryption(_) => "encryption",
            Self::InvalidSubscription(_) => "invalid_subscription",
            Self::Delivery { .. } => "delivery",
            Self::Gone { .. } => "gone",
            Self::RateLimited(_) => "rate_limited",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::Network(_) => "network",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Serialization(_) => "serialization",
            Self::Config(_) => "config",
        }
    }

    /// Map a non-success HTTP status from a push service.
    pub(crate) fn from_status(status: u16, retry_after: Option<u64>) -> Self {
        match status {
            404 | 410 => Self::Gone { status },
            413 => Self::PayloadTooLarge { size: 0, limit: 4096 },
            429 => Self::RateLimited(retry_after.unwrap_or(60)),
            _ => Self::Delivery { status },
        }
    }
}

impl From<reqwest::Error> for PushError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16(), None)
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for PushError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<base64::DecodeError> for PushError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Decode(err.to_string())
    }
}
