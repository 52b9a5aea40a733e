//! Retry policy for transient backend failures.

use std::time::Duration;

use rand::Rng;

/// Why a model request is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// HTTP 429 rate limit
    RateLimit,
    /// HTTP 529 overloaded
    Overloaded,
    /// Connection timeout or network error
    Timeout,
    /// Server error (5xx other than 529)
    ServerError,
}

impl RetryReason {
    /// Classify an HTTP status. `None` means the request should not be retried.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            429 => Some(Self::RateLimit),
            529 => Some(Self::Overloaded),
            500..=599 => Some(Self::ServerError),
            _ => None,
        }
    }

    /// Classify a transport error.
    pub fn from_transport(error: &reqwest::Error) -> Option<Self> {
        if error.is_timeout() || error.is_connect() {
            Some(Self::Timeout)
        } else {
            error
                .status()
                .and_then(|status| Self::from_status(status.as_u16()))
        }
    }
}

impl std::fmt::Display for RetryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "rate_limit"),
            Self::Overloaded => write!(f, "overloaded"),
            Self::Timeout => write!(f, "timeout"),
            Self::ServerError => write!(f, "server_error"),
        }
    }
}

/// Exponential backoff between attempts.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Maximum backoff cap.
    pub max_delay: Duration,
    /// Multiplier per consecutive failure (typically 2.0).
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl BackoffConfig {
    /// Delay before retry number `attempt` (0-based), without jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay_secs = self.base_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = delay_secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Delay with up to 20% random jitter added, still capped.
    pub fn jittered_delay_for(&self, attempt: u32) -> Duration {
        let base = self.delay_for(attempt);
        let jitter = rand::thread_rng().gen_range(0.0..=0.2);
        base.mul_f64(1.0 + jitter).min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_and_is_capped() {
        let backoff = BackoffConfig {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        };
        assert_eq!(backoff.delay_for(0), Duration::from_secs(1));
        assert_eq!(backoff.delay_for(1), Duration::from_secs(2));
        assert_eq!(backoff.delay_for(2), Duration::from_secs(4));
        assert_eq!(backoff.delay_for(3), Duration::from_secs(5));
        assert!(backoff.jittered_delay_for(10) <= Duration::from_secs(5));
    }

    #[test]
    fn only_transient_statuses_retry() {
        assert_eq!(RetryReason::from_status(429), Some(RetryReason::RateLimit));
        assert_eq!(RetryReason::from_status(529), Some(RetryReason::Overloaded));
        assert_eq!(RetryReason::from_status(502), Some(RetryReason::ServerError));
        assert_eq!(RetryReason::from_status(400), None);
        assert_eq!(RetryReason::from_status(401), None);
    }
}
