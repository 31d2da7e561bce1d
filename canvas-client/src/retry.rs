//! Retry strategies for placement submission

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry strategy for transport failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RetryStrategy {
    /// Never retry
    None,
    /// Fixed delay between attempts
    Fixed { delay_ms: u64 },
    /// Exponential backoff
    Exponential {
        initial_delay_ms: u64,
        max_delay_ms: u64,
        multiplier: f64,
    },
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::Exponential {
            initial_delay_ms: 200,
            max_delay_ms: 2_000,
            multiplier: 2.0,
        }
    }
}

impl RetryStrategy {
    /// Delay before the given retry (1-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Fixed { delay_ms } => Duration::from_millis(*delay_ms),
            Self::Exponential {
                initial_delay_ms,
                max_delay_ms,
                multiplier,
            } => {
                let exponent = attempt.saturating_sub(1) as i32;
                let delay = (*initial_delay_ms as f64) * multiplier.powi(exponent);
                Duration::from_millis(delay.min(*max_delay_ms as f64) as u64)
            }
        }
    }
}

/// Attempt budget plus backoff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub strategy: RetryStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            strategy: RetryStrategy::default(),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no backoff
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            strategy: RetryStrategy::None,
        }
    }

    /// Whether another attempt is allowed after `attempt` failed
    pub fn should_retry(&self, attempt: u32) -> bool {
        !matches!(self.strategy, RetryStrategy::None) && attempt < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff() {
        let strategy = RetryStrategy::default();
        assert_eq!(strategy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(strategy.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(strategy.delay_for_attempt(3), Duration::from_millis(800));
        assert_eq!(strategy.delay_for_attempt(10), Duration::from_millis(2_000));
    }

    #[test]
    fn test_fixed_and_none() {
        assert_eq!(
            RetryStrategy::Fixed { delay_ms: 50 }.delay_for_attempt(4),
            Duration::from_millis(50)
        );
        assert_eq!(RetryStrategy::None.delay_for_attempt(1), Duration::ZERO);
    }

    #[test]
    fn test_attempt_budget() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
        assert!(!RetryPolicy::none().should_retry(1));
    }
}
