//! Retry scheduling with externally configurable policy
//!
//! The backoff strategy and retry condition are caller-supplied seams; the
//! scheduler itself only tracks the invocation-scoped attempt counter and
//! enforces the budget. State is threaded through one invocation's attempt
//! loop and never shared across invocations.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Error;
use crate::types::Request;

/// Maps (original request, failure, completed attempts) to the wait before
/// the next attempt
pub trait BackoffStrategy: Send + Sync {
    /// Delay before attempt `attempt + 1`; `attempt` is at least 1 here
    fn delay_before_next_attempt(
        &self,
        request: &Request,
        failure: &Error,
        attempt: u32,
    ) -> Duration;
}

/// Decides whether another attempt is permitted.
///
/// Consulted only while the attempt budget is not exhausted, so it can
/// never force attempts beyond the budget.
pub trait RetryCondition: Send + Sync {
    /// Whether to retry after `attempt` completed attempts
    fn should_retry(&self, request: &Request, failure: &Error, attempt: u32) -> bool;
}

/// Exponential backoff with optional full jitter
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Growth factor per attempt
    pub multiplier: f64,
    /// Whether to draw the delay uniformly from [0, capped] to prevent
    /// thundering herd
    pub jitter: bool,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl ExponentialBackoff {
    /// Set the base delay
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enable or disable jitter
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    fn capped_delay_ms(&self, attempt: u32) -> u64 {
        let exponent = attempt.saturating_sub(1).min(31);
        let exponential =
            self.base_delay.as_millis() as f64 * self.multiplier.powi(exponent as i32);
        (exponential as u64).min(self.max_delay.as_millis() as u64)
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn delay_before_next_attempt(
        &self,
        _request: &Request,
        _failure: &Error,
        attempt: u32,
    ) -> Duration {
        let capped = self.capped_delay_ms(attempt);
        if self.jitter {
            use rand::Rng;
            let mut rng = rand::thread_rng();
            Duration::from_millis(rng.gen_range(0..=capped))
        } else {
            Duration::from_millis(capped)
        }
    }
}

/// Default retry condition: transport failures and throttling or server
/// errors (429, 5xx) are retryable; client-side and other service failures
/// are not.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRetryCondition;

impl RetryCondition for DefaultRetryCondition {
    fn should_retry(&self, _request: &Request, failure: &Error, _attempt: u32) -> bool {
        match failure {
            Error::Transport { .. } => true,
            Error::Service { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Retry policy: attempt budget plus the caller-supplied backoff and
/// condition seams
#[derive(Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (not retries); 3 means at most 3 requests
    pub max_attempts: u32,
    backoff: Arc<dyn BackoffStrategy>,
    condition: Arc<dyn RetryCondition>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Arc::new(ExponentialBackoff::default()),
            condition: Arc::new(DefaultRetryCondition),
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// Create a policy with a custom attempt budget
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Replace the backoff strategy
    pub fn with_backoff(mut self, backoff: Arc<dyn BackoffStrategy>) -> Self {
        self.backoff = backoff;
        self
    }

    /// Replace the retry condition
    pub fn with_condition(mut self, condition: Arc<dyn RetryCondition>) -> Self {
        self.condition = condition;
        self
    }
}

/// Decision after a failed attempt
#[derive(Debug)]
pub enum RetryDecision {
    /// Attempt again after the delay elapses; zero delay is legal
    Retry { delay: Duration },
    /// No further attempts; carries the invocation's final failure
    Exhausted(Error),
}

/// Invocation-scoped retry state machine.
///
/// The attempt counter starts at 0 and increments once per completed
/// attempt; it is monotonically non-decreasing and never observed by
/// another invocation.
#[derive(Debug)]
pub struct RetryScheduler {
    policy: RetryPolicy,
    attempts: u32,
}

impl RetryScheduler {
    /// Create a scheduler for one invocation
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    /// Number of completed attempts
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Record a failed attempt and decide what happens next.
    ///
    /// The condition is consulted only while budget remains. When the
    /// budget itself is spent the failure is wrapped in
    /// [`Error::RetriesExhausted`]; when the condition forbids a retry
    /// earlier, the failure is surfaced as-is.
    pub fn register_failure(&mut self, request: &Request, failure: Error) -> RetryDecision {
        self.attempts += 1;

        if self.attempts < self.policy.max_attempts
            && self
                .policy
                .condition
                .should_retry(request, &failure, self.attempts)
        {
            let delay =
                self.policy
                    .backoff
                    .delay_before_next_attempt(request, &failure, self.attempts);
            return RetryDecision::Retry { delay };
        }

        if self.attempts >= self.policy.max_attempts {
            RetryDecision::Exhausted(Error::RetriesExhausted {
                attempts: self.attempts,
                source: Box::new(failure),
            })
        } else {
            RetryDecision::Exhausted(failure)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;

    fn server_error() -> Error {
        Error::Service {
            service: "ec2".to_string(),
            status: 500,
            code: None,
            message: "internal error".to_string(),
        }
    }

    fn forbidden() -> Error {
        Error::Service {
            service: "ec2".to_string(),
            status: 403,
            code: None,
            message: "access denied".to_string(),
        }
    }

    fn test_request() -> Request {
        Request::new(Method::POST, "/", "AmazonEC2")
    }

    struct AlwaysRetry;
    impl RetryCondition for AlwaysRetry {
        fn should_retry(&self, _: &Request, _: &Error, _: u32) -> bool {
            true
        }
    }

    struct ZeroBackoff;
    impl BackoffStrategy for ZeroBackoff {
        fn delay_before_next_attempt(&self, _: &Request, _: &Error, _: u32) -> Duration {
            Duration::ZERO
        }
    }

    #[test]
    fn test_budget_exhaustion_carries_last_failure() {
        let policy = RetryPolicy::new(3)
            .with_condition(Arc::new(AlwaysRetry))
            .with_backoff(Arc::new(ZeroBackoff));
        let mut scheduler = RetryScheduler::new(policy);
        let request = test_request();

        assert!(matches!(
            scheduler.register_failure(&request, server_error()),
            RetryDecision::Retry { .. }
        ));
        assert!(matches!(
            scheduler.register_failure(&request, server_error()),
            RetryDecision::Retry { .. }
        ));

        // Third failure spends the budget; no fourth attempt is possible.
        match scheduler.register_failure(&request, server_error()) {
            RetryDecision::Exhausted(Error::RetriesExhausted { attempts, source }) => {
                assert_eq!(attempts, 3);
                assert_eq!(source.status(), Some(500));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(scheduler.attempts(), 3);
    }

    #[test]
    fn test_condition_forbids_retry_surfaces_failure_directly() {
        let mut scheduler = RetryScheduler::new(RetryPolicy::default());
        let request = test_request();

        match scheduler.register_failure(&request, forbidden()) {
            RetryDecision::Exhausted(Error::Service { status, .. }) => assert_eq!(status, 403),
            other => panic!("expected direct service failure, got {other:?}"),
        }
        assert_eq!(scheduler.attempts(), 1);
    }

    #[test]
    fn test_transport_failures_are_retryable_by_default() {
        let condition = DefaultRetryCondition;
        let request = test_request();
        let transport = Error::Transport {
            message: "connection reset".to_string(),
            source: None,
        };
        assert!(condition.should_retry(&request, &transport, 1));
        assert!(condition.should_retry(&request, &server_error(), 1));
        assert!(!condition.should_retry(&request, &forbidden(), 1));

        let client = Error::Client {
            message: "bad signature input".to_string(),
            source: None,
        };
        assert!(!condition.should_retry(&request, &client, 1));
    }

    #[test]
    fn test_throttling_is_retryable() {
        let throttled = Error::Service {
            service: "sqs".to_string(),
            status: 429,
            code: Some("Throttling".to_string()),
            message: "slow down".to_string(),
        };
        assert!(DefaultRetryCondition.should_retry(&test_request(), &throttled, 1));
    }

    #[test]
    fn test_exponential_growth_without_jitter() {
        let backoff = ExponentialBackoff::default()
            .with_base_delay(Duration::from_millis(100))
            .with_jitter(false);
        let request = test_request();
        let failure = server_error();

        assert_eq!(
            backoff.delay_before_next_attempt(&request, &failure, 1),
            Duration::from_millis(100)
        );
        assert_eq!(
            backoff.delay_before_next_attempt(&request, &failure, 2),
            Duration::from_millis(200)
        );
        assert_eq!(
            backoff.delay_before_next_attempt(&request, &failure, 3),
            Duration::from_millis(400)
        );
    }

    #[test]
    fn test_backoff_capped_at_max() {
        let backoff = ExponentialBackoff::default()
            .with_base_delay(Duration::from_secs(10))
            .with_max_delay(Duration::from_secs(15))
            .with_jitter(false);
        let delay = backoff.delay_before_next_attempt(&test_request(), &server_error(), 5);
        assert_eq!(delay, Duration::from_secs(15));
    }

    #[test]
    fn test_jitter_stays_within_cap() {
        let backoff = ExponentialBackoff::default()
            .with_base_delay(Duration::from_millis(100))
            .with_jitter(true);
        for _ in 0..50 {
            let delay = backoff.delay_before_next_attempt(&test_request(), &server_error(), 2);
            assert!(delay <= Duration::from_millis(200));
        }
    }

    #[test]
    fn test_zero_delay_backoff_is_legal() {
        let policy = RetryPolicy::new(2)
            .with_condition(Arc::new(AlwaysRetry))
            .with_backoff(Arc::new(ZeroBackoff));
        let mut scheduler = RetryScheduler::new(policy);

        match scheduler.register_failure(&test_request(), server_error()) {
            RetryDecision::Retry { delay } => assert_eq!(delay, Duration::ZERO),
            other => panic!("expected retry, got {other:?}"),
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
    }
}
