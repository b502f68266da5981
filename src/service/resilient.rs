//! Retry-with-backoff wrapper around the completion service.
//!
//! Every stage funnels its completion calls through this wrapper, which
//! enforces the degrade-don't-crash policy: after retries exhaust (or when
//! the shared circuit breaker is open) the caller receives placeholder
//! content instead of an error, and the workflow keeps moving.

use crate::errors::ServiceError;
use crate::service::{CircuitBreaker, CompletionService};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-invocation retry settings.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per invocation (first try included).
    pub max_attempts: u32,
    /// Delay before the first retry; doubles after each failed attempt.
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_secs(2),
        }
    }
}

/// Result of a resilient completion call.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    /// True when the text is placeholder fallback content.
    pub degraded: bool,
}

/// Completion-service handle shared by all stages: retry, breaker,
/// fallback.
#[derive(Clone)]
pub struct ResilientCompleter {
    service: Arc<dyn CompletionService>,
    breaker: Arc<CircuitBreaker>,
    policy: RetryPolicy,
}

impl ResilientCompleter {
    pub fn new(
        service: Arc<dyn CompletionService>,
        breaker: Arc<CircuitBreaker>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            service,
            breaker,
            policy,
        }
    }

    /// Invoke the completion service for the given stage, degrading to
    /// placeholder content instead of failing.
    ///
    /// `label` names the operation in logs and fallback text.
    pub async fn complete(&self, role_instruction: &str, context: &str, label: &str) -> Completion {
        if self.breaker.is_open() {
            warn!(label, "circuit breaker open; skipping retries and degrading");
            return fallback(
                label,
                &ServiceError::CircuitOpen {
                    failures: self.breaker.failures(),
                },
            );
        }

        // Backoff restarts from the configured initial delay on every
        // invocation; growth never carries over between calls.
        let mut delay = self.policy.initial_delay;
        let mut last_error = String::new();

        for attempt in 1..=self.policy.max_attempts {
            debug!(label, attempt, max = self.policy.max_attempts, "completion attempt");
            match self.service.complete(role_instruction, context).await {
                Ok(text) => {
                    self.breaker.record_success();
                    return Completion {
                        text,
                        degraded: false,
                    };
                }
                Err(err) => {
                    warn!(label, attempt, error = %err, "completion attempt failed");
                    self.breaker.record_failure();
                    last_error = err.to_string();

                    if self.breaker.is_open() {
                        break;
                    }
                    if attempt < self.policy.max_attempts {
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        fallback(
            label,
            &ServiceError::Exhausted {
                attempts: self.policy.max_attempts,
                last: last_error,
            },
        )
    }
}

// Placeholder content keeps the pipeline alive when the upstream service
// is down. Wording must stay clear of the sentiment marker lists so a
// degraded run still terminates through the sentiment gate.
fn fallback(label: &str, reason: &ServiceError) -> Completion {
    Completion {
        text: format!(
            "[placeholder] {label} content could not be generated: {reason}. \
             The workflow proceeded with this stand-in; regenerate once the \
             completion service is reachable."
        ),
        degraded: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FailingService {
        calls: AtomicU32,
    }

    #[async_trait]
    impl CompletionService for FailingService {
        async fn complete(&self, _role: &str, _context: &str) -> Result<String, ServiceError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Err(ServiceError::Transport("connection refused".into()))
        }
    }

    struct EchoService;

    #[async_trait]
    impl CompletionService for EchoService {
        async fn complete(&self, _role: &str, context: &str) -> Result<String, ServiceError> {
            Ok(format!("echo: {context}"))
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            initial_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let completer = ResilientCompleter::new(
            Arc::new(EchoService),
            Arc::new(CircuitBreaker::default()),
            fast_policy(),
        );

        let result = completer.complete("role", "hello", "test").await;
        assert!(!result.degraded);
        assert_eq!(result.text, "echo: hello");
    }

    #[tokio::test]
    async fn test_exhausted_retries_degrade() {
        let service = Arc::new(FailingService {
            calls: AtomicU32::new(0),
        });
        let completer = ResilientCompleter::new(
            service.clone(),
            Arc::new(CircuitBreaker::default()),
            fast_policy(),
        );

        let result = completer.complete("role", "ctx", "strategy note").await;
        assert!(result.degraded);
        assert!(result.text.contains("strategy note"));
        assert_eq!(service.calls.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_open_breaker_skips_service_entirely() {
        let service = Arc::new(FailingService {
            calls: AtomicU32::new(0),
        });
        let breaker = Arc::new(CircuitBreaker::new(1));
        breaker.record_failure();
        assert!(breaker.is_open());

        let completer = ResilientCompleter::new(service.clone(), breaker, fast_policy());
        let result = completer.complete("role", "ctx", "test").await;

        assert!(result.degraded);
        assert_eq!(service.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_breaker_opening_mid_call_stops_retries() {
        let service = Arc::new(FailingService {
            calls: AtomicU32::new(0),
        });
        // Opens on the very first failure.
        let breaker = Arc::new(CircuitBreaker::new(1));

        let completer = ResilientCompleter::new(service.clone(), breaker, fast_policy());
        let result = completer.complete("role", "ctx", "test").await;

        assert!(result.degraded);
        assert_eq!(service.calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_success_after_failures_closes_breaker() {
        let breaker = Arc::new(CircuitBreaker::new(5));
        breaker.record_failure();
        breaker.record_failure();

        let completer =
            ResilientCompleter::new(Arc::new(EchoService), breaker.clone(), fast_policy());
        let result = completer.complete("role", "ctx", "test").await;

        assert!(!result.degraded);
        assert_eq!(breaker.failures(), 0);
    }

    #[test]
    fn test_fallback_text_avoids_sentiment_markers() {
        let completion = fallback(
            "review",
            &ServiceError::Transport("connection refused".into()),
        );
        let lower = completion.text.to_lowercase();
        for marker in crate::quality::POSITIVE_MARKERS
            .iter()
            .chain(crate::quality::NEGATIVE_MARKERS)
        {
            assert!(
                !lower.contains(marker),
                "fallback text contains sentiment marker '{marker}'"
            );
        }
    }
}
