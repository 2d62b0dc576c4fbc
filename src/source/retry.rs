use crate::error::SourceError;
use std::future::Future;
use tracing::warn;

/// What to do with a failed request attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// Transient failure, worth another attempt.
    Retry,
    /// Permanent failure, return it as is.
    Abort,
    /// The block does not exist yet. Never retried within the same request.
    NotAvailable,
}

/// Classifies a request failure. 5xx statuses, timeouts and connection resets are
/// transient; everything else is returned to the caller.
pub fn classify(err: &SourceError) -> RetryAction {
    match err {
        SourceError::Status(code) if *code >= 500 => RetryAction::Retry,
        SourceError::Timeout | SourceError::ConnectionReset => RetryAction::Retry,
        SourceError::NotAvailable(_) => RetryAction::NotAvailable,
        _ => RetryAction::Abort,
    }
}

/// Fixed-count retry without delay between attempts; the per-request timeout bounds each
/// attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: usize,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize) -> Self {
        Self { max_attempts: max_attempts.max(1) }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let mut index = 0;
        loop {
            index += 1;
            let err = match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if classify(&err) != RetryAction::Retry {
                return Err(err);
            }

            warn!("Error on executing request [{}/{}]: {}", index, self.max_attempts, err);
            if index >= self.max_attempts {
                return Err(err);
            }
            warn!("Will retry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_classify() {
        assert_eq!(classify(&SourceError::Status(500)), RetryAction::Retry);
        assert_eq!(classify(&SourceError::Status(503)), RetryAction::Retry);
        assert_eq!(classify(&SourceError::Timeout), RetryAction::Retry);
        assert_eq!(classify(&SourceError::ConnectionReset), RetryAction::Retry);
        assert_eq!(classify(&SourceError::NotAvailable(5)), RetryAction::NotAvailable);
        assert_eq!(classify(&SourceError::Status(404)), RetryAction::Abort);
        assert_eq!(classify(&SourceError::Status(429)), RetryAction::Abort);
        assert_eq!(classify(&SourceError::Malformed("eof".into())), RetryAction::Abort);
        assert_eq!(classify(&SourceError::Transport("dns".into())), RetryAction::Abort);
        assert_eq!(
            classify(&SourceError::Rpc { code: -32000, message: "boom".into() }),
            RetryAction::Abort
        );
    }

    #[tokio::test]
    async fn test_retries_transient_until_exhausted() {
        let calls = &AtomicUsize::new(0);
        let result: Result<(), _> = RetryPolicy::new(3)
            .run(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(SourceError::Status(502))
            })
            .await;
        assert!(matches!(result, Err(SourceError::Status(502))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let calls = &AtomicUsize::new(0);
        let result = RetryPolicy::new(3)
            .run(move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(SourceError::Timeout)
                } else {
                    Ok(42)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_failures_are_not_retried() {
        for err in [SourceError::Status(400), SourceError::NotAvailable(9)] {
            let calls = &AtomicUsize::new(0);
            let mut err = Some(err);
            let result: Result<(), _> = RetryPolicy::new(5)
                .run(move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let err = err.take().unwrap_or(SourceError::Timeout);
                    async move { Err(err) }
                })
                .await;
            assert!(result.is_err());
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn test_zero_retries_still_attempts_once() {
        assert_eq!(RetryPolicy::new(0).max_attempts(), 1);
    }
}
