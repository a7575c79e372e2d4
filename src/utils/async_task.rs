use std::future::Future;

use tokio::time::sleep;
use tokio::time::timeout;
use tracing::error;
use tracing::warn;

use crate::BackoffPolicy;
use crate::ConnectionError;
use crate::Error;
use crate::Result;
use crate::StoreError;

/// Run `task` once, then retry up to `policy.max_retries` times
///
/// Every attempt is bounded by `policy.timeout_ms`. Attempts are separated
/// by an exponential backoff capped at `policy.max_delay_ms`. When every
/// attempt fails the last error is wrapped in
/// [`ConnectionError::RetryExhausted`].
pub(crate) async fn task_with_timeout_and_exponential_backoff<F, T, P>(
    op: &'static str,
    task: F,
    policy: BackoffPolicy,
) -> Result<P>
where
    F: Fn() -> T,
    T: Future<Output = Result<P>>,
{
    let attempts = policy.attempts();
    let mut last_error = None;

    for attempt in 0..attempts {
        match timeout(policy.timeout(), task()).await {
            Ok(Ok(r)) => return Ok(r),
            Ok(Err(e)) => {
                warn!(op, attempt = attempt + 1, attempts, "attempt failed: {}", e);
                last_error = Some(e);
            }
            Err(_) => {
                warn!(op, attempt = attempt + 1, attempts, "attempt timed out after {:?}", policy.timeout());
                last_error = Some(
                    StoreError::Timeout {
                        op,
                        duration: policy.timeout(),
                    }
                    .into(),
                );
            }
        }

        if attempt + 1 < attempts {
            sleep(policy.delay_for(attempt)).await;
        }
    }

    error!(op, "giving up after {} attempts", attempts);
    Err(ConnectionError::RetryExhausted {
        attempts,
        source: Box::new(last_error.unwrap_or_else(|| Error::Fatal(format!("{op} never attempted")))),
    }
    .into())
}
