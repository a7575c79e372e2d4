use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::utils::async_task::task_with_timeout_and_exponential_backoff;
use crate::BackoffPolicy;
use crate::ConnectionError;
use crate::Error;

#[tokio::test]
async fn test_task_with_timeout_and_exponential_backoff_success() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let task = move || {
        let counter = counter_clone.clone();
        async move {
            let current = counter.fetch_add(1, Ordering::SeqCst);
            if current == 0 {
                Err(Error::Fatal("First attempt fails".to_string()))
            } else {
                Ok::<_, crate::Error>(current)
            }
        }
    };

    let policy = BackoffPolicy {
        base_delay_ms: 10,
        max_delay_ms: 100,
        timeout_ms: 1000,
        max_retries: 3,
    };

    let result = task_with_timeout_and_exponential_backoff("test", task, policy).await;

    assert_eq!(result.unwrap(), 1);
    assert_eq!(counter.load(Ordering::SeqCst), 2); // 1 failure + 1 success
}

#[tokio::test]
async fn test_task_with_timeout_and_exponential_backoff_max_retries() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let task = move || {
        let counter = counter_clone.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<u32, _>(Error::Fatal("Always fails".to_string()))
        }
    };

    let policy = BackoffPolicy {
        base_delay_ms: 1,
        max_delay_ms: 10,
        timeout_ms: 1000,
        max_retries: 5,
    };

    let result = task_with_timeout_and_exponential_backoff("test", task, policy).await;

    // first attempt + 5 retries
    assert_eq!(counter.load(Ordering::SeqCst), 6);
    match result {
        Err(Error::Connection(ConnectionError::RetryExhausted { attempts, source })) => {
            assert_eq!(attempts, 6);
            assert!(matches!(*source, Error::Fatal(_)));
        }
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
}

#[tokio::test(start_paused = true)]
async fn test_task_with_timeout_and_exponential_backoff_timeout() {
    let task = || async {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok::<u32, Error>(1)
    };

    let policy = BackoffPolicy {
        base_delay_ms: 10,
        max_delay_ms: 10,
        timeout_ms: 50,
        max_retries: 1,
    };

    let result = task_with_timeout_and_exponential_backoff("slow", task, policy).await;

    match result {
        Err(Error::Connection(ConnectionError::RetryExhausted { attempts, source })) => {
            assert_eq!(attempts, 2);
            assert!(source.is_timeout());
        }
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_zero_retries_makes_single_attempt() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let task = move || {
        let counter = counter_clone.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<u32, _>(Error::Fatal("fails".to_string()))
        }
    };

    let policy = BackoffPolicy {
        max_retries: 0,
        ..Default::default()
    };

    assert!(task_with_timeout_and_exponential_backoff("once", task, policy).await.is_err());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}
