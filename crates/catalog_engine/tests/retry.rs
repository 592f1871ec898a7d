use std::cell::Cell;
use std::time::Duration;

use catalog_engine::RetryPolicy;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn stops_at_first_success() {
    let calls = Cell::new(0);
    let policy = RetryPolicy::immediate(3);

    let result: Result<u32, String> = policy
        .run("flaky", |attempt| {
            calls.set(calls.get() + 1);
            async move {
                if attempt < 2 {
                    Err(format!("attempt {attempt} failed"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

    assert_eq!(result, Ok(2));
    assert_eq!(calls.get(), 2);
}

#[tokio::test]
async fn returns_last_error_when_attempts_run_out() {
    let calls = Cell::new(0);
    let policy = RetryPolicy::immediate(3);

    let result: Result<(), String> = policy
        .run("broken", |attempt| {
            calls.set(calls.get() + 1);
            async move { Err(format!("failure {attempt}")) }
        })
        .await;

    assert_eq!(result, Err("failure 3".to_string()));
    assert_eq!(calls.get(), 3);
}

#[tokio::test]
async fn zero_attempts_still_tries_once() {
    let calls = Cell::new(0);

    let _: Result<(), &str> = RetryPolicy::immediate(0)
        .run("once", |_| {
            calls.set(calls.get() + 1);
            async { Err("no") }
        })
        .await;

    assert_eq!(calls.get(), 1);
}

#[test]
fn fixed_delay_is_constant() {
    let policy = RetryPolicy::fixed(3, Duration::from_secs(2));
    assert_eq!(policy.delay_for(1), Duration::from_secs(2));
    assert_eq!(policy.delay_for(3), Duration::from_secs(2));
}

#[test]
fn exponential_delay_grows_and_is_capped() {
    let policy = RetryPolicy::exponential(
        5,
        Duration::from_millis(500),
        2,
        Duration::from_secs(3),
    );
    assert_eq!(policy.delay_for(1), Duration::from_millis(500));
    assert_eq!(policy.delay_for(2), Duration::from_secs(1));
    assert_eq!(policy.delay_for(3), Duration::from_secs(2));
    assert_eq!(policy.delay_for(4), Duration::from_secs(3));
    assert_eq!(policy.delay_for(30), Duration::from_secs(3));
}

#[test]
fn default_policy_is_three_attempts_two_seconds_apart() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.attempts(), 3);
    assert_eq!(policy.delay_for(1), Duration::from_secs(2));
}
