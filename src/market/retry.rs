//! Bounded per-item retry around the fetcher. The delay policy is fixed at
//! construction time; constant delay is the default and exponential growth
//! is opt-in, never applied silently.

use super::fetcher::{FetchError, MarketClient, PriceRecord};
use crate::catalog::Item;
use anyhow::{bail, Result};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Same delay before every retry.
    Fixed(Duration),
    /// Base delay doubled after each failed attempt.
    Exponential(Duration),
}

impl RetryPolicy {
    pub fn parse(kind: &str, base: Duration) -> Result<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "fixed" | "constant" => Ok(Self::Fixed(base)),
            "exponential" | "exp" => Ok(Self::Exponential(base)),
            other => bail!("unknown RETRY_BACKOFF {other:?} (expected fixed or exponential)"),
        }
    }

    /// Delay before the next attempt, given how many attempts already failed.
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        match self {
            Self::Fixed(d) => *d,
            Self::Exponential(base) => {
                // Cap the shift so pathological max_retries cannot overflow.
                let exp = failed_attempts.saturating_sub(1).min(16);
                base.saturating_mul(1u32 << exp)
            }
        }
    }
}

/// Fetch one item with up to `max_retries` attempts. Exhaustion is a
/// non-fatal, per-item outcome: the item is skipped for this sweep.
pub async fn fetch_with_retry(
    client: &MarketClient,
    item: &Item,
    policy: RetryPolicy,
    max_retries: u32,
    cancel: &CancellationToken,
) -> Option<PriceRecord> {
    retry_with(item, policy, max_retries, cancel, || client.fetch(item)).await
}

async fn retry_with<F, Fut>(
    item: &Item,
    policy: RetryPolicy,
    max_retries: u32,
    cancel: &CancellationToken,
    mut attempt_fn: F,
) -> Option<PriceRecord>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PriceRecord, FetchError>>,
{
    let mut attempts: u32 = 0;
    while attempts < max_retries {
        attempts += 1;
        match attempt_fn().await {
            Ok(record) => return Some(record),
            Err(err) => {
                warn!(
                    item = %item.name,
                    attempt = attempts,
                    max_retries,
                    error = %err,
                    "price fetch failed"
                );
                if attempts >= max_retries {
                    break;
                }
                tokio::select! {
                    _ = cancel.cancelled() => return None,
                    _ = tokio::time::sleep(policy.delay_for(attempts)) => {}
                }
            }
        }
    }
    error!(item = %item.name, attempts, "giving up on item for this sweep");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use reqwest::StatusCode;

    fn item(name: &str) -> Item {
        Item {
            name: name.to_string(),
            image: None,
        }
    }

    fn record(name: &str) -> PriceRecord {
        PriceRecord {
            name: name.to_string(),
            price: "$1.23".into(),
            volume: "500".into(),
            median_price: "$1.20".into(),
            picture_url: "N/A".into(),
            observed_at: Utc::now(),
        }
    }

    fn failure() -> Result<PriceRecord, FetchError> {
        Err(FetchError::Status(StatusCode::INTERNAL_SERVER_ERROR))
    }

    #[test]
    fn fixed_policy_is_constant() {
        let policy = RetryPolicy::Fixed(Duration::from_secs(5));
        assert_eq!(policy.delay_for(1), Duration::from_secs(5));
        assert_eq!(policy.delay_for(4), Duration::from_secs(5));
    }

    #[test]
    fn exponential_policy_doubles() {
        let policy = RetryPolicy::Exponential(Duration::from_secs(2));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
    }

    #[test]
    fn parse_recognizes_both_kinds() {
        let base = Duration::from_secs(1);
        assert_eq!(
            RetryPolicy::parse("fixed", base).unwrap(),
            RetryPolicy::Fixed(base)
        );
        assert_eq!(
            RetryPolicy::parse(" Exponential ", base).unwrap(),
            RetryPolicy::Exponential(base)
        );
        assert!(RetryPolicy::parse("jittered", base).is_err());
    }

    #[tokio::test]
    async fn stops_after_max_retries() {
        let mut attempts = 0u32;
        let out = retry_with(
            &item("Case A"),
            RetryPolicy::Fixed(Duration::ZERO),
            3,
            &CancellationToken::new(),
            || {
                attempts += 1;
                std::future::ready(failure())
            },
        )
        .await;
        assert!(out.is_none());
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn returns_first_success() {
        let mut attempts = 0u32;
        let out = retry_with(
            &item("Case A"),
            RetryPolicy::Fixed(Duration::ZERO),
            5,
            &CancellationToken::new(),
            || {
                attempts += 1;
                std::future::ready(if attempts < 2 {
                    failure()
                } else {
                    Ok(record("Case A"))
                })
            },
        )
        .await;
        assert_eq!(out.unwrap().name, "Case A");
        assert_eq!(attempts, 2);
    }

    #[tokio::test]
    async fn zero_budget_never_attempts() {
        let mut attempts = 0u32;
        let out = retry_with(
            &item("Case A"),
            RetryPolicy::Fixed(Duration::ZERO),
            0,
            &CancellationToken::new(),
            || {
                attempts += 1;
                std::future::ready(failure())
            },
        )
        .await;
        assert!(out.is_none());
        assert_eq!(attempts, 0);
    }

    #[tokio::test]
    async fn cancellation_interrupts_the_retry_sleep() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut attempts = 0u32;
        let out = retry_with(
            &item("Case A"),
            // A delay long enough that only cancellation can end the test.
            RetryPolicy::Fixed(Duration::from_secs(3600)),
            3,
            &cancel,
            || {
                attempts += 1;
                std::future::ready(failure())
            },
        )
        .await;
        assert!(out.is_none());
        assert_eq!(attempts, 1);
    }
}
