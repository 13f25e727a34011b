pub mod fetcher;
pub mod retry;

pub use fetcher::{FetchError, MarketClient, PriceRecord};
pub use retry::{fetch_with_retry, RetryPolicy};
