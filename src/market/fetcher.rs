//! One outbound request per fetch attempt against the Steam Community
//! Market price overview endpoint.

use crate::catalog::Item;
use crate::config::Config;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::{Client, Proxy, StatusCode};
use serde::Deserialize;
use thiserror::Error;

const MARKET_ENDPOINT: &str = "https://steamcommunity.com/market/priceoverview/";

/// Placeholder stored when the endpoint omits a price field.
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(reqwest::Error),
    #[error("price endpoint returned status {0}")]
    Status(StatusCode),
    #[error("could not decode price response: {0}")]
    Decode(reqwest::Error),
}

/// One observed price for one catalog item. Immutable once created;
/// consumed into a batch and discarded after flush.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    pub name: String,
    pub price: String,
    pub volume: String,
    pub median_price: String,
    pub picture_url: String,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
struct PriceOverview {
    lowest_price: Option<String>,
    volume: Option<String>,
    median_price: Option<String>,
}

/// Owns one network session. Each worker builds its own client so sessions
/// are never shared across workers.
pub struct MarketClient {
    client: Client,
    appid: u32,
    currency: u32,
}

impl MarketClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = Client::builder().timeout(config.fetch_timeout);
        if let Some(proxy) = config.proxy_url.as_deref() {
            builder = builder.proxy(Proxy::all(proxy).context("invalid PROXY_URL")?);
        }
        Ok(Self {
            client: builder.build().context("building market http client")?,
            appid: config.market_appid,
            currency: config.market_currency,
        })
    }

    /// Single fetch attempt: network failure, bad status, and undecodable
    /// bodies all normalize to `FetchError`. Missing price fields do not
    /// fail; they fall back to the `"N/A"` sentinel.
    pub async fn fetch(&self, item: &Item) -> Result<PriceRecord, FetchError> {
        let url = self.price_url(&item.name);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(FetchError::Transport)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        let body: PriceOverview = resp.json().await.map_err(FetchError::Decode)?;
        Ok(record_for(item, body))
    }

    fn price_url(&self, name: &str) -> String {
        format!(
            "{}?appid={}&currency={}&market_hash_name={}",
            MARKET_ENDPOINT,
            self.appid,
            self.currency,
            urlencoding::encode(name)
        )
    }
}

fn record_for(item: &Item, body: PriceOverview) -> PriceRecord {
    PriceRecord {
        name: item.name.clone(),
        price: body.lowest_price.unwrap_or_else(|| NOT_AVAILABLE.into()),
        volume: body.volume.unwrap_or_else(|| NOT_AVAILABLE.into()),
        median_price: body.median_price.unwrap_or_else(|| NOT_AVAILABLE.into()),
        picture_url: item
            .image
            .clone()
            .unwrap_or_else(|| NOT_AVAILABLE.into()),
        observed_at: Utc::now(),
    }
}
