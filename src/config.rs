//! Runtime configuration, resolved from the environment once at startup and
//! shared immutably afterwards.

use crate::market::retry::RetryPolicy;
use crate::util::env as env_util;
use anyhow::{bail, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_conns: u32,
    /// Target table for upserts. Validated as a bare SQL identifier because
    /// it is interpolated into statements, not bound.
    pub cases_table: String,
    pub case_file: String,
    pub fetch_timeout: Duration,
    /// Idle pause between two full catalog sweeps.
    pub sweep_delay: Duration,
    pub max_retries: u32,
    pub retry_policy: RetryPolicy,
    pub batch_size: usize,
    pub worker_count: usize,
    /// Per-worker startup offset: worker `i` sleeps `i * stagger` first.
    pub stagger: Duration,
    pub proxy_url: Option<String>,
    pub market_appid: u32,
    pub market_currency: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        env_util::init_env();

        let cases_table = env_util::env_opt("CASES_TABLE").unwrap_or_else(|| "cases".into());
        validate_table_name(&cases_table)?;

        let retry_delay = Duration::from_secs(env_util::env_parse("RETRY_DELAY_SECS", 5u64));
        let backoff = env_util::env_opt("RETRY_BACKOFF").unwrap_or_else(|| "fixed".into());
        let retry_policy = RetryPolicy::parse(&backoff, retry_delay)?;

        let batch_size: usize = env_util::env_parse("BATCH_SIZE", 50);
        if batch_size == 0 {
            bail!("BATCH_SIZE must be at least 1");
        }
        let worker_count: usize = env_util::env_parse("WORKER_COUNT", 4);
        if worker_count == 0 {
            bail!("WORKER_COUNT must be at least 1");
        }

        Ok(Self {
            database_url: env_util::db_url()?,
            db_max_conns: env_util::env_parse("DB_MAX_CONNS", 10),
            cases_table,
            case_file: env_util::env_opt("CASE_FILE").unwrap_or_else(|| "cases.json".into()),
            fetch_timeout: Duration::from_secs(env_util::env_parse("FETCH_TIMEOUT_SECS", 10)),
            sweep_delay: Duration::from_secs(env_util::env_parse("SWEEP_DELAY_SECS", 1)),
            max_retries: env_util::env_parse("MAX_RETRIES", 3),
            retry_policy,
            batch_size,
            worker_count,
            stagger: Duration::from_secs(env_util::env_parse("STAGGER_SECS", 5)),
            proxy_url: env_util::env_opt("PROXY_URL"),
            market_appid: env_util::env_parse("MARKET_APPID", 730),
            market_currency: env_util::env_parse("MARKET_CURRENCY", 3),
        })
    }
}

// The table name ends up inside DDL and upsert statements verbatim, so only
// plain identifiers are accepted.
fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let ok = match chars.next() {
        Some(c) => {
            (c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if !ok {
        bail!("CASES_TABLE {name:?} is not a plain SQL identifier");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        assert!(validate_table_name("cases").is_ok());
        assert!(validate_table_name("_staging_cases2").is_ok());
    }

    #[test]
    fn rejects_injection_shaped_names() {
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("2cases").is_err());
        assert!(validate_table_name("cases; DROP TABLE cases").is_err());
        assert!(validate_table_name("public.cases").is_err());
    }
}
