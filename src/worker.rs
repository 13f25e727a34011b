//! Sweep workers: each one owns a market client, a local batch, and a
//! dedicated database connection, and loops over the full catalog until
//! cancelled. Workers never coordinate; duplicate work across them is
//! resolved by the idempotent upsert.

use crate::catalog::Item;
use crate::config::Config;
use crate::database_ops::{cases, db::Db};
use crate::market::fetcher::{MarketClient, PriceRecord};
use crate::market::retry::fetch_with_retry;
use anyhow::{Context, Result};
use sqlx::pool::PoolConnection;
use sqlx::Postgres;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Per-worker buffer of resolved price records, flushed on threshold and
/// at every sweep boundary.
#[derive(Debug, Default)]
pub struct Batch {
    records: Vec<PriceRecord>,
}

impl Batch {
    pub fn push(&mut self, record: PriceRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_full(&self, batch_size: usize) -> bool {
        self.records.len() >= batch_size
    }

    /// Drain the buffer, leaving it empty.
    pub fn take(&mut self) -> Vec<PriceRecord> {
        std::mem::take(&mut self.records)
    }
}

pub struct Worker {
    index: usize,
    config: Arc<Config>,
    catalog: Arc<[Item]>,
    db: Db,
    cancel: CancellationToken,
}

impl Worker {
    pub fn new(
        index: usize,
        config: Arc<Config>,
        catalog: Arc<[Item]>,
        db: Db,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            index,
            config,
            catalog,
            db,
            cancel,
        }
    }

    /// Stagger, then sweep the catalog forever. Only cancellation (observed
    /// at every suspension point) or a startup failure ends the loop.
    pub async fn run(self) -> Result<()> {
        let stagger = self.config.stagger * self.index as u32;
        if !stagger.is_zero() {
            info!(
                worker = self.index,
                delay_secs = stagger.as_secs(),
                "staggering startup"
            );
            tokio::select! {
                _ = self.cancel.cancelled() => return Ok(()),
                _ = sleep(stagger) => {}
            }
        }

        let market = MarketClient::from_config(&self.config).context("building market client")?;
        // One connection per worker, held for the whole run and released on
        // shutdown. A connection lost mid-run surfaces as failed flushes.
        let mut conn = self
            .db
            .pool
            .acquire()
            .await
            .context("acquiring worker db connection")?;
        let mut batch = Batch::default();

        info!(
            worker = self.index,
            items = self.catalog.len(),
            "worker sweeping"
        );
        loop {
            let stored = self.sweep(&market, &mut conn, &mut batch).await;
            if self.cancel.is_cancelled() {
                break;
            }
            info!(worker = self.index, stored, "sweep complete");
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = sleep(self.config.sweep_delay) => {}
            }
        }
        info!(worker = self.index, "worker stopped");
        Ok(())
    }

    /// One full catalog pass. Items whose retries are exhausted are skipped;
    /// the batch is flushed on threshold and once more at the end so no
    /// record waits longer than one sweep.
    async fn sweep(
        &self,
        market: &MarketClient,
        conn: &mut PoolConnection<Postgres>,
        batch: &mut Batch,
    ) -> usize {
        let mut stored = 0;
        for item in self.catalog.iter() {
            if self.cancel.is_cancelled() {
                break;
            }
            if let Some(record) = fetch_with_retry(
                market,
                item,
                self.config.retry_policy,
                self.config.max_retries,
                &self.cancel,
            )
            .await
            {
                batch.push(record);
            }
            if batch.is_full(self.config.batch_size) {
                stored += self.flush(conn, batch).await;
            }
        }
        if !batch.is_empty() {
            stored += self.flush(conn, batch).await;
        }
        stored
    }

    /// Single sweep for one-shot tooling; acquires its own client and
    /// connection and returns how many records were stored.
    pub async fn run_once(&self) -> Result<usize> {
        let market = MarketClient::from_config(&self.config).context("building market client")?;
        let mut conn = self
            .db
            .pool
            .acquire()
            .await
            .context("acquiring worker db connection")?;
        let mut batch = Batch::default();
        Ok(self.sweep(&market, &mut conn, &mut batch).await)
    }

    /// A failed flush drops the batch; those cases are re-fetched and
    /// re-flushed next sweep, so the store converges without recovery here.
    async fn flush(&self, conn: &mut PoolConnection<Postgres>, batch: &mut Batch) -> usize {
        let records = batch.take();
        match cases::upsert_batch(&mut **conn, &self.config.cases_table, &records).await {
            Ok(_) => {
                info!(worker = self.index, count = records.len(), "stored batch");
                records.len()
            }
            Err(err) => {
                error!(
                    worker = self.index,
                    count = records.len(),
                    error = %err,
                    "batch flush failed; records dropped until next sweep"
                );
                0
            }
        }
    }
}

/// Launch the fixed worker pool and wait for every worker to finish.
///
/// Workers are fully independent: same read-only catalog, no shared mutable
/// state, every worker sweeping the entire catalog. The pool only returns
/// once `cancel` fires and each worker reaches its next suspension point.
pub async fn run_pool(
    config: Arc<Config>,
    catalog: Arc<[Item]>,
    db: Db,
    cancel: CancellationToken,
) {
    let mut set: JoinSet<()> = JoinSet::new();
    info!(
        workers = config.worker_count,
        items = catalog.len(),
        "starting sweep workers"
    );
    for index in 0..config.worker_count {
        let worker = Worker::new(
            index,
            config.clone(),
            catalog.clone(),
            db.clone(),
            cancel.clone(),
        );
        set.spawn(async move {
            if let Err(err) = worker.run().await {
                error!(worker = index, error = %err, "worker exited with error");
            }
        });
    }
    while let Some(res) = set.join_next().await {
        if let Err(err) = res {
            error!(error = %err, "worker task panicked");
        }
    }
    info!("worker pool drained");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

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

    #[test]
    fn batch_reaches_threshold_and_drains() {
        let mut batch = Batch::default();
        batch.push(record("Case A"));
        assert!(!batch.is_full(2));
        batch.push(record("Case B"));
        assert!(batch.is_full(2));

        let drained = batch.take();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].name, "Case A");
        assert!(batch.is_empty());
        assert!(!batch.is_full(2));
    }

    #[test]
    fn take_on_empty_batch_is_empty() {
        let mut batch = Batch::default();
        assert!(batch.take().is_empty());
        assert_eq!(batch.len(), 0);
    }
}
