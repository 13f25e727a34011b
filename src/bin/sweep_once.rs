//! One-shot tool: run a single catalog sweep with one worker and exit.
//! Useful for smoke-testing config, catalog, proxy, and database wiring.

use anyhow::{Context, Result};
use casewatch::catalog;
use casewatch::config::Config;
use casewatch::database_ops::{cases, db::Db};
use casewatch::worker::Worker;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    casewatch::util::env::init_env();
    casewatch::tracing::init_tracing("info,sqlx=warn")?;

    let config = Arc::new(Config::from_env().context("loading configuration")?);
    // Unlike the service, a missing or empty catalog is fatal here.
    let items = catalog::load_catalog(Path::new(&config.case_file))?;
    let db = Db::connect(&config.database_url, config.db_max_conns)
        .await
        .context("connecting to database")?;
    cases::ensure_schema(&db, &config.cases_table).await?;

    let worker = Worker::new(0, config, items, db, CancellationToken::new());
    let stored = worker.run_once().await?;
    info!(stored, "single sweep finished");
    Ok(())
}
