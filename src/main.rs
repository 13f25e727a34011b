use anyhow::{Context, Result};
use casewatch::api::ApiServer;
use casewatch::catalog;
use casewatch::config::Config;
use casewatch::database_ops::{cases, db::Db};
use casewatch::worker;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    casewatch::util::env::init_env();
    casewatch::tracing::init_tracing("info,sqlx=warn")?;

    let config = Arc::new(Config::from_env().context("loading configuration")?);
    // Pool must cover one held connection per worker plus API reads.
    let max_conns = config.db_max_conns.max(config.worker_count as u32 + 2);
    let db = Db::connect(&config.database_url, max_conns)
        .await
        .context("connecting to database")?;
    cases::ensure_schema(&db, &config.cases_table)
        .await
        .context("ensuring cases schema")?;

    // A bad case file keeps the read API alive but starts zero workers,
    // so stored rows remain queryable while the catalog gets fixed.
    let catalog = match catalog::load_catalog(Path::new(&config.case_file)) {
        Ok(items) => Some(items),
        Err(err) => {
            error!(error = %err, "catalog unavailable; starting read API with no sweep workers");
            None
        }
    };

    let cancel = CancellationToken::new();
    let pool_handle = catalog.map(|items| {
        info!(
            items = items.len(),
            workers = config.worker_count,
            "starting continuous sweeps"
        );
        tokio::spawn(worker::run_pool(
            config.clone(),
            items,
            db.clone(),
            cancel.clone(),
        ))
    });

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received; stopping sweep workers");
                cancel.cancel();
            }
        });
    }

    let server = ApiServer::from_env()?;
    server.run(db, config.clone()).await?;

    // Server exit (ctrl-c or bind teardown) also ends the sweeps.
    cancel.cancel();
    if let Some(handle) = pool_handle {
        if let Err(err) = handle.await {
            warn!(error = %err, "worker pool task ended abnormally");
        }
    }
    Ok(())
}
