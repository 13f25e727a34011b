//! Storage for observed case prices: one row per case name, overwritten on
//! every flush. The bulk upsert keeps concurrent workers commutative; the
//! row reflects whichever complete write lands last.

use super::db::Db;
use crate::market::fetcher::PriceRecord;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Postgres, QueryBuilder};
use tracing::info;

/// Persisted shape of the latest observation per case name.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CaseRow {
    pub name: String,
    pub price: String,
    pub volume: String,
    pub median_price: String,
    pub picture_url: String,
    pub last_updated: DateTime<Utc>,
}

/// Create the cases table if it is missing. `table` must already be
/// validated as a bare identifier (see `Config`).
pub async fn ensure_schema(db: &Db, table: &str) -> Result<()> {
    let ddl = format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            name TEXT PRIMARY KEY,
            price TEXT NOT NULL,
            volume TEXT NOT NULL,
            median_price TEXT NOT NULL,
            picture_url TEXT NOT NULL,
            last_updated TIMESTAMPTZ NOT NULL
        )"
    );
    sqlx::query(&ddl).persistent(false).execute(&db.pool).await?;
    info!(table, "cases schema ready");
    Ok(())
}

fn build_upsert<'a>(table: &str, records: &'a [PriceRecord]) -> QueryBuilder<'a, Postgres> {
    let mut qb: QueryBuilder<'a, Postgres> = QueryBuilder::new(format!(
        "INSERT INTO {table} (name, price, volume, median_price, picture_url, last_updated) "
    ));
    qb.push_values(records.iter(), |mut b, rec| {
        b.push_bind(&rec.name)
            .push_bind(&rec.price)
            .push_bind(&rec.volume)
            .push_bind(&rec.median_price)
            .push_bind(&rec.picture_url)
            .push_bind(rec.observed_at);
    });
    qb.push(
        " ON CONFLICT (name) DO UPDATE SET \
           price = EXCLUDED.price, \
           volume = EXCLUDED.volume, \
           median_price = EXCLUDED.median_price, \
           picture_url = EXCLUDED.picture_url, \
           last_updated = EXCLUDED.last_updated",
    );
    qb
}

/// Bulk idempotent upsert keyed by case name: one round trip, each record
/// either inserted or overwriting the existing row in full.
pub async fn upsert_batch<'e, E>(executor: E, table: &str, records: &[PriceRecord]) -> Result<u64>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    if records.is_empty() {
        return Ok(0);
    }
    let mut qb = build_upsert(table, records);
    let done = qb.build().persistent(false).execute(executor).await?;
    Ok(done.rows_affected())
}

/// Read side: every stored row plus the oldest `last_updated` among them
/// (i.e. how stale the most lagging case is). `None` before the first flush.
pub async fn fetch_all(db: &Db, table: &str) -> Result<(Option<DateTime<Utc>>, Vec<CaseRow>)> {
    let oldest: Option<DateTime<Utc>> =
        sqlx::query_scalar(&format!("SELECT MIN(last_updated) FROM {table}"))
            .persistent(false)
            .fetch_one(&db.pool)
            .await?;
    let rows: Vec<CaseRow> = sqlx::query_as(&format!(
        "SELECT name, price, volume, median_price, picture_url, last_updated FROM {table} ORDER BY name"
    ))
    .persistent(false)
    .fetch_all(&db.pool)
    .await?;
    Ok((oldest, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn upsert_overwrites_every_non_key_column() {
        let records = vec![record("Case A"), record("Case B")];
        let qb = build_upsert("cases", &records);
        let sql = qb.sql();
        assert!(sql.starts_with(
            "INSERT INTO cases (name, price, volume, median_price, picture_url, last_updated) "
        ));
        assert!(sql.contains("ON CONFLICT (name) DO UPDATE SET"));
        for col in ["price", "volume", "median_price", "picture_url", "last_updated"] {
            assert!(sql.contains(&format!("{col} = EXCLUDED.{col}")), "{col}");
        }
        // Two records, six columns each.
        assert!(sql.contains("$12"));
        assert!(!sql.contains("$13"));
    }
}
