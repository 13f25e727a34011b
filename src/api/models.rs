// API response models (DTOs)

use crate::database_ops::cases::CaseRow;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Body of `GET /cases`.
#[derive(Debug, Serialize)]
pub struct CasesResponse {
    /// Oldest `last_updated` across all rows (staleness of the most lagging
    /// case); null until the first flush lands.
    pub last_updated: Option<DateTime<Utc>>,
    pub cases: Vec<CaseRow>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_serializes_null_timestamp() {
        let body = serde_json::to_value(CasesResponse {
            last_updated: None,
            cases: Vec::new(),
        })
        .unwrap();
        assert!(body["last_updated"].is_null());
        assert_eq!(body["cases"], serde_json::json!([]));
    }

    #[test]
    fn case_rows_keep_wire_field_names() {
        let body = serde_json::to_value(CasesResponse {
            last_updated: Some(Utc::now()),
            cases: vec![CaseRow {
                name: "Case A".into(),
                price: "$1.23".into(),
                volume: "500".into(),
                median_price: "$1.20".into(),
                picture_url: "N/A".into(),
                last_updated: Utc::now(),
            }],
        })
        .unwrap();
        let row = &body["cases"][0];
        assert_eq!(row["name"], "Case A");
        assert_eq!(row["price"], "$1.23");
        assert_eq!(row["median_price"], "$1.20");
        assert!(row["last_updated"].is_string());
    }
}
