//! The case catalog: a static JSON file listing the items every worker
//! sweeps. Loaded and validated once at startup, then shared read-only.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{fs, path::Path, sync::Arc};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    pub name: String,
    /// Optional listing image; stored alongside prices when present.
    pub image: Option<String>,
}

pub fn load_catalog(path: &Path) -> Result<Arc<[Item]>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read case file {}", path.display()))?;
    let items = parse_catalog(&data)
        .with_context(|| format!("failed to parse case file {}", path.display()))?;
    info!(count = items.len(), path = %path.display(), "loaded case catalog");
    Ok(items.into())
}

fn parse_catalog(data: &str) -> Result<Vec<Item>> {
    let items: Vec<Item> = serde_json::from_str(data)?;
    if items.is_empty() {
        bail!("case file has no entries");
    }
    for item in &items {
        if item.name.trim().is_empty() {
            bail!("case entry with blank name");
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_entries() {
        let items = parse_catalog(
            r#"[{"name":"Case A","image":"https://img/a.png"},{"name":"Case B"}]"#,
        )
        .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Case A");
        assert_eq!(items[0].image.as_deref(), Some("https://img/a.png"));
        assert!(items[1].image.is_none());
    }

    #[test]
    fn rejects_empty_list() {
        assert!(parse_catalog("[]").is_err());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_catalog("{\"name\": ").is_err());
    }

    #[test]
    fn rejects_blank_names() {
        assert!(parse_catalog(r#"[{"name":"   "}]"#).is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = load_catalog(Path::new("/nonexistent/cases.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
