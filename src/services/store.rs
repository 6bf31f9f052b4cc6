//! Persistence collaborator client.
//!
//! The data store lives behind a REST interface that upserts by a slug it
//! derives server-side; this client just ships batches of records, child
//! records with parent references, and run-level log entries. It also
//! writes the timestamped JSON artifact that serves as the offline
//! fallback when the store is unreachable.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppResult, PersistenceError};
use crate::models::{ProgramRecord, ProgramTree};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One run-level log entry per site.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunLogEntry {
    pub site: String,
    pub duration_ms: u128,
    pub programs_found: usize,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct ProgramStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ProgramStore {
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: config.store_api_base_url.clone(),
            api_key: config.store_api_key.clone(),
        }
    }

    /// Upsert a batch of top-level programs. The store tolerates partial
    /// batch failure; a non-2xx here covers the whole batch.
    pub async fn upsert_programs(&self, programs: &[ProgramRecord]) -> AppResult<()> {
        if programs.is_empty() {
            return Ok(());
        }
        self.post("funding_programs", &json!(programs)).await
    }

    /// Upsert child records; parent references travel with each record.
    pub async fn upsert_children(&self, children: &[ProgramRecord]) -> AppResult<()> {
        if children.is_empty() {
            return Ok(());
        }
        self.post("funding_subprograms", &json!(children)).await
    }

    /// Record one site's crawl outcome.
    pub async fn log_run(&self, entry: &RunLogEntry) -> AppResult<()> {
        self.post("crawl_runs", &json!(entry)).await
    }

    async fn post(&self, table: &str, body: &serde_json::Value) -> AppResult<()> {
        let endpoint = format!("{}/{}", self.base_url, table);
        let response = self
            .client
            .post(&endpoint)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Prefer", "resolution=merge-duplicates")
            .json(body)
            .send()
            .await
            .map_err(|source| PersistenceError::RequestFailed {
                endpoint: endpoint.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(PersistenceError::BadStatus {
                endpoint,
                status: response.status().as_u16(),
            }
            .into());
        }
        Ok(())
    }
}

/// Write the merged result set (children nested under parents) as a
/// timestamped JSON document under `output_dir`. Returns the path written.
pub fn write_archive(output_dir: &str, trees: &[ProgramTree]) -> AppResult<String> {
    fs::create_dir_all(output_dir).map_err(|source| crate::error::AppError::File {
        path: output_dir.to_string(),
        source,
    })?;

    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = Path::new(output_dir)
        .join(format!("programs_{}.json", stamp))
        .to_string_lossy()
        .into_owned();

    let document = json!({
        "generatedAt": chrono::Local::now().to_rfc3339(),
        "programCount": trees.len(),
        "programs": trees,
    });

    let body = serde_json::to_string_pretty(&document).map_err(PersistenceError::Serialize)?;
    fs::write(&path, body).map_err(|source| crate::error::AppError::File {
        path: path.clone(),
        source,
    })?;

    info!("archive written to {}", path);
    Ok(path)
}

/// Persist everything, logging but not propagating store failures; the
/// archive on disk is the fallback of record.
pub async fn persist_all(
    store: &ProgramStore,
    trees: &[ProgramTree],
    output_dir: &str,
) -> AppResult<String> {
    let top_level: Vec<ProgramRecord> = trees.iter().map(|t| t.program.clone()).collect();
    let children: Vec<ProgramRecord> = trees
        .iter()
        .flat_map(|t| t.subprograms.iter().cloned())
        .collect();

    if let Err(e) = store.upsert_programs(&top_level).await {
        warn!("program upsert failed, archive is the fallback: {}", e);
    }
    if let Err(e) = store.upsert_children(&children).await {
        warn!("subprogram upsert failed, archive is the fallback: {}", e);
    }

    write_archive(output_dir, trees)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_log_entry_serializes_camel_case() {
        let entry = RunLogEntry {
            site: "Test Agency".to_string(),
            duration_ms: 1234,
            programs_found: 7,
            status: "ok".to_string(),
            error: None,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["durationMs"], 1234);
        assert_eq!(value["programsFound"], 7);
        assert!(value.get("error").is_none());
    }

    #[test]
    fn archive_nests_children() {
        let tree = ProgramTree {
            program: ProgramRecord {
                name: "Fund A".to_string(),
                source: "https://x.org/a".to_string(),
                ..Default::default()
            },
            subprograms: vec![ProgramRecord {
                name: "Fund A Youth Window".to_string(),
                source: "https://x.org/a/youth".to_string(),
                parent_program: Some("Fund A".to_string()),
                parent_source: Some("https://x.org/a".to_string()),
                ..Default::default()
            }],
        };

        let dir = std::env::temp_dir().join("fundscout_archive_test");
        let path = write_archive(dir.to_str().unwrap(), &[tree]).unwrap();
        let body = fs::read_to_string(&path).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(doc["programs"][0]["name"], "Fund A");
        assert_eq!(
            doc["programs"][0]["subprograms"][0]["parentProgram"],
            "Fund A"
        );
        let _ = fs::remove_file(path);
    }
}
