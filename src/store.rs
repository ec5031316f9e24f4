//! On-disk history of completed pollutant records.
//!
//! One zstd-compressed bincode file per record, grouped per city under the
//! storage directory. File names sort chronologically, so "most recent"
//! is a directory listing away. Corrupt or foreign files are skipped with a
//! warning rather than failing the lookup; per-city retention prunes the
//! oldest records once the configured cap is exceeded.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use bincode::config::standard as bincode_config;
use bincode::serde::{decode_from_slice, encode_to_vec};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

use crate::constants::{RECORD_MAGIC, RECORD_VERSION};
use crate::types::MeasurementRecord;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredRecord {
    pub city: String,
    pub recorded_at: DateTime<Utc>,
    pub reading: MeasurementRecord,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct RecordFile {
    magic: [u8; 4],
    version: u16,
    payload: StoredRecord,
}

#[derive(Clone)]
pub struct HistoryStore {
    records_dir: PathBuf,
    retention_records: usize,
}

impl HistoryStore {
    pub fn new(records_dir: PathBuf, retention_records: usize) -> Self {
        Self {
            records_dir,
            retention_records,
        }
    }

    /// Lookup is keyed on a lower-cased, path-safe form of the city name.
    fn city_dir(&self, city: &str) -> PathBuf {
        self.records_dir.join(city_key(city))
    }

    /// Most-recent stored record for a city, or `None` when the city has no
    /// history. Absence is a normal outcome, not an error.
    pub async fn load_most_recent(&self, city: &str) -> Result<Option<StoredRecord>> {
        let city_dir = self.city_dir(city);
        if !Path::new(&city_dir).exists() {
            return Ok(None);
        }

        let mut dir = fs::read_dir(&city_dir)
            .await
            .with_context(|| format!("Failed to read {}", city_dir.display()))?;

        let mut files = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|value| value.to_str()) == Some("zst") {
                files.push(path);
            }
        }

        files.sort();
        files.reverse();

        for path in files {
            match load_record_file(&path).await {
                Ok(record) => return Ok(Some(record)),
                Err(error) => {
                    warn!("Failed loading record {}: {error:#}", path.display());
                }
            }
        }

        Ok(None)
    }

    pub async fn persist(&self, record: &StoredRecord) -> Result<()> {
        let file = RecordFile {
            magic: RECORD_MAGIC,
            version: RECORD_VERSION,
            payload: record.clone(),
        };

        let encoded = encode_to_vec(&file, bincode_config()).context("Failed to encode record")?;
        let compressed = zstd::stream::encode_all(Cursor::new(encoded), 6)
            .context("Failed to zstd-compress record")?;

        let city_dir = self.city_dir(&record.city);
        fs::create_dir_all(&city_dir)
            .await
            .with_context(|| format!("Failed to create {}", city_dir.display()))?;

        let stamp = record.recorded_at.format("%Y%m%d-%H%M%S");
        let path = city_dir.join(format!("{stamp}.pqr.zst"));
        let tmp_path = city_dir.join(format!("{stamp}.tmp"));

        fs::write(&tmp_path, compressed)
            .await
            .with_context(|| format!("Failed writing {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &path).await.with_context(|| {
            format!(
                "Failed renaming {} -> {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        self.apply_retention(&city_dir).await?;
        Ok(())
    }

    async fn apply_retention(&self, city_dir: &Path) -> Result<()> {
        let mut dir = fs::read_dir(city_dir)
            .await
            .with_context(|| format!("Failed to read {}", city_dir.display()))?;

        let mut files = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|value| value.to_str()) == Some("zst") {
                files.push(path);
            }
        }

        if files.len() <= self.retention_records {
            return Ok(());
        }

        files.sort();
        let excess = files.len() - self.retention_records;
        for path in files.into_iter().take(excess) {
            if let Err(error) = fs::remove_file(&path).await {
                warn!("Failed removing {}: {error}", path.display());
                continue;
            }
            info!("Pruned {}", path.display());
        }

        Ok(())
    }
}

fn city_key(city: &str) -> String {
    let mut key = String::with_capacity(city.len());
    for ch in city.trim().to_lowercase().chars() {
        if ch.is_alphanumeric() {
            key.push(ch);
        } else if (ch.is_whitespace() || ch == '-' || ch == '_') && !key.ends_with('-') {
            key.push('-');
        }
    }
    key.trim_end_matches('-').to_string()
}

async fn load_record_file(path: &Path) -> Result<StoredRecord> {
    let compressed = fs::read(path)
        .await
        .with_context(|| format!("Failed to read record file {}", path.display()))?;
    let decompressed =
        zstd::stream::decode_all(Cursor::new(compressed)).context("Failed to decompress record")?;
    let (record_file, _): (RecordFile, usize) =
        decode_from_slice(&decompressed, bincode_config()).context("Failed to decode record")?;

    if record_file.magic != RECORD_MAGIC {
        bail!("Invalid record magic");
    }
    if record_file.version != RECORD_VERSION {
        bail!("Unsupported record version {}", record_file.version);
    }

    Ok(record_file.payload)
}
