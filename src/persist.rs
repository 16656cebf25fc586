use crate::results::PostRecord;
use crate::utils::{file_timestamp, sanitize_filename};
use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// File name stems for one platform's snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNaming {
    /// Stem of the de-duplicated CSV table
    pub table_stem: String,
    /// Stem of the raw JSON backup
    pub raw_stem: String,
}

impl OutputNaming {
    pub fn new(table_stem: &str, raw_stem: &str) -> Self {
        Self {
            table_stem: sanitize_filename(table_stem),
            raw_stem: sanitize_filename(raw_stem),
        }
    }

    pub fn linkedin() -> Self {
        Self::new("linkedin_posts", "linkedin_raw")
    }

    pub fn twitter() -> Self {
        Self::new("twitter_data", "twitter_raw")
    }

    pub fn table_path(&self, dir: &Path, timestamp: &str) -> PathBuf {
        dir.join(format!("{}_{}.csv", self.table_stem, timestamp))
    }

    pub fn raw_path(&self, dir: &Path, timestamp: &str) -> PathBuf {
        dir.join(format!("{}_{}.json", self.raw_stem, timestamp))
    }
}

/// Paths and counts of one written snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRun {
    pub table_path: PathBuf,
    pub raw_path: PathBuf,
    pub raw_count: usize,
    pub unique_count: usize,
}

/// Keeps the first record for each exact `text`, preserving order
pub fn dedup_by_text(records: &[PostRecord]) -> Vec<PostRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .iter()
        .filter(|r| seen.insert(r.text.as_str()))
        .cloned()
        .collect()
}

/// De-duplicates and writes both snapshots, stamped with the current time
///
/// Returns `None` when there is nothing to write or writing failed; failures
/// are logged, never raised.
pub fn finalize(records: &[PostRecord], naming: &OutputNaming, dir: &Path) -> Option<PersistedRun> {
    finalize_at(records, naming, dir, Local::now())
}

pub fn finalize_at(
    records: &[PostRecord],
    naming: &OutputNaming,
    dir: &Path,
    at: DateTime<Local>,
) -> Option<PersistedRun> {
    if records.is_empty() {
        ::log::warn!("No posts to save");
        return None;
    }

    match write_snapshot(records, naming, dir, &file_timestamp(at)) {
        Ok(run) => {
            ::log::info!(
                "Saved {} unique posts to {}",
                run.unique_count,
                run.table_path.display()
            );
            ::log::info!(
                "Saved raw data backup ({} posts) to {}",
                run.raw_count,
                run.raw_path.display()
            );
            Some(run)
        }
        Err(e) => {
            ::log::error!("Error saving data: {}", e);
            None
        }
    }
}

fn write_snapshot(
    records: &[PostRecord],
    naming: &OutputNaming,
    dir: &Path,
    timestamp: &str,
) -> Result<PersistedRun, PersistError> {
    fs::create_dir_all(dir)?;

    let unique = dedup_by_text(records);
    let table_path = naming.table_path(dir, timestamp);
    write_csv(&unique, &table_path)?;

    let raw_path = naming.raw_path(dir, timestamp);
    write_json(records, &raw_path)?;

    Ok(PersistedRun {
        table_path,
        raw_path,
        raw_count: records.len(),
        unique_count: unique.len(),
    })
}

fn write_csv(records: &[PostRecord], path: &Path) -> Result<(), PersistError> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_json(records: &[PostRecord], path: &Path) -> Result<(), PersistError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
