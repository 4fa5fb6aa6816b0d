//! The shared JSON update store: one insertion-ordered array of records,
//! read once per run, merged in memory, written back whole.
//!
//! Dedup is pure exact-match on the identity tuple. Re-running a scraper
//! against unchanged sources must be a no-op; near-duplicates with minor
//! textual differences are out of scope.

use crate::error::{Result, ScraperError};
use crate::normalize::clean_description;
use crate::types::UpdateRecord;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Identity tuple rendered as a key string:
/// `game_id|version|update_date|description[..40 chars]`.
/// Truncation counts characters, not bytes — descriptions are Korean.
pub fn dedup_key(record: &UpdateRecord) -> String {
    let head: String = record.description.chars().take(40).collect();
    format!(
        "{}|{}|{}|{}",
        record.game_id, record.version, record.update_date, head
    )
}

pub struct UpdateStore {
    path: PathBuf,
}

impl UpdateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full collection. An absent file is a normal first run and
    /// yields an empty collection; a present-but-unparseable file is an
    /// error, so a partial or corrupted write never gets silently replaced.
    pub fn load(&self) -> Result<Vec<UpdateRecord>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No existing store at {:?}, starting empty", self.path);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text)
            .map_err(|e| ScraperError::Store(format!("{:?}: {e}", self.path)))
    }

    /// Merge new records into the persisted collection. Returns how many
    /// were appended. Dedup applies against history and within the batch;
    /// the file is only rewritten when something was actually added.
    pub fn merge(&self, new_records: &[UpdateRecord]) -> Result<usize> {
        let mut collection = self.load()?;
        let mut seen: HashSet<String> = collection.iter().map(dedup_key).collect();

        let mut added = 0;
        for record in new_records {
            let key = dedup_key(record);
            if seen.contains(&key) {
                debug!("Skipping duplicate record: {key}");
                continue;
            }
            seen.insert(key);
            collection.push(record.clone());
            added += 1;
        }

        if added > 0 {
            self.save(&collection)?;
        }
        Ok(added)
    }

    /// Refresh path used by the coming-soon source: drop existing records
    /// matching `prune`, append the new batch, and always write back.
    pub fn replace_matching(
        &self,
        prune: impl Fn(&UpdateRecord) -> bool,
        new_records: &[UpdateRecord],
    ) -> Result<usize> {
        let mut collection = self.load()?;
        let before = collection.len();
        collection.retain(|record| !prune(record));
        let pruned = before - collection.len();
        if pruned > 0 {
            debug!("Pruned {pruned} stale records before refresh");
        }
        collection.extend(new_records.iter().cloned());
        self.save(&collection)?;
        Ok(new_records.len())
    }

    /// Maintenance pass: strip placeholder fragments written by older runs
    /// and drop duplicates by the (name, update_date, platform) extras.
    /// Returns (descriptions cleaned, duplicates removed).
    pub fn cleanup(&self) -> Result<(usize, usize)> {
        let mut collection = self.load()?;

        let mut cleaned = 0;
        for record in &mut collection {
            let scrubbed = clean_description(&record.description);
            if scrubbed != record.description {
                record.description = scrubbed;
                cleaned += 1;
            }
        }

        let before = collection.len();
        let mut seen: HashSet<(String, String, String)> = HashSet::new();
        collection.retain(|record| {
            let key = (
                record.extra_str("name").to_string(),
                record.update_date.clone(),
                record.extra_str("platform").to_string(),
            );
            if seen.contains(&key) {
                warn!("Removing duplicate entry: {} ({})", record.extra_str("name"), record.update_date);
                return false;
            }
            seen.insert(key);
            true
        });
        let removed = before - collection.len();

        if cleaned > 0 || removed > 0 {
            self.save(&collection)?;
        }
        info!("Cleanup: {cleaned} descriptions cleaned, {removed} duplicates removed");
        Ok((cleaned, removed))
    }

    /// Write the whole collection. Serialization happens fully in memory and
    /// the bytes land in a sibling temp file that is renamed into place, so
    /// a failure at any point leaves the previous file untouched.
    pub fn save(&self, collection: &[UpdateRecord]) -> Result<()> {
        let json = serde_json::to_string_pretty(collection)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!("Wrote {} records to {:?}", collection.len(), self.path);
        Ok(())
    }
}
