//! Usage tracking with frecency scores.
//!
//! Frecency combines frequency (how often) and recency (how recently) using
//! exponential decay:
//!
//! ```text
//! score = 0.4 × 10 × ln(count + 1) + 0.6 × 100 × e^(-λ × age_days)
//! λ = ln(2) / half_life_days
//! ```
//!
//! With a 14-day half-life, an item used 14 days ago has half the recency
//! weight of an item used today. Providers read the score into
//! `Candidate::usage`, where it only breaks ties between equal rank scores.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::{Candidate, Category};
use crate::error::OrbitResult;

const HALF_LIFE_DAYS: f64 = 14.0;

/// λ = ln(2) / half_life
const LAMBDA: f64 = std::f64::consts::LN_2 / HALF_LIFE_DAYS;

/// Entries unused for this long are pruned on load.
const MAX_AGE_DAYS: u64 = 90;

/// Save after this many recorded activations.
const SAVE_DEBOUNCE_COUNT: u32 = 5;

const SECS_PER_DAY: f64 = 86_400.0;

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageEntry {
    category: Category,
    identity: String,
    count: u32,
    last_used: u64,
    first_used: u64,
}

impl UsageEntry {
    fn score_at(&self, now: u64) -> f64 {
        let age_days = now.saturating_sub(self.last_used) as f64 / SECS_PER_DAY;
        let frequency = (f64::from(self.count) + 1.0).ln();
        let recency = (-LAMBDA * age_days).exp();
        0.4 * frequency * 10.0 + 0.6 * recency * 100.0
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UsageData {
    entries: HashMap<String, UsageEntry>,

    #[serde(skip)]
    unsaved: u32,
}

impl UsageData {
    fn key(category: Category, identity: &str) -> String {
        format!("{}:{identity}", category.label().to_lowercase())
    }

    fn record_at(&mut self, category: Category, identity: &str, now: u64) {
        self.entries
            .entry(Self::key(category, identity))
            .and_modify(|entry| {
                entry.count = entry.count.saturating_add(1);
                entry.last_used = now;
            })
            .or_insert_with(|| UsageEntry {
                category,
                identity: identity.to_string(),
                count: 1,
                last_used: now,
                first_used: now,
            });
        self.unsaved += 1;
    }

    fn prune_at(&mut self, now: u64) -> usize {
        let cutoff = now.saturating_sub(MAX_AGE_DAYS * SECS_PER_DAY as u64);
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.last_used > cutoff);
        before - self.entries.len()
    }
}

/// Thread-safe usage counter shared by providers and the dispatcher.
#[derive(Debug, Default)]
pub struct UsageTracker {
    data: RwLock<UsageData>,
    path: Option<PathBuf>,
}

impl UsageTracker {
    /// A tracker that never touches the disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load from `path`. A missing or corrupted file yields an empty tracker.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut data = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "ignoring corrupted usage data");
                UsageData::default()
            }),
            Err(_) => UsageData::default(),
        };

        let pruned = data.prune_at(now_secs());
        if pruned > 0 {
            debug!(pruned, "pruned stale usage entries");
            data.unsaved += 1;
        }

        Self {
            data: RwLock::new(data),
            path: Some(path),
        }
    }

    /// Load from `usage.json` in the given data directory.
    pub fn load_from_dir(data_dir: &Path) -> Self {
        Self::load(data_dir.join("usage.json"))
    }

    /// Frecency score for an entity; 0.0 if it was never used.
    pub fn score(&self, category: Category, identity: &str) -> f64 {
        self.score_at(category, identity, now_secs())
    }

    fn score_at(&self, category: Category, identity: &str, now: u64) -> f64 {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .get(&UsageData::key(category, identity))
            .map_or(0.0, |entry| entry.score_at(now))
    }

    /// Record an activation. Saves every few records.
    pub fn record(&self, category: Category, identity: &str) {
        let due = {
            let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
            data.record_at(category, identity, now_secs());
            data.unsaved >= SAVE_DEBOUNCE_COUNT
        };

        if due {
            if let Err(e) = self.flush() {
                warn!(error = %e, "failed to save usage data");
            }
        }
    }

    pub fn record_candidate(&self, candidate: &Candidate) {
        self.record(candidate.category, &candidate.identity);
    }

    /// Identities of a category ordered by descending score, at most `limit`.
    pub fn most_used(&self, category: Category, limit: usize) -> Vec<(String, f64)> {
        let now = now_secs();
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);

        let mut ranked: Vec<(String, f64)> = data
            .entries
            .values()
            .filter(|entry| entry.category == category)
            .map(|entry| (entry.identity.clone(), entry.score_at(now)))
            .collect();

        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(limit);
        ranked
    }

    /// Write pending changes to disk.
    pub fn flush(&self) -> OrbitResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let (json, pending) = {
            let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
            if data.unsaved == 0 {
                return Ok(());
            }
            (serde_json::to_string_pretty(&*data)?, data.unsaved)
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;

        // Records made during the write stay pending
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.unsaved = data.unsaved.saturating_sub(pending);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: u64 = 86_400;

    #[test]
    fn test_unknown_item_scores_zero() {
        let tracker = UsageTracker::in_memory();
        assert_eq!(tracker.score(Category::Application, "firefox"), 0.0);
    }

    #[test]
    fn test_recorded_item_scores_positive() {
        let tracker = UsageTracker::in_memory();
        tracker.record(Category::Application, "firefox");

        let score = tracker.score(Category::Application, "firefox");
        assert!(score > 0.0 && score < 100.0, "score out of range: {score}");
    }

    #[test]
    fn test_category_is_part_of_the_key() {
        let tracker = UsageTracker::in_memory();
        tracker.record(Category::Bookmark, "https://example.com");
        assert_eq!(tracker.score(Category::Clipboard, "https://example.com"), 0.0);
    }

    #[test]
    fn test_frequent_use_increases_score() {
        let tracker = UsageTracker::in_memory();
        tracker.record(Category::Application, "code");
        let once = tracker.score(Category::Application, "code");

        for _ in 0..10 {
            tracker.record(Category::Application, "code");
        }
        assert!(tracker.score(Category::Application, "code") > once);
    }

    #[test]
    fn test_recency_halves_after_half_life() {
        let mut data = UsageData::default();
        data.record_at(Category::Application, "a", 0);
        let entry = &data.entries[&UsageData::key(Category::Application, "a")];

        let fresh = entry.score_at(0);
        let aged = entry.score_at(14 * DAY);
        let frequency_part = 0.4 * 2f64.ln() * 10.0;

        let ratio = (aged - frequency_part) / (fresh - frequency_part);
        assert!((ratio - 0.5).abs() < 1e-9, "ratio was {ratio}");
    }

    #[test]
    fn test_prune_drops_entries_older_than_max_age() {
        let mut data = UsageData::default();
        data.record_at(Category::Application, "old", 0);
        data.record_at(Category::Application, "new", 80 * DAY);

        assert_eq!(data.prune_at(100 * DAY), 1);
        assert!(data.entries.contains_key("application:new"));
    }

    #[test]
    fn test_most_used_orders_by_score() {
        let tracker = UsageTracker::in_memory();
        for _ in 0..3 {
            tracker.record(Category::Application, "terminal");
        }
        tracker.record(Category::Application, "files");
        tracker.record(Category::File, "/tmp/x");

        let top = tracker.most_used(Category::Application, 5);
        let ids: Vec<&str> = top.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["terminal", "files"]);

        assert_eq!(tracker.most_used(Category::Application, 1).len(), 1);
    }

    #[test]
    fn test_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = UsageTracker::load_from_dir(dir.path());
        tracker.record(Category::SystemCommand, "system:lock");
        tracker.flush().unwrap();

        let reloaded = UsageTracker::load_from_dir(dir.path());
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.score(Category::SystemCommand, "system:lock") > 0.0);
    }

    #[test]
    fn test_corrupted_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(UsageTracker::load(&path).is_empty());
    }

    #[test]
    fn test_debounced_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("usage.json");
        let tracker = UsageTracker::load(&path);

        for _ in 0..SAVE_DEBOUNCE_COUNT {
            tracker.record(Category::Application, "editor");
        }
        assert!(path.exists());
    }

    #[test]
    fn test_failed_write_keeps_changes_pending() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in place of the file makes every write fail
        let path = dir.path().join("usage.json");
        fs::create_dir(&path).unwrap();

        let tracker = UsageTracker::load(&path);
        tracker.record(Category::Application, "editor");

        assert!(tracker.flush().is_err());
        assert!(tracker.flush().is_err());

        fs::remove_dir(&path).unwrap();
        tracker.flush().unwrap();
        assert!(UsageTracker::load(&path).score(Category::Application, "editor") > 0.0);
    }

    #[test]
    fn test_flush_without_changes_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.json");
        let tracker = UsageTracker::load(&path);

        tracker.flush().unwrap();
        assert!(!path.exists());
    }
}
