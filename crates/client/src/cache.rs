//! Local progress cache persisted as a JSON file.
//!
//! Layout on disk:
//!
//! ```json
//! {
//!   "progress": { "phase1": { "month1": { "html-css": { "completed": true, "completedAt": "...", "sync": "synced" } } } },
//!   "tombstones": { "git": { "phaseId": "phase1", "sectionId": "month1" } }
//! }
//! ```
//!
//! Writes go to a sibling temp file which is then renamed over the cache,
//! so a crash mid-write never leaves a truncated file behind.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use roadmap_core::progress::ProgressStatus;
use roadmap_core::types::Timestamp;
use serde::{Deserialize, Serialize};

use crate::api::RemoteRecord;
use crate::error::ClientError;

type Sections = BTreeMap<String, BTreeMap<String, CachedItem>>;

/// How a cached entry relates to the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncState {
    /// Matches what the backend last returned.
    #[default]
    Synced,
    /// Written while the backend was unreachable; not yet pushed.
    PendingPush,
    /// The backend disagreed with a synced entry and its values were taken.
    Conflict,
}

/// Cached state of one item. Not-started items are simply absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedItem {
    #[serde(default, skip_serializing_if = "is_false")]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub in_progress: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
    #[serde(default)]
    pub sync: SyncState,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl CachedItem {
    /// Entry for a write made without the backend. `None` for not-started.
    pub fn local(status: ProgressStatus, now: Timestamp) -> Option<Self> {
        let (completed, in_progress) = match status {
            ProgressStatus::Completed => (true, false),
            ProgressStatus::InProgress => (false, true),
            ProgressStatus::NotStarted => return None,
        };
        Some(Self {
            completed,
            in_progress,
            started_at: in_progress.then_some(now),
            completed_at: completed.then_some(now),
            sync: SyncState::PendingPush,
        })
    }

    /// Entry mirroring a backend record. `None` for not-started.
    pub fn from_remote(record: &RemoteRecord, sync: SyncState) -> Option<Self> {
        let (completed, in_progress) = match record.status {
            ProgressStatus::Completed => (true, false),
            ProgressStatus::InProgress => (false, true),
            ProgressStatus::NotStarted => return None,
        };
        Some(Self {
            completed,
            in_progress,
            started_at: record.started_at,
            completed_at: record.completed_at,
            sync,
        })
    }

    pub fn status(&self) -> ProgressStatus {
        if self.completed {
            ProgressStatus::Completed
        } else if self.in_progress {
            ProgressStatus::InProgress
        } else {
            ProgressStatus::NotStarted
        }
    }
}

/// Locators of an item reset to not-started while offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tombstone {
    pub phase_id: String,
    pub section_id: String,
}

/// A cached item together with where it sits in the curriculum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub phase_id: String,
    pub section_id: String,
    pub item_id: String,
    pub item: CachedItem,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    #[serde(default)]
    progress: BTreeMap<String, Sections>,
    #[serde(default)]
    tombstones: BTreeMap<String, Tombstone>,
}

/// In-memory copy of the cache file. Call [`ProgressCache::save`] to persist.
#[derive(Debug)]
pub struct ProgressCache {
    path: PathBuf,
    state: CacheFile,
}

impl ProgressCache {
    /// Load the cache at `path`; a missing file is an empty cache.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let path = path.into();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CacheFile::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, state })
    }

    /// Write the cache via temp file + rename.
    pub async fn save(&self) -> Result<(), ClientError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let tmp = temp_path(&self.path);
        let bytes = serde_json::to_vec_pretty(&self.state)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, phase_id: &str, section_id: &str, item_id: &str) -> Option<&CachedItem> {
        self.state.progress.get(phase_id)?.get(section_id)?.get(item_id)
    }

    /// Look an item up by id alone.
    pub fn find(&self, item_id: &str) -> Option<CacheEntry> {
        self.entries().into_iter().find(|e| e.item_id == item_id)
    }

    /// Store `item`, replacing any previous entry or tombstone for it.
    pub fn put(&mut self, phase_id: &str, section_id: &str, item_id: &str, item: CachedItem) {
        self.state.tombstones.remove(item_id);
        self.state
            .progress
            .entry(phase_id.to_string())
            .or_default()
            .entry(section_id.to_string())
            .or_default()
            .insert(item_id.to_string(), item);
    }

    /// Drop an entry, pruning its section and phase when they empty.
    pub fn remove(&mut self, phase_id: &str, section_id: &str, item_id: &str) -> Option<CachedItem> {
        let sections = self.state.progress.get_mut(phase_id)?;
        let items = sections.get_mut(section_id)?;
        let removed = items.remove(item_id);
        if items.is_empty() {
            sections.remove(section_id);
        }
        if sections.is_empty() {
            self.state.progress.remove(phase_id);
        }
        removed
    }

    /// Remove an entry and remember that the reset still has to be pushed.
    pub fn bury(&mut self, phase_id: &str, section_id: &str, item_id: &str) {
        self.remove(phase_id, section_id, item_id);
        self.state.tombstones.insert(
            item_id.to_string(),
            Tombstone {
                phase_id: phase_id.to_string(),
                section_id: section_id.to_string(),
            },
        );
    }

    pub fn clear_tombstone(&mut self, item_id: &str) {
        self.state.tombstones.remove(item_id);
    }

    /// Snapshot of every entry, ordered by phase, section, item.
    pub fn entries(&self) -> Vec<CacheEntry> {
        self.state
            .progress
            .iter()
            .flat_map(|(phase_id, sections)| {
                sections.iter().flat_map(move |(section_id, items)| {
                    items.iter().map(move |(item_id, item)| CacheEntry {
                        phase_id: phase_id.clone(),
                        section_id: section_id.clone(),
                        item_id: item_id.clone(),
                        item: item.clone(),
                    })
                })
            })
            .collect()
    }

    pub fn tombstones(&self) -> Vec<(String, Tombstone)> {
        self.state
            .tombstones
            .iter()
            .map(|(id, t)| (id.clone(), t.clone()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.state.progress.is_empty() && self.state.tombstones.is_empty()
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
