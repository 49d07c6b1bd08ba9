//! Backend-first progress client with a local fallback cache.

use std::collections::HashMap;

use chrono::Utc;
use roadmap_core::progress::ProgressStatus;
use roadmap_core::roadmap::Roadmap;
use roadmap_core::stats::completion_percentage;
use roadmap_core::types::Timestamp;
use serde::Serialize;

use crate::api::{BackendApi, RemoteRecord};
use crate::cache::{CacheEntry, CachedItem, ProgressCache, SyncState};
use crate::config::ClientConfig;
use crate::error::ClientError;

/// Progress of a single item, from the backend or the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemProgress {
    pub item_id: String,
    pub phase_id: String,
    pub section_id: String,
    pub status: ProgressStatus,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub sync: SyncState,
}

impl ItemProgress {
    fn from_remote(record: RemoteRecord) -> Self {
        Self {
            item_id: record.item_id,
            phase_id: record.phase_id,
            section_id: record.section_id,
            status: record.status,
            started_at: record.started_at,
            completed_at: record.completed_at,
            sync: SyncState::Synced,
        }
    }

    fn from_cache(entry: CacheEntry) -> Self {
        Self {
            status: entry.item.status(),
            started_at: entry.item.started_at,
            completed_at: entry.item.completed_at,
            sync: entry.item.sync,
            item_id: entry.item_id,
            phase_id: entry.phase_id,
            section_id: entry.section_id,
        }
    }
}

/// Completion counts measured against the curriculum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub total_items: u64,
    pub completed_items: u64,
    pub in_progress_items: u64,
    pub not_started_items: u64,
    pub completion_percentage: u32,
}

impl ProgressSummary {
    fn new(total_items: u64, completed_items: u64, in_progress_items: u64) -> Self {
        Self {
            total_items,
            completed_items,
            in_progress_items,
            not_started_items: total_items.saturating_sub(completed_items + in_progress_items),
            completion_percentage: completion_percentage(completed_items, total_items),
        }
    }
}

/// Outcome of [`ProgressClient::sync_progress_with_backend`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Local writes accepted by the backend.
    pub pushed: usize,
    /// Synced entries the backend disagreed with; backend values kept.
    pub conflicts: usize,
    /// Pushes that failed; those entries stay pending.
    pub failed: usize,
}

/// Progress client for one user.
pub struct ProgressClient {
    api: BackendApi,
    cache: ProgressCache,
    roadmap: Roadmap,
}

impl ProgressClient {
    /// Open the client, loading the cache and the bundled curriculum.
    pub async fn open(config: ClientConfig) -> Result<Self, ClientError> {
        Self::with_roadmap(config, Roadmap::builtin()?).await
    }

    pub async fn with_roadmap(config: ClientConfig, roadmap: Roadmap) -> Result<Self, ClientError> {
        let api = BackendApi::new(&config)?;
        let cache = ProgressCache::load(&config.cache_path).await?;
        Ok(Self { api, cache, roadmap })
    }

    /// Bearer token sent with every request.
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.api.set_token(token);
    }

    pub fn cache(&self) -> &ProgressCache {
        &self.cache
    }

    pub async fn mark_completed(
        &mut self,
        item_id: &str,
        phase_id: &str,
        section_id: &str,
    ) -> Result<SyncState, ClientError> {
        self.mark(item_id, phase_id, section_id, ProgressStatus::Completed).await
    }

    pub async fn mark_in_progress(
        &mut self,
        item_id: &str,
        phase_id: &str,
        section_id: &str,
    ) -> Result<SyncState, ClientError> {
        self.mark(item_id, phase_id, section_id, ProgressStatus::InProgress).await
    }

    pub async fn mark_not_started(
        &mut self,
        item_id: &str,
        phase_id: &str,
        section_id: &str,
    ) -> Result<SyncState, ClientError> {
        self.mark(item_id, phase_id, section_id, ProgressStatus::NotStarted).await
    }

    /// Write to the backend, mirror the answer into the cache, and fall back
    /// to a pending local write when the backend is unavailable.
    ///
    /// Returns `Synced` when the backend took the write, `PendingPush` when
    /// only the cache did.
    async fn mark(
        &mut self,
        item_id: &str,
        phase_id: &str,
        section_id: &str,
        status: ProgressStatus,
    ) -> Result<SyncState, ClientError> {
        let state = match self
            .api
            .upsert_progress(item_id, phase_id, section_id, status)
            .await
        {
            Ok(record) => {
                self.mirror(&record, SyncState::Synced);
                SyncState::Synced
            }
            Err(e) if e.is_fallback_eligible() => {
                tracing::warn!(item_id, error = %e, "Backend unavailable, caching progress locally");
                match CachedItem::local(status, Utc::now()) {
                    Some(item) => self.cache.put(phase_id, section_id, item_id, item),
                    None => self.cache.bury(phase_id, section_id, item_id),
                }
                SyncState::PendingPush
            }
            Err(e) => return Err(e),
        };
        self.cache.save().await?;
        Ok(state)
    }

    /// Backend record for `item_id`, or the cached entry when the backend is
    /// unavailable.
    pub async fn get_item_progress(&self, item_id: &str) -> Result<Option<ItemProgress>, ClientError> {
        match self.api.get_item(item_id).await {
            Ok(record) => Ok(record.map(ItemProgress::from_remote)),
            Err(e) if e.is_fallback_eligible() => {
                tracing::warn!(item_id, error = %e, "Backend unavailable, reading cached progress");
                Ok(self.cache.find(item_id).map(ItemProgress::from_cache))
            }
            Err(e) => Err(e),
        }
    }

    /// Progress over the whole curriculum.
    pub async fn calculate_overall_progress(&self) -> Result<ProgressSummary, ClientError> {
        let total = self.roadmap.total_items() as u64;
        match self.api.overview().await {
            Ok(overview) => Ok(ProgressSummary::new(
                total,
                overview.completed_items,
                overview.in_progress_items,
            )),
            Err(e) if e.is_fallback_eligible() => {
                tracing::warn!(error = %e, "Backend unavailable, computing progress from cache");
                Ok(self.summarize(None))
            }
            Err(e) => Err(e),
        }
    }

    /// Progress within one phase. An unknown phase has no items.
    pub async fn calculate_phase_progress(&self, phase_id: &str) -> Result<ProgressSummary, ClientError> {
        let total = self
            .roadmap
            .phase(phase_id)
            .map_or(0, |p| p.total_items() as u64);
        match self.api.phase_progress(phase_id).await {
            Ok(sections) => {
                let completed = sections.iter().map(|s| s.completed_items).sum();
                let in_progress = sections.iter().map(|s| s.in_progress_items).sum();
                Ok(ProgressSummary::new(total, completed, in_progress))
            }
            Err(e) if e.is_fallback_eligible() => {
                tracing::warn!(phase_id, error = %e, "Backend unavailable, computing phase progress from cache");
                Ok(self.summarize(Some(phase_id)))
            }
            Err(e) => Err(e),
        }
    }

    /// Walk the curriculum (or one phase of it) against the cache.
    fn summarize(&self, phase_id: Option<&str>) -> ProgressSummary {
        let (mut total, mut completed, mut in_progress) = (0, 0, 0);
        for loc in self
            .roadmap
            .items()
            .filter(|loc| phase_id.map_or(true, |p| loc.phase_id == p))
        {
            total += 1;
            match self
                .cache
                .get(loc.phase_id, loc.section_id, &loc.item.id)
                .map(CachedItem::status)
            {
                Some(ProgressStatus::Completed) => completed += 1,
                Some(ProgressStatus::InProgress) => in_progress += 1,
                _ => {}
            }
        }
        ProgressSummary::new(total, completed, in_progress)
    }

    /// Reconcile the cache with the backend.
    ///
    /// Pending entries, and entries the backend has never seen, are pushed.
    /// Pending not-started resets are pushed as `not-started` writes. A
    /// synced entry whose status differs from the backend takes the
    /// backend's values and is marked `Conflict`. Fails only when the
    /// backend listing itself cannot be fetched.
    pub async fn sync_progress_with_backend(&mut self) -> Result<SyncReport, ClientError> {
        let remote: HashMap<String, RemoteRecord> = self
            .api
            .list_all()
            .await?
            .into_iter()
            .map(|r| (r.item_id.clone(), r))
            .collect();
        let mut report = SyncReport::default();

        for entry in self.cache.entries() {
            let server = remote.get(&entry.item_id);
            let needs_push = entry.item.sync == SyncState::PendingPush || server.is_none();
            if needs_push {
                self.push(&entry.item_id, &entry.phase_id, &entry.section_id, entry.item.status(), &mut report)
                    .await;
                continue;
            }
            if let Some(record) = server {
                if record.status != entry.item.status() {
                    tracing::info!(item_id = %entry.item_id, "Backend and cache disagree, keeping backend value");
                    self.cache.remove(&entry.phase_id, &entry.section_id, &entry.item_id);
                    self.mirror(record, SyncState::Conflict);
                    report.conflicts += 1;
                }
            }
        }

        for (item_id, tombstone) in self.cache.tombstones() {
            self.push(
                &item_id,
                &tombstone.phase_id,
                &tombstone.section_id,
                ProgressStatus::NotStarted,
                &mut report,
            )
            .await;
        }

        self.cache.save().await?;
        tracing::info!(
            pushed = report.pushed,
            conflicts = report.conflicts,
            failed = report.failed,
            "Progress sync finished"
        );
        Ok(report)
    }

    async fn push(
        &mut self,
        item_id: &str,
        phase_id: &str,
        section_id: &str,
        status: ProgressStatus,
        report: &mut SyncReport,
    ) {
        match self
            .api
            .upsert_progress(item_id, phase_id, section_id, status)
            .await
        {
            Ok(record) => {
                self.cache.remove(phase_id, section_id, item_id);
                self.cache.clear_tombstone(item_id);
                self.mirror(&record, SyncState::Synced);
                report.pushed += 1;
            }
            Err(e) => {
                tracing::warn!(item_id, error = %e, "Failed to push cached progress");
                report.failed += 1;
            }
        }
    }

    /// Store a backend record in the cache; not-started records clear the
    /// entry instead.
    fn mirror(&mut self, record: &RemoteRecord, sync: SyncState) {
        match CachedItem::from_remote(record, sync) {
            Some(item) => self.cache.put(&record.phase_id, &record.section_id, &record.item_id, item),
            None => {
                self.cache.remove(&record.phase_id, &record.section_id, &record.item_id);
                self.cache.clear_tombstone(&record.item_id);
            }
        }
    }
}
