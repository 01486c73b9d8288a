/// Media asset lifecycle coordination
///
/// Keeps a video's asset slots in agreement with the remote asset store
/// across publish, replacement and delete. The database is the source of
/// truth: a slot holding a URL is the only evidence an asset is live, so
/// the coordinator never leaves a slot pointing at a retired asset.
/// Remote assets left behind by a failed compensation are queued in
/// `pending_retirement` and retried by the job scheduler.

pub mod locks;
pub mod retirement;

pub use locks::KeyedLocks;
pub use retirement::RetirementQueue;

use crate::{
    asset_store::{public_id_from_url, AssetKind, AssetStore, RemoteAsset, StagedUpload},
    db::{self, models::Video},
    error::{HubError, HubResult},
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::{future::Future, sync::Arc, time::Duration};
use tokio::sync::OwnedMutexGuard;
use tracing::{error, info, warn};

/// Give up on a queued retirement after this many failed attempts
pub const MAX_RETIREMENT_ATTEMPTS: i64 = 10;

/// Writes of a revised record before its stale references are reported
const WRITE_ATTEMPTS: u32 = 3;

/// One of a video's two asset references
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The video file
    Primary,
    /// The thumbnail
    Secondary,
}

impl Slot {
    pub fn kind(self) -> AssetKind {
        match self {
            Slot::Primary => AssetKind::Video,
            Slot::Secondary => AssetKind::Image,
        }
    }

    pub fn current(self, video: &Video) -> &str {
        match self {
            Slot::Primary => &video.video_file,
            Slot::Secondary => &video.thumbnail,
        }
    }

    fn assign(self, video: &mut Video, asset: &RemoteAsset) {
        match self {
            Slot::Primary => {
                video.video_file = asset.url.clone();
                video.duration = asset.duration.unwrap_or(0.0);
            }
            Slot::Secondary => video.thumbnail = asset.url.clone(),
        }
    }

    /// Empty the slot; a video without a file cannot stay published
    fn clear(self, video: &mut Video) {
        match self {
            Slot::Primary => {
                video.video_file = String::new();
                video.duration = 0.0;
                video.is_published = false;
            }
            Slot::Secondary => video.thumbnail = String::new(),
        }
    }
}

/// Changes to an existing video, applied by [`MediaCoordinator::revise`]
#[derive(Debug, Default)]
pub struct Revision {
    pub title: Option<String>,
    pub description: Option<String>,
    pub video_file: Option<StagedUpload>,
    pub thumbnail: Option<StagedUpload>,
}

impl Revision {
    /// Requested replacements in retirement order, thumbnail first
    ///
    /// A late retirement failure clears the slots retired before it, and a
    /// cleared thumbnail costs less than an unpublished video.
    fn replacements(&mut self) -> Vec<(Slot, StagedUpload)> {
        let mut replacements = Vec::new();
        if let Some(staged) = self.thumbnail.take() {
            replacements.push((Slot::Secondary, staged));
        }
        if let Some(staged) = self.video_file.take() {
            replacements.push((Slot::Primary, staged));
        }
        replacements
    }
}

/// Caller-supplied fields of a new video
#[derive(Debug, Clone)]
pub struct VideoDraft {
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub is_published: bool,
}

/// Result of a delete: the removed record plus any retirements that failed
#[derive(Debug, Clone)]
pub struct DeleteReport {
    pub video: Video,
    pub retirement_failures: Vec<String>,
}

/// Counts from one pass over the retirement queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetrySummary {
    pub retired: u64,
    pub failed: u64,
    pub abandoned: u64,
}

/// Coordinates uploads and retirements with the video records
pub struct MediaCoordinator {
    db: SqlitePool,
    store: Arc<dyn AssetStore>,
    retirements: RetirementQueue,
    locks: KeyedLocks,
    timeout: Duration,
}

impl MediaCoordinator {
    pub fn new(db: SqlitePool, store: Arc<dyn AssetStore>, timeout: Duration) -> Self {
        Self {
            retirements: RetirementQueue::new(db.clone()),
            db,
            store,
            locks: KeyedLocks::new(),
            timeout,
        }
    }

    pub fn retirements(&self) -> &RetirementQueue {
        &self.retirements
    }

    /// Name of the configured asset store backend
    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    /// Serialize mutations of one video
    pub async fn lock_video(&self, video_id: &str) -> OwnedMutexGuard<()> {
        self.locks.lock(video_id).await
    }

    async fn bounded<T>(&self, op: &str, fut: impl Future<Output = HubResult<T>>) -> HubResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(HubError::AssetStoreUnavailable(format!(
                "{} {} timed out after {:?}",
                self.store.name(),
                op,
                self.timeout
            ))),
        }
    }

    /// Upload a staged file; the staged file is released whatever the outcome
    pub async fn upload(&self, staged: StagedUpload, kind: AssetKind) -> HubResult<RemoteAsset> {
        let size = staged.size();
        let result = self.bounded("upload", self.store.upload(&staged, kind)).await;
        staged.release();

        crate::metrics::record_asset_upload(kind.as_str(), result.is_ok());
        match &result {
            Ok(asset) => info!(kind = %kind, public_id = %asset.public_id, size, "Asset uploaded"),
            Err(e) => warn!(kind = %kind, size, error = %e, "Asset upload failed"),
        }
        result
    }

    /// Remove an asset from the store
    pub async fn retire(&self, public_id: &str, kind: AssetKind) -> HubResult<()> {
        let result = self.bounded("destroy", self.store.destroy(public_id, kind)).await;

        crate::metrics::record_asset_retirement(kind.as_str(), result.is_ok());
        match &result {
            Ok(()) => info!(kind = %kind, public_id, "Asset retired"),
            Err(e) => warn!(kind = %kind, public_id, error = %e, "Asset retirement failed"),
        }
        result
    }

    /// Retire the asset behind `url`, queueing it for retry on failure
    ///
    /// Returns a description of the failure, if any. An empty slot is a no-op.
    async fn retire_or_enqueue(&self, url: &str, kind: AssetKind) -> Option<String> {
        let public_id = public_id_from_url(url)?;

        match self.retire(&public_id, kind).await {
            Ok(()) => None,
            Err(e) => {
                if let Err(queue_err) = self.retirements.record_failure(&public_id, kind, &e).await {
                    error!(
                        kind = %kind,
                        public_id = %public_id,
                        error = %queue_err,
                        "Failed to queue asset for retirement retry"
                    );
                }
                Some(format!("{} {}: {}", kind, public_id, e))
            }
        }
    }

    /// Upload both assets, then create the record
    ///
    /// The record is written once, after both uploads settle. If the
    /// thumbnail upload or the insert fails, whatever was already uploaded
    /// is retired before the error is returned.
    pub async fn publish(
        &self,
        draft: VideoDraft,
        video_file: StagedUpload,
        thumbnail: Option<StagedUpload>,
    ) -> HubResult<Video> {
        let primary = self.upload(video_file, AssetKind::Video).await?;

        let secondary = match thumbnail {
            Some(staged) => match self.upload(staged, AssetKind::Image).await {
                Ok(asset) => Some(asset),
                Err(e) => {
                    warn!(public_id = %primary.public_id, "Thumbnail upload failed, retiring uploaded video");
                    self.retire_or_enqueue(&primary.url, AssetKind::Video).await;
                    return Err(e);
                }
            },
            None => None,
        };

        let now = Utc::now();
        let video = Video {
            id: db::new_id(),
            owner_id: draft.owner_id,
            title: draft.title,
            description: draft.description,
            video_file: primary.url.clone(),
            thumbnail: secondary.as_ref().map(|a| a.url.clone()).unwrap_or_default(),
            duration: primary.duration.unwrap_or(0.0),
            views: 0,
            is_published: draft.is_published,
            created_at: now,
            updated_at: now,
        };

        let inserted = sqlx::query(
            "INSERT INTO video (id, owner_id, title, description, video_file, thumbnail, duration, views, is_published, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&video.id)
        .bind(&video.owner_id)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.video_file)
        .bind(&video.thumbnail)
        .bind(video.duration)
        .bind(video.views)
        .bind(video.is_published)
        .bind(video.created_at)
        .bind(video.updated_at)
        .execute(&self.db)
        .await;

        if let Err(e) = inserted {
            error!(error = %e, "Failed to persist published video, retiring its assets");
            futures::join!(
                self.retire_or_enqueue(&video.video_file, AssetKind::Video),
                self.retire_or_enqueue(&video.thumbnail, AssetKind::Image),
            );
            return Err(e.into());
        }

        info!(video_id = %video.id, owner_id = %video.owner_id, "Video published");
        Ok(video)
    }

    async fn write_video(&self, video: &Video) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE video
             SET title = ?1, description = ?2, video_file = ?3, thumbnail = ?4,
                 duration = ?5, is_published = ?6, updated_at = ?7
             WHERE id = ?8",
        )
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.video_file)
        .bind(&video.thumbnail)
        .bind(video.duration)
        .bind(video.is_published)
        .bind(video.updated_at)
        .bind(&video.id)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    /// Write a revised record, retrying since its old assets may be gone
    ///
    /// If every attempt fails while `stale` is non-empty, the row still
    /// references retired assets. That is logged with the stale URLs and
    /// counted under `StaleAssetReference`.
    async fn persist(&self, video: &Video, stale: &[String]) -> HubResult<()> {
        let mut attempt = 1;
        loop {
            match self.write_video(video).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < WRITE_ATTEMPTS => {
                    warn!(video_id = %video.id, attempt, error = %e, "Video write failed, retrying");
                    tokio::time::sleep(Duration::from_millis(50 * u64::from(attempt))).await;
                    attempt += 1;
                }
                Err(e) => {
                    if !stale.is_empty() {
                        error!(
                            video_id = %video.id,
                            stale_urls = ?stale,
                            error = %e,
                            "Video record still references retired assets"
                        );
                        crate::metrics::record_error("StaleAssetReference");
                    }
                    return Err(e.into());
                }
            }
        }
    }

    /// Apply a revision: retire replaced assets, upload, then write once
    ///
    /// The caller must hold the video's lock and have checked ownership.
    /// Every replaced slot's old asset is retired before any upload starts,
    /// thumbnail first. A failed retirement aborts with no upload attempted;
    /// slots already retired by then are cleared so the record never points
    /// at a retired asset, and nothing else changes. A failed upload clears
    /// its slot and drops the metadata changes. Slots and metadata are
    /// written together in one statement.
    pub async fn revise(&self, mut video: Video, mut revision: Revision) -> HubResult<Video> {
        let replacements = revision.replacements();

        let mut stale = Vec::new();
        let mut retired: Vec<Slot> = Vec::new();
        for (slot, _) in &replacements {
            let old_url = slot.current(&video).to_string();
            let Some(old_id) = public_id_from_url(&old_url) else {
                continue;
            };

            if let Err(e) = self.retire(&old_id, slot.kind()).await {
                warn!(video_id = %video.id, ?slot, "Old asset not retired, update aborted");
                if !retired.is_empty() {
                    for slot in &retired {
                        slot.clear(&mut video);
                    }
                    video.updated_at = Utc::now();
                    self.persist(&video, &stale).await?;
                }
                return Err(e);
            }
            retired.push(*slot);
            stale.push(old_url);
        }

        let mut uploaded = Vec::new();
        let mut failure = None;
        for (slot, staged) in replacements {
            match self.upload(staged, slot.kind()).await {
                Ok(asset) => {
                    slot.assign(&mut video, &asset);
                    uploaded.push((slot.kind(), asset.url));
                }
                Err(e) => {
                    warn!(video_id = %video.id, ?slot, "Replacement upload failed, clearing slot");
                    slot.clear(&mut video);
                    if failure.is_none() {
                        failure = Some(e);
                    }
                }
            }
        }

        if failure.is_none() {
            if let Some(title) = revision.title.take() {
                video.title = title;
            }
            if let Some(description) = revision.description.take() {
                video.description = description;
            }
        }
        video.updated_at = Utc::now();

        if let Err(e) = self.persist(&video, &stale).await {
            // Nothing references the new uploads
            for (kind, url) in &uploaded {
                self.retire_or_enqueue(url, *kind).await;
            }
            return Err(e);
        }

        match failure {
            Some(e) => Err(e),
            None => {
                info!(video_id = %video.id, replaced = uploaded.len(), "Video revised");
                Ok(video)
            }
        }
    }

    /// Delete the record, then retire both slots independently
    ///
    /// The caller must hold the video's lock and have checked ownership.
    /// Retirement failures are queued and reported but never restore the
    /// record.
    pub async fn delete(&self, video: Video) -> HubResult<DeleteReport> {
        sqlx::query("DELETE FROM video WHERE id = ?1")
            .bind(&video.id)
            .execute(&self.db)
            .await?;

        let (primary, secondary) = futures::join!(
            self.retire_or_enqueue(&video.video_file, AssetKind::Video),
            self.retire_or_enqueue(&video.thumbnail, AssetKind::Image),
        );

        let retirement_failures: Vec<String> = primary.into_iter().chain(secondary).collect();
        if retirement_failures.is_empty() {
            info!(video_id = %video.id, "Video deleted");
        } else {
            warn!(
                video_id = %video.id,
                failures = ?retirement_failures,
                "Video deleted, some assets queued for retirement retry"
            );
        }

        Ok(DeleteReport {
            video,
            retirement_failures,
        })
    }

    /// Retry queued retirements, oldest first
    pub async fn retry_pending(&self, batch: i64) -> HubResult<RetrySummary> {
        let mut summary = RetrySummary::default();

        for entry in self.retirements.due(batch).await? {
            let Some(kind) = AssetKind::parse(&entry.kind) else {
                warn!(public_id = %entry.public_id, kind = %entry.kind, "Skipping queued retirement of unknown kind");
                continue;
            };

            match self.retire(&entry.public_id, kind).await {
                Ok(()) => {
                    self.retirements.resolve(&entry.public_id, kind).await?;
                    summary.retired += 1;
                }
                Err(e) if entry.attempts + 1 >= MAX_RETIREMENT_ATTEMPTS => {
                    error!(
                        public_id = %entry.public_id,
                        kind = %kind,
                        attempts = entry.attempts + 1,
                        error = %e,
                        "Giving up on asset retirement"
                    );
                    self.retirements.resolve(&entry.public_id, kind).await?;
                    summary.abandoned += 1;
                }
                Err(e) => {
                    self.retirements.record_failure(&entry.public_id, kind, &e).await?;
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }
}
