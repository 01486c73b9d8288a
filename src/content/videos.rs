/// Video catalogue
use super::required_text;
use crate::{
    asset_store::StagedUpload,
    db::models::Video,
    error::{HubError, HubResult},
    guard,
    media::{DeleteReport, MediaCoordinator, Revision, VideoDraft},
    pagination::{self, ListQuery, Listing, Page, PageRequest, Sort, SortDirection},
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

pub const VIDEOS: Listing = Listing {
    columns: "*",
    source: "video",
    sortable: &[
        ("createdAt", "created_at"),
        ("updatedAt", "updated_at"),
        ("title", "title"),
        ("duration", "duration"),
        ("views", "views"),
    ],
    default_sort: ("createdAt", SortDirection::Desc),
    tiebreak: "rowid",
};

/// Filter stage of a video listing
#[derive(Debug, Clone, Default)]
pub struct VideoFilters {
    /// Case-insensitive title substring
    pub query: Option<String>,
    /// Exact owner id
    pub user_id: Option<String>,
}

/// Requested changes to a video
#[derive(Debug, Default)]
pub struct VideoUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub video_file: Option<StagedUpload>,
    pub thumbnail: Option<StagedUpload>,
}

impl VideoUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.video_file.is_none()
            && self.thumbnail.is_none()
    }
}

/// Thumbnails must be a recognised image format
async fn check_thumbnail(staged: Option<&StagedUpload>) -> HubResult<()> {
    if let Some(staged) = staged {
        if staged.is_empty() {
            return Err(HubError::Validation("thumbnail file is empty".to_string()));
        }
        staged.sniff_image_format().await?;
    }
    Ok(())
}

fn check_video_file(staged: &StagedUpload) -> HubResult<()> {
    if staged.is_empty() {
        return Err(HubError::Validation("video file is empty".to_string()));
    }
    Ok(())
}

/// Video manager
pub struct VideoManager {
    db: SqlitePool,
    media: Arc<MediaCoordinator>,
}

impl VideoManager {
    pub fn new(db: SqlitePool, media: Arc<MediaCoordinator>) -> Self {
        Self { db, media }
    }

    pub async fn find(&self, video_id: &str) -> HubResult<Option<Video>> {
        let video = sqlx::query_as::<_, Video>("SELECT * FROM video WHERE id = ?1")
            .bind(video_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(video)
    }

    pub async fn get_by_id(&self, video_id: &str) -> HubResult<Video> {
        self.find(video_id)
            .await?
            .ok_or_else(|| HubError::NotFound("video not found".to_string()))
    }

    /// Filtered, sorted page of videos
    pub async fn list(
        &self,
        filters: VideoFilters,
        sort: Sort,
        page: PageRequest,
    ) -> HubResult<Page<Video>> {
        let query = ListQuery::new(sort, page)
            .contains("title", filters.query)
            .eq("owner_id", filters.user_id);
        pagination::fetch_page(&self.db, &VIDEOS, &query).await
    }

    /// Upload a new video with an optional thumbnail
    pub async fn publish(
        &self,
        actor_id: &str,
        title: &str,
        description: Option<&str>,
        video_file: StagedUpload,
        thumbnail: Option<StagedUpload>,
    ) -> HubResult<Video> {
        let title = required_text("title", title)?;
        check_video_file(&video_file)?;
        check_thumbnail(thumbnail.as_ref()).await?;

        let draft = VideoDraft {
            owner_id: actor_id.to_string(),
            title,
            description: description.map(|d| d.trim().to_string()).unwrap_or_default(),
            is_published: true,
        };
        self.media.publish(draft, video_file, thumbnail).await
    }

    /// Change metadata and/or replace assets
    ///
    /// Every replaced asset is retired before any upload starts, and the
    /// record is written once. Metadata changes apply only when every
    /// requested replacement succeeded.
    pub async fn update(
        &self,
        actor_id: &str,
        video_id: &str,
        changes: VideoUpdate,
    ) -> HubResult<Video> {
        if changes.is_empty() {
            return Err(HubError::Validation(
                "at least one field must be provided".to_string(),
            ));
        }
        let title = changes
            .title
            .as_deref()
            .map(|t| required_text("title", t))
            .transpose()?;
        if let Some(staged) = &changes.video_file {
            check_video_file(staged)?;
        }
        check_thumbnail(changes.thumbnail.as_ref()).await?;

        let _guard = self.media.lock_video(video_id).await;
        let video = guard::require_owner(actor_id, self.find(video_id).await?)?;

        let revision = Revision {
            title,
            description: changes.description.map(|d| d.trim().to_string()),
            video_file: changes.video_file,
            thumbnail: changes.thumbnail,
        };
        let video = self.media.revise(video, revision).await?;

        info!(video_id = %video.id, "Video updated");
        Ok(video)
    }

    /// Remove a video and retire its assets
    pub async fn delete(&self, actor_id: &str, video_id: &str) -> HubResult<DeleteReport> {
        let _guard = self.media.lock_video(video_id).await;
        let video = guard::require_owner(actor_id, self.find(video_id).await?)?;
        self.media.delete(video).await
    }

    /// Flip the published flag
    pub async fn toggle_publish(&self, actor_id: &str, video_id: &str) -> HubResult<Video> {
        let _guard = self.media.lock_video(video_id).await;
        let mut video = guard::require_owner(actor_id, self.find(video_id).await?)?;

        if !video.is_published && video.video_file.is_empty() {
            return Err(HubError::Validation(
                "a video without a video file cannot be published".to_string(),
            ));
        }

        video.is_published = !video.is_published;
        video.updated_at = Utc::now();
        sqlx::query("UPDATE video SET is_published = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(video.is_published)
            .bind(video.updated_at)
            .bind(&video.id)
            .execute(&self.db)
            .await?;

        info!(video_id = %video.id, is_published = video.is_published, "Publish state toggled");
        Ok(video)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        asset_store::{public_id_from_url, AssetKind, MemoryAssetStore},
        config::PaginationConfig,
        content::testing::seed_users,
        db,
    };
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    // Smallest valid PNG header, enough for format sniffing
    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

    struct Fixture {
        store: Arc<MemoryAssetStore>,
        videos: VideoManager,
        staging: TempDir,
    }

    async fn fixture() -> Fixture {
        let pool = db::create_memory_pool().await.unwrap();
        seed_users(&pool, &["u1", "u2"]).await;
        let store = Arc::new(MemoryAssetStore::new());
        let media = Arc::new(MediaCoordinator::new(
            pool.clone(),
            store.clone(),
            Duration::from_secs(5),
        ));
        Fixture {
            store,
            videos: VideoManager::new(pool, media),
            staging: tempdir().unwrap(),
        }
    }

    impl Fixture {
        async fn stage(&self, name: &str, data: &[u8]) -> StagedUpload {
            StagedUpload::from_bytes(self.staging.path(), name, data).await.unwrap()
        }

        async fn publish(&self, owner: &str, title: &str) -> Video {
            let file = self.stage("clip.mp4", b"video").await;
            let thumb = self.stage("thumb.png", PNG).await;
            self.videos
                .publish(owner, title, Some("desc"), file, Some(thumb))
                .await
                .unwrap()
        }
    }

    fn page(n: u32, size: u32) -> PageRequest {
        PageRequest::new(n, size, &PaginationConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_publish_requires_title() {
        let f = fixture().await;
        let file = f.stage("clip.mp4", b"video").await;
        let result = f.videos.publish("u1", "   ", None, file, None).await;
        assert!(matches!(result, Err(HubError::Validation(_))));
        assert!(f.store.upload_attempts().is_empty());
    }

    #[tokio::test]
    async fn test_publish_rejects_non_image_thumbnail() {
        let f = fixture().await;
        let file = f.stage("clip.mp4", b"video").await;
        let thumb = f.stage("thumb.png", b"plain text").await;
        let result = f.videos.publish("u1", "T", None, file, Some(thumb)).await;
        assert!(matches!(result, Err(HubError::Validation(_))));
        assert!(f.store.upload_attempts().is_empty());
    }

    #[tokio::test]
    async fn test_non_owner_cannot_mutate() {
        let f = fixture().await;
        let video = f.publish("u1", "Mine").await;

        let changes = VideoUpdate {
            title: Some("Stolen".into()),
            ..Default::default()
        };
        assert!(matches!(
            f.videos.update("u2", &video.id, changes).await,
            Err(HubError::Unauthorized(_))
        ));
        assert!(matches!(
            f.videos.delete("u2", &video.id).await,
            Err(HubError::Unauthorized(_))
        ));
        assert!(matches!(
            f.videos.toggle_publish("u2", &video.id).await,
            Err(HubError::Unauthorized(_))
        ));
        assert_eq!(f.videos.get_by_id(&video.id).await.unwrap(), video);
    }

    #[tokio::test]
    async fn test_missing_video_is_not_found_before_ownership() {
        let f = fixture().await;
        assert!(matches!(
            f.videos.delete("u2", "missing").await,
            Err(HubError::NotFound(_))
        ));
        assert!(matches!(
            f.videos.get_by_id("missing").await,
            Err(HubError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_requires_a_change() {
        let f = fixture().await;
        let video = f.publish("u1", "T").await;
        let result = f.videos.update("u1", &video.id, VideoUpdate::default()).await;
        assert!(matches!(result, Err(HubError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_metadata_and_thumbnail() {
        let f = fixture().await;
        let video = f.publish("u1", "Old").await;

        let changes = VideoUpdate {
            title: Some(" New ".into()),
            thumbnail: Some(f.stage("new.png", PNG).await),
            ..Default::default()
        };
        let updated = f.videos.update("u1", &video.id, changes).await.unwrap();

        assert_eq!(updated.title, "New");
        assert_eq!(updated.description, "desc");
        assert_ne!(updated.thumbnail, video.thumbnail);
        assert!(!f.store.is_live(&public_id_from_url(&video.thumbnail).unwrap()));
        assert_eq!(f.videos.get_by_id(&video.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_failed_retire_keeps_metadata_unchanged() {
        let f = fixture().await;
        let video = f.publish("u1", "Old").await;
        f.store.fail_destroys(1);

        let changes = VideoUpdate {
            title: Some("New".into()),
            video_file: Some(f.stage("new.mp4", b"video").await),
            ..Default::default()
        };
        let result = f.videos.update("u1", &video.id, changes).await;

        assert!(matches!(result, Err(HubError::AssetRetirement(_))));
        assert_eq!(f.videos.get_by_id(&video.id).await.unwrap(), video);
    }

    #[tokio::test]
    async fn test_failed_thumbnail_retire_keeps_video_file() {
        let f = fixture().await;
        let video = f.publish("u1", "Old").await;
        f.store.fail_destroys(1);

        let changes = VideoUpdate {
            title: Some("New".into()),
            video_file: Some(f.stage("new.mp4", b"video").await),
            thumbnail: Some(f.stage("new.png", PNG).await),
            ..Default::default()
        };
        let result = f.videos.update("u1", &video.id, changes).await;

        assert!(matches!(result, Err(HubError::AssetRetirement(_))));
        assert_eq!(f.videos.get_by_id(&video.id).await.unwrap(), video);
        assert!(f.store.is_live(&public_id_from_url(&video.video_file).unwrap()));
        assert!(f.store.is_live(&public_id_from_url(&video.thumbnail).unwrap()));
    }

    #[tokio::test]
    async fn test_delete_removes_record_and_assets() {
        let f = fixture().await;
        let video = f.publish("u1", "T").await;

        let report = f.videos.delete("u1", &video.id).await.unwrap();
        assert!(report.retirement_failures.is_empty());
        assert_eq!(f.store.live_count(), 0);
        assert!(f.videos.find(&video.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_toggle_publish_flips_state() {
        let f = fixture().await;
        let video = f.publish("u1", "T").await;

        let hidden = f.videos.toggle_publish("u1", &video.id).await.unwrap();
        assert!(!hidden.is_published);
        let shown = f.videos.toggle_publish("u1", &video.id).await.unwrap();
        assert!(shown.is_published);
    }

    #[tokio::test]
    async fn test_cleared_video_cannot_be_republished() {
        let f = fixture().await;
        let video = f.publish("u1", "T").await;
        f.store.fail_uploads(AssetKind::Video, 1);

        let changes = VideoUpdate {
            video_file: Some(f.stage("new.mp4", b"video").await),
            ..Default::default()
        };
        assert!(f.videos.update("u1", &video.id, changes).await.is_err());

        let cleared = f.videos.get_by_id(&video.id).await.unwrap();
        assert!(!cleared.is_published);
        assert!(matches!(
            f.videos.toggle_publish("u1", &video.id).await,
            Err(HubError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_list_filters_and_sorts() {
        let f = fixture().await;
        f.publish("u1", "Rust basics").await;
        f.publish("u1", "Cooking").await;
        f.publish("u2", "Advanced RUST").await;

        let sort = VIDEOS.sort(Some("title"), Some("asc")).unwrap();
        let filters = VideoFilters {
            query: Some("rust".into()),
            user_id: None,
        };
        let result = f.videos.list(filters, sort, page(1, 10)).await.unwrap();
        let titles: Vec<_> = result.items.iter().map(|v| v.title.as_str()).collect();
        assert_eq!(titles, vec!["Advanced RUST", "Rust basics"]);
        assert_eq!(result.total_count, 2);

        let filters = VideoFilters {
            query: None,
            user_id: Some("u1".into()),
        };
        let sort = VIDEOS.sort(None, None).unwrap();
        let result = f.videos.list(filters, sort, page(2, 1)).await.unwrap();
        assert_eq!(result.total_count, 2);
        assert_eq!(result.total_pages, 2);
        assert_eq!(result.items.len(), 1);
    }

    #[tokio::test]
    async fn test_page_past_end_is_empty() {
        let f = fixture().await;
        f.publish("u1", "Only").await;

        let sort = VIDEOS.sort(None, None).unwrap();
        let result = f
            .videos
            .list(VideoFilters::default(), sort, page(5, 10))
            .await
            .unwrap();
        assert!(result.items.is_empty());
        assert_eq!(result.total_count, 1);
    }
}
