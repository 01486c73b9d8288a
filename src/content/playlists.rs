/// Playlists of a user's own videos
use super::required_text;
use crate::{
    db::{
        self,
        models::{Playlist, PlaylistWithVideos, Video},
    },
    error::{HubError, HubResult},
    guard,
    pagination::{self, ListQuery, Listing, Page, PageRequest, Sort, SortDirection},
};
use chrono::Utc;
use sqlx::SqlitePool;

pub const PLAYLISTS: Listing = Listing {
    columns: "*",
    source: "playlist",
    sortable: &[
        ("createdAt", "created_at"),
        ("updatedAt", "updated_at"),
        ("name", "name"),
    ],
    default_sort: ("createdAt", SortDirection::Desc),
    tiebreak: "rowid",
};

pub struct PlaylistManager {
    db: SqlitePool,
}

impl PlaylistManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    async fn find(&self, playlist_id: &str) -> HubResult<Option<Playlist>> {
        let playlist = sqlx::query_as::<_, Playlist>("SELECT * FROM playlist WHERE id = ?1")
            .bind(playlist_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(playlist)
    }

    async fn video_ids(&self, playlist_id: &str) -> HubResult<Vec<String>> {
        let ids = sqlx::query_scalar(
            "SELECT video_id FROM playlist_video WHERE playlist_id = ?1 ORDER BY added_at, rowid",
        )
        .bind(playlist_id)
        .fetch_all(&self.db)
        .await?;
        Ok(ids)
    }

    async fn with_videos(&self, playlist: Playlist) -> HubResult<PlaylistWithVideos> {
        let videos = self.video_ids(&playlist.id).await?;
        Ok(PlaylistWithVideos { playlist, videos })
    }

    /// Load the playlist and video of a membership change, then apply the
    /// ownership rules
    async fn membership_pair(
        &self,
        actor_id: &str,
        playlist_id: &str,
        video_id: &str,
    ) -> HubResult<Playlist> {
        let playlist = self
            .find(playlist_id)
            .await?
            .ok_or_else(|| HubError::NotFound("playlist not found".to_string()))?;
        let video = sqlx::query_as::<_, Video>("SELECT * FROM video WHERE id = ?1")
            .bind(video_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| HubError::NotFound("video not found".to_string()))?;

        guard::require_same_owner(actor_id, &playlist, &video)?;
        Ok(playlist)
    }

    async fn touch(&self, playlist_id: &str) -> HubResult<()> {
        sqlx::query("UPDATE playlist SET updated_at = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(playlist_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    pub async fn create(
        &self,
        actor_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> HubResult<Playlist> {
        let name = required_text("name", name)?;
        let now = Utc::now();
        let playlist = Playlist {
            id: db::new_id(),
            owner_id: actor_id.to_string(),
            name,
            description: description.map(|d| d.trim().to_string()).unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO playlist (id, owner_id, name, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&playlist.id)
        .bind(&playlist.owner_id)
        .bind(&playlist.name)
        .bind(&playlist.description)
        .bind(playlist.created_at)
        .bind(playlist.updated_at)
        .execute(&self.db)
        .await?;

        Ok(playlist)
    }

    /// A user's playlists; an unknown user simply has none
    pub async fn list_for_user(
        &self,
        user_id: &str,
        sort: Sort,
        page: PageRequest,
    ) -> HubResult<Page<Playlist>> {
        let query = ListQuery::new(sort, page).eq("owner_id", Some(user_id.to_string()));
        pagination::fetch_page(&self.db, &PLAYLISTS, &query).await
    }

    pub async fn get_by_id(&self, playlist_id: &str) -> HubResult<PlaylistWithVideos> {
        let playlist = self
            .find(playlist_id)
            .await?
            .ok_or_else(|| HubError::NotFound("playlist not found".to_string()))?;
        self.with_videos(playlist).await
    }

    /// Add a video; adding one already present changes nothing
    pub async fn add_video(
        &self,
        actor_id: &str,
        playlist_id: &str,
        video_id: &str,
    ) -> HubResult<PlaylistWithVideos> {
        let playlist = self.membership_pair(actor_id, playlist_id, video_id).await?;

        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO playlist_video (playlist_id, video_id, added_at) VALUES (?1, ?2, ?3)",
        )
        .bind(&playlist.id)
        .bind(video_id)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        if inserted.rows_affected() > 0 {
            self.touch(&playlist.id).await?;
        }
        self.get_by_id(&playlist.id).await
    }

    /// Remove a video; removing one that is absent changes nothing
    pub async fn remove_video(
        &self,
        actor_id: &str,
        playlist_id: &str,
        video_id: &str,
    ) -> HubResult<PlaylistWithVideos> {
        let playlist = self.membership_pair(actor_id, playlist_id, video_id).await?;

        let removed = sqlx::query("DELETE FROM playlist_video WHERE playlist_id = ?1 AND video_id = ?2")
            .bind(&playlist.id)
            .bind(video_id)
            .execute(&self.db)
            .await?;

        if removed.rows_affected() > 0 {
            self.touch(&playlist.id).await?;
        }
        self.get_by_id(&playlist.id).await
    }

    pub async fn update(
        &self,
        actor_id: &str,
        playlist_id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> HubResult<PlaylistWithVideos> {
        if name.is_none() && description.is_none() {
            return Err(HubError::Validation(
                "name or description must be provided".to_string(),
            ));
        }
        let name = name.map(|n| required_text("name", n)).transpose()?;
        let mut playlist = guard::require_owner(actor_id, self.find(playlist_id).await?)?;

        if let Some(name) = name {
            playlist.name = name;
        }
        if let Some(description) = description {
            playlist.description = description.trim().to_string();
        }
        playlist.updated_at = Utc::now();

        sqlx::query("UPDATE playlist SET name = ?1, description = ?2, updated_at = ?3 WHERE id = ?4")
            .bind(&playlist.name)
            .bind(&playlist.description)
            .bind(playlist.updated_at)
            .bind(&playlist.id)
            .execute(&self.db)
            .await?;

        self.with_videos(playlist).await
    }

    pub async fn delete(&self, actor_id: &str, playlist_id: &str) -> HubResult<Playlist> {
        let playlist = guard::require_owner(actor_id, self.find(playlist_id).await?)?;
        sqlx::query("DELETE FROM playlist WHERE id = ?1")
            .bind(&playlist.id)
            .execute(&self.db)
            .await?;
        Ok(playlist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::PaginationConfig, content::testing::seed_users};

    async fn setup() -> PlaylistManager {
        let pool = db::create_memory_pool().await.unwrap();
        seed_users(&pool, &["u1", "u2"]).await;
        let now = Utc::now();
        for (id, owner) in [("v1", "u1"), ("v2", "u1"), ("v3", "u2")] {
            sqlx::query(
                "INSERT INTO video (id, owner_id, title, video_file, created_at, updated_at)
                 VALUES (?1, ?2, 'T', 'memory://x.mp4', ?3, ?3)",
            )
            .bind(id)
            .bind(owner)
            .bind(now)
            .execute(&pool)
            .await
            .unwrap();
        }
        PlaylistManager::new(pool)
    }

    #[tokio::test]
    async fn test_add_is_idempotent_and_ordered() {
        let playlists = setup().await;
        let playlist = playlists.create("u1", "Mix", None).await.unwrap();

        playlists.add_video("u1", &playlist.id, "v2").await.unwrap();
        playlists.add_video("u1", &playlist.id, "v1").await.unwrap();
        let again = playlists.add_video("u1", &playlist.id, "v2").await.unwrap();

        assert_eq!(again.videos, vec!["v2".to_string(), "v1".to_string()]);
    }

    #[tokio::test]
    async fn test_remove_absent_video_is_noop() {
        let playlists = setup().await;
        let playlist = playlists.create("u1", "Mix", None).await.unwrap();
        playlists.add_video("u1", &playlist.id, "v1").await.unwrap();

        let after = playlists.remove_video("u1", &playlist.id, "v2").await.unwrap();
        assert_eq!(after.videos, vec!["v1".to_string()]);
        let after = playlists.remove_video("u1", &playlist.id, "v1").await.unwrap();
        assert!(after.videos.is_empty());
    }

    #[tokio::test]
    async fn test_membership_requires_matching_owners() {
        let playlists = setup().await;
        let playlist = playlists.create("u1", "Mix", None).await.unwrap();

        // Someone else's video
        assert!(matches!(
            playlists.add_video("u1", &playlist.id, "v3").await,
            Err(HubError::Unauthorized(_))
        ));
        // Someone else's playlist
        assert!(matches!(
            playlists.add_video("u2", &playlist.id, "v1").await,
            Err(HubError::Unauthorized(_))
        ));
        assert!(matches!(
            playlists.add_video("u1", &playlist.id, "missing").await,
            Err(HubError::NotFound(_))
        ));
        assert!(playlists.get_by_id(&playlist.id).await.unwrap().videos.is_empty());
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let playlists = setup().await;
        assert!(matches!(
            playlists.create("u1", "  ", Some("d")).await,
            Err(HubError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_delete_and_list() {
        let playlists = setup().await;
        let playlist = playlists.create("u1", "Old", Some("d")).await.unwrap();
        playlists.create("u2", "Theirs", None).await.unwrap();

        assert!(matches!(
            playlists.update("u2", &playlist.id, Some("New"), None).await,
            Err(HubError::Unauthorized(_))
        ));
        let updated = playlists
            .update("u1", &playlist.id, Some("New"), None)
            .await
            .unwrap();
        assert_eq!(updated.playlist.name, "New");
        assert_eq!(updated.playlist.description, "d");

        let sort = PLAYLISTS.sort(None, None).unwrap();
        let page = PageRequest::new(1, 10, &PaginationConfig::default()).unwrap();
        let listed = playlists.list_for_user("u1", sort, page).await.unwrap();
        assert_eq!(listed.total_count, 1);

        let none = playlists.list_for_user("ghost", sort, page).await.unwrap();
        assert!(none.items.is_empty());

        playlists.delete("u1", &playlist.id).await.unwrap();
        assert!(matches!(
            playlists.get_by_id(&playlist.id).await,
            Err(HubError::NotFound(_))
        ));
    }
}
