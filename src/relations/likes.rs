/// Likes on videos and comments
use super::{toggle, RelationStore, ToggleOutcome};
use crate::{
    db::{
        self,
        models::{Like, Video},
    },
    error::{HubError, HubResult},
    pagination::{self, ListQuery, Listing, Page, SortDirection},
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

/// What a like points at
///
/// Video and comment ids live in separate target spaces: the lookup always
/// keys on the column that matches the kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeTarget {
    Video(String),
    Comment(String),
}

impl LikeTarget {
    fn column(&self) -> &'static str {
        match self {
            LikeTarget::Video(_) => "video_id",
            LikeTarget::Comment(_) => "comment_id",
        }
    }

    fn id(&self) -> &str {
        match self {
            LikeTarget::Video(id) | LikeTarget::Comment(id) => id,
        }
    }

    fn table(&self) -> &'static str {
        match self {
            LikeTarget::Video(_) => "video",
            LikeTarget::Comment(_) => "comment",
        }
    }
}

/// Videos liked by a user, most recent like first by default
pub const LIKED_VIDEOS: Listing = Listing {
    columns: "video.*",
    source: "likes JOIN video ON video.id = likes.video_id",
    sortable: &[("createdAt", "likes.created_at")],
    default_sort: ("createdAt", SortDirection::Desc),
    tiebreak: "likes.rowid",
};

/// Like manager
pub struct LikeManager {
    db: SqlitePool,
}

impl LikeManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    async fn ensure_target(&self, target: &LikeTarget) -> HubResult<()> {
        let sql = format!("SELECT 1 FROM {} WHERE id = ?1", target.table());
        let found = sqlx::query(&sql)
            .bind(target.id())
            .fetch_optional(&self.db)
            .await?;

        if found.is_none() {
            return Err(HubError::NotFound(format!("{} not found", target.table())));
        }
        Ok(())
    }

    /// Like or unlike a video
    pub async fn toggle_video_like(
        &self,
        actor_id: &str,
        video_id: &str,
    ) -> HubResult<ToggleOutcome<Like>> {
        let target = LikeTarget::Video(video_id.to_string());
        self.ensure_target(&target).await?;
        toggle(self, actor_id, &target).await
    }

    /// Like or unlike a comment
    pub async fn toggle_comment_like(
        &self,
        actor_id: &str,
        comment_id: &str,
    ) -> HubResult<ToggleOutcome<Like>> {
        let target = LikeTarget::Comment(comment_id.to_string());
        self.ensure_target(&target).await?;
        toggle(self, actor_id, &target).await
    }

    /// Tweet likes are not implemented yet; the call changes nothing
    pub async fn toggle_tweet_like(
        &self,
        actor_id: &str,
        tweet_id: &str,
    ) -> HubResult<ToggleOutcome<Like>> {
        tracing::info!(actor_id, tweet_id, "tweet like requested but not supported");
        crate::metrics::record_toggle(Self::NAME, "unsupported");
        Ok(ToggleOutcome::Unsupported)
    }

    /// Page through the videos `actor_id` has liked
    pub async fn liked_videos(&self, actor_id: &str, query: ListQuery) -> HubResult<Page<Video>> {
        let query = query.eq("likes.liked_by", Some(actor_id.to_string()));
        pagination::fetch_page(&self.db, &LIKED_VIDEOS, &query).await
    }

    /// Number of likes on a target
    pub async fn count_for(&self, target: &LikeTarget) -> HubResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM likes WHERE {} = ?1", target.column());
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(target.id())
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl RelationStore for LikeManager {
    type Key = LikeTarget;
    type Record = Like;

    const NAME: &'static str = "like";

    async fn find(&self, actor_id: &str, target: &LikeTarget) -> HubResult<Option<Like>> {
        let sql = format!(
            "SELECT id, liked_by, video_id, comment_id, created_at
             FROM likes WHERE liked_by = ?1 AND {} = ?2",
            target.column()
        );
        let like = sqlx::query_as::<_, Like>(&sql)
            .bind(actor_id)
            .bind(target.id())
            .fetch_optional(&self.db)
            .await?;
        Ok(like)
    }

    async fn insert(&self, actor_id: &str, target: &LikeTarget) -> Result<Like, sqlx::Error> {
        let like = Like {
            id: db::new_id(),
            liked_by: actor_id.to_string(),
            video_id: match target {
                LikeTarget::Video(id) => Some(id.clone()),
                LikeTarget::Comment(_) => None,
            },
            comment_id: match target {
                LikeTarget::Comment(id) => Some(id.clone()),
                LikeTarget::Video(_) => None,
            },
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO likes (id, liked_by, video_id, comment_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&like.id)
        .bind(&like.liked_by)
        .bind(&like.video_id)
        .bind(&like.comment_id)
        .bind(like.created_at)
        .execute(&self.db)
        .await?;

        Ok(like)
    }

    async fn remove(&self, like: &Like) -> HubResult<bool> {
        let result = sqlx::query("DELETE FROM likes WHERE id = ?1")
            .bind(&like.id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::PaginationConfig, pagination::PageRequest, relations::create_or_adopt};

    async fn setup() -> (SqlitePool, LikeManager) {
        let pool = db::create_memory_pool().await.unwrap();
        for (id, name) in [("u1", "alice"), ("u2", "bob")] {
            sqlx::query(
                "INSERT INTO users (id, username, email, full_name, password_hash, created_at)
                 VALUES (?1, ?2, ?3, ?2, 'x', ?4)",
            )
            .bind(id)
            .bind(name)
            .bind(format!("{}@example.com", name))
            .bind(Utc::now())
            .execute(&pool)
            .await
            .unwrap();
        }
        // Same id for a video and a comment to prove the target spaces are disjoint
        sqlx::query(
            "INSERT INTO video (id, owner_id, title, video_file, created_at, updated_at)
             VALUES ('t1', 'u2', 'clip', 'http://cdn/t1.mp4', ?1, ?1)",
        )
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO comment (id, owner_id, video_id, content, created_at, updated_at)
             VALUES ('t1', 'u2', 't1', 'nice', ?1, ?1)",
        )
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();

        let manager = LikeManager::new(pool.clone());
        (pool, manager)
    }

    async fn like_rows(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM likes")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_toggle_twice_creates_then_removes() {
        let (pool, likes) = setup().await;

        let first = likes.toggle_video_like("u1", "t1").await.unwrap();
        match first {
            ToggleOutcome::Created(like) => {
                assert_eq!(like.liked_by, "u1");
                assert_eq!(like.video_id.as_deref(), Some("t1"));
                assert!(like.comment_id.is_none());
            }
            other => panic!("expected Created, got {:?}", other),
        }

        let second = likes.toggle_video_like("u1", "t1").await.unwrap();
        assert_eq!(second, ToggleOutcome::Removed);
        assert_eq!(like_rows(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_video_and_comment_targets_are_disjoint() {
        let (pool, likes) = setup().await;

        likes.toggle_video_like("u1", "t1").await.unwrap();
        let on_comment = likes.toggle_comment_like("u1", "t1").await.unwrap();

        assert!(matches!(on_comment, ToggleOutcome::Created(_)));
        assert_eq!(like_rows(&pool).await, 2);
        assert_eq!(likes.count_for(&LikeTarget::Video("t1".into())).await.unwrap(), 1);
        assert_eq!(likes.count_for(&LikeTarget::Comment("t1".into())).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_target_is_not_found() {
        let (_pool, likes) = setup().await;
        let result = likes.toggle_video_like("u1", "missing").await;
        assert!(matches!(result, Err(HubError::NotFound(_))));
        let result = likes.toggle_comment_like("u1", "missing").await;
        assert!(matches!(result, Err(HubError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_insert_conflict_adopts_peer_record() {
        let (pool, likes) = setup().await;
        let target = LikeTarget::Video("t1".to_string());

        let peer = likes.insert("u1", &target).await.unwrap();
        let adopted = create_or_adopt(&likes, "u1", &target).await.unwrap();

        assert_eq!(adopted, Some(peer));
        assert_eq!(like_rows(&pool).await, 1);
    }

    /// Holds the first two lookups at a barrier so both callers see the
    /// pair as absent before either inserts
    struct LockstepLikes {
        inner: LikeManager,
        barrier: tokio::sync::Barrier,
        lookups: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl RelationStore for LockstepLikes {
        type Key = LikeTarget;
        type Record = Like;

        const NAME: &'static str = "like";

        async fn find(&self, actor_id: &str, target: &LikeTarget) -> HubResult<Option<Like>> {
            let found = self.inner.find(actor_id, target).await?;
            if self.lookups.fetch_add(1, std::sync::atomic::Ordering::SeqCst) < 2 {
                self.barrier.wait().await;
            }
            Ok(found)
        }

        async fn insert(&self, actor_id: &str, target: &LikeTarget) -> Result<Like, sqlx::Error> {
            self.inner.insert(actor_id, target).await
        }

        async fn remove(&self, like: &Like) -> HubResult<bool> {
            self.inner.remove(like).await
        }
    }

    #[tokio::test]
    async fn test_racing_toggles_both_create_one_record() {
        let (pool, likes) = setup().await;
        let store = LockstepLikes {
            inner: likes,
            barrier: tokio::sync::Barrier::new(2),
            lookups: std::sync::atomic::AtomicUsize::new(0),
        };
        let target = LikeTarget::Video("t1".to_string());

        let (a, b) = tokio::join!(
            toggle(&store, "u1", &target),
            toggle(&store, "u1", &target)
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        match (&a, &b) {
            (ToggleOutcome::Created(first), ToggleOutcome::Created(second)) => {
                assert_eq!(first, second);
            }
            other => panic!("expected two creations, got {:?}", other),
        }
        assert_eq!(like_rows(&pool).await, 1);
        // Both initial lookups plus the loser's re-read of the winner's record
        assert_eq!(store.lookups.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_tweet_like_is_a_no_op() {
        let (pool, likes) = setup().await;
        let outcome = likes.toggle_tweet_like("u1", "anything").await.unwrap();
        assert_eq!(outcome, ToggleOutcome::Unsupported);
        assert_eq!(like_rows(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_liked_videos_page() {
        let (_pool, likes) = setup().await;
        likes.toggle_video_like("u1", "t1").await.unwrap();
        likes.toggle_comment_like("u1", "t1").await.unwrap();

        let config = PaginationConfig::default();
        let sort = LIKED_VIDEOS.sort(None, None).unwrap();
        let query = ListQuery::new(sort, PageRequest::new(1, 10, &config).unwrap());

        let page = likes.liked_videos("u1", query.clone()).await.unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].id, "t1");

        let page = likes.liked_videos("u2", query).await.unwrap();
        assert_eq!(page.total_count, 0);
        assert_eq!(page.total_pages, 0);
    }
}
