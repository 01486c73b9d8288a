/// Comments on videos
use super::required_text;
use crate::{
    db::{self, models::Comment},
    error::{HubError, HubResult},
    guard,
    pagination::{self, ListQuery, Listing, Page, PageRequest, Sort, SortDirection},
};
use chrono::Utc;
use sqlx::SqlitePool;

pub const COMMENTS: Listing = Listing {
    columns: "*",
    source: "comment",
    sortable: &[("createdAt", "created_at"), ("updatedAt", "updated_at")],
    default_sort: ("createdAt", SortDirection::Desc),
    tiebreak: "rowid",
};

pub struct CommentManager {
    db: SqlitePool,
}

impl CommentManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    async fn ensure_video(&self, video_id: &str) -> HubResult<()> {
        let found = sqlx::query("SELECT 1 FROM video WHERE id = ?1")
            .bind(video_id)
            .fetch_optional(&self.db)
            .await?;
        if found.is_none() {
            return Err(HubError::NotFound("video not found".to_string()));
        }
        Ok(())
    }

    async fn find(&self, comment_id: &str) -> HubResult<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>("SELECT * FROM comment WHERE id = ?1")
            .bind(comment_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(comment)
    }

    pub async fn list_for_video(
        &self,
        video_id: &str,
        sort: Sort,
        page: PageRequest,
    ) -> HubResult<Page<Comment>> {
        self.ensure_video(video_id).await?;
        let query = ListQuery::new(sort, page).eq("video_id", Some(video_id.to_string()));
        pagination::fetch_page(&self.db, &COMMENTS, &query).await
    }

    pub async fn add(&self, actor_id: &str, video_id: &str, content: &str) -> HubResult<Comment> {
        let content = required_text("content", content)?;
        self.ensure_video(video_id).await?;

        let now = Utc::now();
        let comment = Comment {
            id: db::new_id(),
            owner_id: actor_id.to_string(),
            video_id: video_id.to_string(),
            content,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO comment (id, owner_id, video_id, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&comment.id)
        .bind(&comment.owner_id)
        .bind(&comment.video_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&self.db)
        .await?;

        tracing::debug!(comment_id = %comment.id, video_id, "Comment added");
        Ok(comment)
    }

    pub async fn update(
        &self,
        actor_id: &str,
        comment_id: &str,
        content: &str,
    ) -> HubResult<Comment> {
        let content = required_text("content", content)?;
        let mut comment = guard::require_owner(actor_id, self.find(comment_id).await?)?;

        comment.content = content;
        comment.updated_at = Utc::now();
        sqlx::query("UPDATE comment SET content = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(&comment.content)
            .bind(comment.updated_at)
            .bind(&comment.id)
            .execute(&self.db)
            .await?;

        Ok(comment)
    }

    pub async fn delete(&self, actor_id: &str, comment_id: &str) -> HubResult<Comment> {
        let comment = guard::require_owner(actor_id, self.find(comment_id).await?)?;

        sqlx::query("DELETE FROM comment WHERE id = ?1")
            .bind(&comment.id)
            .execute(&self.db)
            .await?;

        tracing::debug!(comment_id = %comment.id, "Comment deleted");
        Ok(comment)
    }
}
