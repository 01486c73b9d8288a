/// Short text posts
use super::{ensure_user, required_text};
use crate::{
    db::{self, models::Tweet},
    error::HubResult,
    guard,
    pagination::{self, ListQuery, Listing, Page, PageRequest, Sort, SortDirection},
};
use chrono::Utc;
use sqlx::SqlitePool;

pub const TWEETS: Listing = Listing {
    columns: "*",
    source: "tweet",
    sortable: &[("createdAt", "created_at"), ("updatedAt", "updated_at")],
    default_sort: ("createdAt", SortDirection::Desc),
    tiebreak: "rowid",
};

pub struct TweetManager {
    db: SqlitePool,
}

impl TweetManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    async fn find(&self, tweet_id: &str) -> HubResult<Option<Tweet>> {
        let tweet = sqlx::query_as::<_, Tweet>("SELECT * FROM tweet WHERE id = ?1")
            .bind(tweet_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(tweet)
    }

    pub async fn create(&self, actor_id: &str, content: &str) -> HubResult<Tweet> {
        let content = required_text("content", content)?;
        let now = Utc::now();
        let tweet = Tweet {
            id: db::new_id(),
            owner_id: actor_id.to_string(),
            content,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO tweet (id, owner_id, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&tweet.id)
        .bind(&tweet.owner_id)
        .bind(&tweet.content)
        .bind(tweet.created_at)
        .bind(tweet.updated_at)
        .execute(&self.db)
        .await?;

        Ok(tweet)
    }

    /// A user's tweets; the user must exist
    pub async fn list_for_user(
        &self,
        user_id: &str,
        sort: Sort,
        page: PageRequest,
    ) -> HubResult<Page<Tweet>> {
        ensure_user(&self.db, user_id).await?;
        let query = ListQuery::new(sort, page).eq("owner_id", Some(user_id.to_string()));
        pagination::fetch_page(&self.db, &TWEETS, &query).await
    }

    pub async fn update(&self, actor_id: &str, tweet_id: &str, content: &str) -> HubResult<Tweet> {
        let content = required_text("content", content)?;
        let mut tweet = guard::require_owner(actor_id, self.find(tweet_id).await?)?;

        tweet.content = content;
        tweet.updated_at = Utc::now();
        sqlx::query("UPDATE tweet SET content = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(&tweet.content)
            .bind(tweet.updated_at)
            .bind(&tweet.id)
            .execute(&self.db)
            .await?;

        Ok(tweet)
    }

    pub async fn delete(&self, actor_id: &str, tweet_id: &str) -> HubResult<Tweet> {
        let tweet = guard::require_owner(actor_id, self.find(tweet_id).await?)?;
        sqlx::query("DELETE FROM tweet WHERE id = ?1")
            .bind(&tweet.id)
            .execute(&self.db)
            .await?;
        Ok(tweet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::PaginationConfig, content::testing::seed_users, error::HubError};

    async fn setup() -> TweetManager {
        let pool = db::create_memory_pool().await.unwrap();
        seed_users(&pool, &["u1", "u2"]).await;
        TweetManager::new(pool)
    }

    fn first_page() -> (Sort, PageRequest) {
        (
            TWEETS.sort(None, None).unwrap(),
            PageRequest::new(1, 10, &PaginationConfig::default()).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_list_only_the_users_tweets() {
        let tweets = setup().await;
        tweets.create("u1", "hello").await.unwrap();
        tweets.create("u2", "other").await.unwrap();
        tweets.create("u1", "again").await.unwrap();

        let (sort, page) = first_page();
        let listed = tweets.list_for_user("u1", sort, page).await.unwrap();
        assert_eq!(listed.total_count, 2);
        assert!(listed.items.iter().all(|t| t.owner_id == "u1"));
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let tweets = setup().await;
        let (sort, page) = first_page();
        assert!(matches!(
            tweets.list_for_user("ghost", sort, page).await,
            Err(HubError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_and_delete_are_owner_gated() {
        let tweets = setup().await;
        let tweet = tweets.create("u1", "draft").await.unwrap();

        assert!(matches!(
            tweets.update("u2", &tweet.id, "mine now").await,
            Err(HubError::Unauthorized(_))
        ));
        assert!(matches!(
            tweets.update("u1", &tweet.id, " ").await,
            Err(HubError::Validation(_))
        ));

        let updated = tweets.update("u1", &tweet.id, "final").await.unwrap();
        assert_eq!(updated.content, "final");

        tweets.delete("u1", &tweet.id).await.unwrap();
        assert!(matches!(
            tweets.update("u1", &tweet.id, "gone").await,
            Err(HubError::NotFound(_))
        ));
    }
}
