/// Channel subscriptions
use super::{toggle, RelationStore, ToggleOutcome};
use crate::{
    db::{
        self,
        models::{Subscription, UserProfile},
    },
    error::{HubError, HubResult},
    pagination::{self, ListQuery, Listing, Page, SortDirection},
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

/// Users subscribed to a channel
pub const SUBSCRIBERS: Listing = Listing {
    columns: "users.id AS id, users.username AS username, users.full_name AS full_name",
    source: "subscription JOIN users ON users.id = subscription.subscriber_id",
    sortable: &[
        ("createdAt", "subscription.created_at"),
        ("username", "users.username"),
    ],
    default_sort: ("createdAt", SortDirection::Desc),
    tiebreak: "subscription.rowid",
};

/// Channels a user is subscribed to
pub const CHANNELS: Listing = Listing {
    columns: "users.id AS id, users.username AS username, users.full_name AS full_name",
    source: "subscription JOIN users ON users.id = subscription.channel_id",
    sortable: &[
        ("createdAt", "subscription.created_at"),
        ("username", "users.username"),
    ],
    default_sort: ("createdAt", SortDirection::Desc),
    tiebreak: "subscription.rowid",
};

/// Subscription manager
pub struct SubscriptionManager {
    db: SqlitePool,
}

impl SubscriptionManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Subscribe to or unsubscribe from `channel_id`
    ///
    /// Subscribing to oneself is allowed.
    pub async fn toggle(
        &self,
        subscriber_id: &str,
        channel_id: &str,
    ) -> HubResult<ToggleOutcome<Subscription>> {
        let channel = sqlx::query("SELECT 1 FROM users WHERE id = ?1")
            .bind(channel_id)
            .fetch_optional(&self.db)
            .await?;
        if channel.is_none() {
            return Err(HubError::NotFound("channel not found".to_string()));
        }

        toggle(self, subscriber_id, &channel_id.to_string()).await
    }

    pub async fn subscribers_of(
        &self,
        channel_id: &str,
        query: ListQuery,
    ) -> HubResult<Page<UserProfile>> {
        let query = query.eq("subscription.channel_id", Some(channel_id.to_string()));
        pagination::fetch_page(&self.db, &SUBSCRIBERS, &query).await
    }

    pub async fn channels_of(
        &self,
        subscriber_id: &str,
        query: ListQuery,
    ) -> HubResult<Page<UserProfile>> {
        let query = query.eq("subscription.subscriber_id", Some(subscriber_id.to_string()));
        pagination::fetch_page(&self.db, &CHANNELS, &query).await
    }
}

#[async_trait]
impl RelationStore for SubscriptionManager {
    type Key = String;
    type Record = Subscription;

    const NAME: &'static str = "subscription";

    async fn find(&self, subscriber_id: &str, channel_id: &String) -> HubResult<Option<Subscription>> {
        let subscription = sqlx::query_as::<_, Subscription>(
            "SELECT id, subscriber_id, channel_id, created_at
             FROM subscription WHERE subscriber_id = ?1 AND channel_id = ?2",
        )
        .bind(subscriber_id)
        .bind(channel_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(subscription)
    }

    async fn insert(&self, subscriber_id: &str, channel_id: &String) -> Result<Subscription, sqlx::Error> {
        let subscription = Subscription {
            id: db::new_id(),
            subscriber_id: subscriber_id.to_string(),
            channel_id: channel_id.clone(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO subscription (id, subscriber_id, channel_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&subscription.id)
        .bind(&subscription.subscriber_id)
        .bind(&subscription.channel_id)
        .bind(subscription.created_at)
        .execute(&self.db)
        .await?;

        Ok(subscription)
    }

    async fn remove(&self, subscription: &Subscription) -> HubResult<bool> {
        let result = sqlx::query("DELETE FROM subscription WHERE id = ?1")
            .bind(&subscription.id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
