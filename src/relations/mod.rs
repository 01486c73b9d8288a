/// Toggle relations
///
/// Likes and subscriptions are join records created and destroyed only by
/// toggling. The store's uniqueness constraint is the backstop for two
/// concurrent toggles on the same pair: the loser of the insert race adopts
/// the winner's record instead of failing.

pub mod likes;
pub mod subscriptions;

pub use likes::{LikeManager, LikeTarget};
pub use subscriptions::SubscriptionManager;

use crate::error::{HubError, HubResult};
use async_trait::async_trait;
use serde::Serialize;

/// How many times an insert conflict is re-resolved before giving up
const MAX_TOGGLE_ATTEMPTS: usize = 3;

/// Result of a toggle call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "record", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToggleOutcome<T> {
    /// The relation now exists
    Created(T),
    /// The relation existed and was removed
    Removed,
    /// The toggle is declared but not implemented; nothing changed
    Unsupported,
}

impl<T> ToggleOutcome<T> {
    pub fn label(&self) -> &'static str {
        match self {
            ToggleOutcome::Created(_) => "created",
            ToggleOutcome::Removed => "removed",
            ToggleOutcome::Unsupported => "unsupported",
        }
    }
}

/// Storage primitives behind a toggle
#[async_trait]
pub trait RelationStore: Send + Sync {
    type Key: Send + Sync;
    type Record: Send;

    /// Name used in logs and metrics
    const NAME: &'static str;

    /// Look up the relation between `actor_id` and `key`
    async fn find(&self, actor_id: &str, key: &Self::Key) -> HubResult<Option<Self::Record>>;

    /// Insert a new relation record
    ///
    /// Returns the raw driver error so the caller can recognise a
    /// uniqueness violation.
    async fn insert(&self, actor_id: &str, key: &Self::Key) -> Result<Self::Record, sqlx::Error>;

    /// Delete a relation record; returns whether a row was removed
    async fn remove(&self, record: &Self::Record) -> HubResult<bool>;
}

/// Create the relation, or adopt a concurrently created peer record
pub async fn create_or_adopt<S: RelationStore>(
    store: &S,
    actor_id: &str,
    key: &S::Key,
) -> HubResult<Option<S::Record>> {
    match store.insert(actor_id, key).await {
        Ok(record) => Ok(Some(record)),
        Err(e) if HubError::is_unique_violation(&e) => {
            tracing::debug!(relation = S::NAME, actor_id, "insert raced a peer, adopting its record");
            store.find(actor_id, key).await
        }
        Err(e) => Err(HubError::Database(e)),
    }
}

/// Remove the relation if present, create it otherwise
pub async fn toggle<S: RelationStore>(
    store: &S,
    actor_id: &str,
    key: &S::Key,
) -> HubResult<ToggleOutcome<S::Record>> {
    for _ in 0..MAX_TOGGLE_ATTEMPTS {
        if let Some(existing) = store.find(actor_id, key).await? {
            // A peer may have removed it first; the pair ends up absent either way.
            store.remove(&existing).await?;
            crate::metrics::record_toggle(S::NAME, "removed");
            return Ok(ToggleOutcome::Removed);
        }

        // None here means a peer inserted then removed between our insert and re-read.
        if let Some(record) = create_or_adopt(store, actor_id, key).await? {
            crate::metrics::record_toggle(S::NAME, "created");
            return Ok(ToggleOutcome::Created(record));
        }
    }

    Err(HubError::Conflict(format!(
        "{} toggle kept racing concurrent updates",
        S::NAME
    )))
}
