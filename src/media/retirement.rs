/// Retry queue for remote assets whose removal failed
use crate::{
    asset_store::AssetKind,
    db::models::PendingRetirement,
    error::{HubError, HubResult},
};
use chrono::Utc;
use sqlx::SqlitePool;

/// Durable queue backed by the `pending_retirement` table
#[derive(Clone)]
pub struct RetirementQueue {
    db: SqlitePool,
}

impl RetirementQueue {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Record a failed retirement, counting repeated failures
    pub async fn record_failure(
        &self,
        public_id: &str,
        kind: AssetKind,
        error: &HubError,
    ) -> HubResult<()> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO pending_retirement (public_id, kind, attempts, last_error, created_at, updated_at)
             VALUES (?1, ?2, 1, ?3, ?4, ?4)
             ON CONFLICT (public_id, kind) DO UPDATE SET
                attempts = attempts + 1,
                last_error = excluded.last_error,
                updated_at = excluded.updated_at",
        )
        .bind(public_id)
        .bind(kind.as_str())
        .bind(error.to_string())
        .bind(now)
        .execute(&self.db)
        .await?;

        self.refresh_gauge().await;
        Ok(())
    }

    /// Oldest-attempted entries first
    pub async fn due(&self, limit: i64) -> HubResult<Vec<PendingRetirement>> {
        let rows = sqlx::query_as::<_, PendingRetirement>(
            "SELECT public_id, kind, attempts, last_error, created_at, updated_at
             FROM pending_retirement
             ORDER BY updated_at ASC
             LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    /// Drop an entry once the asset is gone or abandoned
    pub async fn resolve(&self, public_id: &str, kind: AssetKind) -> HubResult<()> {
        sqlx::query("DELETE FROM pending_retirement WHERE public_id = ?1 AND kind = ?2")
            .bind(public_id)
            .bind(kind.as_str())
            .execute(&self.db)
            .await?;

        self.refresh_gauge().await;
        Ok(())
    }

    pub async fn len(&self) -> HubResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pending_retirement")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    async fn refresh_gauge(&self) {
        match self.len().await {
            Ok(count) => crate::metrics::PENDING_RETIREMENTS.set(count),
            Err(e) => tracing::debug!(error = %e, "Could not refresh pending retirement gauge"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn test_failures_accumulate_per_asset() {
        let pool = db::create_memory_pool().await.unwrap();
        let queue = RetirementQueue::new(pool);
        let err = HubError::AssetRetirement("nope".into());

        queue.record_failure("abc", AssetKind::Video, &err).await.unwrap();
        queue.record_failure("abc", AssetKind::Video, &err).await.unwrap();
        queue.record_failure("abc", AssetKind::Image, &err).await.unwrap();

        let due = queue.due(10).await.unwrap();
        assert_eq!(due.len(), 2);
        let video = due.iter().find(|r| r.kind == "video").unwrap();
        assert_eq!(video.attempts, 2);
        assert!(video.last_error.as_deref().unwrap().contains("nope"));

        queue.resolve("abc", AssetKind::Video).await.unwrap();
        assert_eq!(queue.len().await.unwrap(), 1);
    }
}
