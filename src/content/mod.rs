/// Owned content: videos, comments, tweets and playlists
///
/// Every mutation loads its resource first, then runs the ownership guard,
/// then writes.

pub mod comments;
pub mod playlists;
pub mod tweets;
pub mod videos;

pub use comments::CommentManager;
pub use playlists::PlaylistManager;
pub use tweets::TweetManager;
pub use videos::{VideoFilters, VideoManager, VideoUpdate};

use crate::error::{HubError, HubResult};
use sqlx::SqlitePool;

/// Trimmed text that must not be blank
pub(crate) fn required_text(field: &str, value: &str) -> HubResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(HubError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Fail with `NotFound` unless a user with `user_id` exists
pub(crate) async fn ensure_user(db: &SqlitePool, user_id: &str) -> HubResult<()> {
    let found = sqlx::query("SELECT 1 FROM users WHERE id = ?1")
        .bind(user_id)
        .fetch_optional(db)
        .await?;
    if found.is_none() {
        return Err(HubError::NotFound("user not found".to_string()));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use chrono::Utc;
    use sqlx::SqlitePool;

    /// Insert bare user rows for manager tests
    pub async fn seed_users(pool: &SqlitePool, ids: &[&str]) {
        for id in ids {
            sqlx::query(
                "INSERT INTO users (id, username, email, full_name, password_hash, created_at)
                 VALUES (?1, ?1, ?1 || '@example.com', ?1, 'x', ?2)",
            )
            .bind(id)
            .bind(Utc::now())
            .execute(pool)
            .await
            .unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text_trims() {
        assert_eq!(required_text("name", "  mix  ").unwrap(), "mix");
        assert!(matches!(required_text("name", " \n "), Err(HubError::Validation(_))));
    }
}
