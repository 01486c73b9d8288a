/// Background task implementations
use crate::{
    asset_store::staging::STAGED_PREFIX,
    context::AppContext,
    error::HubResult,
    media::RetrySummary,
};
use std::{path::Path, time::Duration};

/// Entries retried per pass
const RETIREMENT_BATCH: i64 = 100;

/// Retry asset retirements that failed earlier
pub async fn retry_retirements(ctx: &AppContext) -> HubResult<RetrySummary> {
    ctx.media.retry_pending(RETIREMENT_BATCH).await
}

/// Cleanup expired sessions
pub async fn cleanup_expired_sessions(ctx: &AppContext) -> HubResult<u64> {
    ctx.account_manager.cleanup_expired_sessions().await
}

/// Delete staged upload files older than the configured TTL
pub async fn cleanup_stale_uploads(ctx: &AppContext) -> HubResult<u64> {
    let ttl = Duration::from_secs(ctx.config.jobs.stale_upload_ttl_secs);
    remove_stale_files(&ctx.config.storage.temp_directory, ttl).await
}

/// Remove staged files in `dir` not modified within `ttl`
///
/// Only files carrying the staging prefix are touched.
pub async fn remove_stale_files(dir: &Path, ttl: Duration) -> HubResult<u64> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(STAGED_PREFIX) {
            continue;
        }

        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .unwrap_or_default();
        if age < ttl {
            continue;
        }

        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(path = ?entry.path(), error = %e, "Failed to remove stale upload"),
        }
    }

    Ok(removed)
}

/// Health check - verify all systems are operational
pub async fn health_check(ctx: &AppContext) -> HubResult<()> {
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_only_staged_files_are_swept() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(format!("{}abc.mp4", STAGED_PREFIX)), b"x").unwrap();
        std::fs::write(dir.path().join("keep.txt"), b"x").unwrap();

        // Fresh files survive a long TTL
        assert_eq!(remove_stale_files(dir.path(), Duration::from_secs(3600)).await.unwrap(), 0);

        assert_eq!(remove_stale_files(dir.path(), Duration::ZERO).await.unwrap(), 1);
        assert!(dir.path().join("keep.txt").exists());
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert_eq!(remove_stale_files(&missing, Duration::ZERO).await.unwrap(), 0);
    }
}
