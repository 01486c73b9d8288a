/// Application context and dependency injection
use crate::{
    account::AccountManager,
    asset_store::{self, AssetStore},
    config::{AssetStoreConfig, ServerConfig},
    content::{CommentManager, PlaylistManager, TweetManager, VideoManager},
    db,
    error::{HubError, HubResult},
    media::MediaCoordinator,
    rate_limit::RateLimiter,
    relations::{LikeManager, SubscriptionManager},
};
use sqlx::SqlitePool;
use std::{sync::Arc, time::Duration};

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub account_manager: Arc<AccountManager>,
    // Content
    pub media: Arc<MediaCoordinator>,
    pub videos: Arc<VideoManager>,
    pub comments: Arc<CommentManager>,
    pub tweets: Arc<TweetManager>,
    pub playlists: Arc<PlaylistManager>,
    // Relations
    pub likes: Arc<LikeManager>,
    pub subscriptions: Arc<SubscriptionManager>,
    // Rate limiter
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> HubResult<Self> {
        // Validate configuration
        config.validate()?;

        // Create data directories if they don't exist
        Self::ensure_directories(&config).await?;

        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        // The asset store client is built once here and injected everywhere
        let store = asset_store::build_asset_store(&config.assets)?;

        Ok(Self::with_parts(config, db, store))
    }

    /// Wire services around an existing pool and asset store
    pub fn with_parts(config: ServerConfig, db: SqlitePool, store: Arc<dyn AssetStore>) -> Self {
        let media = Arc::new(MediaCoordinator::new(
            db.clone(),
            store,
            Duration::from_secs(config.assets.timeout_secs),
        ));

        Self {
            account_manager: Arc::new(AccountManager::new(
                db.clone(),
                config.authentication.clone(),
            )),
            videos: Arc::new(VideoManager::new(db.clone(), media.clone())),
            comments: Arc::new(CommentManager::new(db.clone())),
            tweets: Arc::new(TweetManager::new(db.clone())),
            playlists: Arc::new(PlaylistManager::new(db.clone())),
            likes: Arc::new(LikeManager::new(db.clone())),
            subscriptions: Arc::new(SubscriptionManager::new(db.clone())),
            rate_limiter: Arc::new(RateLimiter::new(&config.rate_limit)),
            media,
            db,
            config: Arc::new(config),
        }
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> HubResult<()> {
        let dirs = vec![&config.storage.data_directory, &config.storage.temp_directory];

        for dir in dirs {
            if !dir.exists() {
                tokio::fs::create_dir_all(dir).await.map_err(|e| {
                    HubError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
                })?;
            }
        }

        // Create asset directory if using disk storage
        if let AssetStoreConfig::Disk { location, .. } = &config.assets.store {
            tokio::fs::create_dir_all(location).await?;
        }

        Ok(())
    }
}
