/// Remote asset storage
///
/// Video files and thumbnails live outside the database. A backend accepts a
/// staged local upload and hands back a durable URL, and can later destroy
/// the asset by its public id.

pub mod cloudinary;
pub mod disk;
pub mod memory;
pub mod staging;

pub use cloudinary::CloudinaryAssetStore;
pub use disk::DiskAssetStore;
pub use memory::MemoryAssetStore;
pub use staging::StagedUpload;

use crate::{
    config::{AssetStoreConfig, AssetsConfig},
    error::HubResult,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc, time::Duration};

/// Resource class of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Video,
    Image,
}

impl AssetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetKind::Video => "video",
            AssetKind::Image => "image",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "video" => Some(AssetKind::Video),
            "image" => Some(AssetKind::Image),
            _ => None,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An asset acknowledged by the store
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteAsset {
    pub url: String,
    pub public_id: String,
    /// Media duration in seconds, when the store reports one
    pub duration: Option<f64>,
}

/// Asset storage backend trait
///
/// Upload failures are `AssetUpload`, destroy failures are
/// `AssetRetirement`, and transport failures are `AssetStoreUnavailable`.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Push a staged file to the store
    async fn upload(&self, staged: &StagedUpload, kind: AssetKind) -> HubResult<RemoteAsset>;

    /// Remove an asset; succeeds only when the store acknowledges removal
    async fn destroy(&self, public_id: &str, kind: AssetKind) -> HubResult<()>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

/// Derive the public id from an asset URL: the last path segment up to its
/// first dot. Returns `None` for an empty slot.
pub fn public_id_from_url(url: &str) -> Option<String> {
    let path = url.split(&['?', '#'][..]).next().unwrap_or_default();
    let segment = path.rsplit(&['/', '\\'][..]).next()?;
    let stem = segment.split('.').next().unwrap_or_default();

    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

/// Build the configured backend
pub fn build_asset_store(config: &AssetsConfig) -> HubResult<Arc<dyn AssetStore>> {
    let timeout = Duration::from_secs(config.timeout_secs);

    let store: Arc<dyn AssetStore> = match &config.store {
        AssetStoreConfig::Disk {
            location,
            public_base_url,
        } => Arc::new(DiskAssetStore::new(location.clone(), public_base_url.clone())),
        AssetStoreConfig::Cloudinary {
            cloud_name,
            api_key,
            api_secret,
        } => Arc::new(CloudinaryAssetStore::new(
            cloud_name.clone(),
            api_key.clone(),
            api_secret.clone(),
            timeout,
        )?),
    };

    tracing::info!(backend = store.name(), "Asset store initialized");
    Ok(store)
}
