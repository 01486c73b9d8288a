/// Disk-based asset storage backend
use crate::{
    asset_store::{AssetKind, AssetStore, RemoteAsset, StagedUpload},
    error::{HubError, HubResult},
};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// Disk storage backend
///
/// Stores assets on the local filesystem, one directory per kind, sharded
/// by public id prefix to prevent too many files in one directory. Files
/// are served back under `public_base_url`.
#[derive(Clone)]
pub struct DiskAssetStore {
    base_path: PathBuf,
    public_base_url: String,
}

impl DiskAssetStore {
    /// Create a new disk storage backend
    pub fn new(base_path: PathBuf, public_base_url: String) -> Self {
        Self {
            base_path,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Uses directory sharding: {base}/{kind}/{first2chars}
    fn shard_dir(&self, kind: AssetKind, public_id: &str) -> PathBuf {
        let shard = public_id.get(0..2).unwrap_or("_");
        self.base_path.join(kind.as_str()).join(shard)
    }

    fn asset_url(&self, kind: AssetKind, public_id: &str, extension: &str) -> String {
        let shard = public_id.get(0..2).unwrap_or("_");
        format!(
            "{}/{}/{}/{}.{}",
            self.public_base_url,
            kind.as_str(),
            shard,
            public_id,
            extension
        )
    }

    /// Find the stored file for a public id, whatever its extension
    async fn locate(&self, kind: AssetKind, public_id: &str) -> HubResult<Option<PathBuf>> {
        let dir = self.shard_dir(kind, public_id);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.file_stem().and_then(|s| s.to_str()) == Some(public_id) {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl AssetStore for DiskAssetStore {
    async fn upload(&self, staged: &StagedUpload, kind: AssetKind) -> HubResult<RemoteAsset> {
        let public_id = uuid::Uuid::new_v4().simple().to_string();
        let dir = self.shard_dir(kind, &public_id);

        fs::create_dir_all(&dir).await.map_err(|e| {
            HubError::AssetUpload(format!("Failed to create asset directory: {}", e))
        })?;

        let target = dir.join(format!("{}.{}", public_id, staged.extension()));
        fs::copy(staged.path(), &target).await.map_err(|e| {
            HubError::AssetUpload(format!("Failed to write asset {}: {}", public_id, e))
        })?;

        Ok(RemoteAsset {
            url: self.asset_url(kind, &public_id, staged.extension()),
            public_id,
            duration: None,
        })
    }

    async fn destroy(&self, public_id: &str, kind: AssetKind) -> HubResult<()> {
        let path = self.locate(kind, public_id).await.map_err(|e| {
            HubError::AssetRetirement(format!("Failed to look up asset {}: {}", public_id, e))
        })?;

        let Some(path) = path else {
            return Err(HubError::AssetRetirement(format!(
                "{} asset {} not found",
                kind, public_id
            )));
        };

        fs::remove_file(&path).await.map_err(|e| {
            HubError::AssetRetirement(format!("Failed to delete asset {}: {}", public_id, e))
        })
    }

    fn name(&self) -> &'static str {
        "disk"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset_store::public_id_from_url;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_upload_then_destroy() {
        let dir = tempdir().unwrap();
        let staging = tempdir().unwrap();
        let store = DiskAssetStore::new(dir.path().to_path_buf(), "http://host/assets/".into());

        let staged = StagedUpload::from_bytes(staging.path(), "clip.mp4", b"frames").await.unwrap();
        let asset = store.upload(&staged, AssetKind::Video).await.unwrap();

        assert!(asset.url.starts_with("http://host/assets/video/"));
        assert!(asset.url.ends_with(".mp4"));
        assert_eq!(public_id_from_url(&asset.url).as_deref(), Some(asset.public_id.as_str()));

        let stored = store.locate(AssetKind::Video, &asset.public_id).await.unwrap().unwrap();
        assert_eq!(tokio::fs::read(&stored).await.unwrap(), b"frames");

        store.destroy(&asset.public_id, AssetKind::Video).await.unwrap();
        assert!(!stored.exists());
    }

    #[tokio::test]
    async fn test_destroy_missing_asset_fails() {
        let dir = tempdir().unwrap();
        let store = DiskAssetStore::new(dir.path().to_path_buf(), "http://host/assets".into());

        let result = store.destroy("abcdef", AssetKind::Image).await;
        assert!(matches!(result, Err(HubError::AssetRetirement(_))));
    }

    #[tokio::test]
    async fn test_kinds_do_not_share_ids() {
        let dir = tempdir().unwrap();
        let staging = tempdir().unwrap();
        let store = DiskAssetStore::new(dir.path().to_path_buf(), "http://host/assets".into());

        let staged = StagedUpload::from_bytes(staging.path(), "t.png", b"img").await.unwrap();
        let asset = store.upload(&staged, AssetKind::Image).await.unwrap();

        assert!(store.destroy(&asset.public_id, AssetKind::Video).await.is_err());
        assert!(store.destroy(&asset.public_id, AssetKind::Image).await.is_ok());
    }

    #[test]
    fn test_directory_sharding() {
        let store = DiskAssetStore::new(PathBuf::from("/data/assets"), "http://h".into());
        let path = store.shard_dir(AssetKind::Image, "abc123");
        assert!(path.to_string_lossy().ends_with("image/ab"));
    }
}
