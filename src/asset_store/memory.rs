/// In-memory asset backend with scriptable failures
///
/// Keeps the set of live assets in a map so callers can check exactly which
/// remote copies exist. Used by the lifecycle tests.
use crate::{
    asset_store::{AssetKind, AssetStore, RemoteAsset, StagedUpload},
    error::{HubError, HubResult},
};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

/// Duration reported for every video upload
pub const FAKE_VIDEO_DURATION: f64 = 12.5;

#[derive(Default)]
struct MemoryState {
    live: HashMap<String, AssetKind>,
    upload_failures: HashMap<AssetKind, u32>,
    destroy_failures: u32,
    uploads: Vec<AssetKind>,
    destroys: Vec<String>,
    delay: Option<Duration>,
    next_id: u64,
}

#[derive(Default)]
pub struct MemoryAssetStore {
    state: Mutex<MemoryState>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Reject the next `times` uploads of `kind`
    pub fn fail_uploads(&self, kind: AssetKind, times: u32) {
        self.state().upload_failures.insert(kind, times);
    }

    /// Answer the next `times` destroys with a non-ok result
    pub fn fail_destroys(&self, times: u32) {
        self.state().destroy_failures = times;
    }

    /// Sleep before answering any call
    pub fn set_delay(&self, delay: Duration) {
        self.state().delay = Some(delay);
    }

    pub fn is_live(&self, public_id: &str) -> bool {
        self.state().live.contains_key(public_id)
    }

    pub fn live_count(&self) -> usize {
        self.state().live.len()
    }

    pub fn upload_attempts(&self) -> Vec<AssetKind> {
        self.state().uploads.clone()
    }

    pub fn destroy_attempts(&self) -> Vec<String> {
        self.state().destroys.clone()
    }

    async fn pause(&self) {
        let delay = self.state().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn upload(&self, staged: &StagedUpload, kind: AssetKind) -> HubResult<RemoteAsset> {
        self.pause().await;
        let mut state = self.state();
        state.uploads.push(kind);

        if let Some(remaining) = state.upload_failures.get_mut(&kind) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(HubError::AssetUpload(format!("{} upload rejected", kind)));
            }
        }

        state.next_id += 1;
        let public_id = format!("{}{:06}", kind.as_str(), state.next_id);
        state.live.insert(public_id.clone(), kind);

        Ok(RemoteAsset {
            url: format!(
                "memory://assets/{}/{}.{}",
                kind,
                public_id,
                staged.extension()
            ),
            public_id,
            duration: (kind == AssetKind::Video).then_some(FAKE_VIDEO_DURATION),
        })
    }

    async fn destroy(&self, public_id: &str, kind: AssetKind) -> HubResult<()> {
        self.pause().await;
        let mut state = self.state();
        state.destroys.push(public_id.to_string());

        if state.destroy_failures > 0 {
            state.destroy_failures -= 1;
            return Err(HubError::AssetRetirement(format!(
                "destroy of {} returned \"error\"",
                public_id
            )));
        }

        match state.live.get(public_id) {
            Some(live_kind) if *live_kind == kind => {
                state.live.remove(public_id);
                Ok(())
            }
            _ => Err(HubError::AssetRetirement(format!(
                "destroy of {} returned \"not found\"",
                public_id
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
