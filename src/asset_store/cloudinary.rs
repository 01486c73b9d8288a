/// Cloudinary asset storage backend
use crate::{
    asset_store::{AssetKind, AssetStore, RemoteAsset, StagedUpload},
    error::{HubError, HubResult},
};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Signed REST client for Cloudinary uploads and destroys
pub struct CloudinaryAssetStore {
    client: reqwest::Client,
    api_base: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
    public_id: String,
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

impl CloudinaryAssetStore {
    pub fn new(
        cloud_name: String,
        api_key: String,
        api_secret: String,
        timeout: Duration,
    ) -> HubResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HubError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: DEFAULT_API_BASE.to_string(),
            cloud_name,
            api_key,
            api_secret,
        })
    }

    /// Point the client at another API root, e.g. a regional endpoint
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, kind: AssetKind, action: &str) -> String {
        format!("{}/{}/{}/{}", self.api_base, self.cloud_name, kind.as_str(), action)
    }

    /// SHA-256 over the sorted `key=value` pairs followed by the API secret
    fn sign(&self, params: &[(&str, String)]) -> String {
        let mut sorted: Vec<&(&str, String)> = params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let to_sign = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    async fn error_message(response: reqwest::Response) -> String {
        let status = response.status();
        match response.json::<ErrorBody>().await {
            Ok(body) => format!("{}: {}", status, body.error.message),
            Err(_) => status.to_string(),
        }
    }
}

/// Timeouts and connection failures are retryable; everything else is the
/// caller's failure kind
fn transport_error(e: reqwest::Error, otherwise: fn(String) -> HubError) -> HubError {
    if e.is_timeout() || e.is_connect() {
        HubError::AssetStoreUnavailable(e.to_string())
    } else {
        otherwise(e.to_string())
    }
}

#[async_trait]
impl AssetStore for CloudinaryAssetStore {
    async fn upload(&self, staged: &StagedUpload, kind: AssetKind) -> HubResult<RemoteAsset> {
        let data = tokio::fs::read(staged.path()).await?;
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&[("timestamp", timestamp.clone())]);

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(data).file_name(staged.file_name().to_string()),
            )
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response = self
            .client
            .post(self.endpoint(kind, "upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error(e, HubError::AssetUpload))?;

        if !response.status().is_success() {
            return Err(HubError::AssetUpload(Self::error_message(response).await));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| HubError::AssetUpload(format!("Malformed upload response: {}", e)))?;

        let url = body
            .secure_url
            .or(body.url)
            .ok_or_else(|| HubError::AssetUpload("Upload response carried no URL".to_string()))?;

        Ok(RemoteAsset {
            url,
            public_id: body.public_id,
            duration: body.duration,
        })
    }

    async fn destroy(&self, public_id: &str, kind: AssetKind) -> HubResult<()> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&[
            ("public_id", public_id.to_string()),
            ("timestamp", timestamp.clone()),
        ]);

        let params = [
            ("public_id", public_id.to_string()),
            ("api_key", self.api_key.clone()),
            ("timestamp", timestamp),
            ("signature", signature),
            ("signature_algorithm", "sha256".to_string()),
        ];

        let response = self
            .client
            .post(self.endpoint(kind, "destroy"))
            .form(&params)
            .send()
            .await
            .map_err(|e| transport_error(e, HubError::AssetRetirement))?;

        if !response.status().is_success() {
            return Err(HubError::AssetRetirement(Self::error_message(response).await));
        }

        let body: DestroyResponse = response.json().await.map_err(|e| {
            HubError::AssetRetirement(format!("Malformed destroy response: {}", e))
        })?;

        if body.result != "ok" {
            return Err(HubError::AssetRetirement(format!(
                "destroy of {} returned {:?}",
                public_id, body.result
            )));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "cloudinary"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CloudinaryAssetStore {
        CloudinaryAssetStore::new(
            "demo".into(),
            "key".into(),
            "secret".into(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_signature_is_order_independent() {
        let store = store();
        let a = store.sign(&[("timestamp", "1".into()), ("public_id", "x".into())]);
        let b = store.sign(&[("public_id", "x".into()), ("timestamp", "1".into())]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_signature_matches_manual_digest() {
        let store = store();
        let mut hasher = Sha256::new();
        hasher.update(b"public_id=x&timestamp=1secret");
        let expected = hex::encode(hasher.finalize());

        assert_eq!(
            store.sign(&[("timestamp", "1".into()), ("public_id", "x".into())]),
            expected
        );
    }

    #[test]
    fn test_endpoint_uses_resource_type() {
        let store = store().with_api_base("http://localhost:9/v1_1/");
        assert_eq!(
            store.endpoint(AssetKind::Video, "destroy"),
            "http://localhost:9/v1_1/demo/video/destroy"
        );
        assert_eq!(
            store.endpoint(AssetKind::Image, "upload"),
            "http://localhost:9/v1_1/demo/image/upload"
        );
    }

    #[tokio::test]
    async fn test_unreachable_store_is_unavailable() {
        // Port 9 (discard) is closed on test machines; the connect fails fast.
        let store = store().with_api_base("http://127.0.0.1:9/v1_1");
        let result = store.destroy("abc", AssetKind::Image).await;
        assert!(matches!(result, Err(HubError::AssetStoreUnavailable(_))));
    }
}
