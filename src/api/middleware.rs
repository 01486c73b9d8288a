/// Request helpers shared by the handlers
use crate::{
    asset_store::StagedUpload,
    db,
    error::{HubError, HubResult},
    pagination::{Listing, PageRequest, Sort},
};
use axum::{extract::multipart::Field, http::HeaderMap};
use serde::Deserialize;
use std::{collections::HashMap, path::Path};

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Raw listing parameters, validated by [`ListParams::resolve`]
///
/// Numbers stay strings so bad input surfaces as a validation error in the
/// unified envelope rather than an extractor rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
    pub sort_type: Option<String>,
    pub query: Option<String>,
    pub user_id: Option<String>,
}

impl ListParams {
    pub fn resolve(
        &self,
        listing: &Listing,
        config: &crate::config::PaginationConfig,
    ) -> HubResult<(Sort, PageRequest)> {
        let page = PageRequest::from_raw(self.page.as_deref(), self.limit.as_deref(), config)?;
        let sort = listing.sort(self.sort_by.as_deref(), self.sort_type.as_deref())?;
        Ok((sort, page))
    }
}

/// Path ids must be UUIDs
pub fn path_id(raw: &str, field: &str) -> HubResult<String> {
    db::parse_id(raw, field)
}

/// Fields of a multipart form: text values and staged files
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub text: HashMap<String, String>,
    pub files: HashMap<String, StagedUpload>,
}

impl MultipartForm {
    /// Drain a multipart body, streaming file parts to `staging_dir`
    ///
    /// Files already staged are dropped, and so deleted, if a later part fails.
    pub async fn read(
        mut multipart: axum::extract::Multipart,
        staging_dir: &Path,
    ) -> HubResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| HubError::Validation(format!("Malformed multipart body: {}", e)))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let staged = stage_field(field, staging_dir, &file_name).await?;
                    form.files.insert(name, staged);
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| HubError::Validation(format!("Unreadable field {}: {}", name, e)))?;
                    form.text.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.text.get(name).map(String::as_str)
    }

    pub fn take_file(&mut self, name: &str) -> Option<StagedUpload> {
        self.files.remove(name)
    }
}

async fn stage_field(
    mut field: Field<'_>,
    staging_dir: &Path,
    file_name: &str,
) -> HubResult<StagedUpload> {
    let content_type = field.content_type().map(str::to_string);
    let mut staged = StagedUpload::create(staging_dir, file_name, content_type).await?;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| HubError::Validation(format!("Upload interrupted: {}", e)))?
    {
        staged.append(&chunk).await?;
    }
    staged.finish().await?;

    tracing::debug!(file_name, size = staged.size(), "Multipart file staged");
    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert("authorization", "Bearer abc123".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), Some("abc123".to_string()));

        headers.insert("authorization", "Basic abc123".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert("authorization", "Bearer ".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn test_list_params_resolve() {
        let params = ListParams {
            page: Some("2".into()),
            sort_by: Some("title".into()),
            ..Default::default()
        };
        let config = crate::config::PaginationConfig::default();
        let (sort, page) = params
            .resolve(&crate::content::videos::VIDEOS, &config)
            .unwrap();
        assert_eq!(sort.column, "title");
        assert_eq!(page.page, 2);
        assert_eq!(page.page_size, 10);

        let bad = ListParams {
            limit: Some("lots".into()),
            ..Default::default()
        };
        assert!(bad.resolve(&crate::content::videos::VIDEOS, &config).is_err());
    }
}
