/// Success envelope shared by every endpoint
use crate::pagination::Page;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Pagination metadata of a list response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip)]
    status: StatusCode,
    pub status_code: u16,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::OK, Some(data), message)
    }

    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::CREATED, Some(data), message)
    }

    pub fn with_status(status: StatusCode, data: Option<T>, message: impl Into<String>) -> Self {
        Self {
            status,
            status_code: status.as_u16(),
            success: status.is_success(),
            message: message.into(),
            data,
            pagination: None,
        }
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    /// List response carrying the page's items and metadata
    pub fn page(page: Page<T>, message: impl Into<String>) -> Self {
        let meta = PaginationMeta {
            total: page.total_count,
            page: page.page,
            limit: page.page_size,
            total_pages: page.total_pages,
        };
        let mut response = Self::ok(page.items, message);
        response.pagination = Some(meta);
        response
    }
}

impl ApiResponse<()> {
    /// Success without a payload
    pub fn message(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::OK, None, message)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::PageRequest;

    #[test]
    fn test_page_envelope_shape() {
        let page = Page::new(
            vec!["a", "b"],
            5,
            PageRequest {
                page: 1,
                page_size: 2,
            },
        );
        let body = serde_json::to_value(ApiResponse::page(page, "listed")).unwrap();

        assert_eq!(body["statusCode"], 200);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], serde_json::json!(["a", "b"]));
        assert_eq!(body["pagination"]["total"], 5);
        assert_eq!(body["pagination"]["limit"], 2);
        assert_eq!(body["pagination"]["totalPages"], 3);
    }

    #[test]
    fn test_message_only_envelope_omits_data() {
        let body = serde_json::to_value(ApiResponse::message("done")).unwrap();
        assert!(body.get("data").is_none());
        assert!(body.get("pagination").is_none());
        assert_eq!(body["message"], "done");
    }
}
