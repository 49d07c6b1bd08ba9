//! Shared response envelope for API handlers.
//!
//! Every success body is `{ "success": true, ... }` with optional `data`,
//! `message` and `pagination` members. Errors use the matching
//! `{ "success": false, ... }` shape produced by [`crate::error::AppError`].

use roadmap_core::pagination::{Page, Pagination};
use serde::Serialize;

/// Standard success envelope.
///
/// ```ignore
/// Ok(Json(ApiResponse::data(record)))
/// ```
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            pagination: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    /// Page items as `data`, page metadata as a sibling `pagination` member.
    pub fn page(page: Page<T>) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(page.items),
            pagination: Some(page.pagination),
        }
    }
}

impl ApiResponse<()> {
    /// A body carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            pagination: None,
        }
    }
}
