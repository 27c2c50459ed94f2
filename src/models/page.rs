//! Bulk page-creation request and response models.

use serde::{Deserialize, Serialize};

/// Page statuses accepted by the API.
pub const ALLOWED_STATUSES: [&str; 4] = ["draft", "publish", "pending", "private"];

/// Request body for `POST /pagebuilder/v1/create-pages`.
///
/// # Example
///
/// ```json
/// {
///   "pages": [
///     { "title": "About us", "content": "<p>Hello</p>", "status": "publish" },
///     { "title": "Imprint", "status": "draft" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePagesRequest {
    #[serde(default)]
    pub pages: Vec<PageInput>,
}

/// One page in a bulk-create batch.
///
/// `title` is required; an empty title fails that page without aborting the
/// batch. Unknown fields (such as `meta` or `taxonomies`) are accepted and
/// ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInput {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub excerpt: String,

    /// One of `draft`, `publish`, `pending`, `private`; defaults to
    /// `publish` when absent
    pub status: Option<String>,

    pub template: Option<String>,

    #[serde(default)]
    pub menu_order: i64,
}

/// Reference to a created page, as returned to the caller and delivered in
/// webhook payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRef {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub edit_url: String,
    pub status: String,
}

/// Per-page failure inside an otherwise successful batch.
#[derive(Debug, Serialize, Deserialize)]
pub struct PageCreationError {
    /// Zero-based position in the submitted `pages` array
    pub index: usize,
    pub title: String,
    pub error: String,
}

/// Response body for a processed batch (HTTP 200 even when individual
/// pages failed; per-page failures are isolated into `errors`).
#[derive(Debug, Serialize)]
pub struct CreatePagesResponse {
    pub success: bool,
    pub request_id: String,
    pub message: String,
    pub data: CreatePagesData,
}

#[derive(Debug, Serialize)]
pub struct CreatePagesData {
    pub total_requested: usize,
    pub total_created: usize,
    pub total_failed: usize,
    pub created_pages: Vec<PageRef>,
    pub errors: Vec<PageCreationError>,
    pub response_time_ms: f64,
}
