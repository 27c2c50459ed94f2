//! Page store collaborator.
//!
//! The bulk-create handler treats page persistence as an opaque
//! `create_page` operation that either yields a [`PageRef`] or a per-page
//! error. Pages land in the `pages` table with a slug derived from the
//! title; public and edit URLs are built from the configured site URL.

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::db::DbPool;
use crate::error::AppError;
use crate::models::page::{ALLOWED_STATUSES, PageInput, PageRef};

/// Why a single page in a batch could not be created. These are isolated
/// per page and never abort the batch.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("Page title is required")]
    MissingTitle,

    #[error("Invalid page status: {0}")]
    InvalidStatus(String),
}

/// Create one page.
///
/// # Validation
///
/// - `title` must be non-empty after trimming
/// - `status` must be one of draft/publish/pending/private; absent means
///   `publish`
pub async fn create_page(
    pool: &DbPool,
    config: &Config,
    input: &PageInput,
    api_key_id: i64,
    now: DateTime<Utc>,
) -> Result<Result<PageRef, PageError>, AppError> {
    let title = input.title.trim();
    if title.is_empty() {
        return Ok(Err(PageError::MissingTitle));
    }

    let status = match &input.status {
        None => "publish",
        Some(status) if ALLOWED_STATUSES.contains(&status.as_str()) => status.as_str(),
        Some(status) => return Ok(Err(PageError::InvalidStatus(status.clone()))),
    };

    let slug = slugify(title);

    let result = sqlx::query(
        r#"
        INSERT INTO pages (
            title,
            slug,
            content,
            excerpt,
            status,
            template,
            menu_order,
            api_key_id,
            created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(title)
    .bind(&slug)
    .bind(&input.content)
    .bind(&input.excerpt)
    .bind(status)
    .bind(&input.template)
    .bind(input.menu_order)
    .bind(api_key_id)
    .bind(now)
    .execute(pool)
    .await?;

    let id = result.last_insert_rowid();
    let base = config.site_url.trim_end_matches('/');

    Ok(Ok(PageRef {
        id,
        title: title.to_string(),
        url: format!("{base}/{slug}"),
        edit_url: format!("{base}/admin/pages/{id}"),
        status: status.to_string(),
    }))
}

/// Total number of pages ever created through the API.
pub async fn total_pages(pool: &DbPool) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pages")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// URL slug from a title: lowercase alphanumerics with single dashes.
fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    if slug.is_empty() { "page".to_string() } else { slug }
}
