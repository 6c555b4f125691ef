use crate::model::event::PostRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Slimmed-down post metadata stored at `post:details:{id}` and returned as a
/// list item by the read API.
///
/// `tags` exists in the stored schema but neither the projection nor the
/// backfill fills it in; the read path returns whatever is present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CachedPostDetails {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub view_count: i32,
}

impl From<&PostRecord> for CachedPostDetails {
    fn from(record: &PostRecord) -> Self {
        CachedPostDetails {
            title: record.title.clone(),
            published_at: record.published_at,
            tags: Vec::new(),
            slug: record.slug.clone(),
            view_count: record.view_count,
        }
    }
}

/// Pagination metadata for the read API. `next_page`/`prev_page` serialize as
/// `null` at the ends of the range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pagination {
    pub current_page: i64,
    pub per_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub next_page: Option<i64>,
    pub prev_page: Option<i64>,
}

/// Response body of `GET /api/tag/{tagName}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedPosts {
    pub data: Vec<CachedPostDetails>,
    pub pagination: Pagination,
}
