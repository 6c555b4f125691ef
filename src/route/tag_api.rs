use crate::config::{DEFAULT_PAGE, DEFAULT_PER_PAGE};
use crate::errors::{bad_request, server_error, ApiResult};
use crate::model::post::PaginatedPosts;
use crate::service::{backfill_service, tag_service};
use crate::util::tag::normalize_tag;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/tag/{tag_name}", get(get_posts_by_tag))
        .route("/tag/collect", post(collect_tags))
}

// page/per_page arrive as raw strings so junk values can fall back to the
// defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageQuery {
    page: Option<String>,
    per_page: Option<String>,
}

impl PageQuery {
    fn page(&self) -> i64 {
        parse_or(&self.page, DEFAULT_PAGE)
    }

    fn per_page(&self) -> i64 {
        parse_or(&self.per_page, DEFAULT_PER_PAGE)
    }
}

fn parse_or(raw: &Option<String>, default: i64) -> i64 {
    raw.as_deref()
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|value| *value >= 1)
        .unwrap_or(default)
}

async fn get_posts_by_tag(
    State(state): State<AppState>,
    Path(tag_name): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<PaginatedPosts>> {
    let tag = normalize_tag(&tag_name);
    if tag.is_empty() {
        return Err(bad_request("Tag name cannot be empty"));
    }

    let page =
        tag_service::page_for_tag(state.cache.as_ref(), &tag, query.page(), query.per_page())
            .await
            .map_err(|err| {
                error!("could not page tag {}: {:?}", tag, err);
                server_error("Could not retrieve posts for tag")
            })?;

    Ok(Json(page))
}

async fn collect_tags(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let processed =
        backfill_service::collect_missing_tags(state.cache.as_ref(), state.source.as_ref())
            .await
            .map_err(|err| {
                error!("tag collection failed: {:?}", err);
                server_error("Failed to query tags from database")
            })?;

    let body = if processed.is_empty() {
        json!({ "message": "No new tags to process", "processed_tags": [] })
    } else {
        json!({ "message": "Tags processed successfully", "processed_tags": processed })
    };

    Ok(Json(body))
}
