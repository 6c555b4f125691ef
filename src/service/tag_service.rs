use crate::config::{post_details_key, tag_posts_key};
use crate::model::post::{CachedPostDetails, PaginatedPosts, Pagination};
use crate::service::cache_service::{get_object, Cache};
use anyhow::{Context, Result};
use tracing::{debug, warn};

/// One page of posts for an already-normalized tag, newest first.
///
/// `total_items` is the sorted-set cardinality at the time of the count;
/// members whose detail key is missing or undecodable are skipped, so a page
/// may come back shorter than `per_page`.
pub async fn page_for_tag(
    cache: &dyn Cache,
    tag: &str,
    page: i64,
    per_page: i64,
) -> Result<PaginatedPosts> {
    let set_key = tag_posts_key(tag);

    let total_items = cache
        .zcard(&set_key)
        .await
        .with_context(|| format!("ZCARD {set_key}"))?;

    if total_items == 0 {
        return Ok(PaginatedPosts {
            data: vec![],
            pagination: Pagination {
                current_page: page,
                per_page,
                total_pages: 0,
                total_items: 0,
                next_page: None,
                prev_page: None,
            },
        });
    }

    let start = (page - 1) * per_page;
    let stop = start + per_page - 1;

    let ids = cache
        .zrevrange(&set_key, start, stop)
        .await
        .with_context(|| format!("ZREVRANGE {set_key} {start} {stop}"))?;

    let mut data = Vec::with_capacity(ids.len());
    for id in &ids {
        let details_key = post_details_key(id);
        match get_object::<CachedPostDetails>(cache, &details_key).await {
            Ok(Some(details)) => data.push(details),
            Ok(None) => {
                debug!("post details missing for {}, skipping", details_key);
            }
            Err(err) => {
                warn!("could not hydrate {}: {:?}, skipping", details_key, err);
            }
        }
    }

    let total_pages = (total_items + per_page - 1) / per_page;
    let next_page = (page < total_pages).then(|| page + 1);
    let prev_page = (page > 1).then(|| page - 1);

    Ok(PaginatedPosts {
        data,
        pagination: Pagination {
            current_page: page,
            per_page,
            total_pages,
            total_items,
            next_page,
            prev_page,
        },
    })
}
