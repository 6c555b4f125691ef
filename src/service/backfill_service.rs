use crate::config::{post_details_key, tag_posts_key};
use crate::model::post::CachedPostDetails;
use crate::service::cache_service::{set_object, Cache};
use crate::util::tag::normalize_tag;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::MySqlPool;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// At most this many missing tag indexes are materialized per collect call.
pub const MAX_TAGS_PER_COLLECT: usize = 10;

/// At most this many posts are loaded into each rebuilt index.
pub const MAX_POSTS_PER_TAG: i64 = 100;

/// A published post as read back from the relational store.
#[derive(Debug, Clone)]
pub struct SourcePost {
    pub id: String,
    pub title: String,
    pub published_at: Option<DateTime<Utc>>,
    pub slug: String,
    pub view_count: i32,
}

/// Read-only view of the canonical `posts`/`post_tags` tables. The process
/// holds one SQL-backed instance; tests substitute a fixture.
#[async_trait]
pub trait TagSource: Send + Sync {
    /// Every distinct raw tag attached to at least one published post.
    async fn distinct_tags(&self) -> Result<Vec<String>>;

    /// Published posts carrying the given raw tag, newest first, capped.
    async fn posts_for_tag(&self, tag: &str, limit: i64) -> Result<Vec<SourcePost>>;
}

pub struct SqlTagSource {
    pool: MySqlPool,
}

impl SqlTagSource {
    pub fn new(pool: MySqlPool) -> Self {
        SqlTagSource { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SourcePostRow {
    id: String,
    title: String,
    published_at: Option<NaiveDateTime>,
    slug: String,
    view_count: i32,
}

#[async_trait]
impl TagSource for SqlTagSource {
    async fn distinct_tags(&self) -> Result<Vec<String>> {
        let tags = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT tag
            FROM post_tags pt
            JOIN posts p ON pt.post_id = p.id
            WHERE p.is_published = TRUE AND pt.tag IS NOT NULL AND pt.tag != ''
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("querying distinct tags")?;

        Ok(tags)
    }

    async fn posts_for_tag(&self, tag: &str, limit: i64) -> Result<Vec<SourcePost>> {
        let rows = sqlx::query_as::<_, SourcePostRow>(
            r#"
            SELECT BIN_TO_UUID(p.id) AS id, p.title, p.published_at, p.slug, p.view_count
            FROM posts p
            JOIN post_tags pt ON p.id = pt.post_id
            WHERE p.is_published = TRUE AND pt.tag = ?
            ORDER BY p.published_at DESC
            LIMIT ?
            "#,
        )
        .bind(tag)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("querying posts for tag {tag:?}"))?;

        Ok(rows
            .into_iter()
            .map(|row| SourcePost {
                id: row.id,
                title: row.title,
                published_at: row.published_at.map(|naive| naive.and_utc()),
                slug: row.slug,
                view_count: row.view_count,
            })
            .collect())
    }
}

/// Materializes up to [`MAX_TAGS_PER_COLLECT`] tag indexes that are missing
/// from the cache, each rebuilt from the relational store with up to
/// [`MAX_POSTS_PER_TAG`] posts.
///
/// Returns the per-tag count of posts added. Faults while rebuilding one tag
/// abort that tag only; a failing distinct-tags scan aborts the whole call.
pub async fn collect_missing_tags(
    cache: &dyn Cache,
    source: &dyn TagSource,
) -> Result<BTreeMap<String, u64>> {
    let raw_tags = source.distinct_tags().await?;

    // Duplicates that normalize to the same key collapse to one raw spelling;
    // that spelling is the one used for the per-tag query below.
    let mut all_tags: BTreeMap<String, String> = BTreeMap::new();
    for raw in raw_tags {
        let normalized = normalize_tag(&raw);
        if !normalized.is_empty() {
            all_tags.insert(normalized, raw);
        }
    }

    let mut to_process: Vec<(String, String)> = Vec::with_capacity(MAX_TAGS_PER_COLLECT);
    for (normalized, original) in &all_tags {
        let set_key = tag_posts_key(normalized);
        match cache.exists(&set_key).await {
            Ok(true) => {}
            Ok(false) => {
                to_process.push((normalized.clone(), original.clone()));
                if to_process.len() >= MAX_TAGS_PER_COLLECT {
                    break;
                }
            }
            Err(err) => {
                warn!("could not check {}: {:?}, skipping tag", set_key, err);
            }
        }
    }

    let mut processed: BTreeMap<String, u64> = BTreeMap::new();

    for (normalized, original) in to_process {
        let posts = match source.posts_for_tag(&original, MAX_POSTS_PER_TAG).await {
            Ok(posts) => posts,
            Err(err) => {
                warn!(
                    "could not load posts for tag {} (original {:?}): {:?}",
                    normalized, original, err
                );
                continue;
            }
        };

        let set_key = tag_posts_key(&normalized);
        let mut posts_added: u64 = 0;

        for post in posts {
            let details = CachedPostDetails {
                title: post.title,
                published_at: post.published_at,
                tags: Vec::new(),
                slug: post.slug,
                view_count: post.view_count,
            };

            let details_key = post_details_key(&post.id);
            if let Err(err) = set_object(cache, &details_key, &details).await {
                warn!("could not store {}: {:?}", details_key, err);
                continue;
            }

            let score = post
                .published_at
                .map(|at| at.timestamp() as f64)
                .unwrap_or_else(|| Utc::now().timestamp() as f64);

            if let Err(err) = cache.zadd(&set_key, score, &post.id).await {
                warn!("could not add {} to {}: {:?}", post.id, set_key, err);
                continue;
            }

            posts_added += 1;
        }

        info!("rebuilt {} with {} posts", set_key, posts_added);
        processed.insert(normalized, posts_added);
    }

    Ok(processed)
}
