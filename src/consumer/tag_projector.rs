use crate::config::{post_details_key, tag_posts_key};
use crate::consumer::Outcome;
use crate::model::event::{Op, PostTagEvent};
use crate::model::post::CachedPostDetails;
use crate::service::cache_service::{get_object, Cache};
use crate::util::tag::normalize_tag;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Applies `post_tags` change events to the per-tag sorted sets, scoring each
/// member with the post's publish time.
#[derive(Clone)]
pub struct TagProjector {
    cache: Arc<dyn Cache>,
}

impl TagProjector {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        TagProjector { cache }
    }

    pub async fn apply(&self, event: PostTagEvent) -> Outcome {
        if event.op == Op::Delete {
            let Some(before) = &event.before else {
                debug!("tag delete without a before image, skipping");
                return Outcome::Skipped;
            };

            let tag = normalize_tag(&before.tag);
            if before.post_id.is_empty() || tag.is_empty() {
                debug!(
                    "unusable tag relationship for deletion: post_id {:?}, tag {:?}",
                    before.post_id, before.tag
                );
                return Outcome::Skipped;
            }

            let set_key = tag_posts_key(&tag);
            return match self.cache.zrem(&set_key, &before.post_id).await {
                Ok(()) => {
                    info!("removed {} from {}", before.post_id, set_key);
                    Outcome::Deleted
                }
                Err(err) => {
                    error!("could not remove {} from {}: {:?}", before.post_id, set_key, err);
                    Outcome::Retryable
                }
            };
        }

        let Some(after) = &event.after else {
            debug!("no after image (op {:?}), skipping", event.op);
            return Outcome::Skipped;
        };

        let tag = normalize_tag(&after.tag);
        if after.post_id.is_empty() || tag.is_empty() {
            debug!(
                "unusable tag relationship: post_id {:?}, tag {:?}",
                after.post_id, after.tag
            );
            return Outcome::Skipped;
        }

        let score = self.score_for(&after.post_id).await;
        let set_key = tag_posts_key(&tag);

        match self.cache.zadd(&set_key, score, &after.post_id).await {
            Ok(()) => {
                info!("added {} to {} with score {}", after.post_id, set_key, score);
                Outcome::Stored
            }
            Err(err) => {
                error!("could not add {} to {}: {:?}", after.post_id, set_key, err);
                Outcome::Retryable
            }
        }
    }

    // Publish time of the cached details when they exist, wall clock second
    // otherwise. The relationship event can outrun the post event, so a
    // missing key is normal here; a lookup fault is treated the same way and
    // only degrades ordering instead of stalling the stream.
    async fn score_for(&self, post_id: &str) -> f64 {
        let details_key = post_details_key(post_id);

        match get_object::<CachedPostDetails>(self.cache.as_ref(), &details_key).await {
            Ok(Some(details)) => {
                if let Some(published_at) = details.published_at {
                    return published_at.timestamp() as f64;
                }
            }
            Ok(None) => {
                debug!("no details at {} yet, scoring with current time", details_key);
            }
            Err(err) => {
                warn!(
                    "could not read {}: {:?}, scoring with current time",
                    details_key, err
                );
            }
        }

        Utc::now().timestamp() as f64
    }
}
