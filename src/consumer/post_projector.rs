use crate::config::post_details_key;
use crate::consumer::Outcome;
use crate::model::event::{Op, PostEvent};
use crate::model::post::CachedPostDetails;
use crate::service::cache_service::{set_object, Cache};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Applies `posts` change events to the detail cache: published posts get a
/// `post:details:{id}` key, deletes and unpublish transitions drop it.
#[derive(Clone)]
pub struct PostProjector {
    cache: Arc<dyn Cache>,
}

impl PostProjector {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        PostProjector { cache }
    }

    pub async fn apply(&self, event: PostEvent) -> Outcome {
        // Hard deletes drop the cached details whatever the row looks like
        // now; it may have been retyped or unpublished since it was indexed.
        if event.op == Op::Delete {
            return match &event.before {
                Some(before) if !before.id.is_empty() => self.delete_details(&before.id).await,
                _ => {
                    debug!("delete event without a usable before image, skipping");
                    Outcome::Skipped
                }
            };
        }

        // An update that flips is_published true -> false is a terminal
        // transition for the cache entry too.
        if event.op == Op::Update {
            if let (Some(before), Some(after)) = (&event.before, &event.after) {
                if before.is_published && !after.is_published && !after.id.is_empty() {
                    return self.delete_details(&after.id).await;
                }
            }
        }

        let Some(after) = &event.after else {
            debug!("no after image (op {:?}), skipping", event.op);
            return Outcome::Skipped;
        };

        if after.id.is_empty() {
            debug!("post event without an id, skipping");
            return Outcome::Skipped;
        }

        if !after.kind.eq_ignore_ascii_case("post") {
            debug!("row {} is a {:?}, not a post, skipping", after.id, after.kind);
            return Outcome::Skipped;
        }

        if !after.is_published {
            debug!("post {} is not published, skipping", after.id);
            return Outcome::Skipped;
        }

        let details = CachedPostDetails::from(after);
        let details_key = post_details_key(&after.id);

        match set_object(self.cache.as_ref(), &details_key, &details).await {
            Ok(()) => {
                info!("stored post details at {}", details_key);
                Outcome::Stored
            }
            Err(err) => {
                error!("could not store {}: {:?}", details_key, err);
                Outcome::Retryable
            }
        }
    }

    async fn delete_details(&self, id: &str) -> Outcome {
        let details_key = post_details_key(id);
        match self.cache.del(&details_key).await {
            Ok(()) => {
                info!("deleted post details at {}", details_key);
                Outcome::Deleted
            }
            Err(err) => {
                error!("could not delete {}: {:?}", details_key, err);
                Outcome::Retryable
            }
        }
    }
}
