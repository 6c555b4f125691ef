use crate::tests::support::{post_event, post_row, post_tag_event, FaultyCache, MemoryCache};
use chrono::Utc;
use std::sync::Arc;
use tagcache::config::tag_posts_key;
use tagcache::consumer::post_projector::PostProjector;
use tagcache::consumer::tag_projector::TagProjector;
use tagcache::consumer::Outcome;
use tagcache::service::cache_service::Cache;

const US: i64 = 1_000_000;

fn setup() -> (Arc<MemoryCache>, PostProjector, TagProjector) {
    let cache = Arc::new(MemoryCache::new());
    let posts = PostProjector::new(cache.clone());
    let tags = TagProjector::new(cache.clone());
    (cache, posts, tags)
}

#[tokio::test]
async fn test_member_scored_with_publish_time() {
    let (cache, posts, tags) = setup();

    let row = post_row("a", "post", "Hi", true, Some(1_700_000_000 * US));
    posts.apply(post_event("c", None, Some(&row))).await;

    let outcome = tags
        .apply(post_tag_event("c", None, Some(("a", "Golang"))))
        .await;
    assert_eq!(outcome, Outcome::Stored);
    assert_eq!(
        cache.zscore(&tag_posts_key("golang"), "a"),
        Some(1_700_000_000.0)
    );
}

#[tokio::test]
async fn test_tag_key_is_normalized() {
    let (cache, _, tags) = setup();

    tags.apply(post_tag_event("c", None, Some(("a", "C%2B%2B"))))
        .await;
    assert_eq!(cache.zcard(&tag_posts_key("c++")).await.unwrap(), 1);

    tags.apply(post_tag_event("c", None, Some(("b", "  Rust "))))
        .await;
    assert_eq!(cache.zcard(&tag_posts_key("rust")).await.unwrap(), 1);
}

#[tokio::test]
async fn test_unknown_post_falls_back_to_wall_clock() {
    let (cache, _, tags) = setup();

    let before = Utc::now().timestamp() as f64;
    tags.apply(post_tag_event("c", None, Some(("b", "t")))).await;
    let after = Utc::now().timestamp() as f64;

    let score = cache.zscore(&tag_posts_key("t"), "b").unwrap();
    assert!(score >= before && score <= after, "score {score} not in [{before}, {after}]");
}

#[tokio::test]
async fn test_reupsert_rescores_once_details_arrive() {
    // The relationship event can outrun the post event; a later redelivery
    // of the relationship picks up the real publish time.
    let (cache, posts, tags) = setup();

    tags.apply(post_tag_event("c", None, Some(("b", "t")))).await;

    let row = post_row("b", "post", "Hi", true, Some(1_700_000_500 * US));
    posts.apply(post_event("c", None, Some(&row))).await;

    tags.apply(post_tag_event("c", None, Some(("b", "t")))).await;
    assert_eq!(cache.zscore(&tag_posts_key("t"), "b"), Some(1_700_000_500.0));
}

#[tokio::test]
async fn test_delete_removes_member() {
    let (cache, _, tags) = setup();

    tags.apply(post_tag_event("c", None, Some(("a", "t")))).await;
    assert_eq!(cache.zcard(&tag_posts_key("t")).await.unwrap(), 1);

    let outcome = tags
        .apply(post_tag_event("d", Some(("a", "t")), None))
        .await;
    assert_eq!(outcome, Outcome::Deleted);
    assert_eq!(cache.zcard(&tag_posts_key("t")).await.unwrap(), 0);
}

#[tokio::test]
async fn test_membership_follows_last_relationship_event() {
    // Whatever the interleaving with posts events, the member is present
    // exactly when the last relationship event was not a delete.
    let (cache, posts, tags) = setup();
    let row = post_row("a", "post", "Hi", true, Some(1_700_000_000 * US));

    tags.apply(post_tag_event("c", None, Some(("a", "t")))).await;
    posts.apply(post_event("c", None, Some(&row))).await;
    tags.apply(post_tag_event("d", Some(("a", "t")), None)).await;
    assert_eq!(cache.zcard(&tag_posts_key("t")).await.unwrap(), 0);

    tags.apply(post_tag_event("u", None, Some(("a", "t")))).await;
    assert_eq!(cache.zcard(&tag_posts_key("t")).await.unwrap(), 1);
}

#[tokio::test]
async fn test_blank_ids_and_tags_are_skipped() {
    let (cache, _, tags) = setup();

    assert_eq!(
        tags.apply(post_tag_event("c", None, Some(("", "t")))).await,
        Outcome::Skipped
    );
    assert_eq!(
        tags.apply(post_tag_event("c", None, Some(("a", "   ")))).await,
        Outcome::Skipped
    );
    assert_eq!(
        tags.apply(post_tag_event("d", Some(("", "")), None)).await,
        Outcome::Skipped
    );
    assert_eq!(
        tags.apply(post_tag_event("c", None, None)).await,
        Outcome::Skipped
    );
    assert_eq!(cache.zcard(&tag_posts_key("t")).await.unwrap(), 0);
}

#[tokio::test]
async fn test_applying_twice_is_idempotent() {
    let (cache, posts, tags) = setup();

    let row = post_row("a", "post", "Hi", true, Some(1_700_000_000 * US));
    posts.apply(post_event("c", None, Some(&row))).await;

    tags.apply(post_tag_event("c", None, Some(("a", "t")))).await;
    tags.apply(post_tag_event("c", None, Some(("a", "t")))).await;
    assert_eq!(cache.zcard(&tag_posts_key("t")).await.unwrap(), 1);
    assert_eq!(cache.zscore(&tag_posts_key("t"), "a"), Some(1_700_000_000.0));

    tags.apply(post_tag_event("d", Some(("a", "t")), None)).await;
    tags.apply(post_tag_event("d", Some(("a", "t")), None)).await;
    assert_eq!(cache.zcard(&tag_posts_key("t")).await.unwrap(), 0);
}

#[tokio::test]
async fn test_write_fault_is_retryable() {
    let tags = TagProjector::new(Arc::new(FaultyCache));

    // The score lookup failing is tolerated; the sorted-set write failing
    // is not.
    assert_eq!(
        tags.apply(post_tag_event("c", None, Some(("a", "t")))).await,
        Outcome::Retryable
    );
    assert_eq!(
        tags.apply(post_tag_event("d", Some(("a", "t")), None)).await,
        Outcome::Retryable
    );
}
