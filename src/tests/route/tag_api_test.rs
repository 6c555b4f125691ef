use crate::tests::support::{
    post_event, post_row, post_tag_event, source_post, test_config, MemoryCache, StaticTagSource,
};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tagcache::consumer::post_projector::PostProjector;
use tagcache::consumer::tag_projector::TagProjector;
use tagcache::{create_app, AppState};
use tower::ServiceExt;

const US: i64 = 1_000_000;

fn app_with(cache: Arc<MemoryCache>, source: StaticTagSource) -> Router {
    let state = AppState::new(test_config(), cache, Arc::new(source));
    create_app(state)
}

async fn request(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn test_health() {
    let app = app_with(Arc::new(MemoryCache::new()), StaticTagSource::default());
    let (status, body) = request(&app, "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_then_tag_round_trip() {
    let cache = Arc::new(MemoryCache::new());
    let posts = PostProjector::new(cache.clone());
    let tags = TagProjector::new(cache.clone());

    let row = post_row("a", "post", "Hi", true, Some(1_700_000_000 * US));
    posts.apply(post_event("c", None, Some(&row))).await;
    tags.apply(post_tag_event("c", None, Some(("a", "Golang"))))
        .await;

    let app = app_with(cache, StaticTagSource::default());
    let (status, body) = request(&app, "GET", "/api/tag/golang?page=1&per_page=10").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total_items"], 1);
    assert_eq!(body["data"][0]["title"], "Hi");
    assert_eq!(body["data"][0]["publishedAt"], "2023-11-14T22:13:20Z");
}

#[tokio::test]
async fn test_percent_encoded_tag_matches_both_spellings() {
    let cache = Arc::new(MemoryCache::new());
    let posts = PostProjector::new(cache.clone());
    let tags = TagProjector::new(cache.clone());

    let row = post_row("a", "post", "Hi", true, Some(1_700_000_000 * US));
    posts.apply(post_event("c", None, Some(&row))).await;
    tags.apply(post_tag_event("c", None, Some(("a", "C%2B%2B"))))
        .await;

    let app = app_with(cache, StaticTagSource::default());

    let (status, body) = request(&app, "GET", "/api/tag/c%2B%2B").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total_items"], 1);

    let (status, body) = request(&app, "GET", "/api/tag/c++").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total_items"], 1);
}

#[tokio::test]
async fn test_unpublished_post_lingers_in_index_but_not_in_data() {
    let cache = Arc::new(MemoryCache::new());
    let posts = PostProjector::new(cache.clone());
    let tags = TagProjector::new(cache.clone());

    let published = post_row("a", "post", "Hi", true, Some(1_700_000_000 * US));
    posts.apply(post_event("c", None, Some(&published))).await;
    tags.apply(post_tag_event("c", None, Some(("a", "golang"))))
        .await;

    let unpublished = post_row("a", "post", "Hi", false, Some(1_700_000_000 * US));
    posts
        .apply(post_event("u", Some(&published), Some(&unpublished)))
        .await;

    let app = app_with(cache, StaticTagSource::default());
    let (status, body) = request(&app, "GET", "/api/tag/golang").await;

    // The sorted-set member stays until its own delete event arrives; the
    // read path just cannot hydrate it any more.
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total_items"], 1);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_pagination_boundary() {
    let cache = Arc::new(MemoryCache::new());
    let posts = PostProjector::new(cache.clone());
    let tags = TagProjector::new(cache.clone());

    for i in 0..25 {
        let row = post_row(
            &format!("p{i:02}"),
            "post",
            &format!("Post {i:02}"),
            true,
            Some((1_700_000_000 + i) * US),
        );
        posts.apply(post_event("c", None, Some(&row))).await;
        tags.apply(post_tag_event("c", None, Some((&format!("p{i:02}"), "t"))))
            .await;
    }

    let app = app_with(cache, StaticTagSource::default());

    let (status, body) = request(&app, "GET", "/api/tag/t?page=3&per_page=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total_items"], 25);
    assert_eq!(body["pagination"]["total_pages"], 3);
    assert_eq!(body["pagination"]["current_page"], 3);
    assert_eq!(body["pagination"]["next_page"], Value::Null);
    assert_eq!(body["pagination"]["prev_page"], 2);
    assert_eq!(body["data"].as_array().unwrap().len(), 5);

    // Newest first: page one starts at the latest publish time.
    let (_, body) = request(&app, "GET", "/api/tag/t?page=1&per_page=10").await;
    assert_eq!(body["data"][0]["title"], "Post 24");
    assert_eq!(body["pagination"]["prev_page"], Value::Null);
    assert_eq!(body["pagination"]["next_page"], 2);
}

#[tokio::test]
async fn test_blank_tag_is_rejected() {
    let app = app_with(Arc::new(MemoryCache::new()), StaticTagSource::default());
    let (status, body) = request(&app, "GET", "/api/tag/%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Tag name cannot be empty");
}

#[tokio::test]
async fn test_unknown_tag_returns_an_empty_page() {
    let app = app_with(Arc::new(MemoryCache::new()), StaticTagSource::default());
    let (status, body) = request(&app, "GET", "/api/tag/nothing?page=4").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
    assert_eq!(body["pagination"]["total_items"], 0);
    assert_eq!(body["pagination"]["total_pages"], 0);
    assert_eq!(body["pagination"]["current_page"], 4);
    assert_eq!(body["pagination"]["next_page"], Value::Null);
    assert_eq!(body["pagination"]["prev_page"], Value::Null);
}

#[tokio::test]
async fn test_junk_page_params_fall_back_to_defaults() {
    let cache = Arc::new(MemoryCache::new());
    let posts = PostProjector::new(cache.clone());
    let tags = TagProjector::new(cache.clone());

    let row = post_row("a", "post", "Hi", true, Some(1_700_000_000 * US));
    posts.apply(post_event("c", None, Some(&row))).await;
    tags.apply(post_tag_event("c", None, Some(("a", "t")))).await;

    let app = app_with(cache, StaticTagSource::default());
    let (status, body) = request(&app, "GET", "/api/tag/t?page=zero&per_page=-5").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["current_page"], 1);
    assert_eq!(body["pagination"]["per_page"], 10);
}

#[tokio::test]
async fn test_collect_reports_processed_tags() {
    let cache = Arc::new(MemoryCache::new());
    let source = StaticTagSource {
        tags: vec!["t".to_string()],
        posts: HashMap::from([(
            "t".to_string(),
            vec![source_post("a", "Hi", 1_700_000_000)],
        )]),
        ..Default::default()
    };
    let app = app_with(cache, source);

    let (status, body) = request(&app, "POST", "/api/tag/collect").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Tags processed successfully");
    assert_eq!(body["processed_tags"]["t"], 1);

    // The index exists now, so a second call has nothing to do.
    let (status, body) = request(&app, "POST", "/api/tag/collect").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "No new tags to process");
    assert_eq!(body["processed_tags"], serde_json::json!([]));
}

#[tokio::test]
async fn test_unknown_route_is_a_json_404() {
    let app = app_with(Arc::new(MemoryCache::new()), StaticTagSource::default());
    let (status, body) = request(&app, "GET", "/api/nothing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not Found");
}
