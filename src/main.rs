
use tagcache::config::AppConfig;
use tagcache::consumer::post_projector::PostProjector;
use tagcache::consumer::tag_projector::TagProjector;
use tagcache::consumer::{build_consumer, run_loop, Outcome};
use tagcache::logging::ElasticsearchLayer;
use tagcache::model::event::{decode_post_event, decode_post_tag_event};
use tagcache::util::env::load_dotenv;
use tagcache::{create_app, AppState};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() {
    load_dotenv();

    let config = AppConfig::from_env();

    let es_layer = config
        .log
        .elasticsearch_url
        .as_deref()
        .map(|url| ElasticsearchLayer::new(url, &config.log.elasticsearch_index_prefix));

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or(format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(fmt::layer())
        .with(es_layer)
        .init();

    if config.log.elasticsearch_url.is_some() {
        info!("Elasticsearch logging enabled");
    }

    let (app_state, db) = AppState::connect(config.clone()).await;

    let posts_consumer = build_consumer(&config.kafka, &config.kafka.posts_topic)
        .expect("Cannot create consumer for the posts topic");
    let post_tags_consumer = build_consumer(&config.kafka, &config.kafka.post_tags_topic)
        .expect("Cannot create consumer for the post_tags topic");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let posts_task = {
        let projector = PostProjector::new(app_state.cache.clone());
        let topic = config.kafka.posts_topic.clone();
        let shutdown = shutdown_rx.clone();

        tokio::spawn(async move {
            run_loop(posts_consumer, &topic, shutdown, move |payload| {
                let projector = projector.clone();
                async move {
                    match decode_post_event(&payload) {
                        Ok(event) => projector.apply(event).await,
                        Err(err) => {
                            error!("dropping undecodable posts message: {}", err);
                            Outcome::Skipped
                        }
                    }
                }
            })
            .await;
        })
    };

    let post_tags_task = {
        let projector = TagProjector::new(app_state.cache.clone());
        let topic = config.kafka.post_tags_topic.clone();
        let shutdown = shutdown_rx.clone();

        tokio::spawn(async move {
            run_loop(post_tags_consumer, &topic, shutdown, move |payload| {
                let projector = projector.clone();
                async move {
                    match decode_post_tag_event(&payload) {
                        Ok(event) => projector.apply(event).await,
                        Err(err) => {
                            error!("dropping undecodable post_tags message: {}", err);
                            Outcome::Skipped
                        }
                    }
                }
            })
            .await;
        })
    };

    let addr = format!("0.0.0.0:{}", config.http.port);
    let app = create_app(app_state);
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Cannot bind HTTP listener");
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    // The server has drained; stop the consumer loops. An apply that is
    // already in flight finishes before its loop exits.
    let _ = shutdown_tx.send(true);
    let _ = tokio::join!(posts_task, post_tags_task);

    db.pool.close().await;
    info!("Shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Cannot install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Cannot install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
