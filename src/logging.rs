use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

const SERVICE_NAME: &str = "tag-service";

/// Ships every log record to a daily Elasticsearch index, fire and forget.
/// A record that fails to ship is dropped; stdout already has it.
pub struct ElasticsearchLayer {
    client: reqwest::Client,
    url: String,
    index_prefix: String,
}

impl ElasticsearchLayer {
    pub fn new(url: &str, index_prefix: &str) -> Self {
        ElasticsearchLayer {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .expect("Cannot build Elasticsearch HTTP client"),
            url: url.trim_end_matches('/').to_string(),
            index_prefix: index_prefix.to_string(),
        }
    }
}

#[derive(Serialize)]
struct LogRecord {
    timestamp: String,
    level: String,
    message: String,
    service: &'static str,
    target: String,
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

impl<S: Subscriber> Layer<S> for ElasticsearchLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let now = Utc::now();
        let record = LogRecord {
            timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            level: event.metadata().level().to_string(),
            message: visitor.message,
            service: SERVICE_NAME,
            target: event.metadata().target().to_string(),
        };

        let endpoint = format!(
            "{}/{}-{}/_doc",
            self.url,
            self.index_prefix,
            now.format("%Y.%m.%d")
        );
        let client = self.client.clone();

        // The sink must never block or fail the code that logged.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let _ = client.post(endpoint).json(&record).send().await;
            });
        }
    }
}
