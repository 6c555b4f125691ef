use crate::config::KafkaConfig;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaResult;
use rdkafka::message::Message;
use rdkafka::Offset;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info};

pub mod post_projector;
pub mod tag_projector;

/// What applying one change event did to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A detail key or sorted-set member was written.
    Stored,
    /// A detail key or sorted-set member was removed.
    Deleted,
    /// The event was irrelevant or unusable; the offset can be committed.
    Skipped,
    /// A transport fault; the event must be redelivered.
    Retryable,
}

/// Sleep between attempts after a fetch error or a retryable apply.
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

pub fn build_consumer(config: &KafkaConfig, topic: &str) -> KafkaResult<StreamConsumer> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", config.brokers.join(","))
        .set("group.id", config.group_id.as_str())
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest")
        .create()?;

    consumer.subscribe(&[topic])?;
    Ok(consumer)
}

/// At-least-once fetch/commit driver around one topic.
///
/// The handler decodes and applies one message payload. Offsets are committed
/// after every outcome except `Retryable`, which rewinds to the same offset
/// and backs off; decode failures are the handler's to log and map to
/// `Skipped` so a poison pill cannot wedge the partition.
///
/// A shutdown signal interrupts the blocking fetch; an apply that is already
/// running finishes first, and no further fetches are made.
pub async fn run_loop<F, Fut>(
    consumer: StreamConsumer,
    topic: &str,
    mut shutdown: watch::Receiver<bool>,
    handle: F,
) where
    F: Fn(Vec<u8>) -> Fut,
    Fut: Future<Output = Outcome>,
{
    info!("consumer loop started for {}", topic);

    loop {
        let received = tokio::select! {
            _ = shutdown.changed() => {
                info!("shutdown requested, stopping consumer for {}", topic);
                break;
            }
            received = consumer.recv() => received,
        };

        let message = match received {
            Ok(message) => message,
            Err(err) => {
                error!("error fetching message from {}: {:?}", topic, err);
                sleep(RETRY_BACKOFF).await;
                continue;
            }
        };

        let payload = message.payload().unwrap_or_default().to_vec();

        match handle(payload).await {
            Outcome::Stored | Outcome::Deleted | Outcome::Skipped => {
                if let Err(err) = consumer.commit_message(&message, CommitMode::Async) {
                    error!("error committing offset on {}: {:?}", topic, err);
                }
            }
            Outcome::Retryable => {
                // Rewind so the uncommitted offset is fetched again after the
                // backoff instead of being silently stepped over.
                if let Err(err) = consumer.seek(
                    message.topic(),
                    message.partition(),
                    Offset::Offset(message.offset()),
                    Duration::from_secs(5),
                ) {
                    error!(
                        "could not rewind {} to offset {}: {:?}",
                        topic,
                        message.offset(),
                        err
                    );
                }
                sleep(RETRY_BACKOFF).await;
            }
        }
    }
}
