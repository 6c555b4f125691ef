use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Deserializer};
use std::error::Error;

/// Row-level change operation carried by a CDC envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Create,
    Update,
    Delete,
    Read,
}

impl Op {
    fn parse(raw: &str) -> Result<Self, DecodeError> {
        match raw {
            "c" => Ok(Op::Create),
            "u" => Ok(Op::Update),
            "d" => Ok(Op::Delete),
            "r" => Ok(Op::Read),
            other => Err(DecodeError::UnknownOp(other.to_string())),
        }
    }
}

#[derive(Debug, Display)]
pub enum DecodeError {
    #[display("malformed change envelope: {_0}")]
    MalformedEnvelope(serde_json::Error),
    #[display("unknown op {_0:?}")]
    UnknownOp(String),
}

impl Error for DecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DecodeError::MalformedEnvelope(err) => Some(err),
            DecodeError::UnknownOp(_) => None,
        }
    }
}

// The outer frame as emitted by the replication connector. `schema` and
// `payload.source` are carried on the wire but never consumed here.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    payload: ChangePayload<T>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ChangePayload<T> {
    #[serde(default)]
    before: Option<T>,
    #[serde(default)]
    after: Option<T>,
    op: String,
    #[serde(default)]
    ts_ms: i64,
}

/// A row of the upstream `posts` table as it appears inside an envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct PostRecord {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub view_count: i32,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default, deserialize_with = "micros_to_datetime")]
    pub published_at: Option<DateTime<Utc>>,
}

/// A row of the upstream `post_tags` table.
#[derive(Debug, Clone, Deserialize)]
pub struct PostTagRecord {
    #[serde(default)]
    pub post_id: String,
    #[serde(default)]
    pub tag: String,
}

#[derive(Debug)]
pub struct PostEvent {
    pub op: Op,
    pub before: Option<PostRecord>,
    pub after: Option<PostRecord>,
    pub ts_ms: i64,
}

#[derive(Debug)]
pub struct PostTagEvent {
    pub op: Op,
    pub before: Option<PostTagRecord>,
    pub after: Option<PostTagRecord>,
    pub ts_ms: i64,
}

/// Decodes an envelope from the `posts` topic.
pub fn decode_post_event(raw: &[u8]) -> Result<PostEvent, DecodeError> {
    let envelope: Envelope<PostRecord> =
        serde_json::from_slice(raw).map_err(DecodeError::MalformedEnvelope)?;
    let payload = envelope.payload;

    Ok(PostEvent {
        op: Op::parse(&payload.op)?,
        before: payload.before,
        after: payload.after,
        ts_ms: payload.ts_ms,
    })
}

/// Decodes an envelope from the `post_tags` topic.
pub fn decode_post_tag_event(raw: &[u8]) -> Result<PostTagEvent, DecodeError> {
    let envelope: Envelope<PostTagRecord> =
        serde_json::from_slice(raw).map_err(DecodeError::MalformedEnvelope)?;
    let payload = envelope.payload;

    Ok(PostTagEvent {
        op: Op::parse(&payload.op)?,
        before: payload.before,
        after: payload.after,
        ts_ms: payload.ts_ms,
    })
}

// `published_at` arrives as microseconds since epoch; null means the publish
// time is unknown.
fn micros_to_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let micros: Option<i64> = Option::deserialize(deserializer)?;
    match micros {
        None => Ok(None),
        Some(us) => DateTime::from_timestamp_micros(us)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("published_at out of range: {us}"))),
    }
}
