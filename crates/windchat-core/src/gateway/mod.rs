//! Boundary to the diagnostics backend.
//!
//! The session controller only ever talks to the backend through
//! [`SyncGateway`]; [`HttpGateway`] is the production implementation.

pub mod http;

pub use http::HttpGateway;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::GatewayError;
use crate::state::Credential;

/// One stored question/answer exchange from the user's history
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistoryRecord {
    pub question: String,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Reply to a single question
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AskReply {
    #[serde(default)]
    pub answer: Option<String>,
}

impl AskReply {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: Some(answer.into()),
        }
    }
}

#[async_trait]
pub trait SyncGateway: Send + Sync {
    /// Fetch every stored exchange for the authenticated user, newest first.
    async fn list_conversations(&self, credential: &Credential) -> Result<Vec<HistoryRecord>, GatewayError>;

    /// Submit a question and wait for the answer.
    async fn ask(&self, question: &str, credential: &Credential) -> Result<AskReply, GatewayError>;
}

/// Accept RFC 3339 as well as the naive ISO-8601 form some backends emit (read as UTC).
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_history_record_with_offset_ignores_extra_fields() {
        let json = r#"{"question":"q","answer":"a","intent":"fault","created_at":"2024-05-01T12:30:00+02:00"}"#;
        let record: HistoryRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.created_at, Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_history_record_naive_timestamp_is_utc() {
        let json = r#"{"question":"q","answer":null,"created_at":"2024-05-01T12:30:00.123456"}"#;
        let record: HistoryRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.answer, None);
        assert_eq!(record.created_at.timestamp(), Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap().timestamp());
    }

    #[test]
    fn test_history_record_rejects_garbage_timestamp() {
        let json = r#"{"question":"q","answer":"a","created_at":"yesterday"}"#;
        assert!(serde_json::from_str::<HistoryRecord>(json).is_err());
    }

    #[test]
    fn test_ask_reply_ignores_extra_fields() {
        let json = r#"{"answer":"Check bearing temperature","explanations":[{"feature":"rpm","shap_value":0.4}]}"#;
        let reply: AskReply = serde_json::from_str(json).unwrap();
        assert_eq!(reply.answer.as_deref(), Some("Check bearing temperature"));
    }
}
