use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use tracing::debug;

use super::{AskReply, HistoryRecord, SyncGateway};
use crate::error::GatewayError;
use crate::state::Credential;

#[derive(Serialize)]
struct AskRequest<'a> {
    question: &'a str,
}

#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl SyncGateway for HttpGateway {
    async fn list_conversations(&self, credential: &Credential) -> Result<Vec<HistoryRecord>, GatewayError> {
        let url = self.url("my-chats");
        debug!(%url, "fetching conversation history");

        let response = self
            .client
            .get(&url)
            .bearer_auth(credential.expose())
            .send()
            .await?;

        let response = check_status(response).await?;
        let records: Vec<HistoryRecord> = response.json().await?;
        Ok(records)
    }

    async fn ask(&self, question: &str, credential: &Credential) -> Result<AskReply, GatewayError> {
        let url = self.url("ask");
        debug!(%url, chars = question.chars().count(), "submitting question");

        let response = self
            .client
            .post(&url)
            .bearer_auth(credential.expose())
            .json(&AskRequest { question })
            .send()
            .await?;

        let response = check_status(response).await?;
        let reply: AskReply = response.json().await?;
        Ok(reply)
    }
}

async fn check_status(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    Err(classify_status(status, &text))
}

fn classify_status(status: StatusCode, body: &str) -> GatewayError {
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, body)
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Auth(detail),
        _ => GatewayError::Transport(format!("backend request failed with status {}", detail)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credential() -> Credential {
        Credential::new("test-token")
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let gateway = HttpGateway::new("http://localhost:8000/");
        assert_eq!(gateway.url("ask"), "http://localhost:8000/ask");
        assert_eq!(gateway.url("my-chats"), "http://localhost:8000/my-chats");
    }

    #[tokio::test]
    async fn test_ask_posts_question_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ask"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_json(json!({ "question": "turbine vibration alarm" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "answer": "Check bearing temperature",
                "explanations": [],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = HttpGateway::new(&server.uri());
        let reply = gateway.ask("turbine vibration alarm", &credential()).await.unwrap();

        assert_eq!(reply, AskReply::new("Check bearing temperature"));
    }

    #[tokio::test]
    async fn test_list_conversations_decodes_history() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/my-chats"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "question": "why is the yaw drifting",
                    "answer": "recalibrate the yaw encoder",
                    "intent": "fault_diagnosis",
                    "created_at": "2024-05-01T09:30:00+00:00",
                },
                {
                    "question": "pitch fault on T3",
                    "answer": null,
                    "created_at": "2024-05-01T09:10:00.250000",
                },
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = HttpGateway::new(&server.uri());
        let records = gateway.list_conversations(&credential()).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].question, "why is the yaw drifting");
        assert_eq!(records[0].answer.as_deref(), Some("recalibrate the yaw encoder"));
        assert_eq!(records[0].created_at, Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap());
        assert_eq!(records[1].answer, None);
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/my-chats"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
            .mount(&server)
            .await;

        let gateway = HttpGateway::new(&server.uri());
        let err = gateway.list_conversations(&credential()).await.unwrap_err();

        assert_eq!(err, GatewayError::Auth("401 Unauthorized: invalid token".to_string()));
    }

    #[tokio::test]
    async fn test_forbidden_ask_maps_to_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ask"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let gateway = HttpGateway::new(&server.uri());
        let err = gateway.ask("q", &credential()).await.unwrap_err();

        assert!(matches!(err, GatewayError::Auth(_)));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_transport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ask"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
            .mount(&server)
            .await;

        let gateway = HttpGateway::new(&server.uri());
        let err = gateway.ask("q", &credential()).await.unwrap_err();

        match err {
            GatewayError::Transport(msg) => assert!(msg.contains("500") && msg.contains("model crashed"), "{}", msg),
            other => panic!("expected transport error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_maps_to_transport() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/my-chats"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let gateway = HttpGateway::new(&server.uri());
        let err = gateway.list_conversations(&credential()).await.unwrap_err();

        assert!(matches!(err, GatewayError::Transport(_)));
    }

    #[tokio::test]
    async fn test_slow_backend_times_out_as_transport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ask"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "answer": "late" }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let gateway = HttpGateway::with_timeout(&server.uri(), Duration::from_millis(200)).unwrap();
        let err = gateway.ask("q", &credential()).await.unwrap_err();

        assert_eq!(err, GatewayError::Transport("timeout".to_string()));
    }
}
