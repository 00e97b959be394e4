//! HTTP client for the scheduling service's internal session endpoints.
//!
//! - The controller authenticates with a service bearer token
//! - Timeouts prevent a hung scheduling call from stalling a join
//! - Response bodies are never logged (they carry transport tokens)

use super::{DescriptorResponse, SchedulingClient};
use crate::config::Config;
use crate::descriptor::CallerIdentity;
use crate::errors::{SchedulingError, SessionError};

use async_trait::async_trait;
use common::secret::{ExposeSecret, SecretString};
use common::types::SessionId;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::{error, instrument, warn};

/// HTTP implementation of [`SchedulingClient`].
#[derive(Clone)]
pub struct HttpSchedulingClient {
    /// HTTP client with configured timeouts.
    client: Client,

    /// Base URL, without trailing slash.
    base_url: String,

    /// Service token for the `Authorization` header.
    service_token: SecretString,
}

impl HttpSchedulingClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Config` if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, SessionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.scheduling_request_timeout_seconds))
            .connect_timeout(Duration::from_secs(
                config.scheduling_connect_timeout_seconds,
            ))
            .build()
            .map_err(|e| {
                error!(target: "sc.scheduling", error = %e, "Failed to build HTTP client");
                SessionError::Config("failed to build scheduling HTTP client".to_string())
            })?;

        Ok(Self {
            client,
            base_url: config.scheduling_api_url.clone(),
            service_token: config.scheduling_service_token.clone(),
        })
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.service_token.expose_secret())
    }
}

/// Map a non-success status to a scheduling error.
fn error_for_status(status: StatusCode) -> SchedulingError {
    match status {
        StatusCode::NOT_FOUND => SchedulingError::NotFound,
        StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => SchedulingError::Forbidden,
        StatusCode::CONFLICT | StatusCode::GONE => SchedulingError::AlreadyEnded,
        other => SchedulingError::Unavailable(format!("unexpected status {}", other.as_u16())),
    }
}

fn check_status(response: &Response) -> Result<(), SchedulingError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let err = error_for_status(status);
    warn!(
        target: "sc.scheduling",
        status = status.as_u16(),
        error = %err,
        "Scheduling service returned error status"
    );
    Err(err)
}

#[async_trait]
impl SchedulingClient for HttpSchedulingClient {
    #[instrument(skip_all, fields(session_id = %session_id, user_id = %caller.user_id))]
    async fn get_session_descriptor(
        &self,
        session_id: &SessionId,
        caller: &CallerIdentity,
    ) -> Result<DescriptorResponse, SchedulingError> {
        let url = format!(
            "{}/api/v1/sessions/{}/descriptor?user_id={}",
            self.base_url, session_id, caller.user_id
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(|e| {
                warn!(target: "sc.scheduling", error = %e, "Descriptor request failed");
                SchedulingError::Unavailable("scheduling service is unavailable".to_string())
            })?;

        check_status(&response)?;

        response.json::<DescriptorResponse>().await.map_err(|e| {
            warn!(target: "sc.scheduling", error = %e, "Malformed descriptor response");
            SchedulingError::Unavailable("malformed descriptor response".to_string())
        })
    }

    #[instrument(skip_all, fields(session_id = %session_id))]
    async fn mark_session_ended(&self, session_id: &SessionId) -> Result<(), SchedulingError> {
        let url = format!("{}/api/v1/sessions/{}/end", self.base_url, session_id);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(|e| {
                warn!(target: "sc.scheduling", error = %e, "End-session request failed");
                SchedulingError::Unavailable("scheduling service is unavailable".to_string())
            })?;

        check_status(&response)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::scheduling::SessionStatus;
    use common::types::{ParticipantUid, UserId};
    use std::collections::HashMap;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HttpSchedulingClient {
        let vars = HashMap::from([
            ("SCHEDULING_API_URL".to_string(), server.uri()),
            (
                "SCHEDULING_SERVICE_TOKEN".to_string(),
                "svc-token".to_string(),
            ),
        ]);
        let config = Config::from_vars(&vars).unwrap();
        HttpSchedulingClient::new(&config).unwrap()
    }

    fn caller() -> CallerIdentity {
        CallerIdentity::new(UserId::new(), "Ada")
    }

    #[tokio::test]
    async fn test_get_descriptor_success() {
        let server = MockServer::start().await;
        let caller = caller();
        let owner = UserId::new();

        Mock::given(method("GET"))
            .and(path("/api/v1/sessions/sess-1/descriptor"))
            .and(query_param("user_id", caller.user_id.to_string()))
            .and(header("Authorization", "Bearer svc-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "session_id": "sess-1",
                "status": "live",
                "owner_user_id": owner.to_string(),
                "channel_name": "algebra-7",
                "app_id": "app-123",
                "token": "rtc-token",
                "participant_id": 4021,
                "expires_at": "2099-01-01T00:00:00Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let descriptor = client_for(&server)
            .get_session_descriptor(&SessionId::new("sess-1"), &caller)
            .await
            .unwrap();

        assert_eq!(descriptor.status, SessionStatus::Live);
        assert_eq!(descriptor.owner_user_id, owner);
        assert_eq!(descriptor.channel_name, "algebra-7");
        assert_eq!(descriptor.participant_id, ParticipantUid(4021));
        assert_eq!(descriptor.token.expose_secret(), "rtc-token");
    }

    #[tokio::test]
    async fn test_get_descriptor_status_mapping() {
        for (status, check) in [
            (404, "not_found"),
            (403, "forbidden"),
            (410, "already_ended"),
            (503, "unavailable"),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;

            let err = client_for(&server)
                .get_session_descriptor(&SessionId::new("sess-x"), &caller())
                .await
                .unwrap_err();

            let matched = match check {
                "not_found" => matches!(err, SchedulingError::NotFound),
                "forbidden" => matches!(err, SchedulingError::Forbidden),
                "already_ended" => matches!(err, SchedulingError::AlreadyEnded),
                _ => matches!(err, SchedulingError::Unavailable(_)),
            };
            assert!(matched, "status {status} mapped to {err:?}");
        }
    }

    #[tokio::test]
    async fn test_get_descriptor_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_session_descriptor(&SessionId::new("sess-1"), &caller())
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_mark_session_ended() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/sessions/sess-9/end"))
            .and(header("Authorization", "Bearer svc-token"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .mark_session_ended(&SessionId::new("sess-9"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_mark_session_ended_already_ended() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .mark_session_ended(&SessionId::new("sess-9"))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::AlreadyEnded));
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        let vars = HashMap::from([
            (
                "SCHEDULING_API_URL".to_string(),
                "http://127.0.0.1:1".to_string(),
            ),
            ("SCHEDULING_SERVICE_TOKEN".to_string(), "t".to_string()),
            (
                "SCHEDULING_CONNECT_TIMEOUT_SECONDS".to_string(),
                "1".to_string(),
            ),
        ]);
        let client = HttpSchedulingClient::new(&Config::from_vars(&vars).unwrap()).unwrap();

        let err = client
            .mark_session_ended(&SessionId::new("sess-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::Unavailable(_)));
    }
}
