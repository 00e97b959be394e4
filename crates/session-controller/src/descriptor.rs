//! Session descriptor resolution.
//!
//! A descriptor is everything one join attempt needs: the channel, the
//! single-use transport credentials, the numeric participant id and the
//! caller's role. It is resolved fresh for every attempt and is deliberately
//! not `Clone`, so the credentials cannot be cached and reused for a second
//! join.

use chrono::{DateTime, Utc};
use common::secret::{ExposeSecret, SecretString};
use common::types::{ParticipantUid, SessionId, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::errors::SessionError;
use crate::scheduling::{DescriptorResponse, SchedulingClient, SessionStatus};

/// Role negotiated for a participant in one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionRole {
    /// Sends audio/video on join; the session owner.
    Publisher,
    /// Receives media; may opt in to publishing later.
    Subscriber,
}

impl SessionRole {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SessionRole::Publisher => "publisher",
            SessionRole::Subscriber => "subscriber",
        }
    }
}

/// Authenticated caller asking to join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: UserId,
    pub display_name: String,
}

impl CallerIdentity {
    #[must_use]
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
        }
    }
}

/// Transport credentials for a single join.
#[derive(Debug)]
pub struct Credentials {
    pub app_id: String,
    pub token: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl Credentials {
    /// Whether the token has passed its expiry at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Resolved join descriptor. Consumed by one join attempt.
#[derive(Debug)]
pub struct SessionDescriptor {
    pub session_id: SessionId,
    pub channel_name: String,
    pub credentials: Credentials,
    pub participant_id: ParticipantUid,
    pub role: SessionRole,
}

/// Resolves descriptors through the scheduling service.
#[derive(Clone)]
pub struct SessionDescriptorResolver {
    client: Arc<dyn SchedulingClient>,
}

impl SessionDescriptorResolver {
    #[must_use]
    pub fn new(client: Arc<dyn SchedulingClient>) -> Self {
        Self { client }
    }

    /// Resolve the descriptor for `caller` in `session_id`.
    ///
    /// # Errors
    ///
    /// - `NotFound` / `Forbidden` / `AlreadyEnded` from the scheduling service
    /// - `AlreadyEnded` if the session status is `Ended`
    /// - `Scheduling` if the service is unreachable or the descriptor is unusable
    ///
    /// All errors are terminal for the join attempt.
    #[instrument(skip_all, fields(session_id = %session_id, user_id = %caller.user_id))]
    pub async fn resolve(
        &self,
        session_id: &SessionId,
        caller: &CallerIdentity,
    ) -> Result<SessionDescriptor, SessionError> {
        let response = self
            .client
            .get_session_descriptor(session_id, caller)
            .await?;

        let descriptor = build_descriptor(session_id, caller, response, Utc::now())?;

        debug!(
            target: "sc.descriptor",
            channel = %descriptor.channel_name,
            participant_id = %descriptor.participant_id,
            role = descriptor.role.as_str(),
            "Descriptor resolved"
        );

        Ok(descriptor)
    }
}

fn build_descriptor(
    session_id: &SessionId,
    caller: &CallerIdentity,
    response: DescriptorResponse,
    now: DateTime<Utc>,
) -> Result<SessionDescriptor, SessionError> {
    if response.status == SessionStatus::Ended {
        return Err(SessionError::AlreadyEnded);
    }

    if &response.session_id != session_id {
        warn!(
            target: "sc.descriptor",
            requested = %session_id,
            returned = %response.session_id,
            "Descriptor returned for a different session"
        );
        return Err(SessionError::Scheduling("invalid descriptor".to_string()));
    }

    let credentials = Credentials {
        app_id: response.app_id,
        token: response.token,
        expires_at: response.expires_at,
    };

    if response.channel_name.is_empty()
        || credentials.app_id.is_empty()
        || credentials.token.expose_secret().is_empty()
    {
        warn!(target: "sc.descriptor", "Descriptor is missing transport credentials");
        return Err(SessionError::Scheduling("invalid descriptor".to_string()));
    }

    if credentials.is_expired_at(now) {
        warn!(
            target: "sc.descriptor",
            expires_at = %credentials.expires_at,
            "Descriptor credentials already expired"
        );
        return Err(SessionError::Scheduling("invalid descriptor".to_string()));
    }

    let role = if response.owner_user_id == caller.user_id {
        SessionRole::Publisher
    } else {
        SessionRole::Subscriber
    };

    Ok(SessionDescriptor {
        session_id: response.session_id,
        channel_name: response.channel_name,
        credentials,
        participant_id: response.participant_id,
        role,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::errors::{ErrorCategory, SchedulingError};
    use crate::scheduling::mock::MockSchedulingClient;
    use chrono::Duration;

    fn response(owner: UserId, status: SessionStatus) -> DescriptorResponse {
        DescriptorResponse {
            session_id: SessionId::new("sess-1"),
            status,
            owner_user_id: owner,
            channel_name: "biology-3".to_string(),
            app_id: "app-1".to_string(),
            token: SecretString::from("rtc-token"),
            participant_id: ParticipantUid(12),
            expires_at: Utc::now() + Duration::minutes(10),
        }
    }

    fn resolver(mock: MockSchedulingClient) -> SessionDescriptorResolver {
        SessionDescriptorResolver::new(Arc::new(mock))
    }

    #[tokio::test]
    async fn test_owner_is_publisher() {
        let teacher = CallerIdentity::new(UserId::new(), "Ms. Frizzle");
        let mock =
            MockSchedulingClient::with_descriptor(response(teacher.user_id, SessionStatus::Live));

        let descriptor = resolver(mock)
            .resolve(&SessionId::new("sess-1"), &teacher)
            .await
            .unwrap();

        assert_eq!(descriptor.role, SessionRole::Publisher);
        assert_eq!(descriptor.participant_id, ParticipantUid(12));
        assert_eq!(descriptor.channel_name, "biology-3");
    }

    #[tokio::test]
    async fn test_non_owner_is_subscriber() {
        let student = CallerIdentity::new(UserId::new(), "Arnold");
        let mock = MockSchedulingClient::with_descriptor(response(
            UserId::new(),
            SessionStatus::Scheduled,
        ));

        let descriptor = resolver(mock)
            .resolve(&SessionId::new("sess-1"), &student)
            .await
            .unwrap();

        assert_eq!(descriptor.role, SessionRole::Subscriber);
    }

    #[tokio::test]
    async fn test_ended_session_rejected() {
        let caller = CallerIdentity::new(UserId::new(), "Arnold");
        let mock =
            MockSchedulingClient::with_descriptor(response(UserId::new(), SessionStatus::Ended));

        let err = resolver(mock)
            .resolve(&SessionId::new("sess-1"), &caller)
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::AlreadyEnded));
    }

    #[tokio::test]
    async fn test_collaborator_errors_propagate() {
        let caller = CallerIdentity::new(UserId::new(), "Arnold");

        let err = resolver(MockSchedulingClient::failing(SchedulingError::NotFound))
            .resolve(&SessionId::new("sess-1"), &caller)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NotFound));

        let err = resolver(MockSchedulingClient::failing(SchedulingError::Forbidden))
            .resolve(&SessionId::new("sess-1"), &caller)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Forbidden {
                operation: "join",
                ..
            }
        ));
        assert_eq!(err.category(), ErrorCategory::JoinRejected);
    }

    #[test]
    fn test_expired_credentials_rejected() {
        let caller = CallerIdentity::new(UserId::new(), "Arnold");
        let mut resp = response(UserId::new(), SessionStatus::Live);
        resp.expires_at = Utc::now() - Duration::seconds(1);

        let err = build_descriptor(&SessionId::new("sess-1"), &caller, resp, Utc::now())
            .unwrap_err();
        assert!(matches!(err, SessionError::Scheduling(_)));
    }

    #[test]
    fn test_missing_token_rejected() {
        let caller = CallerIdentity::new(UserId::new(), "Arnold");
        let mut resp = response(UserId::new(), SessionStatus::Live);
        resp.token = SecretString::from("");

        assert!(build_descriptor(&SessionId::new("sess-1"), &caller, resp, Utc::now()).is_err());
    }

    #[test]
    fn test_mismatched_session_rejected() {
        let caller = CallerIdentity::new(UserId::new(), "Arnold");
        let resp = response(UserId::new(), SessionStatus::Live);

        assert!(build_descriptor(&SessionId::new("other"), &caller, resp, Utc::now()).is_err());
    }

    #[test]
    fn test_descriptor_debug_redacts_token() {
        let caller = CallerIdentity::new(UserId::new(), "Arnold");
        let resp = response(UserId::new(), SessionStatus::Live);
        let descriptor =
            build_descriptor(&SessionId::new("sess-1"), &caller, resp, Utc::now()).unwrap();

        assert!(!format!("{descriptor:?}").contains("rtc-token"));
    }
}
