//! Pre-configured test data for controller tests.

use chrono::{Duration, Utc};
use common::secret::SecretString;
use common::types::{ParticipantUid, SessionId, UserId};
use session_controller::descriptor::CallerIdentity;
use session_controller::scheduling::{DescriptorResponse, SessionStatus};
use uuid::Uuid;

/// A scheduled class session as the scheduling service would describe it.
#[derive(Debug, Clone)]
pub struct TestSession {
    pub session_id: SessionId,
    /// The teacher who owns the session.
    pub owner: UserId,
    pub channel_name: String,
    pub status: SessionStatus,
    pub participant_id: ParticipantUid,
}

impl TestSession {
    /// Create a live session with a fresh owner.
    #[must_use]
    pub fn new(session_id: impl Into<String>) -> Self {
        let session_id = session_id.into();
        Self {
            channel_name: format!("class-{session_id}"),
            session_id: SessionId::new(session_id),
            owner: UserId::new(),
            status: SessionStatus::Live,
            participant_id: ParticipantUid(1001),
        }
    }

    /// Create a live session with a random ID.
    #[must_use]
    pub fn random() -> Self {
        Self::new(format!("sess-{}", Uuid::new_v4()))
    }

    #[must_use]
    pub fn with_status(mut self, status: SessionStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_participant_id(mut self, participant_id: u32) -> Self {
        self.participant_id = ParticipantUid(participant_id);
        self
    }

    /// The session owner as a caller.
    #[must_use]
    pub fn teacher(&self) -> CallerIdentity {
        CallerIdentity::new(self.owner, "Test Teacher")
    }

    /// A caller who is not the owner.
    #[must_use]
    pub fn student(&self) -> CallerIdentity {
        CallerIdentity::new(UserId::new(), "Test Student")
    }

    /// Descriptor the scheduling service returns for this session.
    #[must_use]
    pub fn descriptor(&self) -> DescriptorResponse {
        DescriptorResponse {
            session_id: self.session_id.clone(),
            status: self.status,
            owner_user_id: self.owner,
            channel_name: self.channel_name.clone(),
            app_id: "test-app".to_string(),
            token: SecretString::from("test-rtc-token"),
            participant_id: self.participant_id,
            expires_at: Utc::now() + Duration::minutes(30),
        }
    }
}
