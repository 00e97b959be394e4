//! Scheduling service seam.
//!
//! The scheduling service owns sessions, courses and enrollment. The
//! controller needs two things from it: a join descriptor for a caller, and a
//! way to mark a session ended.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::secret::SecretString;
use common::types::{ParticipantUid, SessionId, UserId};
use serde::{Deserialize, Serialize};

use crate::descriptor::CallerIdentity;
use crate::errors::SchedulingError;

mod http;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use http::HttpSchedulingClient;

/// Status of a scheduled session as reported by the scheduling service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    Live,
    Ended,
}

/// Descriptor payload returned by the scheduling service.
///
/// Role is not part of the payload; it is derived by the resolver from
/// `owner_user_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct DescriptorResponse {
    pub session_id: SessionId,
    pub status: SessionStatus,
    /// The teacher who owns the session.
    pub owner_user_id: UserId,
    pub channel_name: String,
    pub app_id: String,
    /// Single-use transport access token.
    pub token: SecretString,
    pub participant_id: ParticipantUid,
    /// When `token` stops being accepted by the transport.
    pub expires_at: DateTime<Utc>,
}

/// Operations the controller consumes from the scheduling service.
#[async_trait]
pub trait SchedulingClient: Send + Sync {
    /// Fetch the join descriptor for `caller` in `session_id`.
    async fn get_session_descriptor(
        &self,
        session_id: &SessionId,
        caller: &CallerIdentity,
    ) -> Result<DescriptorResponse, SchedulingError>;

    /// Mark the session ended for every participant.
    async fn mark_session_ended(&self, session_id: &SessionId) -> Result<(), SchedulingError>;
}
