//! Session termination reporter.
//!
//! Marks a session ended server-side on behalf of its publisher. Callers
//! treat a failed report as non-blocking: local teardown always follows.

use common::types::SessionId;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::descriptor::SessionRole;
use crate::errors::SessionError;
use crate::observability::metrics;
use crate::scheduling::SchedulingClient;

#[derive(Clone)]
pub struct SessionTerminationReporter {
    client: Arc<dyn SchedulingClient>,
}

impl SessionTerminationReporter {
    #[must_use]
    pub fn new(client: Arc<dyn SchedulingClient>) -> Self {
        Self { client }
    }

    /// Report that `session_id` has ended for all participants.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if `role` is not `Publisher` (no external call is made)
    /// - `TerminationReport` if the scheduling service rejects or cannot be reached
    #[instrument(skip_all, fields(session_id = %session_id, role = role.as_str()))]
    pub async fn report_ended(
        &self,
        session_id: &SessionId,
        role: SessionRole,
    ) -> Result<(), SessionError> {
        if role != SessionRole::Publisher {
            return Err(SessionError::Forbidden {
                operation: "end_session",
                reason: "only the session owner can end the session".to_string(),
            });
        }

        match self.client.mark_session_ended(session_id).await {
            Ok(()) => {
                metrics::record_termination_report("success");
                info!(target: "sc.termination", "Session marked ended");
                Ok(())
            }
            Err(e) => {
                metrics::record_termination_report("error");
                warn!(target: "sc.termination", error = %e, "Failed to mark session ended");
                Err(SessionError::TerminationReport(e.to_string()))
            }
        }
    }
}
