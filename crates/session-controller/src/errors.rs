//! Session controller error types.
//!
//! `SessionError` is what callers of the controller handle see. Collaborator
//! failures (`SchedulingError`, `TransportError`) are converted at the seam so
//! the UI layer only ever matches on one enum.
//!
//! Internal details are logged, never placed in [`SessionError::client_message`].

use std::time::Duration;
use thiserror::Error;

use crate::actors::SessionLifecycleState;

/// Session controller error type.
///
/// Grouped by [`ErrorCategory`]:
/// - `JoinRejected`: `NotFound`, `Forbidden` from `join`, `AlreadyEnded`,
///   `TransportJoin`, `JoinMedia`, `JoinTimeout`, `Scheduling`
/// - `MediaDevice`: `CaptureDevice`, `TransportPublish`
/// - `InvalidState`: `InvalidState`, `Forbidden` from any other operation
/// - `Internal`: `TerminationReport`, `Config`, `Internal`
#[derive(Debug, Error)]
pub enum SessionError {
    /// The scheduled session does not exist.
    #[error("Session not found")]
    NotFound,

    /// Caller has no access to the session (`operation == "join"`), or
    /// `operation` is reserved for the publisher.
    #[error("Forbidden: {reason}")]
    Forbidden {
        operation: &'static str,
        reason: String,
    },

    /// The session has already been ended by its owner.
    #[error("Session already ended")]
    AlreadyEnded,

    /// Camera or microphone denied or unavailable.
    #[error("Capture device error: {0}")]
    CaptureDevice(String),

    /// Joining the transport channel failed.
    #[error("Transport join failed: {0}")]
    TransportJoin(String),

    /// Publishing local tracks failed.
    #[error("Transport publish failed: {0}")]
    TransportPublish(String),

    /// Publisher media setup failed while joining and the attempt was
    /// abandoned. Wraps the `CaptureDevice` or `TransportPublish` cause.
    #[error("Join media setup failed: {0}")]
    JoinMedia(#[source] Box<SessionError>),

    /// Operation is not valid in the current lifecycle state.
    #[error("Operation '{operation}' not allowed in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionLifecycleState,
    },

    /// Reporting the session end to the scheduling service failed.
    #[error("Termination report failed: {0}")]
    TerminationReport(String),

    /// The join sequence did not reach `Joined` within the configured bound.
    #[error("Join timed out after {0:?}")]
    JoinTimeout(Duration),

    /// Scheduling service unreachable or returned an unusable descriptor.
    #[error("Scheduling service error: {0}")]
    Scheduling(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error with context (actor channel failures).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification used by the UI to decide what to offer the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The participant could not join; a fresh attempt is required.
    JoinRejected,
    /// The participant is in the session but local media failed; retry is possible.
    MediaDevice,
    /// The request does not fit the current lifecycle state.
    InvalidState,
    /// Something failed that the user cannot act on.
    Internal,
}

impl SessionError {
    /// Returns the category of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            SessionError::NotFound
            | SessionError::Forbidden {
                operation: "join", ..
            }
            | SessionError::AlreadyEnded
            | SessionError::TransportJoin(_)
            | SessionError::JoinMedia(_)
            | SessionError::JoinTimeout(_)
            | SessionError::Scheduling(_) => ErrorCategory::JoinRejected,
            SessionError::CaptureDevice(_) | SessionError::TransportPublish(_) => {
                ErrorCategory::MediaDevice
            }
            SessionError::InvalidState { .. } | SessionError::Forbidden { .. } => {
                ErrorCategory::InvalidState
            }
            SessionError::TerminationReport(_)
            | SessionError::Config(_)
            | SessionError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Whether the UI may offer an in-session retry.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.category() == ErrorCategory::MediaDevice
    }

    /// Reclassify a media error raised during `join` as a join failure.
    ///
    /// Other errors pass through unchanged.
    #[must_use]
    pub fn into_join_failure(self) -> Self {
        match self {
            SessionError::CaptureDevice(_) | SessionError::TransportPublish(_) => {
                SessionError::JoinMedia(Box::new(self))
            }
            other => other,
        }
    }

    /// The media error behind a `JoinMedia` failure.
    #[must_use]
    pub fn media_cause(&self) -> Option<&SessionError> {
        match self {
            SessionError::JoinMedia(cause) => Some(cause.as_ref()),
            _ => None,
        }
    }

    /// Returns a bounded label string for the error variant (for metrics).
    #[must_use]
    pub fn error_type_label(&self) -> &'static str {
        match self {
            SessionError::NotFound => "not_found",
            SessionError::Forbidden { .. } => "forbidden",
            SessionError::AlreadyEnded => "already_ended",
            SessionError::CaptureDevice(_) => "capture_device",
            SessionError::TransportJoin(_) => "transport_join",
            SessionError::TransportPublish(_) => "transport_publish",
            SessionError::JoinMedia(_) => "join_media",
            SessionError::InvalidState { .. } => "invalid_state",
            SessionError::TerminationReport(_) => "termination_report",
            SessionError::JoinTimeout(_) => "join_timeout",
            SessionError::Scheduling(_) => "scheduling",
            SessionError::Config(_) => "config",
            SessionError::Internal(_) => "internal",
        }
    }

    /// Returns a user-safe error message (no internal details).
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            SessionError::NotFound => "This class session does not exist".to_string(),
            SessionError::Forbidden { .. } => {
                "You do not have access to this action".to_string()
            }
            SessionError::AlreadyEnded => "This class session has already ended".to_string(),
            SessionError::CaptureDevice(_) => {
                "Camera or microphone is unavailable, check device permissions".to_string()
            }
            SessionError::TransportJoin(_) | SessionError::JoinTimeout(_) => {
                "Could not connect to the live class, please try again".to_string()
            }
            SessionError::TransportPublish(_) => {
                "Your audio/video could not be shared with the class".to_string()
            }
            SessionError::JoinMedia(cause) => cause.client_message(),
            SessionError::InvalidState { .. } => {
                "That action is not available right now".to_string()
            }
            SessionError::Scheduling(_)
            | SessionError::TerminationReport(_)
            | SessionError::Config(_)
            | SessionError::Internal(_) => "An internal error occurred".to_string(),
        }
    }
}

/// Errors returned by a [`SchedulingClient`](crate::scheduling::SchedulingClient).
#[derive(Debug, Clone, Error)]
pub enum SchedulingError {
    #[error("Session not found")]
    NotFound,

    #[error("Access denied")]
    Forbidden,

    #[error("Session already ended")]
    AlreadyEnded,

    /// Network failure, timeout, 5xx or malformed body.
    #[error("Scheduling service unavailable: {0}")]
    Unavailable(String),
}

impl From<SchedulingError> for SessionError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::NotFound => SessionError::NotFound,
            SchedulingError::Forbidden => SessionError::Forbidden {
                operation: "join",
                reason: "no access to this session".to_string(),
            },
            SchedulingError::AlreadyEnded => SessionError::AlreadyEnded,
            SchedulingError::Unavailable(msg) => SessionError::Scheduling(msg),
        }
    }
}

/// Errors returned by a [`MediaTransport`](crate::transport::MediaTransport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// Camera or microphone could not be opened.
    #[error("Capture device unavailable: {0}")]
    CaptureDevice(String),

    #[error("Join failed: {0}")]
    Join(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Leave failed: {0}")]
    Leave(String),
}

impl From<TransportError> for SessionError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::CaptureDevice(msg) => SessionError::CaptureDevice(msg),
            TransportError::Join(msg) => SessionError::TransportJoin(msg),
            TransportError::Publish(msg) => SessionError::TransportPublish(msg),
            TransportError::Leave(msg) => SessionError::Internal(format!("leave failed: {msg}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_category_mapping() {
        // Cannot join
        assert_eq!(SessionError::NotFound.category(), ErrorCategory::JoinRejected);
        assert_eq!(
            SessionError::Forbidden {
                operation: "join",
                reason: "x".to_string(),
            }
            .category(),
            ErrorCategory::JoinRejected
        );
        assert_eq!(SessionError::AlreadyEnded.category(), ErrorCategory::JoinRejected);
        assert_eq!(
            SessionError::TransportJoin("refused".to_string()).category(),
            ErrorCategory::JoinRejected
        );
        assert_eq!(
            SessionError::JoinTimeout(Duration::from_secs(20)).category(),
            ErrorCategory::JoinRejected
        );

        // Joined, but media failed
        assert_eq!(
            SessionError::CaptureDevice("denied".to_string()).category(),
            ErrorCategory::MediaDevice
        );
        assert_eq!(
            SessionError::TransportPublish("rejected".to_string()).category(),
            ErrorCategory::MediaDevice
        );

        assert_eq!(
            SessionError::InvalidState {
                operation: "join",
                state: SessionLifecycleState::Joined,
            }
            .category(),
            ErrorCategory::InvalidState
        );
        assert_eq!(
            SessionError::TerminationReport("503".to_string()).category(),
            ErrorCategory::Internal
        );
    }

    #[test]
    fn test_only_media_errors_are_recoverable() {
        assert!(SessionError::CaptureDevice("denied".to_string()).is_recoverable());
        assert!(!SessionError::NotFound.is_recoverable());
        assert!(!SessionError::TransportJoin("x".to_string()).is_recoverable());
    }

    #[test]
    fn test_join_path_media_errors_are_not_recoverable() {
        for cause in [
            SessionError::CaptureDevice("denied".to_string()),
            SessionError::TransportPublish("rejected".to_string()),
        ] {
            let label = cause.error_type_label();
            let err = cause.into_join_failure();

            assert!(matches!(err, SessionError::JoinMedia(_)));
            assert_eq!(err.category(), ErrorCategory::JoinRejected);
            assert!(!err.is_recoverable());
            assert_eq!(err.media_cause().map(SessionError::error_type_label), Some(label));
        }

        // Non-media errors pass through
        assert!(matches!(
            SessionError::TransportJoin("x".to_string()).into_join_failure(),
            SessionError::TransportJoin(_)
        ));
    }

    #[test]
    fn test_owner_only_forbidden_is_a_state_error() {
        let err = SessionError::Forbidden {
            operation: "end_session",
            reason: "only the session owner can end the session".to_string(),
        };

        assert_eq!(err.category(), ErrorCategory::InvalidState);
        assert!(!err.is_recoverable());
        assert_eq!(err.error_type_label(), "forbidden");
    }

    #[test]
    fn test_client_messages_hide_internal_details() {
        let err = SessionError::Scheduling("connection refused at 10.0.0.7:8080".to_string());
        assert!(!err.client_message().contains("10.0.0.7"));
        assert_eq!(err.client_message(), "An internal error occurred");

        let err = SessionError::TransportJoin("token rejected: sig mismatch".to_string());
        assert!(!err.client_message().contains("sig mismatch"));
    }

    #[test]
    fn test_scheduling_error_conversion() {
        assert!(matches!(
            SessionError::from(SchedulingError::NotFound),
            SessionError::NotFound
        ));
        assert!(matches!(
            SessionError::from(SchedulingError::Forbidden),
            SessionError::Forbidden {
                operation: "join",
                ..
            }
        ));
        assert!(matches!(
            SessionError::from(SchedulingError::AlreadyEnded),
            SessionError::AlreadyEnded
        ));
        assert!(matches!(
            SessionError::from(SchedulingError::Unavailable("503".to_string())),
            SessionError::Scheduling(msg) if msg == "503"
        ));
    }

    #[test]
    fn test_transport_error_conversion() {
        assert!(matches!(
            SessionError::from(TransportError::CaptureDevice("busy".to_string())),
            SessionError::CaptureDevice(_)
        ));
        assert!(matches!(
            SessionError::from(TransportError::Join("x".to_string())),
            SessionError::TransportJoin(_)
        ));
        assert!(matches!(
            SessionError::from(TransportError::Publish("x".to_string())),
            SessionError::TransportPublish(_)
        ));
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            format!(
                "{}",
                SessionError::InvalidState {
                    operation: "enable_on_demand",
                    state: SessionLifecycleState::Leaving,
                }
            ),
            "Operation 'enable_on_demand' not allowed in state Leaving"
        );
        assert_eq!(
            format!("{}", SessionError::CaptureDevice("camera busy".to_string())),
            "Capture device error: camera busy"
        );
    }

    #[test]
    fn test_error_type_labels_are_distinct() {
        let errors = [
            SessionError::NotFound,
            SessionError::Forbidden {
                operation: "join",
                reason: String::new(),
            },
            SessionError::AlreadyEnded,
            SessionError::CaptureDevice(String::new()),
            SessionError::TransportJoin(String::new()),
            SessionError::TransportPublish(String::new()),
            SessionError::JoinMedia(Box::new(SessionError::CaptureDevice(String::new()))),
            SessionError::TerminationReport(String::new()),
            SessionError::JoinTimeout(Duration::from_secs(1)),
            SessionError::Scheduling(String::new()),
            SessionError::Config(String::new()),
            SessionError::Internal(String::new()),
        ];
        let mut labels: Vec<&str> = errors.iter().map(SessionError::error_type_label).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), errors.len());
    }
}
