//! Message and state types for the session controller actor.
//!
//! Requests travel over a bounded `tokio::sync::mpsc` mailbox and are answered
//! through `tokio::sync::oneshot`. Lifecycle state is published separately
//! over a `tokio::sync::watch` channel so reads never queue behind a join.

use std::fmt;
use tokio::sync::oneshot;

use crate::descriptor::SessionRole;
use crate::errors::SessionError;
use crate::local_media::LocalMediaSnapshot;

/// Lifecycle of one session attempt.
///
/// ```text
/// Idle -> Resolving -> Joining -> Joined -> Leaving -> Left
///            |            |
///            +------------+--> Failed
/// ```
///
/// `Left` and `Failed` are terminal until an explicit reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionLifecycleState {
    #[default]
    Idle,
    Resolving,
    Joining,
    Joined,
    Leaving,
    Left,
    Failed,
}

impl SessionLifecycleState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SessionLifecycleState::Idle => "idle",
            SessionLifecycleState::Resolving => "resolving",
            SessionLifecycleState::Joining => "joining",
            SessionLifecycleState::Joined => "joined",
            SessionLifecycleState::Leaving => "leaving",
            SessionLifecycleState::Left => "left",
            SessionLifecycleState::Failed => "failed",
        }
    }

    /// Whether the attempt is over (`Left` or `Failed`).
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionLifecycleState::Left | SessionLifecycleState::Failed
        )
    }
}

impl fmt::Display for SessionLifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view published by the controller after every change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub state: SessionLifecycleState,
    /// Known once the descriptor has been resolved.
    pub role: Option<SessionRole>,
    pub local_media: LocalMediaSnapshot,
}

/// Messages sent to `SessionControllerActor`.
#[derive(Debug)]
pub enum SessionMessage {
    /// Resolve, join the channel and set up local media.
    Join {
        respond_to: oneshot::Sender<Result<SessionRole, SessionError>>,
    },

    /// Mute or unmute the microphone.
    ToggleAudio {
        enable: bool,
        respond_to: oneshot::Sender<Result<LocalMediaSnapshot, SessionError>>,
    },

    /// Suppress or resume the camera.
    ToggleVideo {
        enable: bool,
        respond_to: oneshot::Sender<Result<LocalMediaSnapshot, SessionError>>,
    },

    /// Subscriber opts in to publishing.
    EnableOnDemand {
        respond_to: oneshot::Sender<Result<LocalMediaSnapshot, SessionError>>,
    },

    /// Leave the session locally.
    Leave {
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },

    /// End the session for everyone (publisher only), then leave.
    EndSession {
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },

    /// Re-initialize a finished controller back to `Idle`.
    Reset {
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },
}

impl SessionMessage {
    /// Operation name for log fields and metric labels.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            SessionMessage::Join { .. } => "join",
            SessionMessage::ToggleAudio { .. } => "toggle_audio",
            SessionMessage::ToggleVideo { .. } => "toggle_video",
            SessionMessage::EnableOnDemand { .. } => "enable_on_demand",
            SessionMessage::Leave { .. } => "leave",
            SessionMessage::EndSession { .. } => "end_session",
            SessionMessage::Reset { .. } => "reset",
        }
    }
}
