//! Media transport seam.
//!
//! The real-time media provider (capture, channel join, publish, remote
//! notifications) is an external capability. The controller talks to it only
//! through [`MediaTransport`]; codec negotiation and routing stay on the
//! provider's side.

use async_trait::async_trait;
use common::secret::SecretString;
use common::types::ParticipantUid;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::errors::TransportError;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

/// Kind of media carried by a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    /// Returns the kind as a string for log fields and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

/// A locally captured track (microphone or camera).
pub trait LocalTrack: Send + Sync + fmt::Debug {
    fn kind(&self) -> MediaKind;

    /// Enable or disable sending without releasing the device.
    fn set_enabled(&self, enabled: bool);

    fn is_enabled(&self) -> bool;

    /// Stop capture and release the device. The track is unusable afterwards.
    fn stop(&self);
}

/// A track published by a remote participant.
pub trait RemoteTrack: Send + Sync + fmt::Debug {
    /// Provider-assigned identifier, used by the rendering layer.
    fn track_id(&self) -> &str;

    fn kind(&self) -> MediaKind;
}

/// Microphone and camera tracks returned by one capture request.
#[derive(Debug, Clone)]
pub struct CaptureTracks {
    pub audio: Arc<dyn LocalTrack>,
    pub video: Arc<dyn LocalTrack>,
}

/// Asynchronous notification emitted by the transport.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A remote participant started publishing a track.
    UserPublished {
        participant_id: ParticipantUid,
        kind: MediaKind,
        track: Arc<dyn RemoteTrack>,
    },

    /// A remote participant stopped publishing a track.
    UserUnpublished {
        participant_id: ParticipantUid,
        kind: MediaKind,
    },
}

/// Capability contract of the real-time media provider.
#[async_trait]
pub trait MediaTransport: Send + Sync {
    /// Acquire microphone and camera capture tracks.
    async fn create_capture_tracks(&self) -> Result<CaptureTracks, TransportError>;

    /// Join the named channel with single-use credentials.
    async fn join_channel(
        &self,
        app_id: &str,
        channel_name: &str,
        token: &SecretString,
        participant_id: ParticipantUid,
    ) -> Result<(), TransportError>;

    /// Publish local tracks into the joined channel.
    async fn publish(&self, tracks: &[Arc<dyn LocalTrack>]) -> Result<(), TransportError>;

    /// Leave the current channel.
    async fn leave_channel(&self) -> Result<(), TransportError>;

    /// Register for remote publish/unpublish notifications.
    ///
    /// Events are delivered in the order the provider emits them. The
    /// receiver must be obtained before `join_channel` so nothing emitted
    /// during the join is missed.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<TransportEvent>;
}
