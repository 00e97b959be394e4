//! Local media manager.
//!
//! Owns at most one microphone track and one camera track for the session
//! attempt. Tracks are created lazily (on join for a publisher, on request for
//! a subscriber), toggled without releasing the device, and stopped exactly
//! once on teardown. After teardown the manager is sealed; reviving capture
//! requires a fresh join.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::descriptor::SessionRole;
use crate::errors::SessionError;
use crate::transport::{CaptureTracks, LocalTrack, MediaTransport};

/// Mutable local media state.
#[derive(Debug, Default)]
pub struct LocalMediaState {
    pub audio_track: Option<Arc<dyn LocalTrack>>,
    pub video_track: Option<Arc<dyn LocalTrack>>,
    /// Meaningful only while `audio_track` is present.
    pub muted: bool,
    /// Meaningful only while `video_track` is present.
    pub video_suppressed: bool,
}

/// Read-only view of [`LocalMediaState`] handed to callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalMediaSnapshot {
    pub has_audio: bool,
    pub has_video: bool,
    pub muted: bool,
    pub video_suppressed: bool,
}

impl LocalMediaSnapshot {
    /// Whether no local tracks exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.has_audio && !self.has_video
    }

    /// Whether the local camera is present and sending.
    #[must_use]
    pub fn video_active(&self) -> bool {
        self.has_video && !self.video_suppressed
    }
}

/// Manages capture, publish, toggling and release of local tracks.
pub struct LocalMediaManager {
    transport: Arc<dyn MediaTransport>,
    state: LocalMediaState,
    /// Set once `create_and_publish` has run; it is single-shot.
    create_attempted: bool,
    /// Set by `teardown`; no capture is allowed afterwards.
    sealed: bool,
}

impl LocalMediaManager {
    #[must_use]
    pub fn new(transport: Arc<dyn MediaTransport>) -> Self {
        Self {
            transport,
            state: LocalMediaState::default(),
            create_attempted: false,
            sealed: false,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> LocalMediaSnapshot {
        LocalMediaSnapshot {
            has_audio: self.state.audio_track.is_some(),
            has_video: self.state.video_track.is_some(),
            muted: self.state.muted,
            video_suppressed: self.state.video_suppressed,
        }
    }

    /// Whether the local camera is currently sending.
    #[must_use]
    pub fn local_video_active(&self) -> bool {
        self.snapshot().video_active()
    }

    /// Join-time media setup.
    ///
    /// A publisher captures and publishes microphone and camera; a subscriber
    /// starts with no local tracks. Runs at most once per attempt.
    ///
    /// # Errors
    ///
    /// - `Internal` if called twice or after teardown (the controller only
    ///   calls it once per attempt)
    /// - `CaptureDevice` / `TransportPublish` for a publisher whose capture or
    ///   publish fails (tracks captured before the failure are kept for teardown)
    pub async fn create_and_publish(
        &mut self,
        role: SessionRole,
    ) -> Result<LocalMediaSnapshot, SessionError> {
        if self.create_attempted || self.sealed {
            return Err(self.unavailable("create_and_publish"));
        }
        self.create_attempted = true;

        match role {
            SessionRole::Subscriber => {
                debug!(target: "sc.media.local", "Subscriber joins without local tracks");
                Ok(self.snapshot())
            }
            SessionRole::Publisher => {
                let tracks = self.capture().await?;
                self.install(tracks);
                self.publish_current().await?;
                info!(target: "sc.media.local", "Publisher tracks published");
                Ok(self.snapshot())
            }
        }
    }

    /// Opt-in capture for a participant that joined without tracks.
    ///
    /// A no-op returning the current snapshot if tracks already exist.
    ///
    /// # Errors
    ///
    /// - `Internal` after teardown
    /// - `CaptureDevice` if the devices cannot be opened (state unchanged)
    /// - `TransportPublish` if publishing fails; the new tracks are stopped
    ///   and released so a later retry starts clean
    pub async fn enable_on_demand(&mut self) -> Result<LocalMediaSnapshot, SessionError> {
        if self.sealed {
            return Err(self.unavailable("enable_on_demand"));
        }
        if self.state.audio_track.is_some() || self.state.video_track.is_some() {
            debug!(target: "sc.media.local", "Local tracks already exist, nothing to enable");
            return Ok(self.snapshot());
        }

        let tracks = self.capture().await?;
        self.install(tracks);

        if let Err(e) = self.publish_current().await {
            warn!(
                target: "sc.media.local",
                error = %e,
                "Publishing on-demand tracks failed, releasing devices"
            );
            self.release_tracks();
            return Err(e);
        }

        info!(target: "sc.media.local", "On-demand tracks published");
        Ok(self.snapshot())
    }

    /// Mute (`enable = false`) or unmute the microphone.
    ///
    /// No-op if no audio track exists.
    pub fn toggle_audio(&mut self, enable: bool) -> LocalMediaSnapshot {
        if let Some(track) = &self.state.audio_track {
            track.set_enabled(enable);
            self.state.muted = !enable;
            debug!(target: "sc.media.local", muted = self.state.muted, "Audio toggled");
        }
        self.snapshot()
    }

    /// Suppress (`enable = false`) or resume the camera.
    ///
    /// No-op if no video track exists.
    pub fn toggle_video(&mut self, enable: bool) -> LocalMediaSnapshot {
        if let Some(track) = &self.state.video_track {
            track.set_enabled(enable);
            self.state.video_suppressed = !enable;
            debug!(
                target: "sc.media.local",
                video_suppressed = self.state.video_suppressed,
                "Video toggled"
            );
        }
        self.snapshot()
    }

    /// Stop and release both tracks and seal the manager.
    ///
    /// Idempotent; safe when no tracks exist.
    pub fn teardown(&mut self) {
        self.sealed = true;
        let released = self.release_tracks();
        if released > 0 {
            info!(target: "sc.media.local", released, "Local tracks released");
        }
    }

    async fn capture(&self) -> Result<CaptureTracks, SessionError> {
        self.transport.create_capture_tracks().await.map_err(|e| {
            warn!(target: "sc.media.local", error = %e, "Capture device unavailable");
            SessionError::from(e)
        })
    }

    fn install(&mut self, tracks: CaptureTracks) {
        self.state.audio_track = Some(tracks.audio);
        self.state.video_track = Some(tracks.video);
        self.state.muted = false;
        self.state.video_suppressed = false;
    }

    async fn publish_current(&self) -> Result<(), SessionError> {
        let tracks: Vec<Arc<dyn LocalTrack>> = self
            .state
            .audio_track
            .iter()
            .chain(self.state.video_track.iter())
            .cloned()
            .collect();

        self.transport
            .publish(&tracks)
            .await
            .map_err(SessionError::from)
    }

    /// Stops whatever tracks are present. Returns how many were stopped.
    fn release_tracks(&mut self) -> usize {
        let mut released = 0;
        for track in [self.state.audio_track.take(), self.state.video_track.take()]
            .into_iter()
            .flatten()
        {
            track.stop();
            released += 1;
        }
        self.state.muted = false;
        self.state.video_suppressed = false;
        released
    }

    /// Out-of-state calls are rejected by the controller before they get here.
    fn unavailable(&self, operation: &'static str) -> SessionError {
        let reason = if self.sealed {
            "local media already torn down"
        } else {
            "local media already set up"
        };
        SessionError::Internal(format!("{operation}: {reason}"))
    }
}
