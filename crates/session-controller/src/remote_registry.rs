//! Remote participant registry.
//!
//! Tracks which remote participants currently publish which media kinds.
//! Fed by transport notifications (from the event pump task) and read by the
//! controller handle, so it is internally synchronized. The lock is never held
//! across an await point.
//!
//! Once closed (on teardown) the registry ignores late notifications until it
//! is reopened for a fresh join.

use common::types::ParticipantUid;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

use crate::observability::metrics;
use crate::transport::{MediaKind, RemoteTrack, TransportEvent};

/// Registry key: at most one track per participant and kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackKey {
    pub participant_id: ParticipantUid,
    pub kind: MediaKind,
}

/// One registry entry as exposed to the rendering layer.
#[derive(Debug, Clone)]
pub struct RemoteTrackEntry {
    pub participant_id: ParticipantUid,
    pub kind: MediaKind,
    pub track: Arc<dyn RemoteTrack>,
}

#[derive(Debug, Default)]
struct Inner {
    tracks: BTreeMap<TrackKey, Arc<dyn RemoteTrack>>,
    closed: bool,
}

/// Registry of remote tracks for the active session.
#[derive(Debug, Default)]
pub struct RemoteParticipantRegistry {
    inner: Mutex<Inner>,
}

impl RemoteParticipantRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply one transport notification.
    pub fn apply(&self, event: TransportEvent) {
        match event {
            TransportEvent::UserPublished {
                participant_id,
                kind,
                track,
            } => self.on_remote_published(participant_id, kind, track),
            TransportEvent::UserUnpublished {
                participant_id,
                kind,
            } => self.on_remote_unpublished(participant_id, kind),
        }
    }

    /// Record (or replace) the track a participant publishes for `kind`.
    pub fn on_remote_published(
        &self,
        participant_id: ParticipantUid,
        kind: MediaKind,
        track: Arc<dyn RemoteTrack>,
    ) {
        let mut inner = self.lock();
        if inner.closed {
            trace!(
                target: "sc.media.remote",
                participant_id = %participant_id,
                kind = kind.as_str(),
                "Ignoring publish on closed registry"
            );
            return;
        }

        let replaced = inner
            .tracks
            .insert(
                TrackKey {
                    participant_id,
                    kind,
                },
                track,
            )
            .is_some();
        if !replaced {
            metrics::remote_tracks_added(1);
        }

        debug!(
            target: "sc.media.remote",
            participant_id = %participant_id,
            kind = kind.as_str(),
            replaced,
            "Remote track published"
        );
    }

    /// Drop the participant's track for `kind`. Unknown keys are ignored.
    pub fn on_remote_unpublished(&self, participant_id: ParticipantUid, kind: MediaKind) {
        let mut inner = self.lock();
        if inner.closed {
            return;
        }

        let removed = inner
            .tracks
            .remove(&TrackKey {
                participant_id,
                kind,
            })
            .is_some();
        if removed {
            metrics::remote_tracks_removed(1);
        }

        debug!(
            target: "sc.media.remote",
            participant_id = %participant_id,
            kind = kind.as_str(),
            removed,
            "Remote track unpublished"
        );
    }

    /// Current entries, ordered by participant then kind.
    #[must_use]
    pub fn snapshot(&self) -> Vec<RemoteTrackEntry> {
        self.lock()
            .tracks
            .iter()
            .map(|(key, track)| RemoteTrackEntry {
                participant_id: key.participant_id,
                kind: key.kind,
                track: Arc::clone(track),
            })
            .collect()
    }

    /// Number of distinct remote participants with a video track.
    #[must_use]
    pub fn video_participant_count(&self) -> usize {
        self.lock()
            .tracks
            .keys()
            .filter(|key| key.kind == MediaKind::Video)
            .count()
    }

    /// Distinct remote participants with at least one track.
    #[must_use]
    pub fn participant_ids(&self) -> Vec<ParticipantUid> {
        self.lock()
            .tracks
            .keys()
            .map(|key| key.participant_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Empty the registry and stop accepting notifications. Idempotent.
    pub fn clear_and_close(&self) {
        let mut inner = self.lock();
        let dropped = inner.tracks.len();
        inner.tracks.clear();
        inner.closed = true;
        metrics::remote_tracks_removed(dropped);

        if dropped > 0 {
            debug!(target: "sc.media.remote", dropped, "Remote registry cleared");
        }
    }

    /// Accept notifications again after a reset.
    pub fn reopen(&self) {
        let mut inner = self.lock();
        metrics::remote_tracks_removed(inner.tracks.len());
        inner.tracks.clear();
        inner.closed = false;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::transport::mock::MockRemoteTrack;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    fn uid(n: u32) -> ParticipantUid {
        ParticipantUid(n)
    }

    fn publish(registry: &RemoteParticipantRegistry, n: u32, kind: MediaKind, track_id: &str) {
        registry.on_remote_published(uid(n), kind, MockRemoteTrack::new(track_id, kind));
    }

    #[test]
    fn test_publish_and_unpublish() {
        let registry = RemoteParticipantRegistry::new();

        publish(&registry, 7, MediaKind::Video, "v7");
        publish(&registry, 7, MediaKind::Audio, "a7");

        assert_eq!(registry.snapshot().len(), 2);
        assert_eq!(registry.video_participant_count(), 1);
        assert_eq!(registry.participant_ids(), vec![uid(7)]);

        registry.on_remote_unpublished(uid(7), MediaKind::Video);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.first().unwrap().kind, MediaKind::Audio);
        assert_eq!(registry.video_participant_count(), 0);
    }

    #[test]
    fn test_republish_overwrites() {
        let registry = RemoteParticipantRegistry::new();

        publish(&registry, 7, MediaKind::Video, "h1");
        publish(&registry, 7, MediaKind::Video, "h2");

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.first().unwrap().track.track_id(), "h2");
    }

    #[test]
    fn test_unknown_unpublish_is_ignored() {
        let registry = RemoteParticipantRegistry::new();
        registry.on_remote_unpublished(uid(99), MediaKind::Audio);
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn test_snapshot_is_ordered() {
        let registry = RemoteParticipantRegistry::new();
        for n in [30, 4, 17] {
            publish(&registry, n, MediaKind::Video, &format!("v{n}"));
        }
        publish(&registry, 4, MediaKind::Audio, "a4");

        let keys: Vec<(u32, MediaKind)> = registry
            .snapshot()
            .iter()
            .map(|e| (e.participant_id.0, e.kind))
            .collect();
        assert_eq!(
            keys,
            vec![
                (4, MediaKind::Audio),
                (4, MediaKind::Video),
                (17, MediaKind::Video),
                (30, MediaKind::Video)
            ]
        );
        assert_eq!(registry.participant_ids(), vec![uid(4), uid(17), uid(30)]);
    }

    #[test]
    fn test_closed_registry_ignores_events() {
        let registry = RemoteParticipantRegistry::new();
        publish(&registry, 1, MediaKind::Video, "v1");

        registry.clear_and_close();
        registry.clear_and_close();
        assert!(registry.is_closed());
        assert!(registry.snapshot().is_empty());

        registry.apply(TransportEvent::UserPublished {
            participant_id: uid(2),
            kind: MediaKind::Video,
            track: MockRemoteTrack::new("late", MediaKind::Video),
        });
        assert!(registry.snapshot().is_empty());

        registry.reopen();
        publish(&registry, 2, MediaKind::Video, "v2");
        assert_eq!(registry.video_participant_count(), 1);
    }

    #[test]
    fn test_active_gauge_is_shared_across_registries() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        ::metrics::with_local_recorder(&recorder, || {
            let first = RemoteParticipantRegistry::new();
            let second = RemoteParticipantRegistry::new();

            publish(&first, 1, MediaKind::Video, "v1");
            publish(&first, 1, MediaKind::Video, "v1-again");
            publish(&first, 2, MediaKind::Audio, "a2");
            publish(&second, 3, MediaKind::Video, "v3");

            // Closing one session leaves the other's tracks counted
            first.clear_and_close();
            first.reopen();
            second.on_remote_unpublished(uid(99), MediaKind::Video);
        });

        let gauge = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .find_map(|(key, _, _, value)| match value {
                DebugValue::Gauge(v) if key.key().name() == "sc_remote_tracks_active" => {
                    Some(v.into_inner())
                }
                _ => None,
            });
        assert_eq!(gauge, Some(1.0));
    }
}
