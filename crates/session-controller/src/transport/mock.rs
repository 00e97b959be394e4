//! Mock media transport for testing.
//!
//! Records every call in order (including track stops) so tests can assert
//! teardown ordering, and lets tests inject failures and remote events.

use super::{CaptureTracks, LocalTrack, MediaKind, MediaTransport, RemoteTrack, TransportEvent};
use crate::errors::TransportError;

use async_trait::async_trait;
use common::secret::SecretString;
use common::types::ParticipantUid;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One recorded interaction with the mock transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    CreateCaptureTracks,
    JoinChannel {
        channel_name: String,
        participant_id: ParticipantUid,
    },
    Publish {
        track_count: usize,
    },
    LeaveChannel,
    StopTrack(MediaKind),
}

type CallLog = Arc<Mutex<Vec<TransportCall>>>;

/// Mock capture track that counts stops.
#[derive(Debug)]
pub struct MockLocalTrack {
    kind: MediaKind,
    enabled: AtomicBool,
    stop_count: AtomicUsize,
    calls: CallLog,
}

impl MockLocalTrack {
    fn new(kind: MediaKind, calls: CallLog) -> Arc<Self> {
        Arc::new(Self {
            kind,
            enabled: AtomicBool::new(true),
            stop_count: AtomicUsize::new(0),
            calls,
        })
    }

    /// Number of times `stop` was called.
    pub fn stop_count(&self) -> usize {
        self.stop_count.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_count() > 0
    }
}

impl LocalTrack for MockLocalTrack {
    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.stop_count.fetch_add(1, Ordering::SeqCst);
        lock(&self.calls).push(TransportCall::StopTrack(self.kind));
    }
}

/// Mock remote track identified by a string id.
#[derive(Debug)]
pub struct MockRemoteTrack {
    track_id: String,
    kind: MediaKind,
}

impl MockRemoteTrack {
    pub fn new(track_id: impl Into<String>, kind: MediaKind) -> Arc<Self> {
        Arc::new(Self {
            track_id: track_id.into(),
            kind,
        })
    }
}

impl RemoteTrack for MockRemoteTrack {
    fn track_id(&self) -> &str {
        &self.track_id
    }

    fn kind(&self) -> MediaKind {
        self.kind
    }
}

/// Mock media transport.
#[derive(Debug, Default)]
pub struct MockTransport {
    fail_capture: AtomicBool,
    fail_join: AtomicBool,
    fail_publish: AtomicBool,
    fail_leave: AtomicBool,
    join_delay: Mutex<Option<Duration>>,
    publish_delay: Mutex<Option<Duration>>,
    events_during_join: Mutex<Vec<TransportEvent>>,
    calls: CallLog,
    created_tracks: Mutex<Vec<Arc<MockLocalTrack>>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<TransportEvent>>>,
    join_count: AtomicUsize,
    leave_count: AtomicUsize,
}

impl MockTransport {
    /// Create a mock where every operation succeeds immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make capture requests fail with a device error.
    #[must_use]
    pub fn with_capture_failure(self) -> Self {
        self.set_capture_failure(true);
        self
    }

    /// Make channel joins fail.
    #[must_use]
    pub fn with_join_failure(self) -> Self {
        self.fail_join.store(true, Ordering::SeqCst);
        self
    }

    /// Make publish calls fail.
    #[must_use]
    pub fn with_publish_failure(self) -> Self {
        self.set_publish_failure(true);
        self
    }

    /// Make leave calls fail (teardown must still complete).
    #[must_use]
    pub fn with_leave_failure(self) -> Self {
        self.fail_leave.store(true, Ordering::SeqCst);
        self
    }

    /// Delay `join_channel` by the given duration.
    #[must_use]
    pub fn with_join_delay(self, delay: Duration) -> Self {
        *lock(&self.join_delay) = Some(delay);
        self
    }

    /// Delay `publish` by the given duration.
    #[must_use]
    pub fn with_publish_delay(self, delay: Duration) -> Self {
        *lock(&self.publish_delay) = Some(delay);
        self
    }

    /// Emit these events to subscribers while `join_channel` is in progress.
    #[must_use]
    pub fn with_events_during_join(self, events: Vec<TransportEvent>) -> Self {
        *lock(&self.events_during_join) = events;
        self
    }

    /// Toggle capture failures at runtime.
    pub fn set_capture_failure(&self, fail: bool) {
        self.fail_capture.store(fail, Ordering::SeqCst);
    }

    /// Toggle publish failures at runtime.
    pub fn set_publish_failure(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Deliver a remote "published" notification.
    pub fn emit_published(&self, participant_id: u32, kind: MediaKind, track_id: &str) {
        self.emit(TransportEvent::UserPublished {
            participant_id: ParticipantUid(participant_id),
            kind,
            track: MockRemoteTrack::new(track_id, kind),
        });
    }

    /// Deliver a remote "unpublished" notification.
    pub fn emit_unpublished(&self, participant_id: u32, kind: MediaKind) {
        self.emit(TransportEvent::UserUnpublished {
            participant_id: ParticipantUid(participant_id),
            kind,
        });
    }

    /// Deliver an arbitrary event to every live subscriber.
    pub fn emit(&self, event: TransportEvent) {
        lock(&self.subscribers).retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of `join_channel` calls.
    pub fn join_count(&self) -> usize {
        self.join_count.load(Ordering::SeqCst)
    }

    /// Number of `leave_channel` calls.
    pub fn leave_count(&self) -> usize {
        self.leave_count.load(Ordering::SeqCst)
    }

    /// Number of live event subscribers.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers)
            .iter()
            .filter(|tx| !tx.is_closed())
            .count()
    }

    /// All recorded calls in order.
    pub fn calls(&self) -> Vec<TransportCall> {
        lock(&self.calls).clone()
    }

    /// Number of recorded calls matching the predicate.
    pub fn count_calls(&self, predicate: impl Fn(&TransportCall) -> bool) -> usize {
        lock(&self.calls).iter().filter(|c| predicate(c)).count()
    }

    /// Every track handed out by `create_capture_tracks`.
    pub fn created_tracks(&self) -> Vec<Arc<MockLocalTrack>> {
        lock(&self.created_tracks).clone()
    }

    fn record(&self, call: TransportCall) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl MediaTransport for MockTransport {
    async fn create_capture_tracks(&self) -> Result<CaptureTracks, TransportError> {
        self.record(TransportCall::CreateCaptureTracks);

        if self.fail_capture.load(Ordering::SeqCst) {
            return Err(TransportError::CaptureDevice(
                "permission denied".to_string(),
            ));
        }

        let audio = MockLocalTrack::new(MediaKind::Audio, Arc::clone(&self.calls));
        let video = MockLocalTrack::new(MediaKind::Video, Arc::clone(&self.calls));
        lock(&self.created_tracks).extend([Arc::clone(&audio), Arc::clone(&video)]);

        Ok(CaptureTracks { audio, video })
    }

    async fn join_channel(
        &self,
        _app_id: &str,
        channel_name: &str,
        _token: &SecretString,
        participant_id: ParticipantUid,
    ) -> Result<(), TransportError> {
        self.join_count.fetch_add(1, Ordering::SeqCst);
        self.record(TransportCall::JoinChannel {
            channel_name: channel_name.to_string(),
            participant_id,
        });

        let events = std::mem::take(&mut *lock(&self.events_during_join));
        for event in events {
            self.emit(event);
        }

        let delay = *lock(&self.join_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_join.load(Ordering::SeqCst) {
            return Err(TransportError::Join("invalid token".to_string()));
        }
        Ok(())
    }

    async fn publish(&self, tracks: &[Arc<dyn LocalTrack>]) -> Result<(), TransportError> {
        self.record(TransportCall::Publish {
            track_count: tracks.len(),
        });

        let delay = *lock(&self.publish_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(TransportError::Publish("publish rejected".to_string()));
        }
        Ok(())
    }

    async fn leave_channel(&self) -> Result<(), TransportError> {
        self.leave_count.fetch_add(1, Ordering::SeqCst);
        self.record(TransportCall::LeaveChannel);

        if self.fail_leave.load(Ordering::SeqCst) {
            return Err(TransportError::Leave("connection reset".to_string()));
        }
        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<TransportEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.subscribers).push(tx);
        rx
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_capture_and_stop_are_recorded() {
        let transport = MockTransport::new();
        let tracks = transport.create_capture_tracks().await.unwrap();

        tracks.audio.stop();

        assert_eq!(
            transport.calls(),
            vec![
                TransportCall::CreateCaptureTracks,
                TransportCall::StopTrack(MediaKind::Audio)
            ]
        );
        assert_eq!(transport.created_tracks().len(), 2);
    }

    #[tokio::test]
    async fn test_events_reach_subscribers() {
        let transport = MockTransport::new();
        let mut rx = transport.subscribe();

        transport.emit_published(3, MediaKind::Video, "t-3");

        let event = rx.recv().await.expect("event delivered");
        assert!(matches!(
            event,
            TransportEvent::UserPublished { participant_id, kind, ref track }
                if participant_id == ParticipantUid(3)
                    && kind == MediaKind::Video
                    && track.track_id() == "t-3"
        ));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let transport = MockTransport::new().with_join_failure();
        let result = transport
            .join_channel("app", "ch", &SecretString::from("t"), ParticipantUid(1))
            .await;
        assert!(matches!(result, Err(TransportError::Join(_))));
        assert_eq!(transport.join_count(), 1);

        transport.set_capture_failure(true);
        assert!(matches!(
            transport.create_capture_tracks().await,
            Err(TransportError::CaptureDevice(_))
        ));
    }
}
