//! `SessionControllerActor` - the lifecycle state machine for one session attempt.
//!
//! The actor is the single authority over transitions and teardown:
//! - `join()` runs resolve, channel join and local media setup in order,
//!   bounded by the join timeout and interruptible by shutdown
//! - every exit path (leave, end session, join failure, shutdown, dropped
//!   handles) goes through one idempotent `teardown`
//! - remote notifications bypass the mailbox via the [`EventPump`]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use common::types::{ParticipantUid, SessionId};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::event_pump::EventPump;
use super::messages::{SessionLifecycleState, SessionMessage, SessionSnapshot};
use crate::config::ControllerConfig;
use crate::descriptor::{CallerIdentity, SessionDescriptor, SessionDescriptorResolver, SessionRole};
use crate::errors::SessionError;
use crate::local_media::{LocalMediaManager, LocalMediaSnapshot};
use crate::observability::metrics;
use crate::remote_registry::{RemoteParticipantRegistry, RemoteTrackEntry};
use crate::scheduling::SchedulingClient;
use crate::termination::SessionTerminationReporter;
use crate::transport::MediaTransport;

/// Upper bound on the channel leave during teardown.
const LEAVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to a `SessionControllerActor`.
///
/// Cloneable. Dropping every clone shuts the actor down (after teardown).
#[derive(Clone)]
pub struct SessionControllerHandle {
    sender: mpsc::Sender<SessionMessage>,
    cancel_token: CancellationToken,
    status: watch::Receiver<SessionSnapshot>,
    registry: Arc<RemoteParticipantRegistry>,
    session_id: SessionId,
}

impl SessionControllerHandle {
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Join the session. Valid only from `Idle`.
    ///
    /// Returns the negotiated role once `Joined`.
    pub async fn join(&self) -> Result<SessionRole, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::Join { respond_to: tx })
            .await
            .map_err(|e| SessionError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| SessionError::Internal(format!("response receive failed: {e}")))?
    }

    /// Mute (`false`) or unmute (`true`) the microphone.
    pub async fn toggle_audio(&self, enable: bool) -> Result<LocalMediaSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::ToggleAudio {
                enable,
                respond_to: tx,
            })
            .await
            .map_err(|e| SessionError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| SessionError::Internal(format!("response receive failed: {e}")))?
    }

    /// Turn the camera off (`false`) or back on (`true`).
    pub async fn toggle_video(&self, enable: bool) -> Result<LocalMediaSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::ToggleVideo {
                enable,
                respond_to: tx,
            })
            .await
            .map_err(|e| SessionError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| SessionError::Internal(format!("response receive failed: {e}")))?
    }

    /// Capture and publish local media for a participant that joined without it.
    pub async fn enable_on_demand(&self) -> Result<LocalMediaSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::EnableOnDemand { respond_to: tx })
            .await
            .map_err(|e| SessionError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| SessionError::Internal(format!("response receive failed: {e}")))?
    }

    /// Leave the session. A no-op once the attempt is over.
    ///
    /// Also `Ok` if the actor has already stopped, since it tears down
    /// before exiting.
    pub async fn leave(&self) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(SessionMessage::Leave { respond_to: tx })
            .await
            .is_err()
        {
            debug!(target: "sc.actor.controller", "Controller already stopped, nothing to leave");
            return Ok(());
        }

        rx.await
            .map_err(|e| SessionError::Internal(format!("response receive failed: {e}")))?
    }

    /// End the session for every participant, then leave. Publisher only.
    pub async fn end_session(&self) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::EndSession { respond_to: tx })
            .await
            .map_err(|e| SessionError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| SessionError::Internal(format!("response receive failed: {e}")))?
    }

    /// Return a finished controller (`Left`/`Failed`) to `Idle` for a new attempt.
    pub async fn reset(&self) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::Reset { respond_to: tx })
            .await
            .map_err(|e| SessionError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| SessionError::Internal(format!("response receive failed: {e}")))?
    }

    /// Tear down and stop the actor (e.g. the hosting view is going away).
    ///
    /// Interrupts an in-flight join.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        *self.status.borrow()
    }

    #[must_use]
    pub fn state(&self) -> SessionLifecycleState {
        self.status.borrow().state
    }

    /// Role negotiated for this caller, once resolved.
    #[must_use]
    pub fn role(&self) -> Option<SessionRole> {
        self.status.borrow().role
    }

    #[must_use]
    pub fn local_media(&self) -> LocalMediaSnapshot {
        self.status.borrow().local_media
    }

    /// Remote tracks currently published, ordered by participant then kind.
    #[must_use]
    pub fn remote_tracks(&self) -> Vec<RemoteTrackEntry> {
        self.registry.snapshot()
    }

    /// Remote participants with video, plus the local participant if its
    /// camera is sending.
    #[must_use]
    pub fn participant_count(&self) -> usize {
        let local = usize::from(self.local_media().video_active());
        self.registry.video_participant_count() + local
    }

    /// Remote participants publishing any track, in id order.
    #[must_use]
    pub fn participant_ids(&self) -> Vec<ParticipantUid> {
        self.registry.participant_ids()
    }

    /// Watch every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.status.clone()
    }

    /// Wait until the lifecycle reaches `target`.
    ///
    /// # Errors
    ///
    /// `Internal` if the actor stops before reaching `target`.
    pub async fn wait_for_state(&self, target: SessionLifecycleState) -> Result<(), SessionError> {
        let mut status = self.status.clone();
        status
            .wait_for(|snapshot| snapshot.state == target)
            .await
            .map(|_| ())
            .map_err(|e| SessionError::Internal(format!("status channel closed: {e}")))
    }
}

/// How a join attempt finished.
enum JoinOutcome {
    Joined(SessionRole),
    Failed(SessionError),
    TimedOut,
    Cancelled,
}

/// The `SessionControllerActor` implementation.
pub struct SessionControllerActor {
    session_id: SessionId,
    caller: CallerIdentity,
    receiver: mpsc::Receiver<SessionMessage>,
    cancel_token: CancellationToken,
    config: ControllerConfig,
    resolver: SessionDescriptorResolver,
    reporter: SessionTerminationReporter,
    transport: Arc<dyn MediaTransport>,
    local_media: LocalMediaManager,
    registry: Arc<RemoteParticipantRegistry>,
    /// Present from a successful channel join until teardown.
    descriptor: Option<SessionDescriptor>,
    role: Option<SessionRole>,
    state: SessionLifecycleState,
    /// Whether `join_channel` was called in this attempt.
    join_attempted: bool,
    torn_down: bool,
    pump: Option<EventPump>,
    status_tx: watch::Sender<SessionSnapshot>,
}

impl SessionControllerActor {
    /// Spawn a controller for `caller` in `session_id`.
    ///
    /// Returns a handle and the task join handle.
    ///
    /// # Arguments
    ///
    /// * `scheduling` - Scheduling service client (descriptor + end reporting)
    /// * `transport` - Media transport provider
    /// * `cancel_token` - Shutdown signal; cancelling it tears the session down
    pub fn spawn(
        session_id: SessionId,
        caller: CallerIdentity,
        scheduling: Arc<dyn SchedulingClient>,
        transport: Arc<dyn MediaTransport>,
        config: ControllerConfig,
        cancel_token: CancellationToken,
    ) -> (SessionControllerHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(config.mailbox_capacity);
        let (status_tx, status_rx) = watch::channel(SessionSnapshot::default());
        let registry = Arc::new(RemoteParticipantRegistry::new());

        let actor = Self {
            session_id: session_id.clone(),
            caller,
            receiver,
            cancel_token: cancel_token.clone(),
            config,
            resolver: SessionDescriptorResolver::new(Arc::clone(&scheduling)),
            reporter: SessionTerminationReporter::new(scheduling),
            local_media: LocalMediaManager::new(Arc::clone(&transport)),
            transport,
            registry: Arc::clone(&registry),
            descriptor: None,
            role: None,
            state: SessionLifecycleState::Idle,
            join_attempted: false,
            torn_down: false,
            pump: None,
            status_tx,
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = SessionControllerHandle {
            sender,
            cancel_token,
            status: status_rx,
            registry,
            session_id,
        };

        (handle, task_handle)
    }

    /// Run the actor message loop.
    #[instrument(
        skip_all,
        name = "sc.actor.controller",
        fields(session_id = %self.session_id, user_id = %self.caller.user_id)
    )]
    async fn run(mut self) {
        info!(target: "sc.actor.controller", "SessionControllerActor started");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "sc.actor.controller",
                        state = %self.state,
                        "SessionControllerActor received cancellation signal"
                    );
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => self.handle_message(message).await,
                        None => {
                            info!(
                                target: "sc.actor.controller",
                                state = %self.state,
                                "All controller handles dropped"
                            );
                            break;
                        }
                    }
                }
            }
        }

        if !self.state.is_terminal() {
            self.set_state(SessionLifecycleState::Leaving);
            self.teardown("shutdown").await;
            self.set_state(SessionLifecycleState::Left);
        }

        info!(
            target: "sc.actor.controller",
            state = %self.state,
            "SessionControllerActor stopped"
        );
    }

    async fn handle_message(&mut self, message: SessionMessage) {
        let operation = message.operation();
        debug!(target: "sc.actor.controller", operation, state = %self.state, "Handling message");

        match message {
            SessionMessage::Join { respond_to } => {
                let result = self.join().await;
                let _ = respond_to.send(record(operation, result));
            }
            SessionMessage::ToggleAudio { enable, respond_to } => {
                let result = self
                    .require_joined(operation)
                    .map(|()| self.local_media.toggle_audio(enable));
                self.publish_status();
                let _ = respond_to.send(record(operation, result));
            }
            SessionMessage::ToggleVideo { enable, respond_to } => {
                let result = self
                    .require_joined(operation)
                    .map(|()| self.local_media.toggle_video(enable));
                self.publish_status();
                let _ = respond_to.send(record(operation, result));
            }
            SessionMessage::EnableOnDemand { respond_to } => {
                let result = self.enable_on_demand().await;
                let _ = respond_to.send(record(operation, result));
            }
            SessionMessage::Leave { respond_to } => {
                let result = self.leave().await;
                let _ = respond_to.send(record(operation, result));
            }
            SessionMessage::EndSession { respond_to } => {
                let result = self.end_session().await;
                let _ = respond_to.send(record(operation, result));
            }
            SessionMessage::Reset { respond_to } => {
                let result = self.reset();
                let _ = respond_to.send(record(operation, result));
            }
        }
    }

    async fn join(&mut self) -> Result<SessionRole, SessionError> {
        if self.state != SessionLifecycleState::Idle {
            return Err(self.invalid_state("join"));
        }

        let started = Instant::now();
        self.set_state(SessionLifecycleState::Resolving);

        let cancel_token = self.cancel_token.clone();
        let join_timeout = self.config.join_timeout;
        let outcome = tokio::select! {
            () = cancel_token.cancelled() => JoinOutcome::Cancelled,
            result = tokio::time::timeout(join_timeout, self.join_sequence()) => match result {
                Ok(Ok(role)) => JoinOutcome::Joined(role),
                Ok(Err(e)) => JoinOutcome::Failed(e),
                Err(_) => JoinOutcome::TimedOut,
            },
        };

        let elapsed = started.elapsed();
        match outcome {
            JoinOutcome::Joined(role) => {
                self.set_state(SessionLifecycleState::Joined);
                metrics::record_join_attempt("success", elapsed);
                info!(
                    target: "sc.actor.controller",
                    role = role.as_str(),
                    elapsed_ms = elapsed.as_millis(),
                    "Joined session"
                );
                Ok(role)
            }
            JoinOutcome::Failed(e) => {
                warn!(
                    target: "sc.actor.controller",
                    state = %self.state,
                    error = %e,
                    "Join failed"
                );
                self.teardown("join_failure").await;
                self.set_state(SessionLifecycleState::Failed);
                metrics::record_join_attempt("error", elapsed);
                Err(e)
            }
            JoinOutcome::TimedOut => {
                warn!(
                    target: "sc.actor.controller",
                    state = %self.state,
                    timeout_ms = join_timeout.as_millis(),
                    "Join timed out"
                );
                self.teardown("join_failure").await;
                self.set_state(SessionLifecycleState::Failed);
                metrics::record_join_attempt("timeout", elapsed);
                Err(SessionError::JoinTimeout(join_timeout))
            }
            JoinOutcome::Cancelled => {
                info!(
                    target: "sc.actor.controller",
                    state = %self.state,
                    "Join interrupted by shutdown"
                );
                self.set_state(SessionLifecycleState::Leaving);
                self.teardown("shutdown").await;
                self.set_state(SessionLifecycleState::Left);
                metrics::record_join_attempt("cancelled", elapsed);
                Err(SessionError::Internal("join interrupted by shutdown".to_string()))
            }
        }
    }

    /// Resolve, join the channel, then set up local media.
    async fn join_sequence(&mut self) -> Result<SessionRole, SessionError> {
        let descriptor = self
            .resolver
            .resolve(&self.session_id, &self.caller)
            .await?;
        let role = descriptor.role;
        self.role = Some(role);
        self.set_state(SessionLifecycleState::Joining);

        // Subscribe before joining so nothing emitted during the join is lost.
        let events = self.transport.subscribe();
        self.pump = Some(EventPump::spawn(
            events,
            Arc::clone(&self.registry),
            self.cancel_token.child_token(),
        ));

        self.join_attempted = true;
        self.transport
            .join_channel(
                &descriptor.credentials.app_id,
                &descriptor.channel_name,
                &descriptor.credentials.token,
                descriptor.participant_id,
            )
            .await?;
        debug!(
            target: "sc.actor.controller",
            channel = %descriptor.channel_name,
            participant_id = %descriptor.participant_id,
            "Channel joined"
        );
        self.descriptor = Some(descriptor);

        self.local_media
            .create_and_publish(role)
            .await
            .map_err(SessionError::into_join_failure)?;
        self.publish_status();

        Ok(role)
    }

    async fn enable_on_demand(&mut self) -> Result<LocalMediaSnapshot, SessionError> {
        self.require_joined("enable_on_demand")?;

        let result =
            until_cancelled(&self.cancel_token, self.local_media.enable_on_demand()).await;
        self.publish_status();

        if let Err(e) = &result {
            warn!(
                target: "sc.actor.controller",
                error = %e,
                "Enabling local media failed, session stays joined"
            );
        }
        result
    }

    async fn leave(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionLifecycleState::Left | SessionLifecycleState::Failed => {
                debug!(
                    target: "sc.actor.controller",
                    state = %self.state,
                    "Leave on finished session"
                );
                Ok(())
            }
            SessionLifecycleState::Idle | SessionLifecycleState::Joined => {
                self.set_state(SessionLifecycleState::Leaving);
                self.teardown("leave").await;
                self.set_state(SessionLifecycleState::Left);
                info!(target: "sc.actor.controller", "Left session");
                Ok(())
            }
            _ => Err(self.invalid_state("leave")),
        }
    }

    async fn end_session(&mut self) -> Result<(), SessionError> {
        if self.role == Some(SessionRole::Subscriber) {
            return Err(SessionError::Forbidden {
                operation: "end_session",
                reason: "only the session owner can end the session".to_string(),
            });
        }
        if self.state != SessionLifecycleState::Joined {
            return Err(self.invalid_state("end_session"));
        }
        let Some(role) = self.role else {
            return Err(self.invalid_state("end_session"));
        };

        self.set_state(SessionLifecycleState::Leaving);

        let report = until_cancelled(
            &self.cancel_token,
            self.reporter.report_ended(&self.session_id, role),
        )
        .await;
        if let Err(e) = report {
            // Never blocks the publisher from leaving.
            warn!(
                target: "sc.actor.controller",
                error = %e,
                "Termination report failed, continuing teardown"
            );
            metrics::record_error("end_session", e.error_type_label());
        }

        self.teardown("end_session").await;
        self.set_state(SessionLifecycleState::Left);
        info!(target: "sc.actor.controller", "Session ended");
        Ok(())
    }

    fn reset(&mut self) -> Result<(), SessionError> {
        if !self.state.is_terminal() {
            return Err(self.invalid_state("reset"));
        }

        self.local_media = LocalMediaManager::new(Arc::clone(&self.transport));
        self.registry.reopen();
        self.descriptor = None;
        self.role = None;
        self.join_attempted = false;
        self.torn_down = false;
        self.set_state(SessionLifecycleState::Idle);

        info!(target: "sc.actor.controller", "Controller reset");
        Ok(())
    }

    /// Release everything the attempt acquired. Idempotent; step failures are
    /// logged and the remaining steps still run.
    ///
    /// Local tracks are stopped before the channel is left.
    async fn teardown(&mut self, trigger: &'static str) {
        if self.torn_down {
            debug!(target: "sc.actor.controller", trigger, "Teardown already done");
            return;
        }
        self.torn_down = true;
        metrics::record_teardown(trigger);

        self.local_media.teardown();

        if self.join_attempted {
            match tokio::time::timeout(LEAVE_TIMEOUT, self.transport.leave_channel()).await {
                Ok(Ok(())) => debug!(target: "sc.actor.controller", "Channel left"),
                Ok(Err(e)) => warn!(
                    target: "sc.actor.controller",
                    error = %e,
                    "Leaving channel failed"
                ),
                Err(_) => warn!(
                    target: "sc.actor.controller",
                    timeout_ms = LEAVE_TIMEOUT.as_millis(),
                    "Leaving channel timed out"
                ),
            }
            self.join_attempted = false;
        }

        if let Some(pump) = self.pump.take() {
            pump.stop().await;
        }
        self.registry.clear_and_close();
        if let Some(descriptor) = self.descriptor.take() {
            debug!(
                target: "sc.actor.controller",
                channel = %descriptor.channel_name,
                "Descriptor discarded"
            );
        }
        self.publish_status();

        info!(target: "sc.actor.controller", trigger, "Teardown complete");
    }

    fn require_joined(&self, operation: &'static str) -> Result<(), SessionError> {
        if self.state == SessionLifecycleState::Joined {
            Ok(())
        } else {
            Err(self.invalid_state(operation))
        }
    }

    fn invalid_state(&self, operation: &'static str) -> SessionError {
        SessionError::InvalidState {
            operation,
            state: self.state,
        }
    }

    fn set_state(&mut self, next: SessionLifecycleState) {
        if self.state != next {
            debug!(
                target: "sc.actor.controller",
                from = %self.state,
                to = %next,
                "State transition"
            );
            self.state = next;
        }
        self.publish_status();
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(SessionSnapshot {
            state: self.state,
            role: self.role,
            local_media: self.local_media.snapshot(),
        });
    }
}

/// Record an error result for `operation`, passing the result through.
fn record<T>(operation: &'static str, result: Result<T, SessionError>) -> Result<T, SessionError> {
    if let Err(e) = &result {
        metrics::record_error(operation, e.error_type_label());
    }
    result
}

/// Run `fut` unless shutdown is requested first.
async fn until_cancelled<T>(
    cancel_token: &CancellationToken,
    fut: impl Future<Output = Result<T, SessionError>>,
) -> Result<T, SessionError> {
    tokio::select! {
        () = cancel_token.cancelled() => {
            Err(SessionError::Internal("interrupted by shutdown".to_string()))
        }
        result = fut => result,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::scheduling::mock::MockSchedulingClient;
    use crate::scheduling::{DescriptorResponse, SessionStatus};
    use crate::transport::mock::{MockTransport, TransportCall};
    use chrono::Utc;
    use common::secret::SecretString;
    use common::types::{ParticipantUid, UserId};

    fn descriptor_for(owner: UserId) -> DescriptorResponse {
        DescriptorResponse {
            session_id: SessionId::new("sess-1"),
            status: SessionStatus::Live,
            owner_user_id: owner,
            channel_name: "chem-101".to_string(),
            app_id: "app".to_string(),
            token: SecretString::from("rtc"),
            participant_id: ParticipantUid(5),
            expires_at: Utc::now() + chrono::Duration::minutes(5),
        }
    }

    fn spawn_controller(
        scheduling: MockSchedulingClient,
        transport: Arc<MockTransport>,
        caller: CallerIdentity,
    ) -> (SessionControllerHandle, JoinHandle<()>) {
        SessionControllerActor::spawn(
            SessionId::new("sess-1"),
            caller,
            Arc::new(scheduling),
            transport,
            ControllerConfig::default(),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_publisher_join_and_leave() {
        let owner = CallerIdentity::new(UserId::new(), "Teacher");
        let transport = Arc::new(MockTransport::new());
        let (handle, task) = spawn_controller(
            MockSchedulingClient::with_descriptor(descriptor_for(owner.user_id)),
            Arc::clone(&transport),
            owner,
        );

        assert_eq!(handle.state(), SessionLifecycleState::Idle);
        assert_eq!(handle.join().await.unwrap(), SessionRole::Publisher);
        assert_eq!(handle.state(), SessionLifecycleState::Joined);
        assert!(handle.local_media().has_audio);
        assert_eq!(handle.participant_count(), 1);

        handle.leave().await.unwrap();
        assert_eq!(handle.state(), SessionLifecycleState::Left);
        assert_eq!(handle.participant_count(), 0);
        assert_eq!(transport.leave_count(), 1);

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_resolver_failure_has_no_transport_interaction() {
        let caller = CallerIdentity::new(UserId::new(), "Student");
        let transport = Arc::new(MockTransport::new());
        let (handle, _task) = spawn_controller(
            MockSchedulingClient::failing(crate::errors::SchedulingError::NotFound),
            Arc::clone(&transport),
            caller,
        );

        let err = handle.join().await.unwrap_err();

        assert!(matches!(err, SessionError::NotFound));
        assert_eq!(handle.state(), SessionLifecycleState::Failed);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_before_join_is_invalid_state() {
        let caller = CallerIdentity::new(UserId::new(), "Student");
        let (handle, _task) = spawn_controller(
            MockSchedulingClient::default(),
            Arc::new(MockTransport::new()),
            caller,
        );

        let err = handle.toggle_audio(false).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidState {
                operation: "toggle_audio",
                state: SessionLifecycleState::Idle
            }
        ));
    }

    #[tokio::test]
    async fn test_leave_from_idle_goes_to_left_without_transport() {
        let caller = CallerIdentity::new(UserId::new(), "Student");
        let transport = Arc::new(MockTransport::new());
        let (handle, _task) = spawn_controller(
            MockSchedulingClient::default(),
            Arc::clone(&transport),
            caller,
        );

        handle.leave().await.unwrap();

        assert_eq!(handle.state(), SessionLifecycleState::Left);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_leave_failure_does_not_block_teardown() {
        let owner = CallerIdentity::new(UserId::new(), "Teacher");
        let transport = Arc::new(MockTransport::new().with_leave_failure());
        let (handle, _task) = spawn_controller(
            MockSchedulingClient::with_descriptor(descriptor_for(owner.user_id)),
            Arc::clone(&transport),
            owner,
        );
        handle.join().await.unwrap();

        handle.leave().await.unwrap();

        assert_eq!(handle.state(), SessionLifecycleState::Left);
        assert!(handle.local_media().is_empty());
        assert!(transport.created_tracks().iter().all(|t| t.is_stopped()));
        assert_eq!(
            transport.count_calls(|c| *c == TransportCall::LeaveChannel),
            1
        );
    }

    #[tokio::test]
    async fn test_reset_requires_finished_attempt() {
        let caller = CallerIdentity::new(UserId::new(), "Student");
        let (handle, _task) = spawn_controller(
            MockSchedulingClient::default(),
            Arc::new(MockTransport::new()),
            caller,
        );

        assert!(matches!(
            handle.reset().await,
            Err(SessionError::InvalidState { operation: "reset", .. })
        ));

        // Default mock has no descriptor: the join fails with NotFound.
        handle.join().await.unwrap_err();
        handle.reset().await.unwrap();
        assert_eq!(handle.state(), SessionLifecycleState::Idle);
        assert!(handle.role().is_none());
    }
}
