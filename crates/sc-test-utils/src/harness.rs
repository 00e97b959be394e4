//! Controller harness: a spawned `SessionControllerActor` on mock collaborators.

use std::sync::Arc;
use std::time::Duration;

use session_controller::actors::{SessionControllerActor, SessionControllerHandle};
use session_controller::config::ControllerConfig;
use session_controller::descriptor::CallerIdentity;
use session_controller::scheduling::mock::MockSchedulingClient;
use session_controller::transport::mock::MockTransport;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::fixtures::TestSession;

/// A running controller plus the mocks it talks to.
pub struct ControllerHarness {
    pub handle: SessionControllerHandle,
    pub task: JoinHandle<()>,
    pub transport: Arc<MockTransport>,
    pub scheduling: Arc<MockSchedulingClient>,
    pub cancel_token: CancellationToken,
}

impl ControllerHarness {
    /// Controller for the session owner, on succeeding mocks.
    #[must_use]
    pub fn teacher(session: &TestSession) -> Self {
        Self::builder(session).caller(session.teacher()).spawn()
    }

    /// Controller for a non-owner, on succeeding mocks.
    #[must_use]
    pub fn student(session: &TestSession) -> Self {
        Self::builder(session).caller(session.student()).spawn()
    }

    #[must_use]
    pub fn builder(session: &TestSession) -> ControllerHarnessBuilder {
        ControllerHarnessBuilder {
            session: session.clone(),
            caller: session.student(),
            transport: MockTransport::new(),
            scheduling: MockSchedulingClient::with_descriptor(session.descriptor()),
            config: ControllerConfig::default(),
        }
    }

    /// Cancel the controller and wait for the actor task to exit.
    pub async fn shutdown(self) {
        self.cancel_token.cancel();
        self.task.await.expect("controller task panicked");
    }
}

/// Builder for [`ControllerHarness`].
pub struct ControllerHarnessBuilder {
    session: TestSession,
    caller: CallerIdentity,
    transport: MockTransport,
    scheduling: MockSchedulingClient,
    config: ControllerConfig,
}

impl ControllerHarnessBuilder {
    #[must_use]
    pub fn caller(mut self, caller: CallerIdentity) -> Self {
        self.caller = caller;
        self
    }

    #[must_use]
    pub fn transport(mut self, transport: MockTransport) -> Self {
        self.transport = transport;
        self
    }

    #[must_use]
    pub fn scheduling(mut self, scheduling: MockSchedulingClient) -> Self {
        self.scheduling = scheduling;
        self
    }

    #[must_use]
    pub fn join_timeout(mut self, timeout: Duration) -> Self {
        self.config.join_timeout = timeout;
        self
    }

    #[must_use]
    pub fn spawn(self) -> ControllerHarness {
        let transport = Arc::new(self.transport);
        let scheduling = Arc::new(self.scheduling);
        let cancel_token = CancellationToken::new();

        let (handle, task) = SessionControllerActor::spawn(
            self.session.session_id.clone(),
            self.caller,
            Arc::clone(&scheduling) as _,
            Arc::clone(&transport) as _,
            self.config,
            cancel_token.clone(),
        );

        ControllerHarness {
            handle,
            task,
            transport,
            scheduling,
            cancel_token,
        }
    }
}
