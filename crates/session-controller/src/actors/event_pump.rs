//! Event pump: feeds transport notifications into the remote registry.
//!
//! Runs as its own task so notifications are applied while the controller
//! is suspended on a collaborator call. Events are applied in arrival order.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::remote_registry::RemoteParticipantRegistry;
use crate::transport::TransportEvent;

pub struct EventPump {
    cancel_token: CancellationToken,
    task: JoinHandle<()>,
}

impl EventPump {
    /// Spawn a pump reading `events` until the stream ends or `cancel_token` fires.
    #[must_use]
    pub fn spawn(
        mut events: mpsc::UnboundedReceiver<TransportEvent>,
        registry: Arc<RemoteParticipantRegistry>,
        cancel_token: CancellationToken,
    ) -> Self {
        let token = cancel_token.clone();
        let task = tokio::spawn(async move {
            let mut applied: u64 = 0;
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    event = events.recv() => match event {
                        Some(event) => {
                            registry.apply(event);
                            applied += 1;
                        }
                        None => {
                            debug!(target: "sc.media.remote", "Transport event stream closed");
                            break;
                        }
                    }
                }
            }
            debug!(target: "sc.media.remote", applied, "Event pump stopped");
        });

        Self { cancel_token, task }
    }

    /// Stop the pump and wait for it to exit.
    pub async fn stop(self) {
        self.cancel_token.cancel();
        if let Err(e) = self.task.await {
            warn!(target: "sc.media.remote", error = %e, "Event pump task failed");
        }
    }
}
