//! Actor implementation of the session lifecycle controller.
//!
//! ```text
//! SessionControllerActor (one per session attempt)
//! ├── owns lifecycle state, descriptor, LocalMediaManager
//! ├── shares RemoteParticipantRegistry with its handle
//! └── EventPump task (transport notifications -> registry)
//! ```
//!
//! # Key Design Decisions
//!
//! - **Single writer**: every state transition runs inside the actor loop, one
//!   message at a time
//! - **Watch for reads**: state and local media are published on a `watch`
//!   channel, remote tracks are read straight from the registry
//! - **CancellationToken**: external teardown (shutdown, parent cancel) runs
//!   the same teardown as an explicit leave and interrupts an in-flight join
//!
//! # Modules
//!
//! - [`controller`] - `SessionControllerActor` and its handle
//! - [`event_pump`] - task applying transport notifications to the registry
//! - [`messages`] - mailbox messages and lifecycle types

pub mod controller;
pub mod event_pump;
pub mod messages;

pub use controller::{SessionControllerActor, SessionControllerHandle};
pub use messages::{SessionLifecycleState, SessionMessage, SessionSnapshot};
