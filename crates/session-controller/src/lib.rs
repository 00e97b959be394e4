//! Live Class Session Controller Library
//!
//! Joins a participant (teacher or student) into a live audio/video class
//! session and keeps the session's resources accounted for:
//!
//! - Resolving a single-use join descriptor and the caller's role
//! - Joining the transport channel and publishing local media
//! - Tracking media published by remote participants
//! - Guaranteed, idempotent teardown on every exit path
//! - Ending the session for everyone (session owner only)
//!
//! # Architecture
//!
//! ```text
//! SessionControllerHandle (cloneable, UI facing)
//! └── SessionControllerActor (one per session attempt)
//!     ├── SessionDescriptorResolver  -> SchedulingClient
//!     ├── LocalMediaManager          -> MediaTransport
//!     ├── SessionTerminationReporter -> SchedulingClient
//!     └── EventPump -> RemoteParticipantRegistry (shared with the handle)
//! ```
//!
//! # Lifecycle
//!
//! `Idle -> Resolving -> Joining -> Joined -> Leaving -> Left`, with `Failed`
//! reachable from `Resolving` and `Joining`. A finished controller can be
//! returned to `Idle` with an explicit reset.
//!
//! # Modules
//!
//! - [`actors`] - Lifecycle controller actor, handle and event pump
//! - [`config`] - Configuration from environment
//! - [`descriptor`] - Join descriptor resolution and role derivation
//! - [`errors`] - Error types and categories
//! - [`local_media`] - Local capture track ownership
//! - [`observability`] - Metrics
//! - [`remote_registry`] - Remote participant tracks
//! - [`scheduling`] - Scheduling service client
//! - [`termination`] - End-of-session reporting
//! - [`transport`] - Media transport capability contract

pub mod actors;
pub mod config;
pub mod descriptor;
pub mod errors;
pub mod local_media;
pub mod observability;
pub mod remote_registry;
pub mod scheduling;
pub mod termination;
pub mod transport;

pub use actors::{SessionControllerActor, SessionControllerHandle, SessionLifecycleState};
pub use errors::{ErrorCategory, SessionError};
