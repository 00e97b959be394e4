//! # SC Test Utilities
//!
//! Shared test utilities for the session controller.
//!
//! - `fixtures` - scheduled sessions and callers (teacher, student)
//! - `harness` - a spawned controller wired to the in-crate mocks
//! - `wait` - polling helpers for state reached asynchronously
//! - [`init_test_tracing`] - test-writer tracing subscriber
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sc_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let session = TestSession::new("sess-1");
//!     let harness = ControllerHarness::teacher(&session);
//!
//!     harness.handle.join().await.unwrap();
//!     harness.transport.emit_published(7, MediaKind::Video, "h1");
//! }
//! ```

pub mod fixtures;
pub mod harness;
pub mod wait;

pub use fixtures::*;
pub use harness::*;
pub use wait::*;

use std::sync::Once;

static TRACING: Once = Once::new();

/// Install a test-writer tracing subscriber once per test binary.
///
/// Honors `RUST_LOG`; defaults to `session_controller=debug`.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "session_controller=debug,sc=debug".into());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
