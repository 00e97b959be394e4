//! Observability for the session controller.
//!
//! The controller is a library; it records through the `metrics` facade and
//! leaves recorder/exporter installation to the embedding application.
//!
//! # Privacy by Default
//!
//! Collaborator calls and the actor loop use `#[instrument(skip_all)]` with
//! explicit safe fields. Transport tokens and the service token are never
//! logged or used as labels.
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `sc_join_attempts_total` | Counter | `outcome` | Join attempts by result |
//! | `sc_join_duration_seconds` | Histogram | `outcome` | Time from `join()` to `Joined`/`Failed` |
//! | `sc_teardowns_total` | Counter | `trigger` | Teardowns by what caused them |
//! | `sc_remote_tracks_active` | Gauge | none | Remote tracks currently registered |
//! | `sc_errors_total` | Counter | `operation`, `error_type` | Errors surfaced to callers |
//! | `sc_termination_reports_total` | Counter | `outcome` | End-of-session reports |

pub mod metrics;
