//! Mock scheduling client for testing.

use super::{DescriptorResponse, SchedulingClient};
use crate::descriptor::CallerIdentity;
use crate::errors::SchedulingError;

use async_trait::async_trait;
use common::types::SessionId;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock scheduling client.
///
/// Returns the configured descriptor (or error) on every call and records
/// which sessions were marked ended.
#[derive(Debug, Default)]
pub struct MockSchedulingClient {
    descriptor: Mutex<Option<DescriptorResponse>>,
    descriptor_error: Mutex<Option<SchedulingError>>,
    end_error: Mutex<Option<SchedulingError>>,
    resolve_delay: Mutex<Option<Duration>>,
    descriptor_calls: AtomicUsize,
    ended_sessions: Mutex<Vec<SessionId>>,
}

impl MockSchedulingClient {
    /// Create a mock that returns `descriptor` for every caller.
    pub fn with_descriptor(descriptor: DescriptorResponse) -> Self {
        let mock = Self::default();
        *lock(&mock.descriptor) = Some(descriptor);
        mock
    }

    /// Create a mock whose descriptor lookups fail.
    pub fn failing(error: SchedulingError) -> Self {
        let mock = Self::default();
        *lock(&mock.descriptor_error) = Some(error);
        mock
    }

    /// Make `mark_session_ended` fail.
    #[must_use]
    pub fn with_end_failure(self, error: SchedulingError) -> Self {
        *lock(&self.end_error) = Some(error);
        self
    }

    /// Delay descriptor lookups.
    #[must_use]
    pub fn with_resolve_delay(self, delay: Duration) -> Self {
        *lock(&self.resolve_delay) = Some(delay);
        self
    }

    /// Number of descriptor lookups made.
    pub fn descriptor_calls(&self) -> usize {
        self.descriptor_calls.load(Ordering::SeqCst)
    }

    /// Sessions passed to `mark_session_ended`, in call order.
    pub fn ended_sessions(&self) -> Vec<SessionId> {
        lock(&self.ended_sessions).clone()
    }
}

#[async_trait]
impl SchedulingClient for MockSchedulingClient {
    async fn get_session_descriptor(
        &self,
        _session_id: &SessionId,
        _caller: &CallerIdentity,
    ) -> Result<DescriptorResponse, SchedulingError> {
        self.descriptor_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *lock(&self.resolve_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = lock(&self.descriptor_error).clone() {
            return Err(err);
        }
        lock(&self.descriptor)
            .clone()
            .ok_or(SchedulingError::NotFound)
    }

    async fn mark_session_ended(&self, session_id: &SessionId) -> Result<(), SchedulingError> {
        lock(&self.ended_sessions).push(session_id.clone());

        match lock(&self.end_error).clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
