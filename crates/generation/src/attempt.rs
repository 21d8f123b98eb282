//! Bookkeeping for one step of a video fallback chain

use std::time::{Duration, Instant};

use crate::provider::OperationHandle;

/// Lifecycle of a single provider attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Submitted,
    Polling,
    Completed,
    TimedOut,
    Failed,
}

/// One variant's attempt at a video task. Discarded once the task settles.
#[derive(Debug, Clone)]
pub struct ProviderAttempt {
    pub provider_id: String,
    pub operation_handle: OperationHandle,
    pub poll_count: u32,
    pub started_at: Instant,
    pub state: AttemptState,
}

impl ProviderAttempt {
    pub fn submitted(provider_id: impl Into<String>, operation_handle: OperationHandle) -> Self {
        let attempt = Self {
            provider_id: provider_id.into(),
            operation_handle,
            poll_count: 0,
            started_at: Instant::now(),
            state: AttemptState::Submitted,
        };
        log::info!(
            "Operation started with {}: {}",
            attempt.provider_id,
            attempt.operation_handle
        );
        attempt
    }

    /// Count one status check
    pub fn record_poll(&mut self, done: bool, max_polls: u32) {
        self.poll_count += 1;
        self.state = AttemptState::Polling;
        log::debug!(
            "Polling {}... {}/{}, done={}",
            self.provider_id,
            self.poll_count,
            max_polls,
            done
        );
    }

    pub fn complete(&mut self) {
        self.state = AttemptState::Completed;
        log::info!(
            "{} finished after {} poll(s) in {:.1}s",
            self.provider_id,
            self.poll_count,
            self.elapsed().as_secs_f32()
        );
    }

    pub fn time_out(&mut self) {
        self.state = AttemptState::TimedOut;
        log::warn!(
            "{} still running after {} poll(s), giving up",
            self.provider_id,
            self.poll_count
        );
    }

    pub fn fail(&mut self) {
        self.state = AttemptState::Failed;
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let mut attempt = ProviderAttempt::submitted("veo-a", OperationHandle("op-1".to_string()));
        assert_eq!(attempt.state, AttemptState::Submitted);

        attempt.record_poll(false, 3);
        attempt.record_poll(true, 3);
        assert_eq!(attempt.state, AttemptState::Polling);
        assert_eq!(attempt.poll_count, 2);

        attempt.complete();
        assert_eq!(attempt.state, AttemptState::Completed);
    }
}
