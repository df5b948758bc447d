use crate::data::Snapshot;
use crate::history::HistoryStore;
use crate::monitor::MonitorError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const EMPTY_RESULT: &str = "No metrics data received";

/// Most recent acquisition failure, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorState {
    message: Option<String>,
}

impl ErrorState {
    pub fn set(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub fn clear(&mut self) {
        self.message = None;
    }

    pub fn get(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Result of one tick, as seen by the state.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    Snapshot(Snapshot),
    Empty,
    Failed(String),
}

impl From<Result<Option<Snapshot>, MonitorError>> for SampleOutcome {
    fn from(result: Result<Option<Snapshot>, MonitorError>) -> Self {
        match result {
            Ok(Some(snapshot)) => SampleOutcome::Snapshot(snapshot),
            Ok(None) => SampleOutcome::Empty,
            Err(err) => SampleOutcome::Failed(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    history: HistoryStore,
    error: ErrorState,
}

impl DashboardState {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            history: HistoryStore::with_capacity(capacity),
            error: ErrorState::default(),
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn error(&self) -> &ErrorState {
        &self.error
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.history.current()
    }

    /// Applies one tick. Failures keep the window intact but drop the
    /// current snapshot so readouts do not show stale data.
    pub fn apply(&mut self, outcome: SampleOutcome) {
        match outcome {
            SampleOutcome::Snapshot(snapshot) => {
                self.history.append(snapshot);
                self.error.clear();
            }
            SampleOutcome::Empty => self.fail(EMPTY_RESULT),
            SampleOutcome::Failed(reason) => self.fail(&reason),
        }
    }

    fn fail(&mut self, reason: &str) {
        self.error.set(format!("Failed to fetch metrics: {reason}"));
        self.history.clear_current();
    }
}

/// Handle to the dashboard state shared by the poller and the UI.
///
/// Readers go through [`SharedState::read`]; only the poller writes.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<DashboardState>>,
}

impl SharedState {
    pub fn new(state: DashboardState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(DashboardState::with_capacity(capacity))
    }

    pub fn read<R>(&self, f: impl FnOnce(&DashboardState) -> R) -> R {
        f(&self.lock())
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, DashboardState> {
        // Every mutation is a single append or slot overwrite, so the state
        // behind a poisoned lock is still consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::snapshot;

    fn window_timestamps(state: &DashboardState) -> Vec<u64> {
        state.history().window().iter().map(|s| s.timestamp).collect()
    }

    #[test]
    fn error_state_overwrites_and_clears() {
        let mut error = ErrorState::default();
        assert!(error.get().is_none());

        error.set("first");
        error.set("second");
        assert_eq!(error.get(), Some("second"));

        error.clear();
        assert!(error.get().is_none());
    }

    #[test]
    fn failed_tick_keeps_window_and_drops_current() {
        let mut state = DashboardState::default();
        state.apply(SampleOutcome::Snapshot(snapshot(1, &[5.0])));
        state.apply(SampleOutcome::Snapshot(snapshot(2, &[6.0])));
        let before = window_timestamps(&state);

        state.apply(SampleOutcome::Failed("sensor offline".into()));

        assert_eq!(
            state.error().get(),
            Some("Failed to fetch metrics: sensor offline")
        );
        assert!(state.current().is_none());
        assert_eq!(window_timestamps(&state), before);
    }

    #[test]
    fn empty_result_is_a_failure() {
        let mut state = DashboardState::default();
        state.apply(SampleOutcome::Snapshot(snapshot(1, &[])));

        state.apply(SampleOutcome::from(Ok(None)));

        assert_eq!(
            state.error().get(),
            Some("Failed to fetch metrics: No metrics data received")
        );
        assert!(state.current().is_none());
        assert_eq!(state.history().len(), 1);
    }

    #[test]
    fn success_after_failure_recovers() {
        let mut state = DashboardState::default();
        state.apply(SampleOutcome::from(Err(MonitorError::EmptyOutput)));
        assert!(state.error().get().is_some());

        let fresh = snapshot(9, &[1.0, 2.0]);
        state.apply(SampleOutcome::Snapshot(fresh.clone()));

        assert!(state.error().get().is_none());
        assert_eq!(state.current(), Some(&fresh));
    }

    #[test]
    fn shared_state_reads_through_handle() {
        let shared = SharedState::with_capacity(3);
        let writer = shared.clone();
        for ts in 0..5 {
            writer.lock().apply(SampleOutcome::Snapshot(snapshot(ts, &[])));
        }

        let (len, current) = shared.read(|s| (s.history().len(), s.current().map(|c| c.timestamp)));
        assert_eq!(len, 3);
        assert_eq!(current, Some(4));
    }
}
