use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use tracing::warn;

use crate::metrics::Counter;

use super::request::{Completion, QueuedPath, SearchOutcome};
use super::sync;
use super::worker::SharedState;

#[derive(Debug)]
struct Armed {
    request: Arc<QueuedPath>,
    deadline: Instant,
}

#[derive(Debug, Default)]
struct WatchState {
    armed: Option<Armed>,
    stopping: bool,
}

/// Per-worker watchdog. While armed it resolves the running request as
/// timed out once the budget elapses, without waiting for the worker to
/// notice.
#[derive(Debug)]
pub(crate) struct TimeoutMonitor {
    budget: Duration,
    state: Mutex<WatchState>,
    changed: Condvar,
}

impl TimeoutMonitor {
    pub(crate) fn new(budget: Duration) -> Self {
        Self {
            budget,
            state: Mutex::new(WatchState::default()),
            changed: Condvar::new(),
        }
    }

    pub(crate) fn arm(&self, request: &Arc<QueuedPath>) {
        let mut state = sync::lock(&self.state, "watchdog_arm");
        state.armed = Some(Armed {
            request: Arc::clone(request),
            deadline: Instant::now() + self.budget,
        });
        self.changed.notify_one();
    }

    pub(crate) fn disarm(&self) {
        let mut state = sync::lock(&self.state, "watchdog_disarm");
        state.armed = None;
        self.changed.notify_one();
    }

    pub(crate) fn stop(&self) {
        let mut state = sync::lock(&self.state, "watchdog_stop");
        state.stopping = true;
        self.changed.notify_one();
    }

    /// Watchdog thread body. Returns after [`stop`](Self::stop).
    pub(crate) fn watch(&self, shared: &SharedState) {
        let mut state = sync::lock(&self.state, "watchdog_watch");
        loop {
            if state.stopping {
                return;
            }
            let Some(deadline) = state.armed.as_ref().map(|armed| armed.deadline) else {
                state = sync::wait(&self.changed, state, "watchdog_watch");
                continue;
            };

            let now = Instant::now();
            if now < deadline {
                state = sync::wait_timeout(
                    &self.changed,
                    state,
                    deadline - now,
                    "watchdog_watch",
                );
                continue;
            }

            if let Some(armed) = state.armed.take() {
                self.expire(armed.request, shared);
            }
        }
    }

    fn expire(&self, request: Arc<QueuedPath>, shared: &SharedState) {
        if !request.try_settle() {
            return;
        }
        shared.metrics().record(Counter::SearchesTimedOut);
        warn!(
            request_id = request.id().0,
            requester = request.requester().0,
            budget_ms = self.budget.as_millis() as u64,
            "path_search_timed_out"
        );
        shared.post(Completion {
            request,
            outcome: SearchOutcome::TimedOut,
        });
    }
}
