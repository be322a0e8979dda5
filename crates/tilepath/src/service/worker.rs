use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crossbeam_queue::SegQueue;
use tracing::debug;

use crate::grid::GridModel;
use crate::metrics::{Counter, MetricsHandle};
use crate::search::{AStarSearch, SearchStatus};

use super::request::{Completion, QueuedPath, SearchOutcome};
use super::sync;
use super::timeout::TimeoutMonitor;

/// State reachable from every background thread of one service.
#[derive(Debug)]
pub(crate) struct SharedState {
    queue: Mutex<VecDeque<Arc<QueuedPath>>>,
    work_ready: Condvar,
    shutdown: AtomicBool,
    completions: SegQueue<Completion>,
    metrics: MetricsHandle,
}

impl SharedState {
    pub(crate) fn new(metrics: MetricsHandle) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            work_ready: Condvar::new(),
            shutdown: AtomicBool::new(false),
            completions: SegQueue::new(),
            metrics,
        }
    }

    pub(crate) fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }

    pub(crate) fn enqueue(&self, request: Arc<QueuedPath>) {
        sync::lock(&self.queue, "enqueue").push_back(request);
        self.work_ready.notify_one();
    }

    pub(crate) fn queued_len(&self) -> usize {
        sync::lock(&self.queue, "queued_len").len()
    }

    /// Pops the oldest live request, waiting at most `idle_sleep` for one to
    /// arrive. Cancelled requests are dropped on the way.
    pub(crate) fn next_request(&self, idle_sleep: Duration) -> Option<Arc<QueuedPath>> {
        let mut queue = sync::lock(&self.queue, "next_request");
        let mut waited = false;
        loop {
            if self.is_shutting_down() {
                return None;
            }
            while let Some(request) = queue.pop_front() {
                if request.is_cancelled() {
                    debug!(
                        request_id = request.id().0,
                        requester = request.requester().0,
                        "cancelled_request_skipped"
                    );
                    continue;
                }
                return Some(request);
            }
            if waited {
                return None;
            }
            queue = sync::wait_timeout(&self.work_ready, queue, idle_sleep, "next_request");
            waited = true;
        }
    }

    pub(crate) fn post(&self, completion: Completion) {
        self.completions.push(completion);
    }

    pub(crate) fn pop_completion(&self) -> Option<Completion> {
        self.completions.pop()
    }

    pub(crate) fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    pub(crate) fn begin_shutdown(&self) {
        // Taking the lock orders the flag against a worker about to wait.
        let _queue = sync::lock(&self.queue, "begin_shutdown");
        self.shutdown.store(true, Ordering::Release);
        self.work_ready.notify_all();
    }
}

/// Everything one background worker owns.
#[derive(Debug)]
pub(crate) struct Worker {
    pub(crate) index: usize,
    pub(crate) grid: Arc<GridModel>,
    pub(crate) shared: Arc<SharedState>,
    pub(crate) watchdog: Option<Arc<TimeoutMonitor>>,
    pub(crate) idle_sleep: Duration,
    pub(crate) max_steps_per_slice: u32,
}

impl Worker {
    pub(crate) fn run(self) {
        debug!(worker = self.index, "path_worker_started");
        while !self.shared.is_shutting_down() {
            if let Some(request) = self.shared.next_request(self.idle_sleep) {
                self.process(request);
            }
        }
        debug!(worker = self.index, "path_worker_stopped");
    }

    fn process(&self, request: Arc<QueuedPath>) {
        self.shared.metrics().record(Counter::SearchesStarted);
        debug!(
            worker = self.index,
            request_id = request.id().0,
            requester = request.requester().0,
            start_x = request.start().x,
            start_y = request.start().y,
            end_x = request.end().x,
            end_y = request.end().y,
            "path_search_started"
        );

        if let Some(watchdog) = &self.watchdog {
            watchdog.arm(&request);
        }
        let outcome = self.search(&request);
        if let Some(watchdog) = &self.watchdog {
            watchdog.disarm();
        }

        let counter = match &outcome {
            SearchOutcome::Found(_) => Counter::SearchesFound,
            SearchOutcome::NoPath => Counter::SearchesNoPath,
            SearchOutcome::TimedOut | SearchOutcome::Abandoned => {
                debug!(
                    worker = self.index,
                    request_id = request.id().0,
                    "path_search_abandoned"
                );
                return;
            }
        };
        // The watchdog may have resolved the request between the last slice
        // and disarm.
        if !request.try_settle() {
            return;
        }

        self.shared.metrics().record(counter);
        self.shared.post(Completion { request, outcome });
    }

    fn search(&self, request: &QueuedPath) -> SearchOutcome {
        let mut search = AStarSearch::new(&self.grid, request.start(), request.end());
        loop {
            if request.is_settled() || self.shared.is_shutting_down() {
                return SearchOutcome::Abandoned;
            }
            match search.run_budgeted(self.max_steps_per_slice) {
                SearchStatus::Pending => {}
                SearchStatus::Found => {
                    debug!(
                        request_id = request.id().0,
                        expanded_nodes = search.expanded_nodes(),
                        path_cost = search.path_cost().unwrap_or_default(),
                        "path_search_found"
                    );
                    return search
                        .take_path()
                        .map_or(SearchOutcome::NoPath, SearchOutcome::Found);
                }
                SearchStatus::NoPath => {
                    debug!(
                        request_id = request.id().0,
                        expanded_nodes = search.expanded_nodes(),
                        "path_search_exhausted"
                    );
                    return SearchOutcome::NoPath;
                }
            }
        }
    }
}
