mod request;
mod sync;
mod timeout;
mod worker;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::PathCache;
use crate::config::{ConfigError, PathfinderConfig};
use crate::geom::{CellCoord, Vec2};
use crate::grid::{GridError, GridModel, TileSource};
use crate::metrics::{Counter, MetricsHandle, PathfinderStats};
use crate::path::Path;

pub use request::RequesterId;

use request::{QueuedPath, RequestId};
use timeout::TimeoutMonitor;
use worker::{SharedState, Worker};

/// Receives the result of one request: `Some(path)` when a route exists,
/// `None` for trivial, unreachable or timed-out requests.
pub type PathCallback = Box<dyn FnOnce(Option<Path>)>;

#[derive(Debug, Error)]
pub enum PathfinderError {
    #[error("invalid pathfinder configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to build walkability grid: {0}")]
    Grid(#[from] GridError),
    #[error("failed to spawn thread {name}: {source}")]
    SpawnThread {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

struct PendingRequest {
    request: Arc<QueuedPath>,
    callback: PathCallback,
}

/// Asynchronous pathfinding service over one immutable grid.
///
/// Searches run on background workers; results come back through
/// [`update`](Self::update), which the owner calls once per tick on its own
/// thread. Callbacks and the path cache never leave that thread.
pub struct Pathfinder {
    grid: Arc<GridModel>,
    config: PathfinderConfig,
    shared: Arc<SharedState>,
    watchdogs: Vec<Arc<TimeoutMonitor>>,
    threads: Vec<JoinHandle<()>>,
    pending: HashMap<RequesterId, PendingRequest>,
    cache: PathCache,
    next_request_id: u64,
}

impl Pathfinder {
    pub fn new(grid: GridModel, config: PathfinderConfig) -> Result<Self, PathfinderError> {
        config.validate()?;

        let mut pathfinder = Self {
            grid: Arc::new(grid),
            cache: PathCache::new(config.max_cached_paths),
            shared: Arc::new(SharedState::new(MetricsHandle::default())),
            watchdogs: Vec::new(),
            threads: Vec::new(),
            pending: HashMap::new(),
            next_request_id: 0,
            config,
        };
        // A failed spawn drops `pathfinder`, which stops and joins whatever
        // already started.
        for index in 0..pathfinder.config.worker_count {
            pathfinder.spawn_worker(index)?;
        }

        info!(
            worker_count = pathfinder.config.worker_count,
            max_cached_paths = pathfinder.config.max_cached_paths,
            search_timeout_ms = pathfinder.config.search_timeout_ms.unwrap_or_default(),
            max_steps_per_slice = pathfinder.config.max_steps_per_slice,
            tile_count = pathfinder.grid.tile_count(),
            "pathfinder_started"
        );
        Ok(pathfinder)
    }

    pub fn from_source(
        source: &impl TileSource,
        config: PathfinderConfig,
    ) -> Result<Self, PathfinderError> {
        let grid = GridModel::from_source(source)?;
        Self::new(grid, config)
    }

    fn spawn_worker(&mut self, index: usize) -> Result<(), PathfinderError> {
        let watchdog = self
            .config
            .search_timeout()
            .map(|budget| Arc::new(TimeoutMonitor::new(budget)));

        if let Some(watchdog) = &watchdog {
            let name = format!("tilepath-watchdog-{index}");
            let monitor = Arc::clone(watchdog);
            let shared = Arc::clone(&self.shared);
            let handle = spawn_named(name, move || monitor.watch(&shared))?;
            self.watchdogs.push(Arc::clone(watchdog));
            self.threads.push(handle);
        }

        let worker = Worker {
            index,
            grid: Arc::clone(&self.grid),
            shared: Arc::clone(&self.shared),
            watchdog,
            idle_sleep: self.config.idle_sleep(),
            max_steps_per_slice: self.config.max_steps_per_slice,
        };
        let handle = spawn_named(format!("tilepath-worker-{index}"), move || worker.run())?;
        self.threads.push(handle);
        Ok(())
    }

    /// Requests a path from `start` to `end` on behalf of `requester`.
    ///
    /// Positions in the same cell and cached routes are answered before this
    /// returns. Anything else is queued; a previous queued request of the
    /// same requester is cancelled and its callback dropped unused.
    pub fn find_path<F>(&mut self, start: Vec2, end: Vec2, requester: RequesterId, callback: F)
    where
        F: FnOnce(Option<Path>) + 'static,
    {
        let start = CellCoord::from_world(start);
        let end = CellCoord::from_world(end);
        let metrics = self.shared.metrics();
        metrics.record(Counter::RequestsSubmitted);

        if start == end {
            metrics.record(Counter::TrivialRequests);
            debug!(requester = requester.0, "trivial_path_request");
            callback(None);
            return;
        }

        if let Some(path) = self.cache.try_get(start, end) {
            metrics.record(Counter::CacheHits);
            debug!(requester = requester.0, waypoints = path.len(), "path_cache_hit");
            callback(Some(path));
            return;
        }

        let id = RequestId(self.next_request_id);
        self.next_request_id = self.next_request_id.wrapping_add(1);
        let request = QueuedPath::new(id, requester, start, end);

        let previous = self.pending.insert(
            requester,
            PendingRequest {
                request: Arc::clone(&request),
                callback: Box::new(callback),
            },
        );
        if let Some(previous) = previous {
            previous.request.cancel();
            metrics.record(Counter::RequestsCancelled);
            debug!(
                requester = requester.0,
                superseded_request_id = previous.request.id().0,
                "path_request_superseded"
            );
        }

        debug!(
            requester = requester.0,
            request_id = id.0,
            start_x = start.x,
            start_y = start.y,
            end_x = end.x,
            end_y = end.y,
            "path_request_queued"
        );
        self.shared.enqueue(request);
    }

    /// Cancels the in-flight request of `requester`. Its callback is dropped
    /// without being called. Unknown requesters are ignored.
    pub fn cancel_object(&mut self, requester: RequesterId) {
        let Some(pending) = self.pending.remove(&requester) else {
            return;
        };
        pending.request.cancel();
        self.shared.metrics().record(Counter::RequestsCancelled);
        debug!(
            requester = requester.0,
            request_id = pending.request.id().0,
            "path_request_cancelled"
        );
    }

    /// Start and end cells of the request `requester` is still waiting on.
    pub fn try_get_request(&self, requester: RequesterId) -> Option<(CellCoord, CellCoord)> {
        self.pending
            .get(&requester)
            .map(|pending| (pending.request.start(), pending.request.end()))
    }

    /// Delivers every finished search: invokes its callback and caches found
    /// paths. Results of cancelled or superseded requests are discarded.
    /// Never blocks. Returns the number of callbacks invoked.
    pub fn update(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(completion) = self.shared.pop_completion() {
            let request = completion.request;
            let requester = request.requester();
            let is_current = self
                .pending
                .get(&requester)
                .is_some_and(|pending| pending.request.id() == request.id());

            if request.is_cancelled() || !is_current {
                self.shared.metrics().record(Counter::ResultsDiscarded);
                debug!(
                    requester = requester.0,
                    request_id = request.id().0,
                    "path_result_discarded"
                );
                continue;
            }
            let Some(pending) = self.pending.remove(&requester) else {
                continue;
            };

            let path = completion.outcome.into_path();
            if let Some(path) = &path {
                self.cache.insert(request.start(), request.end(), path.clone());
            }
            self.shared.metrics().record(Counter::ResultsDelivered);
            (pending.callback)(path);
            delivered += 1;
        }
        delivered
    }

    pub fn grid(&self) -> &GridModel {
        &self.grid
    }

    pub fn config(&self) -> &PathfinderConfig {
        &self.config
    }

    pub fn metrics(&self) -> MetricsHandle {
        self.shared.metrics().clone()
    }

    pub fn stats(&self) -> PathfinderStats {
        self.shared.metrics().snapshot()
    }

    pub fn cached_paths(&self) -> usize {
        self.cache.len()
    }

    /// Requesters still waiting for a callback.
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Requests not yet picked up by a worker, cancelled ones included.
    pub fn queued_requests(&self) -> usize {
        self.shared.queued_len()
    }

    /// Stops workers and watchdogs and joins their threads. Pending callbacks
    /// are dropped without being called. Idempotent.
    pub fn shutdown(&mut self) {
        if self.threads.is_empty() {
            return;
        }

        self.shared.begin_shutdown();
        for watchdog in &self.watchdogs {
            watchdog.stop();
        }
        let thread_count = self.threads.len();
        for handle in self.threads.drain(..) {
            let name = handle.thread().name().unwrap_or("tilepath").to_owned();
            if handle.join().is_err() {
                warn!(thread = name.as_str(), "pathfinder_thread_panicked");
            }
        }
        self.watchdogs.clear();
        self.pending.clear();

        let stats = self.stats();
        info!(
            thread_count,
            searches_started = stats.searches_started,
            searches_found = stats.searches_found,
            searches_no_path = stats.searches_no_path,
            searches_timed_out = stats.searches_timed_out,
            cache_hits = stats.cache_hits,
            "pathfinder_stopped"
        );
    }
}

impl Drop for Pathfinder {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Pathfinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pathfinder")
            .field("config", &self.config)
            .field("threads", &self.threads.len())
            .field("pending", &self.pending.len())
            .field("cached_paths", &self.cache.len())
            .finish_non_exhaustive()
    }
}

fn spawn_named<F>(name: String, body: F) -> Result<JoinHandle<()>, PathfinderError>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.clone())
        .spawn(body)
        .map_err(|source| PathfinderError::SpawnThread { name, source })
}
