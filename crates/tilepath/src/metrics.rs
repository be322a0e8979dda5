use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Point-in-time copy of the service counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathfinderStats {
    pub requests_submitted: u64,
    pub trivial_requests: u64,
    pub cache_hits: u64,
    pub requests_cancelled: u64,
    pub searches_started: u64,
    pub searches_found: u64,
    pub searches_no_path: u64,
    pub searches_timed_out: u64,
    pub results_delivered: u64,
    pub results_discarded: u64,
}

impl PathfinderStats {
    pub fn searches_finished(&self) -> u64 {
        self.searches_found + self.searches_no_path + self.searches_timed_out
    }
}

#[derive(Debug, Default)]
struct Counters {
    requests_submitted: AtomicU64,
    trivial_requests: AtomicU64,
    cache_hits: AtomicU64,
    requests_cancelled: AtomicU64,
    searches_started: AtomicU64,
    searches_found: AtomicU64,
    searches_no_path: AtomicU64,
    searches_timed_out: AtomicU64,
    results_delivered: AtomicU64,
    results_discarded: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Counter {
    RequestsSubmitted,
    TrivialRequests,
    CacheHits,
    RequestsCancelled,
    SearchesStarted,
    SearchesFound,
    SearchesNoPath,
    SearchesTimedOut,
    ResultsDelivered,
    ResultsDiscarded,
}

#[derive(Clone, Debug, Default)]
pub struct MetricsHandle {
    counters: Arc<Counters>,
}

impl MetricsHandle {
    pub fn snapshot(&self) -> PathfinderStats {
        let counters = &self.counters;
        let read = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        PathfinderStats {
            requests_submitted: read(&counters.requests_submitted),
            trivial_requests: read(&counters.trivial_requests),
            cache_hits: read(&counters.cache_hits),
            requests_cancelled: read(&counters.requests_cancelled),
            searches_started: read(&counters.searches_started),
            searches_found: read(&counters.searches_found),
            searches_no_path: read(&counters.searches_no_path),
            searches_timed_out: read(&counters.searches_timed_out),
            results_delivered: read(&counters.results_delivered),
            results_discarded: read(&counters.results_discarded),
        }
    }

    pub(crate) fn record(&self, counter: Counter) {
        self.slot(counter).fetch_add(1, Ordering::Relaxed);
    }

    fn slot(&self, counter: Counter) -> &AtomicU64 {
        let counters = &self.counters;
        match counter {
            Counter::RequestsSubmitted => &counters.requests_submitted,
            Counter::TrivialRequests => &counters.trivial_requests,
            Counter::CacheHits => &counters.cache_hits,
            Counter::RequestsCancelled => &counters.requests_cancelled,
            Counter::SearchesStarted => &counters.searches_started,
            Counter::SearchesFound => &counters.searches_found,
            Counter::SearchesNoPath => &counters.searches_no_path,
            Counter::SearchesTimedOut => &counters.searches_timed_out,
            Counter::ResultsDelivered => &counters.results_delivered,
            Counter::ResultsDiscarded => &counters.results_discarded,
        }
    }
}
