use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::geom::CellCoord;
use crate::path::Path;

/// Identifies the object a path is computed for. Each requester has at most
/// one request in flight; a newer request supersedes the older one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequesterId(pub u64);

impl From<u64> for RequesterId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "requester#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct RequestId(pub(crate) u64);

/// A request shared between the foreground service, one worker and that
/// worker's watchdog.
#[derive(Debug)]
pub(crate) struct QueuedPath {
    id: RequestId,
    requester: RequesterId,
    start: CellCoord,
    end: CellCoord,
    cancelled: AtomicBool,
    settled: AtomicBool,
}

impl QueuedPath {
    pub(crate) fn new(
        id: RequestId,
        requester: RequesterId,
        start: CellCoord,
        end: CellCoord,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            requester,
            start,
            end,
            cancelled: AtomicBool::new(false),
            settled: AtomicBool::new(false),
        })
    }

    pub(crate) fn id(&self) -> RequestId {
        self.id
    }

    pub(crate) fn requester(&self) -> RequesterId {
        self.requester
    }

    pub(crate) fn start(&self) -> CellCoord {
        self.start
    }

    pub(crate) fn end(&self) -> CellCoord {
        self.end
    }

    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Claims the right to post this request's completion. Only the first
    /// caller gets `true`.
    pub(crate) fn try_settle(&self) -> bool {
        !self.settled.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub(crate) enum SearchOutcome {
    Found(Path),
    NoPath,
    TimedOut,
    /// The search stopped early without a result of its own.
    Abandoned,
}

impl SearchOutcome {
    pub(crate) fn into_path(self) -> Option<Path> {
        match self {
            Self::Found(path) => Some(path),
            Self::NoPath | Self::TimedOut | Self::Abandoned => None,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Completion {
    pub(crate) request: Arc<QueuedPath>,
    pub(crate) outcome: SearchOutcome,
}
