//! Deferred request queue: holds operations issued before the gateway is ready.
//!
//! Every public bridge operation goes through [`RequestQueue::admit`]. Once
//! the queue is ready the operation is handed straight back to the caller;
//! before that it is parked in a per-kind lane together with a completion
//! channel. [`RequestQueue::mark_ready`] flips the flag exactly once and
//! hands the parked lanes out for draining.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::oneshot;

use iobridge_domain::error::BridgeError;

/// Kind of a deferred operation. Lanes drain in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RequestKind {
    ReadState,
    WriteState,
    ReadObject,
    WriteObject,
    ReadFile,
    WriteFile,
    ReadLog,
    WriteLog,
    ReadEnums,
    ListInstances,
    Classify,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ReadState => "read_state",
            Self::WriteState => "write_state",
            Self::ReadObject => "read_object",
            Self::WriteObject => "write_object",
            Self::ReadFile => "read_file",
            Self::WriteFile => "write_file",
            Self::ReadLog => "read_log",
            Self::WriteLog => "write_log",
            Self::ReadEnums => "read_enums",
            Self::ListInstances => "list_instances",
            Self::Classify => "classify",
        })
    }
}

type JobFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A parked operation. Running it settles the caller's pending result.
pub struct Job<C> {
    run: Box<dyn FnOnce(C) -> JobFuture + Send>,
}

impl<C> Job<C> {
    /// Execute the operation against `ctx` and settle its completion.
    pub async fn run(self, ctx: C) {
        (self.run)(ctx).await;
    }
}

/// Outcome of [`RequestQueue::admit`].
pub enum Admission<F, T> {
    /// The queue is ready: run the operation now.
    Run(F),
    /// The operation was parked; the receiver settles once it is drained.
    Deferred(oneshot::Receiver<Result<T, BridgeError>>),
}

/// Lanes handed out by [`RequestQueue::mark_ready`], one per kind, FIFO.
pub type Lanes<C> = Vec<(RequestKind, VecDeque<Job<C>>)>;

struct QueueState<C> {
    ready: bool,
    lanes: BTreeMap<RequestKind, VecDeque<Job<C>>>,
}

/// Buffers operations until the readiness transition.
///
/// `C` is the context a parked operation runs against (the gateway handle).
pub struct RequestQueue<C> {
    state: Mutex<QueueState<C>>,
}

impl<C> Default for RequestQueue<C> {
    fn default() -> Self {
        Self {
            state: Mutex::new(QueueState {
                ready: false,
                lanes: BTreeMap::new(),
            }),
        }
    }
}

impl<C: Send + 'static> RequestQueue<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<C>> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.lock().ready
    }

    /// Number of operations parked in a lane.
    #[must_use]
    pub fn pending(&self, kind: RequestKind) -> usize {
        self.lock().lanes.get(&kind).map_or(0, VecDeque::len)
    }

    /// Either hand the operation back for immediate execution or park it.
    pub fn admit<T, F, Fut>(&self, kind: RequestKind, op: F) -> Admission<F, T>
    where
        T: Send + 'static,
        F: FnOnce(C) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, BridgeError>> + Send + 'static,
    {
        let mut state = self.lock();
        if state.ready {
            return Admission::Run(op);
        }
        let (tx, rx) = oneshot::channel();
        let job = Job {
            run: Box::new(move |ctx: C| -> JobFuture {
                Box::pin(async move {
                    // the caller may have given up on the result
                    let _ = tx.send(op(ctx).await);
                })
            }),
        };
        state.lanes.entry(kind).or_default().push_back(job);
        tracing::debug!(%kind, "request deferred until ready");
        Admission::Deferred(rx)
    }

    /// Flip the readiness flag and take every parked lane.
    ///
    /// Returns `None` when the queue was already ready, so lanes are drained
    /// at most once.
    pub fn mark_ready(&self) -> Option<Lanes<C>> {
        let mut state = self.lock();
        if state.ready {
            return None;
        }
        state.ready = true;
        Some(std::mem::take(&mut state.lanes).into_iter().collect())
    }
}

impl<C: Clone + Send + 'static> RequestQueue<C> {
    /// Run every lane sequentially, each strictly in submission order.
    ///
    /// A failing operation only settles its own completion.
    pub async fn drain(lanes: Lanes<C>, ctx: C) {
        for (kind, jobs) in lanes {
            tracing::debug!(%kind, count = jobs.len(), "draining deferred requests");
            for job in jobs {
                job.run(ctx.clone()).await;
            }
        }
    }
}

/// Await a parked operation.
///
/// # Errors
///
/// Returns the operation's own error, or [`BridgeError::Cancelled`] when the
/// queue was dropped before the operation ran.
pub async fn settle<T>(rx: oneshot::Receiver<Result<T, BridgeError>>) -> Result<T, BridgeError> {
    rx.await.map_err(|_| BridgeError::Cancelled)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use iobridge_domain::error::GatewayError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Log = Arc<Mutex<Vec<String>>>;

    fn record(log: &Log, entry: &str) {
        log.lock().unwrap().push(entry.to_string());
    }

    fn deferred<F, T>(admission: Admission<F, T>) -> oneshot::Receiver<Result<T, BridgeError>> {
        match admission {
            Admission::Deferred(rx) => rx,
            Admission::Run(_) => panic!("expected the request to be deferred"),
        }
    }

    #[tokio::test]
    async fn should_run_immediately_when_ready() {
        let queue: RequestQueue<Log> = RequestQueue::new();
        assert!(queue.mark_ready().unwrap().is_empty());

        let admission = queue.admit(RequestKind::ReadState, |_log: Log| async { Ok(42) });

        match admission {
            Admission::Run(op) => assert_eq!(op(Log::default()).await.unwrap(), 42),
            Admission::Deferred(_) => panic!("expected immediate execution"),
        }
    }

    #[tokio::test]
    async fn should_drain_each_lane_in_submission_order() {
        let queue: RequestQueue<Log> = RequestQueue::new();
        let log = Log::default();

        let mut receivers = Vec::new();
        for name in ["a", "b", "c"] {
            let admission = queue.admit(RequestKind::WriteState, move |log: Log| async move {
                record(&log, name);
                Ok(name)
            });
            receivers.push(deferred(admission));
        }
        assert_eq!(queue.pending(RequestKind::WriteState), 3);

        let lanes = queue.mark_ready().unwrap();
        RequestQueue::drain(lanes, Arc::clone(&log)).await;

        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
        for (rx, expected) in receivers.into_iter().zip(["a", "b", "c"]) {
            assert_eq!(settle(rx).await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn should_drain_only_once() {
        let queue: RequestQueue<Log> = RequestQueue::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let rx = deferred(queue.admit(RequestKind::Classify, move |_log: Log| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        let lanes = queue.mark_ready().unwrap();
        RequestQueue::drain(lanes, Log::default()).await;
        assert!(queue.mark_ready().is_none());

        settle(rx).await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(queue.pending(RequestKind::Classify), 0);
    }

    #[tokio::test]
    async fn should_isolate_failing_request() {
        let queue: RequestQueue<Log> = RequestQueue::new();
        let log = Log::default();

        let failing = deferred(queue.admit(RequestKind::ReadObject, |_log: Log| async {
            Err::<(), _>(GatewayError::new("read object", "zone.9", "no such object").into())
        }));
        let passing = deferred(queue.admit(RequestKind::ReadObject, |log: Log| async move {
            record(&log, "after failure");
            Ok(())
        }));

        RequestQueue::drain(queue.mark_ready().unwrap(), Arc::clone(&log)).await;

        let err = settle(failing).await.unwrap_err();
        assert!(err.to_string().contains("zone.9"));
        assert!(settle(passing).await.is_ok());
        assert_eq!(*log.lock().unwrap(), vec!["after failure"]);
    }

    #[tokio::test]
    async fn should_drain_lanes_in_kind_order() {
        let queue: RequestQueue<Log> = RequestQueue::new();
        let log = Log::default();

        let late = deferred(queue.admit(RequestKind::Classify, |log: Log| async move {
            record(&log, "classify");
            Ok(())
        }));
        let early = deferred(queue.admit(RequestKind::ReadState, |log: Log| async move {
            record(&log, "read_state");
            Ok(())
        }));

        RequestQueue::drain(queue.mark_ready().unwrap(), Arc::clone(&log)).await;

        settle(late).await.unwrap();
        settle(early).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["read_state", "classify"]);
    }

    #[tokio::test]
    async fn should_report_cancelled_when_queue_is_dropped() {
        let queue: RequestQueue<Log> = RequestQueue::new();
        let rx = deferred(queue.admit(RequestKind::ReadFile, |_log: Log| async { Ok(()) }));
        drop(queue);

        assert!(matches!(settle(rx).await, Err(BridgeError::Cancelled)));
    }
}
