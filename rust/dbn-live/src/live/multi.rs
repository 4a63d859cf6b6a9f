//! A coordinator fanning independent gateway sessions out across worker
//! threads.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::JoinHandle,
};

use tracing::{debug, warn};

use crate::{
    live::session::{ErrorSink, RecordSink, Session, DEFAULT_BUFFER_CAPACITY},
    Error, Result, SType, Schema,
};

/// A client coordinating any number of parallel, independently-owned gateway
/// sessions, each on its own worker thread, all dispatching into one shared
/// pair of sinks.
///
/// Sessions are independent: a session erroring out does not cancel the
/// others; its worker invokes the error sink and exits. Both sinks are
/// invoked from worker threads without additional synchronization, so with
/// more than one session active they must be reentrant-safe.
pub struct MultiSession {
    on_error: ErrorSink,
    on_record: RecordSink,
    capacity: usize,
    num_sessions: u64,
    num_subscribed: Arc<AtomicU64>,
    stop: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl MultiSession {
    /// Creates a new coordinator with no sessions, dispatching to the given
    /// sinks.
    pub fn new(on_error: ErrorSink, on_record: RecordSink) -> Self {
        Self::with_capacity(on_error, on_record, DEFAULT_BUFFER_CAPACITY)
    }

    /// Creates a new coordinator whose sessions use an explicit buffer
    /// capacity target instead of
    /// [`DEFAULT_BUFFER_CAPACITY`].
    pub fn with_capacity(on_error: ErrorSink, on_record: RecordSink, capacity: usize) -> Self {
        Self {
            on_error,
            on_record,
            capacity,
            num_sessions: 0,
            num_subscribed: Arc::new(AtomicU64::new(0)),
            stop: Arc::new(AtomicBool::new(false)),
            workers: Vec::new(),
        }
    }

    /// Establishes one more parallel session: connects and authenticates on
    /// the calling thread, so authentication failures surface here, then
    /// hands the session to a worker thread that subscribes to `symbols` and
    /// streams records into the shared sinks until [`close_all`](Self::close_all)
    /// or a session failure.
    ///
    /// Once the worker's subscription requests have all been sent, it counts
    /// toward [`is_fully_subscribed`](Self::is_fully_subscribed).
    ///
    /// # Errors
    /// This function returns an error if connecting or authenticating fails
    /// (the error sink fires first) or the worker thread cannot be spawned.
    /// The failed session still counts toward the session total, so the
    /// coordinator never reports fully subscribed after a failure.
    #[allow(clippy::too_many_arguments)]
    pub fn connect_and_start<S: AsRef<str>>(
        &mut self,
        api_key: &str,
        dataset: &str,
        ts_out: bool,
        schema: Schema,
        stype_in: SType,
        symbols: &[S],
        suffix: &str,
        replay: bool,
    ) -> Result<()> {
        let index = self.num_sessions;
        self.num_sessions += 1;

        let mut session = Session::with_capacity(
            self.on_error.clone(),
            self.on_record.clone(),
            self.capacity,
        );
        session.connect(api_key, dataset, ts_out)?;

        let symbols: Vec<String> = symbols.iter().map(|s| s.as_ref().to_owned()).collect();
        let suffix = suffix.to_owned();
        let stop = Arc::clone(&self.stop);
        let num_subscribed = Arc::clone(&self.num_subscribed);
        let worker = std::thread::Builder::new()
            .name(format!("dbn-live-{index}"))
            .spawn(move || {
                if session
                    .start(schema, stype_in, &symbols, &suffix, replay)
                    .is_err()
                {
                    warn!(index, "session worker exiting: subscription failed");
                    session.close();
                    return;
                }
                num_subscribed.fetch_add(1, Ordering::AcqRel);
                debug!(index, "session subscribed");
                while !stop.load(Ordering::Relaxed) {
                    if session.get().is_err() {
                        warn!(index, "session worker exiting: stream failed");
                        break;
                    }
                }
                session.close();
            })
            .map_err(|e| {
                let err = Error::io(e, "spawning session worker");
                (self.on_error)(true, &err.to_string());
                err
            })?;
        self.workers.push(worker);
        Ok(())
    }

    /// Returns the number of sessions established through
    /// [`connect_and_start`](Self::connect_and_start).
    pub fn num_sessions(&self) -> u64 {
        self.num_sessions
    }

    /// Returns `true` once every session has finished sending its
    /// subscription requests. Remains `true` until
    /// [`close_all`](Self::close_all).
    pub fn is_fully_subscribed(&self) -> bool {
        self.num_subscribed.load(Ordering::Acquire) == self.num_sessions
    }

    /// Requests every worker to stop, joins them, closes their sessions, and
    /// releases the bookkeeping, returning the coordinator to its initial
    /// state. Safe to call after a failed
    /// [`connect_and_start`](Self::connect_and_start).
    ///
    /// A running worker observes the stop flag when it next reaches its
    /// completion wait, so this blocks until each session's wait returns.
    pub fn close_all(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        for worker in self.workers.drain(..) {
            // A panicked worker has already torn its session down.
            let _ = worker.join();
        }
        self.num_sessions = 0;
        self.num_subscribed.store(0, Ordering::Release);
        self.stop.store(false, Ordering::Relaxed);
    }
}

impl Drop for MultiSession {
    fn drop(&mut self) {
        self.close_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn sinks() -> (ErrorSink, RecordSink, Arc<Mutex<Vec<String>>>) {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink_errors = Arc::clone(&errors);
        let on_error: ErrorSink = Arc::new(move |_, msg: &str| {
            sink_errors.lock().unwrap().push(msg.to_owned());
        });
        (on_error, Arc::new(|_| {}), errors)
    }

    #[test]
    fn test_no_sessions_is_fully_subscribed() {
        let (on_error, on_record, _) = sinks();
        let multi = MultiSession::new(on_error, on_record);
        assert!(multi.is_fully_subscribed());
        assert_eq!(multi.num_sessions(), 0);
    }

    #[test]
    fn test_failed_connect_holds_subscription_barrier_down() {
        let (on_error, on_record, errors) = sinks();
        let mut multi = MultiSession::with_capacity(on_error, on_record, 64 * 1024);
        // A key shorter than the bucket ID fails before any I/O.
        let res = multi.connect_and_start(
            "abc",
            "XNAS.ITCH",
            false,
            Schema::Trades,
            SType::RawSymbol,
            &["ES"],
            "",
            false,
        );
        assert!(res.is_err());
        assert_eq!(multi.num_sessions(), 1);
        assert!(!multi.is_fully_subscribed());
        assert!(!errors.lock().unwrap().is_empty());
        multi.close_all();
        assert_eq!(multi.num_sessions(), 0);
        assert!(multi.is_fully_subscribed());
    }
}
