//! Input poller: lifecycle of the raw mouse capture worker.
//!
//! The owning thread calls `start`/`stop`; a dedicated worker thread opens the
//! capture session, blocks on its queue and runs the callback for each decoded
//! report. `stop` posts an explicit wake so it never waits on fresh input. The
//! wake is queued behind pending reports, and the worker drains up to it.

use crate::config::PollerConfig;
use crate::error::{PollError, PollResult};
use crate::id::PollerId;
use crate::source::{CaptureTarget, EventSession, EventSource, SourceEvent, Waker};
use crate::state::MouseState;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, info_span, warn};

/// Callback run on the worker thread after every decoded report.
pub type MouseCallback = Arc<dyn Fn(&MouseState) + Send + Sync>;

type WakerOf<S> = <<S as EventSource>::Session as EventSession>::Waker;

// Lifecycle word shared with the worker.
const STOPPED: u8 = 0;
const RUNNING: u8 = 1;
/// Stop requested; the worker keeps delivering until its shutdown marker.
const DRAINING: u8 = 2;

/// Lifecycle state of a poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Stopped,
    Running,
}

struct Worker<W> {
    thread: JoinHandle<MouseState>,
    ready_rx: Receiver<PollResult<W>>,
    waker: Option<W>,
    /// Setup outcome, once the worker has reported it.
    ready: Option<PollResult<()>>,
}

impl<W: Waker> Worker<W> {
    fn record_ready(&mut self, report: PollResult<W>) -> PollResult<()> {
        let outcome = report.map(|waker| {
            self.waker = Some(waker);
        });
        self.ready = Some(outcome.clone());
        outcome
    }

    fn wait_ready(&mut self, timeout: Duration) -> PollResult<()> {
        if let Some(ready) = &self.ready {
            return ready.clone();
        }
        match self.ready_rx.recv_timeout(timeout) {
            Ok(report) => self.record_ready(report),
            Err(RecvTimeoutError::Timeout) => Err(PollError::ReadyTimeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                self.ready = Some(Err(PollError::WorkerExited));
                Err(PollError::WorkerExited)
            }
        }
    }

    /// Unblock the worker's queue wait. Blocks until setup has been reported.
    ///
    /// Returns false if no wake was queued.
    fn wake(&mut self) -> bool {
        if self.ready.is_none() {
            match self.ready_rx.recv() {
                Ok(report) => {
                    let _ = self.record_ready(report);
                }
                Err(_) => self.ready = Some(Err(PollError::WorkerExited)),
            }
        }

        // No waker means setup failed and the worker is already on its way out.
        let Some(waker) = &self.waker else {
            return false;
        };
        match waker.wake() {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Failed to wake worker; stop waits for the next input event");
                false
            }
        }
    }
}

/// Background raw mouse poller.
///
/// ```no_run
/// use mousepoll_core::{ChannelSource, InputPoller};
///
/// let (source, _injector) = ChannelSource::new();
/// let mut poller = InputPoller::new(source, |state| println!("{state:?}"));
/// assert!(poller.start());
/// assert!(poller.stop());
/// ```
pub struct InputPoller<S: EventSource> {
    id: PollerId,
    config: PollerConfig,
    source: Arc<S>,
    callback: MouseCallback,
    lifecycle: Arc<AtomicU8>,
    snapshot: MouseState,
    worker: Option<Worker<WakerOf<S>>>,
}

impl<S: EventSource> InputPoller<S> {
    pub fn new<F>(source: S, callback: F) -> Self
    where
        F: Fn(&MouseState) + Send + Sync + 'static,
    {
        Self::with_config(source, PollerConfig::default(), callback)
    }

    pub fn with_config<F>(source: S, config: PollerConfig, callback: F) -> Self
    where
        F: Fn(&MouseState) + Send + Sync + 'static,
    {
        Self {
            id: PollerId::new(),
            config,
            source: Arc::new(source),
            callback: Arc::new(callback),
            lifecycle: Arc::new(AtomicU8::new(STOPPED)),
            snapshot: MouseState::default(),
            worker: None,
        }
    }

    pub fn id(&self) -> PollerId {
        self.id
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    pub fn state(&self) -> WorkerState {
        if self.lifecycle.load(Ordering::SeqCst) == RUNNING {
            WorkerState::Running
        } else {
            WorkerState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == WorkerState::Running
    }

    /// Snapshot as of the end of the last completed run.
    ///
    /// While running, the live snapshot is only visible to the callback.
    pub fn snapshot(&self) -> MouseState {
        self.snapshot
    }

    /// Spawn the capture worker.
    ///
    /// Returns false if already running. Setup happens asynchronously on the
    /// worker; use [`wait_ready`](Self::wait_ready) to observe its outcome.
    pub fn start(&mut self) -> bool {
        match self.spawn_worker() {
            Ok(()) => true,
            Err(PollError::AlreadyRunning) => {
                warn!(poller = %self.id, "Start requested while already running");
                false
            }
            Err(e) => {
                error!(poller = %self.id, error = %e, "Poller not started");
                false
            }
        }
    }

    fn spawn_worker(&mut self) -> PollResult<()> {
        if self
            .lifecycle
            .compare_exchange(STOPPED, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PollError::AlreadyRunning);
        }

        let (ready_tx, ready_rx) = bounded(1);
        let target = CaptureTarget {
            id: self.id,
            name: self.id.target_name(),
            input_sink: self.config.input_sink,
            no_legacy: self.config.no_legacy,
        };
        let source = Arc::clone(&self.source);
        let callback = Arc::clone(&self.callback);
        let lifecycle = Arc::clone(&self.lifecycle);
        let initial = self.snapshot;

        let spawned = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || run_worker(&*source, target, lifecycle, callback, initial, ready_tx));

        match spawned {
            Ok(thread) => {
                self.worker = Some(Worker {
                    thread,
                    ready_rx,
                    waker: None,
                    ready: None,
                });
                info!(poller = %self.id, "Poller started");
                Ok(())
            }
            Err(e) => {
                self.lifecycle.store(STOPPED, Ordering::SeqCst);
                Err(PollError::Spawn(e.to_string()))
            }
        }
    }

    /// Wait until the worker reports the outcome of its setup.
    pub fn wait_ready(&mut self, timeout: Duration) -> PollResult<()> {
        if !self.is_running() {
            return Err(PollError::NotRunning);
        }
        match self.worker.as_mut() {
            Some(worker) => worker.wait_ready(timeout),
            None => Err(PollError::WorkerExited),
        }
    }

    /// `start` followed by `wait_ready` with the configured timeout.
    pub fn start_confirmed(&mut self) -> PollResult<()> {
        self.spawn_worker()?;
        self.wait_ready(self.config.ready_timeout())
    }

    /// Stop the worker and join it.
    ///
    /// Reports queued before the call are still delivered to the callback.
    /// Returns false if not running, or if the worker could not be joined
    /// (it panicked). The state is Stopped afterwards in both cases.
    pub fn stop(&mut self) -> bool {
        if self
            .lifecycle
            .compare_exchange(RUNNING, DRAINING, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        let Some(mut worker) = self.worker.take() else {
            error!(poller = %self.id, "Running without a worker handle");
            self.lifecycle.store(STOPPED, Ordering::SeqCst);
            return false;
        };

        if !worker.wake() {
            // Without a marker to drain to, exit after the next event.
            self.lifecycle.store(STOPPED, Ordering::SeqCst);
        }

        let joined = worker.thread.join();
        self.lifecycle.store(STOPPED, Ordering::SeqCst);

        match joined {
            Ok(snapshot) => {
                self.snapshot = snapshot;
                info!(poller = %self.id, "Poller stopped");
                true
            }
            Err(_) => {
                error!(poller = %self.id, "Failed to join worker thread");
                false
            }
        }
    }
}

impl<S: EventSource> Drop for InputPoller<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker<S: EventSource>(
    source: &S,
    target: CaptureTarget,
    lifecycle: Arc<AtomicU8>,
    callback: MouseCallback,
    mut state: MouseState,
    ready_tx: Sender<PollResult<WakerOf<S>>>,
) -> MouseState {
    let span = info_span!("mouse_poll", poller = %target.id);
    let _enter = span.enter();

    let mut session = match source.open(&target) {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "Capture setup failed");
            let _ = ready_tx.send(Err(e));
            return state;
        }
    };
    let _ = ready_tx.send(Ok(session.waker()));
    info!(target = %target.name, "Capture loop started");

    let mut delivered: u64 = 0;
    loop {
        match session.next_event() {
            SourceEvent::Report(report) => {
                state.apply(&report);
                callback(&state);
                delivered += 1;
            }
            SourceEvent::Ignored => {}
            SourceEvent::Shutdown => {
                debug!("Queue shutdown received");
                break;
            }
        }
        if lifecycle.load(Ordering::SeqCst) == STOPPED {
            break;
        }
    }

    drop(session);
    info!(delivered, "Capture loop exited");
    state
}
