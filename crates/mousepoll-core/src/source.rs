//! Event source seam between the poller worker and the platform.
//!
//! A source is shared with every worker the poller spawns. Each worker opens
//! its own session on its own thread; the session owns the capture target and
//! releases it on drop, including while unwinding from a panicking callback.

use crate::error::{PollError, PollResult};
use crate::id::PollerId;
use crate::state::RawMouseReport;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Everything a source needs to create and register a capture target.
#[derive(Debug, Clone)]
pub struct CaptureTarget {
    pub id: PollerId,
    /// Process-unique name for the capture target.
    pub name: String,
    /// Deliver input while the target is not in the foreground.
    pub input_sink: bool,
    /// Exclude legacy mouse messages.
    pub no_legacy: bool,
}

/// One retrieved queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEvent {
    /// Raw input notification from a mouse-class device.
    Report(RawMouseReport),
    /// Anything else the queue delivered.
    Ignored,
    /// The queue signalled shutdown.
    Shutdown,
}

/// Wakes a session blocked in [`EventSession::next_event`] from another thread.
pub trait Waker: Send + 'static {
    fn wake(&self) -> PollResult<()>;
}

/// A capture target opened on the worker thread.
pub trait EventSession {
    type Waker: Waker;

    fn waker(&self) -> Self::Waker;

    /// Block until the next queued event.
    fn next_event(&mut self) -> SourceEvent;
}

/// Factory for capture sessions.
pub trait EventSource: Send + Sync + 'static {
    type Session: EventSession;

    /// Create and register a capture target. Called on the worker thread.
    fn open(&self, target: &CaptureTarget) -> PollResult<Self::Session>;
}

enum Injected {
    Report(RawMouseReport),
    Other,
    /// Shutdown marker for the session with this token.
    Shutdown(u64),
}

/// In-process source fed by a [`ChannelInjector`].
///
/// Reports queued before a session opens are delivered to that session. The
/// shutdown marker travels on the same queue, so a wake never overtakes
/// reports injected before it.
pub struct ChannelSource {
    tx: Sender<Injected>,
    rx: Receiver<Injected>,
    next_token: AtomicU64,
    open_error: Option<PollError>,
}

/// Sending half of a [`ChannelSource`].
#[derive(Clone)]
pub struct ChannelInjector {
    tx: Sender<Injected>,
}

impl ChannelSource {
    pub fn new() -> (Self, ChannelInjector) {
        let (tx, rx) = unbounded();
        (
            Self {
                tx: tx.clone(),
                rx,
                next_token: AtomicU64::new(0),
                open_error: None,
            },
            ChannelInjector { tx },
        )
    }

    /// Make every `open` fail with `error`.
    pub fn with_open_error(mut self, error: PollError) -> Self {
        self.open_error = Some(error);
        self
    }
}

impl ChannelInjector {
    /// Queue a raw mouse report. Returns false once the source is gone.
    pub fn inject(&self, report: RawMouseReport) -> bool {
        self.tx.send(Injected::Report(report)).is_ok()
    }

    /// Queue a non-mouse entry.
    pub fn inject_other(&self) -> bool {
        self.tx.send(Injected::Other).is_ok()
    }
}

impl EventSource for ChannelSource {
    type Session = ChannelSession;

    fn open(&self, target: &CaptureTarget) -> PollResult<ChannelSession> {
        if let Some(error) = &self.open_error {
            return Err(error.clone());
        }
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        debug!(target = %target.name, token, "Channel session opened");
        Ok(ChannelSession {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            token,
        })
    }
}

pub struct ChannelSession {
    tx: Sender<Injected>,
    rx: Receiver<Injected>,
    token: u64,
}

impl EventSession for ChannelSession {
    type Waker = ChannelWaker;

    fn waker(&self) -> ChannelWaker {
        ChannelWaker {
            tx: self.tx.clone(),
            token: self.token,
        }
    }

    fn next_event(&mut self) -> SourceEvent {
        match self.rx.recv() {
            Ok(Injected::Report(report)) => SourceEvent::Report(report),
            Ok(Injected::Other) => SourceEvent::Ignored,
            Ok(Injected::Shutdown(token)) if token == self.token => SourceEvent::Shutdown,
            // Left behind by an earlier session that died before reading it.
            Ok(Injected::Shutdown(_)) => SourceEvent::Ignored,
            Err(_) => SourceEvent::Shutdown,
        }
    }
}

pub struct ChannelWaker {
    tx: Sender<Injected>,
    token: u64,
}

impl Waker for ChannelWaker {
    fn wake(&self) -> PollResult<()> {
        self.tx
            .send(Injected::Shutdown(self.token))
            .map_err(|e| PollError::Wake(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture_target() -> CaptureTarget {
        let id = PollerId::new();
        CaptureTarget {
            id,
            name: id.target_name(),
            input_sink: true,
            no_legacy: true,
        }
    }

    #[test]
    fn test_channel_session_delivers_in_order() {
        let (source, injector) = ChannelSource::new();
        let mut session = source.open(&capture_target()).expect("open");

        injector.inject(RawMouseReport::motion(1, 0));
        injector.inject_other();
        injector.inject(RawMouseReport::motion(2, 0));

        assert_eq!(
            session.next_event(),
            SourceEvent::Report(RawMouseReport::motion(1, 0))
        );
        assert_eq!(session.next_event(), SourceEvent::Ignored);
        assert_eq!(
            session.next_event(),
            SourceEvent::Report(RawMouseReport::motion(2, 0))
        );
    }

    #[test]
    fn test_wake_unblocks_session() {
        let (source, _injector) = ChannelSource::new();
        let mut session = source.open(&capture_target()).expect("open");
        let waker = session.waker();

        let handle = std::thread::spawn(move || session.next_event());
        waker.wake().expect("wake");

        assert_eq!(handle.join().expect("join"), SourceEvent::Shutdown);
    }

    #[test]
    fn test_repeated_wake_is_not_an_error() {
        let (source, _injector) = ChannelSource::new();
        let mut session = source.open(&capture_target()).expect("open");
        let waker = session.waker();

        waker.wake().expect("wake");
        waker.wake().expect("second wake");
        assert_eq!(session.next_event(), SourceEvent::Shutdown);
    }

    #[test]
    fn test_shutdown_queued_behind_reports() {
        let (source, injector) = ChannelSource::new();
        let mut session = source.open(&capture_target()).expect("open");
        let waker = session.waker();

        injector.inject(RawMouseReport::motion(1, 0));
        injector.inject(RawMouseReport::motion(2, 0));
        waker.wake().expect("wake");

        assert_eq!(
            session.next_event(),
            SourceEvent::Report(RawMouseReport::motion(1, 0))
        );
        assert_eq!(
            session.next_event(),
            SourceEvent::Report(RawMouseReport::motion(2, 0))
        );
        assert_eq!(session.next_event(), SourceEvent::Shutdown);
    }

    #[test]
    fn test_stale_shutdown_ignored_by_next_session() {
        let (source, injector) = ChannelSource::new();
        let first = source.open(&capture_target()).expect("first open");
        first.waker().wake().expect("wake");
        drop(first);

        let mut second = source.open(&capture_target()).expect("second open");
        injector.inject(RawMouseReport::motion(4, 4));

        assert_eq!(second.next_event(), SourceEvent::Ignored);
        assert_eq!(
            second.next_event(),
            SourceEvent::Report(RawMouseReport::motion(4, 4))
        );
    }

    #[test]
    fn test_open_error() {
        let (source, _injector) = ChannelSource::new();
        let source = source.with_open_error(PollError::DeviceRegistration(5));
        assert_eq!(
            source.open(&capture_target()).err(),
            Some(PollError::DeviceRegistration(5))
        );
    }
}
