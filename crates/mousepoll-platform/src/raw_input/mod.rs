//! Raw mouse capture target.
//!
//! Platform implementations:
//! - Windows: hidden message-only window + Raw Input API (`windows.rs`)
//! - Other platforms: `open` fails with `PollError::Unsupported`

#[cfg(windows)]
mod windows;

#[cfg(windows)]
pub use windows::{RawInputSession, RawInputSource, RawInputWaker};

#[cfg(not(windows))]
mod fallback {
    use mousepoll_core::{
        CaptureTarget, EventSession, EventSource, PollError, PollResult, SourceEvent, Waker,
    };
    use tracing::warn;

    /// Raw input source for platforms without a raw mouse API binding.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct RawInputSource;

    /// Never constructed; `open` always fails.
    pub enum RawInputSession {}

    /// Never constructed.
    pub enum RawInputWaker {}

    impl EventSource for RawInputSource {
        type Session = RawInputSession;

        fn open(&self, target: &CaptureTarget) -> PollResult<RawInputSession> {
            warn!(target = %target.name, "Raw mouse capture requested on unsupported platform");
            Err(PollError::Unsupported)
        }
    }

    impl EventSession for RawInputSession {
        type Waker = RawInputWaker;

        fn waker(&self) -> RawInputWaker {
            match *self {}
        }

        fn next_event(&mut self) -> SourceEvent {
            match *self {}
        }
    }

    impl Waker for RawInputWaker {
        fn wake(&self) -> PollResult<()> {
            match *self {}
        }
    }
}

#[cfg(not(windows))]
pub use fallback::{RawInputSession, RawInputSource, RawInputWaker};

#[cfg(all(test, not(windows)))]
mod tests {
    use super::*;
    use mousepoll_core::{InputPoller, MouseState, PollError, WorkerState};
    use std::time::Duration;

    #[test]
    fn test_unsupported_platform_reports_setup_failure() {
        let mut poller = InputPoller::new(RawInputSource, |_: &MouseState| {});
        assert!(poller.start());
        assert_eq!(
            poller.wait_ready(Duration::from_secs(5)),
            Err(PollError::Unsupported)
        );
        assert_eq!(poller.state(), WorkerState::Running);
        assert!(poller.stop());
    }
}
