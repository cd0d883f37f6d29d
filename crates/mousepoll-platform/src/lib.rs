//! mousepoll-platform: platform-specific raw mouse capture for mousepoll.
//!
//! This crate provides [`RawInputSource`], the `EventSource` that owns the
//! hidden OS capture target, plus constructors for pollers bound to it.

mod raw_input;

use mousepoll_core::{InputPoller, MouseState, PollerConfig};

pub use raw_input::{RawInputSession, RawInputSource, RawInputWaker};

/// Poller capturing from the platform's raw mouse input.
pub type RawInputPoller = InputPoller<RawInputSource>;

/// Create a poller bound to the platform raw input source.
pub fn create_poller<F>(callback: F) -> RawInputPoller
where
    F: Fn(&MouseState) + Send + Sync + 'static,
{
    create_poller_with_config(PollerConfig::default(), callback)
}

/// Create a poller bound to the platform raw input source with `config`.
pub fn create_poller_with_config<F>(config: PollerConfig, callback: F) -> RawInputPoller
where
    F: Fn(&MouseState) + Send + Sync + 'static,
{
    InputPoller::with_config(RawInputSource, config, callback)
}

/// Whether this build has a working raw mouse backend.
pub fn is_supported() -> bool {
    cfg!(windows)
}
