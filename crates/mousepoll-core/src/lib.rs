//! mousepoll-core: raw mouse snapshot decode + background poller lifecycle.
//!
//! Design goal: keep this crate platform-agnostic. The OS capture target
//! (hidden window, raw input registration, message queue) lives in
//! `mousepoll-platform` behind the [`EventSource`] seam.
//!
//! ## Module Structure
//!
//! - `error` - Poller and config error types
//! - `state` - `MouseState` snapshot and the raw report decode step
//! - `id` - Per-instance poller identity
//! - `config` - Poller configuration (YAML)
//! - `source` - Event source traits and the in-process channel source
//! - `poller` - `InputPoller` lifecycle and worker loop

mod config;
mod error;
mod id;
mod poller;
mod source;
mod state;

pub use config::PollerConfig;
pub use error::{ConfigError, ConfigResult, PollError, PollResult};
pub use id::PollerId;
pub use poller::{InputPoller, MouseCallback, WorkerState};
pub use source::{
    CaptureTarget, ChannelInjector, ChannelSession, ChannelSource, ChannelWaker, EventSession,
    EventSource, SourceEvent, Waker,
};
pub use state::{flags, MouseButton, MouseState, RawMouseReport, WHEEL_DELTA};
