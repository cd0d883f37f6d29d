//! Common error types for mousepoll.

use std::time::Duration;
use thiserror::Error;

/// Poller and capture-target errors.
///
/// Platform variants carry the OS error code reported at the failing call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("poller is already running")]
    AlreadyRunning,
    #[error("poller is not running")]
    NotRunning,
    #[error("raw mouse capture is not supported on this platform")]
    Unsupported,
    #[error("failed to register window class (os error {0})")]
    ClassRegistration(u32),
    #[error("failed to create message window (os error {0})")]
    TargetCreation(u32),
    #[error("failed to associate routing slot with message window (os error {0})")]
    RouteAssociation(u32),
    #[error("failed to register raw input device (os error {0})")]
    DeviceRegistration(u32),
    #[error("failed to remove raw input device (os error {0})")]
    DeviceUnregistration(u32),
    #[error("failed to destroy message window (os error {0})")]
    TargetDestruction(u32),
    #[error("failed to unregister window class (os error {0})")]
    ClassUnregistration(u32),
    #[error("failed to wake worker: {0}")]
    Wake(String),
    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),
    #[error("worker did not report readiness within {0:?}")]
    ReadyTimeout(Duration),
    #[error("worker exited before reporting readiness")]
    WorkerExited,
}

/// Result type for poller operations.
pub type PollResult<T> = Result<T, PollError>;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
