//! Per-instance poller identity.

use std::fmt;
use uuid::Uuid;

/// Opaque identity of one [`InputPoller`](crate::InputPoller).
///
/// Names the platform capture target, so two pollers in one process never
/// collide on window-class registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PollerId(Uuid);

impl PollerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Name for the capture target owned by this poller.
    pub fn target_name(&self) -> String {
        format!("MousePoll_{}", self.0.simple())
    }
}

impl Default for PollerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PollerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = PollerId::new();
        let b = PollerId::new();
        assert_ne!(a, b);
        assert_ne!(a.target_name(), b.target_name());
    }

    #[test]
    fn test_target_name_shape() {
        let name = PollerId::new().target_name();
        assert!(name.starts_with("MousePoll_"));
        // 32 hex digits after the prefix; well under the 256 char class-name limit.
        assert_eq!(name.len(), "MousePoll_".len() + 32);
    }
}
