//! Acquisition timeout policy.

use std::time::Duration;

/// How long to wait for a transaction slot or pooled connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Fail immediately if the resource is unavailable.
    Immediate,
    /// Wait up to the given duration, then fail.
    Bounded(Duration),
    /// Wait indefinitely.
    Infinite,
}

impl Timeout {
    /// Millisecond convention of the route layer: `0` fails immediately,
    /// a positive value bounds the wait, a negative value waits forever.
    pub fn from_millis(ms: i64) -> Timeout {
        match ms {
            0 => Timeout::Immediate,
            ms if ms < 0 => Timeout::Infinite,
            ms => Timeout::Bounded(Duration::from_millis(ms as u64)),
        }
    }
}

impl std::fmt::Display for Timeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Timeout::Immediate => write!(f, "immediate"),
            Timeout::Bounded(d) => write!(f, "{}ms", d.as_millis()),
            Timeout::Infinite => write!(f, "infinite"),
        }
    }
}
