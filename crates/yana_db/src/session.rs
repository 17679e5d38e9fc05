//! Session identity and time.
//!
//! The dirty-write guard needs to know who is writing and when their edit
//! session began. Both are injected by the caller instead of being read from
//! request globals, and the current time comes from a [`Clock`] so tests can
//! control it.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// User identifier used when the caller is unknown.
pub const ANONYMOUS_USER: &str = "*";

/// Identity and edit-session start of the acting user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    /// User identifier (typically the remote address).
    pub user: String,
    /// Unix timestamp at which the user's edit session started, if known.
    pub started_at: Option<u64>,
}

impl SessionContext {
    /// Creates a session for `user` without a known start time.
    pub fn new(user: impl Into<String>) -> Self {
        let user = user.into();
        Self {
            user: if user.is_empty() {
                ANONYMOUS_USER.to_string()
            } else {
                user
            },
            started_at: None,
        }
    }

    /// Creates an anonymous session.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_USER)
    }

    /// Sets the session start timestamp.
    #[must_use]
    pub const fn started_at(mut self, timestamp: u64) -> Self {
        self.started_at = Some(timestamp);
        self
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::anonymous()
    }
}

/// Source of the current unix time in seconds.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Returns the current unix timestamp.
    fn now(&self) -> u64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Creates a clock frozen at `now`.
    #[must_use]
    pub fn new(now: u64) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    /// Sets the current time.
    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Moves the clock forward by `seconds`.
    pub fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
