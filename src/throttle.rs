// Giveaway Bot - Clock and rate limiting
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::eligibility::RejectReason;
use crate::state::UserId;

/// Source of wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // The guarded maps stay consistent even if a holder panicked.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Suppresses repeated rejection notices per (candidate, reason).
///
/// Process-local: a restart forgets every timestamp, which at worst lets one
/// duplicate notice through.
#[derive(Debug)]
pub struct CooldownGate {
    window: Duration,
    last_notified: Mutex<HashMap<(UserId, RejectReason), DateTime<Utc>>>,
}

impl CooldownGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_notified: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true and records `now` when the candidate may be told about
    /// `reason` again. A suppressed call leaves the stored timestamp alone.
    pub fn should_notify(&self, candidate: UserId, reason: RejectReason, now: DateTime<Utc>) -> bool {
        let mut last_notified = lock(&self.last_notified);
        if let Some(last) = last_notified.get(&(candidate, reason)) {
            if now.signed_duration_since(*last) < self.window {
                return false;
            }
        }
        last_notified.insert((candidate, reason), now);
        true
    }
}

/// Drops a second firing that lands within `window` of the previous one
#[derive(Debug)]
pub struct FireGuard {
    window: Duration,
    last_fired: Mutex<Option<DateTime<Utc>>>,
}

impl FireGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_fired: Mutex::new(None),
        }
    }

    pub fn try_fire(&self, now: DateTime<Utc>) -> bool {
        let mut last_fired = lock(&self.last_fired);
        if let Some(last) = *last_fired {
            if now.signed_duration_since(last) < self.window {
                return false;
            }
        }
        *last_fired = Some(now);
        true
    }
}
