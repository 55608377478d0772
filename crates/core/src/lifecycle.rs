// SPDX-License-Identifier: MIT

//! Lifecycle action bookkeeping and the postponer's deadline math (§3, §4.4).
//!
//! The actual heartbeat loop (waiting on timers, the cancellation token, and
//! the platform's heartbeat call) lives with the service that drives I/O;
//! this module owns the pure scheduling logic so it can be tested without
//! sleeping.

use crate::clock::Clock;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A single in-flight termination lifecycle action (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleAction {
    pub group: String,
    pub hook: String,
    pub token: String,
    pub instance_id: String,
    pub transition: String,
    /// When this action began (§3, §4.4 step 2: "next deadline =
    /// action.startTime + heartbeatTimeout"), on the same monotonic clock
    /// the postponer anchors its schedule on. Set when the action is
    /// decoded off the event, not when postponing begins.
    pub start_time: Instant,
}

/// Per-`(group, hook)` timeout parameters (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleHookDescription {
    pub heartbeat_timeout: Duration,
    pub global_timeout: Duration,
}

/// Small TTL cache for hook descriptions, keyed by `(group, hook)` (§3: "≤10
/// entries, TTL long enough that hook parameters do not change in
/// practice").
pub struct HookCache<C: Clock> {
    clock: C,
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<(String, String), (LifecycleHookDescription, Instant)>>,
}

impl<C: Clock> HookCache<C> {
    pub fn new(clock: C, ttl: Duration, capacity: usize) -> Self {
        Self { clock, ttl, capacity, entries: Mutex::new(HashMap::new()) }
    }

    /// Return the cached description if present and not expired.
    pub fn get(&self, group: &str, hook: &str) -> Option<LifecycleHookDescription> {
        let mut entries = self.entries.lock();
        let key = (group.to_string(), hook.to_string());
        match entries.get(&key) {
            Some((desc, inserted)) if self.clock.now().saturating_duration_since(*inserted) < self.ttl => Some(*desc),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, group: &str, hook: &str, desc: LifecycleHookDescription) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity && !entries.contains_key(&(group.to_string(), hook.to_string())) {
            // Evict an arbitrary entry; the cache is tiny and entries are
            // cheap to refetch.
            if let Some(victim) = entries.keys().next().cloned() {
                entries.remove(&victim);
            }
        }
        entries.insert((group.to_string(), hook.to_string()), (desc, self.clock.now()));
    }
}

/// The postponer's deadline state (§4.4), advanced by whoever owns the
/// actual timer loop.
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    heartbeat_timeout: Duration,
    deadline: Instant,
    global_deadline: Instant,
}

impl Schedule {
    /// Start a new schedule: `deadline = start + heartbeatTimeout`,
    /// `globalDeadline = start + globalTimeout`.
    pub fn start(start: Instant, desc: LifecycleHookDescription) -> Self {
        Self {
            heartbeat_timeout: desc.heartbeat_timeout,
            deadline: start + desc.heartbeat_timeout,
            global_deadline: start + desc.global_timeout,
        }
    }

    /// Delay until the next heartbeat fire, relative to `now`: half the
    /// remaining interval to the current per-action deadline (§4.4 step 2,
    /// 3). Never negative.
    pub fn heartbeat_delay(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now) / 2
    }

    /// Advance the per-action deadline by one more `heartbeatTimeout` from
    /// `now` after a successful heartbeat (§4.4 step 3). Anchoring on the
    /// heartbeat's fire time, not the prior deadline, is what keeps the
    /// heartbeat cadence converging on a steady `heartbeatTimeout / 2`
    /// interval (§8 property 8) instead of drifting wider each round.
    pub fn advance(&mut self, now: Instant) {
        self.deadline = now + self.heartbeat_timeout;
    }

    pub fn is_globally_timed_out(&self, now: Instant) -> bool {
        now >= self.global_deadline
    }
}
