//! Cross-navigation redirect throttle
//!
//! Chain resolution catches loops inside one `resolve` call. This throttle
//! catches loops that span separate navigation events: each key (a URL or a
//! tab id, chosen by the host) may be redirected at most `ceiling` times per
//! window. Timestamps are milliseconds supplied by the caller.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

/// Default throttle window.
pub const DEFAULT_WINDOW_MS: u64 = 3000;

/// Ceiling when keys are URLs.
pub const PER_URL_CEILING: u32 = 3;

/// Ceiling when keys are tabs.
pub const PER_TAB_CEILING: u32 = 5;

/// Throttle window and ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThrottleConfig {
    pub window_ms: u64,
    pub ceiling: u32,
}

impl ThrottleConfig {
    pub const fn per_url() -> Self {
        Self {
            window_ms: DEFAULT_WINDOW_MS,
            ceiling: PER_URL_CEILING,
        }
    }

    pub const fn per_tab() -> Self {
        Self {
            window_ms: DEFAULT_WINDOW_MS,
            ceiling: PER_TAB_CEILING,
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self::per_url()
    }
}

/// Redirect count for one key within the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectState {
    pub count: u32,
    pub window_start: u64,
}

impl RedirectState {
    fn lapsed(&self, now: u64, window_ms: u64) -> bool {
        now.saturating_sub(self.window_start) > window_ms
    }
}

/// Per-key redirect counters behind a mutex.
#[derive(Debug, Default)]
pub struct RedirectThrottle {
    config: ThrottleConfig,
    states: Mutex<HashMap<String, RedirectState>>,
}

impl RedirectThrottle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            states: Mutex::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn config(&self) -> ThrottleConfig {
        self.config
    }

    // A poisoned lock is recovered.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, RedirectState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True when `key` has reached the ceiling within the current window.
    /// A lapsed window is reset first.
    pub fn should_suppress(&self, key: &str, now: u64) -> bool {
        let mut states = self.lock();
        self.suppress_locked(&mut states, key, now)
    }

    /// Count one redirect for `key`, opening a new window when the last
    /// one has lapsed.
    pub fn record_redirect(&self, key: &str, now: u64) {
        let mut states = self.lock();
        self.record_locked(&mut states, key, now);
    }

    /// Check and record under one lock. Returns true when the redirect
    /// must be suppressed, in which case nothing is recorded.
    pub fn check_and_record(&self, key: &str, now: u64) -> bool {
        let mut states = self.lock();
        if self.suppress_locked(&mut states, key, now) {
            return true;
        }
        self.record_locked(&mut states, key, now);
        false
    }

    /// Forget `key`. Returns whether it was tracked.
    pub fn reset(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Drop every key whose window has lapsed. Returns the number removed.
    pub fn evict_expired(&self, now: u64) -> usize {
        let window_ms = self.config.window_ms;
        let mut states = self.lock();
        let before = states.len();
        states.retain(|_, state| !state.lapsed(now, window_ms));
        before - states.len()
    }

    pub fn state(&self, key: &str) -> Option<RedirectState> {
        self.lock().get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn suppress_locked(&self, states: &mut HashMap<String, RedirectState>, key: &str, now: u64) -> bool {
        let Some(state) = states.get_mut(key) else {
            return false;
        };
        if state.lapsed(now, self.config.window_ms) {
            state.count = 0;
            state.window_start = now;
            return false;
        }
        if state.count >= self.config.ceiling {
            log::warn!(
                "Circular redirect detection: {key} redirected {} times within {} ms",
                state.count,
                self.config.window_ms
            );
            return true;
        }
        false
    }

    fn record_locked(&self, states: &mut HashMap<String, RedirectState>, key: &str, now: u64) {
        let window_ms = self.config.window_ms;
        let state = states.entry(key.to_string()).or_insert(RedirectState {
            count: 0,
            window_start: now,
        });
        if state.lapsed(now, window_ms) {
            state.count = 0;
            state.window_start = now;
        }
        state.count = state.count.saturating_add(1);
    }
}
