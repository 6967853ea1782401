// crates/rule-orchestrator-sync/src/limiter.rs
// ============================================================================
// Module: Fixed-Window Rate Limiter
// Description: Per-client request budget over a 60 second window.
// Purpose: Bound how often a client can run sync operations.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A window opens at registration and resets once 60 seconds have elapsed
//! since it opened. Bursts straddling a window boundary may admit up to twice
//! the limit; that is accepted.

use serde::Serialize;

/// Window length in milliseconds.
pub const RATE_LIMIT_WINDOW_MS: i64 = 60_000;

/// Fixed-window request counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedWindowLimiter {
    /// Requests admitted per window.
    limit: u32,
    /// Window start (unix milliseconds).
    window_start_ms: i64,
    /// Requests admitted in the current window.
    used: u32,
}

/// Snapshot of a limiter's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitUsage {
    /// Requests admitted in the current window.
    pub used: u32,
    /// Requests admitted per window.
    pub limit: u32,
    /// Requests still available in the current window.
    pub remaining: u32,
    /// When the current window resets (unix milliseconds).
    pub window_reset_ms: i64,
}

impl FixedWindowLimiter {
    /// Opens a window at `now_ms`.
    #[must_use]
    pub const fn new(limit: u32, now_ms: i64) -> Self {
        Self {
            limit,
            window_start_ms: now_ms,
            used: 0,
        }
    }

    /// Admits one request if the window has budget left.
    pub fn try_acquire(&mut self, now_ms: i64) -> bool {
        self.roll(now_ms);
        if self.used >= self.limit {
            return false;
        }
        self.used += 1;
        true
    }

    /// Changes the limit without resetting the window.
    pub const fn set_limit(&mut self, limit: u32) {
        self.limit = limit;
    }

    /// Returns the configured limit.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Reports usage as of `now_ms`.
    #[must_use]
    pub fn usage(&self, now_ms: i64) -> RateLimitUsage {
        let mut view = self.clone();
        view.roll(now_ms);
        RateLimitUsage {
            used: view.used,
            limit: view.limit,
            remaining: view.limit.saturating_sub(view.used),
            window_reset_ms: view.window_start_ms.saturating_add(RATE_LIMIT_WINDOW_MS),
        }
    }

    /// Starts a new window when the current one has elapsed.
    fn roll(&mut self, now_ms: i64) {
        if now_ms.saturating_sub(self.window_start_ms) >= RATE_LIMIT_WINDOW_MS {
            self.window_start_ms = now_ms;
            self.used = 0;
        }
    }
}
