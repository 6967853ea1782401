// crates/rule-orchestrator-core/src/core/time.rs
// ============================================================================
// Module: Rule Orchestrator Time Model
// Description: Injectable clocks for TTLs, rate-limit windows, and history.
// Purpose: Keep time-dependent behavior deterministic under test.
// Dependencies: time
// ============================================================================

//! ## Overview
//! Components never read wall-clock time directly; they hold a [`Clock`] and
//! ask it for unix milliseconds. Hosts use [`SystemClock`]; tests use
//! [`ManualClock`] and advance it explicitly to cross TTL and window
//! boundaries.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::SystemTime;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Clock Interface
// ============================================================================

/// Source of unix-millisecond timestamps.
pub trait Clock: Send + Sync {
    /// Returns the current time as unix epoch milliseconds.
    fn now_millis(&self) -> i64;
}

/// Shared clock handle.
pub type SharedClock = Arc<dyn Clock>;

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
        i64::try_from(nanos / 1_000_000).unwrap_or(i64::MAX)
    }
}

/// Manually advanced clock for deterministic tests.
///
/// # Invariants
/// - Clones share the same underlying instant.
#[derive(Clone, Default)]
pub struct ManualClock {
    /// Current instant in unix milliseconds.
    now: Arc<AtomicI64>,
}

impl ManualClock {
    /// Creates a manual clock starting at the given unix milliseconds.
    #[must_use]
    pub fn starting_at(millis: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(millis)),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let delta = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.now.fetch_add(delta, Ordering::SeqCst);
    }

    /// Sets the clock to an absolute instant.
    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock").field("now", &self.now_millis()).finish()
    }
}

// ============================================================================
// SECTION: Conversions
// ============================================================================

/// Converts a filesystem timestamp to unix milliseconds (0 when unavailable).
#[must_use]
pub fn system_time_millis(time: SystemTime) -> i64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .ok()
        .and_then(|elapsed| i64::try_from(elapsed.as_millis()).ok())
        .unwrap_or_default()
}

/// Converts a duration to whole milliseconds, saturating.
#[must_use]
pub fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// Formats unix milliseconds as an RFC 3339 string.
#[must_use]
pub fn format_millis(millis: i64) -> Option<String> {
    let nanos = i128::from(millis) * 1_000_000;
    OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()?.format(&Rfc3339).ok()
}
