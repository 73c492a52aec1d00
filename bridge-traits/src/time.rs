//! Time Abstractions
//!
//! Provides an injectable time source so TTL checks, revalidation thresholds,
//! and debounce timers can be tested deterministically.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Time source trait
///
/// Abstracts system time to enable deterministic testing.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::time::Clock;
///
/// fn entry_age_secs(clock: &dyn Clock, stored_at: i64) -> i64 {
///     clock.unix_timestamp() - stored_at
/// }
/// ```
pub trait Clock: Send + Sync {
    /// Get current UTC time
    fn now(&self) -> DateTime<Utc>;

    /// Get current Unix timestamp in seconds
    fn unix_timestamp(&self) -> i64 {
        self.now().timestamp()
    }

    /// Get current Unix timestamp in milliseconds
    fn unix_timestamp_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// System clock implementation using actual system time
#[derive(Debug, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for tests
///
/// Starts at a fixed instant and only moves when told to, which makes TTL
/// expiry and revalidation-age assertions exact.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::time::{Clock, ManualClock};
///
/// let clock = ManualClock::starting_at(1_700_000_000);
/// clock.advance_secs(86_400);
/// assert_eq!(clock.unix_timestamp(), 1_700_086_400);
/// ```
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Create a clock fixed at the given Unix timestamp in seconds
    pub fn starting_at(unix_secs: i64) -> Self {
        Self {
            millis: AtomicI64::new(unix_secs * 1000),
        }
    }

    /// Advance the clock by whole seconds
    pub fn advance_secs(&self, secs: i64) {
        self.millis.fetch_add(secs * 1000, Ordering::SeqCst);
    }

    /// Advance the clock by milliseconds
    pub fn advance_millis(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    /// Jump the clock to an absolute Unix timestamp in seconds
    pub fn set_secs(&self, unix_secs: i64) {
        self.millis.store(unix_secs * 1000, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.millis.load(Ordering::SeqCst);
        match Utc.timestamp_millis_opt(millis) {
            chrono::LocalResult::Single(dt) => dt,
            // Out-of-range millis only happen if a test stores i64 extremes
            _ => DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}
