use chrono::{DateTime, Duration, Utc};
use std::fmt::Debug;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// A source of the current time.
pub trait Clock: Debug + Send + Sync {
    /// The current time.
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to, with a resolution of one millisecond.
/// Clones share the same time, so a test can keep a clone to advance the clock of a session store.
#[derive(Debug, Clone)]
pub struct MockClock {
    milliseconds: Arc<AtomicI64>,
}

impl MockClock {
    /// Create a clock standing at `now`, truncated to whole milliseconds.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            milliseconds: Arc::new(AtomicI64::new(now.timestamp_millis())),
        }
    }

    /// Set the clock to `now`, truncated to whole milliseconds.
    pub fn set(&self, now: DateTime<Utc>) {
        self.milliseconds
            .store(now.timestamp_millis(), Ordering::SeqCst);
    }

    /// Move the clock by `duration`, which may be negative.
    pub fn advance(&self, duration: Duration) {
        self.milliseconds
            .fetch_add(duration.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        let milliseconds = self.milliseconds.load(Ordering::SeqCst);
        let nanoseconds = milliseconds.rem_euclid(1000) as u32 * 1_000_000;
        DateTime::from_timestamp(milliseconds.div_euclid(1000), nanoseconds)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}
