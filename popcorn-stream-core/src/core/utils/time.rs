use chrono::{DateTime, Utc};
#[cfg(any(test, feature = "testing"))]
use std::sync::Mutex;
use std::fmt::Debug;

/// The source of the current time.
/// Components depending on wall-clock time receive a clock so time can be controlled within tests.
pub trait Clock: Debug + Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// The clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock which only moves when it's told to.
#[cfg(any(test, feature = "testing"))]
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

#[cfg(any(test, feature = "testing"))]
impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Set the current time of the clock.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().expect("clock lock poisoned") = now;
    }

    /// Move the clock forward by the given duration.
    pub fn advance(&self, duration: std::time::Duration) {
        let mut now = self.now.lock().expect("clock lock poisoned");
        *now = *now + chrono::Duration::from_std(duration).expect("duration out of range");
    }
}

#[cfg(any(test, feature = "testing"))]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock poisoned")
    }
}
