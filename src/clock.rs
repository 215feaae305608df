// Time source for task creation

use chrono::{DateTime, Utc};

/// Provides the current time to the store
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_recent() {
        // After 2020
        assert!(SystemClock.now().timestamp_millis() > 1_600_000_000_000);
    }
}
