use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Source of the current wall-clock time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    fn now_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Start at the given Unix epoch millisecond.
    pub fn at_ms(ms: i64) -> Self {
        let start = Utc
            .timestamp_millis_opt(ms)
            .single()
            .unwrap_or_default();
        Self::new(start)
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set_ms(&self, ms: i64) {
        if let Some(at) = Utc.timestamp_millis_opt(ms).single() {
            *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_starts_at_epoch_ms() {
        let clock = ManualClock::at_ms(0);
        assert_eq!(clock.now_ms(), 0);
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::at_ms(1_000);
        let other = clock.clone();
        clock.advance(Duration::milliseconds(500));
        assert_eq!(other.now_ms(), 1_500);

        other.set_ms(86_400_001);
        assert_eq!(clock.now_ms(), 86_400_001);
    }

    #[test]
    fn test_system_clock_is_close_to_now() {
        let diff = (SystemClock.now() - Utc::now()).num_seconds().abs();
        assert!(diff <= 1);
    }
}
