//! Millisecond clocks for call timing

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Source of millisecond timestamps
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since an arbitrary fixed origin
    fn now_millis(&self) -> u64;
}

/// Monotonic clock measuring milliseconds since its own construction
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Clock that only moves when told to
///
/// Drives replay of recorded event logs and deterministic tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_millis: u64) -> Self {
        Self {
            now: AtomicU64::new(start_millis),
        }
    }

    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now_millis(&self) -> u64 {
        (**self).now_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let first = clock.now_millis();
        thread::sleep(Duration::from_millis(3));
        let second = clock.now_millis();
        assert!(second >= first + 3);
    }

    #[test]
    fn test_manual_clock_set_and_advance() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now_millis(), 100);
        clock.advance(25);
        assert_eq!(clock.now_millis(), 125);
        clock.set(10);
        assert_eq!(clock.now_millis(), 10);
    }

    #[test]
    fn test_shared_manual_clock() {
        let clock = std::sync::Arc::new(ManualClock::new(0));
        let handle = clock.clone();
        handle.advance(7);
        assert_eq!(clock.now_millis(), 7);
    }
}
