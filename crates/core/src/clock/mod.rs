use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Time source the scheduler reads "now" from.
///
/// `now` returns `None` while the source is unavailable (for instance an
/// audio context that could not be created). The engine then degrades to
/// an inert state instead of failing.
pub trait ClockSource {
    /// Monotonically increasing time in seconds.
    fn now(&self) -> Option<f64>;

    /// Wakes the source up if it has been suspended by the host.
    fn resume_if_suspended(&mut self);
}

/// Wall clock backed by [`Instant`], measured from construction.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
    suspended: bool,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            suspended: true,
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource for SystemClock {
    fn now(&self) -> Option<f64> {
        Some(self.origin.elapsed().as_secs_f64())
    }

    fn resume_if_suspended(&mut self) {
        if self.suspended {
            tracing::debug!("resuming system clock");
            self.suspended = false;
        }
    }
}

#[derive(Debug)]
struct ManualState {
    seconds: f64,
    available: bool,
    resumes: usize,
}

/// Deterministic clock driven by hand.
///
/// Clones share the same underlying time, so a test can keep one handle
/// while the engine owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

impl ManualClock {
    pub fn new(seconds: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(ManualState {
                seconds,
                available: true,
                resumes: 0,
            })),
        }
    }

    /// A clock that reports no time until [`ManualClock::set_available`].
    pub fn unavailable() -> Self {
        let clock = Self::new(0.0);
        clock.set_available(false);
        clock
    }

    pub fn set(&self, seconds: f64) {
        self.lock().seconds = seconds;
    }

    pub fn advance(&self, delta: f64) {
        let mut state = self.lock();
        state.seconds = (state.seconds + delta).max(0.0);
    }

    pub fn set_available(&self, available: bool) {
        self.lock().available = available;
    }

    /// Number of times the engine asked this clock to resume.
    pub fn resume_count(&self) -> usize {
        self.lock().resumes
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        // The state holds plain numbers, so a poisoned guard is still usable.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> Option<f64> {
        let state = self.lock();
        state.available.then_some(state.seconds)
    }

    fn resume_if_suspended(&mut self) {
        self.lock().resumes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(1.0);
        let handle = clock.clone();
        handle.advance(0.5);
        assert_eq!(clock.now(), Some(1.5));

        handle.advance(-10.0);
        assert_eq!(clock.now(), Some(0.0));
    }

    #[test]
    fn unavailable_clock_reports_nothing() {
        let clock = ManualClock::unavailable();
        assert_eq!(clock.now(), None);
        clock.set_available(true);
        assert_eq!(clock.now(), Some(0.0));
    }

    #[test]
    fn system_clock_starts_suspended() {
        let mut clock = SystemClock::new();
        assert!(clock.is_suspended());
        clock.resume_if_suspended();
        assert!(!clock.is_suspended());

        let first = clock.now().unwrap();
        let second = clock.now().unwrap();
        assert!(second >= first);
    }
}
