//! Minimum-interval gate for caller-triggered rescans.
//!
//! Without change notifications, every reader would otherwise rescan the
//! directory. The throttle lets at most one rescan through per interval.
//! The very first request always goes through.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Never fired; the next request passes.
    Idle,
    /// Fired; requests pass again once the deadline is reached.
    Armed(Instant),
    /// Stopped for good.
    Stopped,
}

#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    state: State,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: State::Idle,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true if a rescan may run now, and re-arms for a full interval.
    pub fn try_acquire(&mut self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    pub fn try_acquire_at(&mut self, now: Instant) -> bool {
        let ready = match self.state {
            State::Idle => true,
            State::Armed(deadline) => now >= deadline,
            State::Stopped => false,
        };
        if ready {
            self.state = State::Armed(now + self.interval);
        }
        ready
    }

    /// Time until the next request may pass, or None if one may pass now.
    pub fn remaining_at(&self, now: Instant) -> Option<Duration> {
        match self.state {
            State::Idle => None,
            State::Armed(deadline) if now >= deadline => None,
            State::Armed(deadline) => Some(deadline - now),
            State::Stopped => Some(Duration::MAX),
        }
    }

    /// Refuses every later request.
    pub fn stop(&mut self) {
        self.state = State::Stopped;
    }

    pub fn is_stopped(&self) -> bool {
        self.state == State::Stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_request_passes() {
        let mut throttle = Throttle::new(Duration::from_secs(2));
        let now = Instant::now();
        assert_eq!(throttle.remaining_at(now), None);
        assert!(throttle.try_acquire_at(now));
    }

    #[test]
    fn test_requests_within_interval_are_refused() {
        let mut throttle = Throttle::new(Duration::from_secs(2));
        let start = Instant::now();

        assert!(throttle.try_acquire_at(start));
        assert!(!throttle.try_acquire_at(start + Duration::from_millis(500)));
        assert!(!throttle.try_acquire_at(start + Duration::from_millis(1999)));
        assert_eq!(
            throttle.remaining_at(start + Duration::from_secs(1)),
            Some(Duration::from_secs(1))
        );

        // After the interval one request passes and the window restarts.
        let later = start + Duration::from_secs(2);
        assert!(throttle.try_acquire_at(later));
        assert!(!throttle.try_acquire_at(later + Duration::from_secs(1)));
    }

    #[test]
    fn test_zero_interval_always_passes() {
        let mut throttle = Throttle::new(Duration::ZERO);
        let now = Instant::now();
        assert!(throttle.try_acquire_at(now));
        assert!(throttle.try_acquire_at(now));
    }

    #[test]
    fn test_stopped_refuses_everything() {
        let mut throttle = Throttle::new(Duration::ZERO);
        throttle.stop();
        throttle.stop();
        assert!(throttle.is_stopped());
        assert!(!throttle.try_acquire_at(Instant::now() + Duration::from_secs(60)));
    }
}
