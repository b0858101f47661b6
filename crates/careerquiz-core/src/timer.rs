//! Per-question countdown.
//!
//! The countdown is a plain value driven by explicit [`Countdown::tick`]
//! calls. Wall-clock scheduling lives in [`crate::session`].

use serde::{Deserialize, Serialize};

/// Default time limit per question, in ticks (seconds).
pub const DEFAULT_TIME_LIMIT: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountdownState {
    /// Counting down for the current question.
    Running,
    /// Reached zero and fired. Stays here until the next question.
    Expired,
    /// Stopped without firing (the question was submitted manually).
    Cancelled,
}

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Decremented; time is still left.
    Running(u32),
    /// This tick brought the countdown to zero.
    Expired,
    /// The countdown is not running; nothing changed.
    Idle,
}

/// A countdown bound to exactly one unanswered question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Countdown {
    limit: u32,
    remaining: u32,
    state: CountdownState,
}

impl Countdown {
    /// A running countdown starting at `limit`. A limit of 0 is clamped to 1.
    pub fn new(limit: u32) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            remaining: limit,
            state: CountdownState::Running,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn state(&self) -> CountdownState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == CountdownState::Running
    }

    /// Decrement by one. Fires exactly once, then stays idle.
    pub fn tick(&mut self) -> Tick {
        if self.state != CountdownState::Running {
            return Tick::Idle;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.state = CountdownState::Expired;
            Tick::Expired
        } else {
            Tick::Running(self.remaining)
        }
    }

    /// Stop without firing. No effect once expired.
    pub fn cancel(&mut self) {
        if self.state == CountdownState::Running {
            self.state = CountdownState::Cancelled;
        }
    }

    /// Restart at the configured limit for the next question.
    pub fn reset(&mut self) {
        self.remaining = self.limit;
        self.state = CountdownState::Running;
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_down_and_fires_once() {
        let mut c = Countdown::new(3);
        assert_eq!(c.tick(), Tick::Running(2));
        assert_eq!(c.tick(), Tick::Running(1));
        assert_eq!(c.tick(), Tick::Expired);
        assert_eq!(c.remaining(), 0);
        assert_eq!(c.tick(), Tick::Idle);
        assert_eq!(c.remaining(), 0);
        assert_eq!(c.state(), CountdownState::Expired);
    }

    #[test]
    fn cancel_stops_without_firing() {
        let mut c = Countdown::new(2);
        c.tick();
        c.cancel();
        assert_eq!(c.tick(), Tick::Idle);
        assert_eq!(c.remaining(), 1);
        assert_eq!(c.state(), CountdownState::Cancelled);
    }

    #[test]
    fn cancel_after_expiry_keeps_expired() {
        let mut c = Countdown::new(1);
        assert_eq!(c.tick(), Tick::Expired);
        c.cancel();
        assert_eq!(c.state(), CountdownState::Expired);
    }

    #[test]
    fn reset_restarts_at_limit() {
        let mut c = Countdown::new(2);
        c.tick();
        c.tick();
        c.reset();
        assert!(c.is_running());
        assert_eq!(c.remaining(), 2);
    }

    #[test]
    fn zero_limit_is_clamped() {
        let mut c = Countdown::new(0);
        assert_eq!(c.limit(), 1);
        assert_eq!(c.tick(), Tick::Expired);
    }

    #[test]
    fn default_limit_is_thirty() {
        assert_eq!(Countdown::default().remaining(), DEFAULT_TIME_LIMIT);
        assert_eq!(DEFAULT_TIME_LIMIT, 30);
    }
}
