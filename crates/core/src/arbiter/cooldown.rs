use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::Rng;

/// Randomized suppression window for the chat channel.
///
/// The cooldown starts when a chat message is *selected*, so chat-driven
/// output is rate-bounded regardless of how long the reply takes. Once started
/// it always runs to its deadline.
#[derive(Debug)]
pub struct ChatCooldown {
    min: Duration,
    max: Duration,
    until: Mutex<Option<Instant>>,
}

impl ChatCooldown {
    /// `min` and `max` are swapped if given in the wrong order.
    pub fn new(min: Duration, max: Duration) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            min,
            max,
            until: Mutex::new(None),
        }
    }

    /// If chat is currently allowed, start a cooldown and return its length.
    /// Returns `None` while a previous cooldown is still running.
    pub fn try_begin(&self) -> Option<Duration> {
        let mut until = self.until.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        if until.is_some_and(|deadline| now < deadline) {
            return None;
        }
        let length = self.roll();
        *until = Some(now + length);
        Some(length)
    }

    pub fn is_active(&self) -> bool {
        self.remaining().is_some()
    }

    /// Time left until chat is allowed again.
    pub fn remaining(&self) -> Option<Duration> {
        let until = self.until.lock().unwrap_or_else(|e| e.into_inner());
        until
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .filter(|left| !left.is_zero())
    }

    fn roll(&self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_is_allowed() {
        let cd = ChatCooldown::new(Duration::from_secs(2), Duration::from_secs(6));
        assert!(!cd.is_active());
        let length = cd.try_begin().unwrap();
        assert!(length >= Duration::from_secs(2) && length <= Duration::from_secs(6));
        assert!(cd.is_active());
    }

    #[test]
    fn blocked_while_running() {
        let cd = ChatCooldown::new(Duration::from_secs(5), Duration::from_secs(5));
        assert!(cd.try_begin().is_some());
        assert!(cd.try_begin().is_none());
    }

    #[test]
    fn allowed_again_after_deadline() {
        let cd = ChatCooldown::new(Duration::from_millis(10), Duration::from_millis(20));
        assert!(cd.try_begin().is_some());
        std::thread::sleep(Duration::from_millis(40));
        assert!(!cd.is_active());
        assert!(cd.try_begin().is_some());
    }

    #[test]
    fn reversed_bounds_are_normalized() {
        let cd = ChatCooldown::new(Duration::from_secs(6), Duration::from_secs(2));
        let length = cd.try_begin().unwrap();
        assert!(length >= Duration::from_secs(2) && length <= Duration::from_secs(6));
    }

    #[test]
    fn zero_cooldown_never_blocks() {
        let cd = ChatCooldown::new(Duration::ZERO, Duration::ZERO);
        assert_eq!(cd.try_begin(), Some(Duration::ZERO));
        assert_eq!(cd.try_begin(), Some(Duration::ZERO));
    }
}
