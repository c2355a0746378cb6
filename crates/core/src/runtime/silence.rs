//! Spontaneous talking when the stream goes quiet.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::arbiter::{ChannelKind, MessageArbiter};
use crate::config::AikoCfg;

const POLL_PERIOD: Duration = Duration::from_millis(100);

#[derive(Debug)]
struct Clock {
    last_spoken: Instant,
    patience: Duration,
}

#[derive(Debug, Default)]
struct Prompts {
    /// Consumed without replacement.
    spontaneous: Vec<String>,
    generic: Vec<String>,
}

/// Queues a system prompt once nothing has been said for a random stretch.
/// Starts paused; the operator turns it on.
#[derive(Debug)]
pub struct SilenceBreaker {
    arbiter: Arc<MessageArbiter>,
    min: Duration,
    max: Duration,
    enabled: AtomicBool,
    clock: Mutex<Clock>,
    prompts: Mutex<Prompts>,
}

impl SilenceBreaker {
    pub fn new(
        arbiter: Arc<MessageArbiter>,
        min: Duration,
        max: Duration,
        spontaneous: Vec<String>,
        generic: Vec<String>,
    ) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            arbiter,
            min,
            max,
            enabled: AtomicBool::new(false),
            clock: Mutex::new(Clock {
                last_spoken: Instant::now(),
                patience: roll(min, max),
            }),
            prompts: Mutex::new(Prompts {
                spontaneous,
                generic,
            }),
        }
    }

    pub fn from_cfg(
        cfg: &AikoCfg,
        arbiter: Arc<MessageArbiter>,
        spontaneous: Vec<String>,
        generic: Vec<String>,
    ) -> Self {
        Self::new(
            arbiter,
            Duration::from_secs(cfg.silence_min_secs),
            Duration::from_secs(cfg.silence_max_secs),
            spontaneous,
            generic,
        )
    }

    pub fn enable(&self) {
        self.mark_spoken();
        self.enabled.store(true, Ordering::Relaxed);
        tracing::info!("silence breaker enabled");
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
        tracing::info!("silence breaker paused");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Reset the silence timer. Called after every reply.
    pub fn mark_spoken(&self) {
        self.mark_spoken_at(Instant::now());
    }

    fn mark_spoken_at(&self, now: Instant) {
        let mut clock = self.clock.lock().unwrap_or_else(|e| e.into_inner());
        clock.last_spoken = now;
    }

    /// Spontaneous prompts not yet used.
    pub fn spontaneous_left(&self) -> usize {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .spontaneous
            .len()
    }

    /// Check the timer at `now`. If the silence has lasted long enough, queue a
    /// prompt as a system message, re-roll the patience and return the prompt.
    pub fn check(&self, now: Instant) -> Option<String> {
        if !self.is_enabled() {
            return None;
        }
        {
            let mut clock = self.clock.lock().unwrap_or_else(|e| e.into_inner());
            if now.saturating_duration_since(clock.last_spoken) < clock.patience {
                return None;
            }
            clock.patience = roll(self.min, self.max);
            clock.last_spoken = now;
        }

        let prompt = self.choose_prompt()?;
        tracing::info!(prompt = %prompt, "silence broken");
        self.arbiter.push(ChannelKind::System, prompt.clone());
        Some(prompt)
    }

    /// Coin flip between a fresh spontaneous prompt and a generic one.
    /// Falls back to the other list when the chosen one is empty.
    fn choose_prompt(&self) -> Option<String> {
        let mut prompts = self.prompts.lock().unwrap_or_else(|e| e.into_inner());
        let mut rng = rand::rng();
        let want_spontaneous = rng.random_bool(0.5);
        if (want_spontaneous || prompts.generic.is_empty()) && !prompts.spontaneous.is_empty() {
            let idx = rng.random_range(0..prompts.spontaneous.len());
            return Some(prompts.spontaneous.swap_remove(idx));
        }
        if prompts.generic.is_empty() {
            return None;
        }
        let idx = rng.random_range(0..prompts.generic.len());
        Some(prompts.generic[idx].clone())
    }

    /// Poll the timer every 100ms until `cancel` fires.
    pub fn spawn(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let breaker = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(POLL_PERIOD);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("silence breaker stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        breaker.check(Instant::now());
                    }
                }
            }
        })
    }
}

fn roll(min: Duration, max: Duration) -> Duration {
    if min == max {
        return min;
    }
    Duration::from_millis(rand::rng().random_range(min.as_millis() as u64..=max.as_millis() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbiter::{ArbiterCfg, Next};

    fn arbiter() -> Arc<MessageArbiter> {
        Arc::new(MessageArbiter::new(ArbiterCfg {
            mic_expiration: Duration::from_secs(10),
            chat_min_cooldown: Duration::ZERO,
            chat_max_cooldown: Duration::ZERO,
            chat_pool_capacity: 10,
        }))
    }

    fn breaker(arb: Arc<MessageArbiter>, spontaneous: &[&str], generic: &[&str]) -> SilenceBreaker {
        SilenceBreaker::new(
            arb,
            Duration::from_secs(5),
            Duration::from_secs(5),
            spontaneous.iter().map(|s| s.to_string()).collect(),
            generic.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn paused_by_default() {
        let arb = arbiter();
        let sb = breaker(arb.clone(), &["a"], &["b"]);
        assert!(!sb.is_enabled());
        assert_eq!(sb.check(Instant::now() + Duration::from_secs(60)), None);
        assert_eq!(arb.next(), Next::Empty);
    }

    #[test]
    fn waits_for_patience() {
        let arb = arbiter();
        let sb = breaker(arb.clone(), &[], &["say something"]);
        sb.enable();
        let start = Instant::now();
        sb.mark_spoken_at(start);
        assert_eq!(sb.check(start + Duration::from_secs(4)), None);
        assert_eq!(
            sb.check(start + Duration::from_secs(5)).as_deref(),
            Some("say something")
        );
        assert_eq!(arb.next(), Next::System("say something".into()));
        // timer restarts after firing
        assert_eq!(sb.check(start + Duration::from_secs(6)), None);
    }

    #[test]
    fn speaking_resets_timer() {
        let arb = arbiter();
        let sb = breaker(arb, &[], &["g"]);
        sb.enable();
        let start = Instant::now();
        sb.mark_spoken_at(start + Duration::from_secs(4));
        assert_eq!(sb.check(start + Duration::from_secs(6)), None);
    }

    #[test]
    fn spontaneous_prompts_are_used_once() {
        let arb = arbiter();
        let sb = breaker(arb, &["one", "two"], &[]);
        sb.enable();
        let start = Instant::now();
        sb.mark_spoken_at(start);
        let mut seen = Vec::new();
        for i in 1..=3 {
            if let Some(p) = sb.check(start + Duration::from_secs(5 * i)) {
                seen.push(p);
            }
        }
        seen.sort();
        assert_eq!(seen, vec!["one".to_string(), "two".to_string()]);
        assert_eq!(sb.spontaneous_left(), 0);
    }

    #[test]
    fn generic_prompts_repeat() {
        let arb = arbiter();
        let sb = breaker(arb, &[], &["only"]);
        sb.enable();
        let start = Instant::now();
        sb.mark_spoken_at(start);
        assert!(sb.check(start + Duration::from_secs(5)).is_some());
        assert!(sb.check(start + Duration::from_secs(10)).is_some());
    }

    #[tokio::test]
    async fn task_stops_on_cancel() {
        let sb = Arc::new(breaker(arbiter(), &[], &[]));
        let cancel = CancellationToken::new();
        let handle = sb.spawn(cancel.clone());
        cancel.cancel();
        handle.await.unwrap();
    }
}
