use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How often the background sweep checks for an expired message.
pub const SWEEP_PERIOD: Duration = Duration::from_millis(100);

#[derive(Debug)]
struct Slot {
    message: Option<String>,
    last_set: Instant,
}

/// Single-slot holder for the latest live utterance.
///
/// Last write wins. A message that sits unread for `expiration` is dropped by
/// the sweep task (see [`spawn_sweeper`](Self::spawn_sweeper)); `take` applies
/// the same deadline so a reader never sees a message the sweep is about to clear.
#[derive(Debug)]
pub struct ExpiringMailbox {
    slot: Mutex<Slot>,
    expiration: Duration,
}

impl ExpiringMailbox {
    pub fn new(expiration: Duration) -> Self {
        Self {
            slot: Mutex::new(Slot {
                message: None,
                last_set: Instant::now(),
            }),
            expiration,
        }
    }

    /// Overwrite any pending message and restart the expiration timer.
    pub fn set(&self, text: impl Into<String>) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if slot.message.is_some() {
            tracing::debug!("mic message superseded before it was read");
        }
        slot.message = Some(text.into());
        slot.last_set = Instant::now();
    }

    /// Atomically return and clear the pending message, if still fresh.
    pub fn take(&self) -> Option<String> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if slot.last_set.elapsed() >= self.expiration {
            slot.message = None;
        }
        slot.message.take()
    }

    pub fn has_message(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .message
            .is_some()
    }

    /// Clear the slot if `expiration` has elapsed since the last `set` as of `now`.
    /// Returns true if a pending message was dropped.
    pub fn sweep(&self, now: Instant) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if now.saturating_duration_since(slot.last_set) < self.expiration {
            return false;
        }
        slot.message.take().is_some()
    }

    /// Run [`sweep`](Self::sweep) every [`SWEEP_PERIOD`] until `cancel` fires.
    pub fn spawn_sweeper(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let mailbox = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_PERIOD);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("mailbox sweeper shutting down");
                        return;
                    }
                    _ = ticker.tick() => {
                        if mailbox.sweep(Instant::now()) {
                            tracing::info!(
                                expiration_ms = mailbox.expiration.as_millis() as u64,
                                "mic message expired unread"
                            );
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_take_returns_message_once() {
        let mb = ExpiringMailbox::new(Duration::from_secs(10));
        mb.set("A");
        assert!(mb.has_message());
        assert_eq!(mb.take().as_deref(), Some("A"));
        assert_eq!(mb.take(), None);
    }

    #[test]
    fn last_write_wins() {
        let mb = ExpiringMailbox::new(Duration::from_secs(10));
        mb.set("first");
        mb.set("second");
        assert_eq!(mb.take().as_deref(), Some("second"));
    }

    #[test]
    fn sweep_respects_deadline() {
        let mb = ExpiringMailbox::new(Duration::from_secs(5));
        mb.set("A");
        let now = Instant::now();
        assert!(!mb.sweep(now));
        assert!(mb.has_message());
        assert!(mb.sweep(now + Duration::from_secs(6)));
        assert!(!mb.has_message());
    }

    #[test]
    fn take_after_expiration_is_empty() {
        let mb = ExpiringMailbox::new(Duration::from_millis(20));
        mb.set("A");
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(mb.take(), None);
    }

    #[tokio::test]
    async fn sweeper_clears_unread_message() {
        let mb = Arc::new(ExpiringMailbox::new(Duration::from_millis(50)));
        let cancel = CancellationToken::new();
        let handle = mb.spawn_sweeper(cancel.clone());

        mb.set("A");
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!mb.has_message());

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn set_restarts_timer() {
        let mb = Arc::new(ExpiringMailbox::new(Duration::from_millis(400)));
        let cancel = CancellationToken::new();
        let _handle = mb.spawn_sweeper(cancel.clone());

        mb.set("A");
        tokio::time::sleep(Duration::from_millis(250)).await;
        mb.set("B");
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(mb.take().as_deref(), Some("B"));
        cancel.cancel();
    }
}
