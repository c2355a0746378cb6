//! Message arbitration between the operator, live speech and chat.
//!
//! Producers only ever call [`MessageArbiter::add_message`]; the single
//! consumer polls [`MessageArbiter::next`]. Priority is fixed and re-evaluated
//! on every poll: system > mic > chat.

pub mod cooldown;
pub mod mailbox;
pub mod pool;
pub mod queue;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::AikoCfg;
use cooldown::ChatCooldown;
use mailbox::ExpiringMailbox;
use pool::{EvictionPool, PoolError};
use queue::OrderedQueue;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ArbiterError {
    #[error("{0} is not a valid message type")]
    InvalidChannel(String),
}

/// The closed set of input channels, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    System,
    Mic,
    Chat,
}

impl ChannelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Mic => "mic",
            Self::Chat => "chat",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = ArbiterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Self::System),
            "mic" => Ok(Self::Mic),
            "chat" => Ok(Self::Chat),
            other => Err(ArbiterError::InvalidChannel(other.to_owned())),
        }
    }
}

/// Result of one poll of the arbiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    System(String),
    Mic(String),
    /// Chat was selected and its cooldown started. `None` if the pool was empty.
    Chat(Option<String>),
    Empty,
}

impl Next {
    /// The message text, if this poll produced one.
    pub fn into_message(self) -> Option<(ChannelKind, String)> {
        match self {
            Self::System(text) => Some((ChannelKind::System, text)),
            Self::Mic(text) => Some((ChannelKind::Mic, text)),
            Self::Chat(text) => text.map(|t| (ChannelKind::Chat, t)),
            Self::Empty => None,
        }
    }
}

/// Tunables for [`MessageArbiter`].
#[derive(Debug, Clone)]
pub struct ArbiterCfg {
    pub mic_expiration: Duration,
    pub chat_min_cooldown: Duration,
    pub chat_max_cooldown: Duration,
    pub chat_pool_capacity: usize,
}

impl From<&AikoCfg> for ArbiterCfg {
    fn from(cfg: &AikoCfg) -> Self {
        Self {
            mic_expiration: mic_expiration(cfg.voice_message_expiration_secs),
            chat_min_cooldown: Duration::from_secs(cfg.chat_min_cooldown_secs),
            chat_max_cooldown: Duration::from_secs(cfg.chat_max_cooldown_secs),
            chat_pool_capacity: cfg.chat_pool_capacity,
        }
    }
}

/// Out-of-range values saturate instead of panicking; `AikoCfg::validate`
/// reports them at load time.
fn mic_expiration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(if secs > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}

/// Priority arbiter over the three input channels.
///
/// Construct one per process and share it behind an `Arc`. Each channel owns
/// its own lock; the arbiter never holds more than one at a time, so producers
/// on different channels do not contend.
#[derive(Debug)]
pub struct MessageArbiter {
    system: OrderedQueue,
    mic: Arc<ExpiringMailbox>,
    chat: EvictionPool,
    cooldown: ChatCooldown,
}

impl MessageArbiter {
    pub fn new(cfg: ArbiterCfg) -> Self {
        Self {
            system: OrderedQueue::new(),
            mic: Arc::new(ExpiringMailbox::new(cfg.mic_expiration)),
            chat: EvictionPool::new(cfg.chat_pool_capacity),
            cooldown: ChatCooldown::new(cfg.chat_min_cooldown, cfg.chat_max_cooldown),
        }
    }

    /// Start the mic mailbox expiration sweep, bound to `cancel`.
    pub fn spawn_sweeper(&self, cancel: CancellationToken) -> JoinHandle<()> {
        self.mic.spawn_sweeper(cancel)
    }

    /// Route `text` to the channel named by `kind`.
    pub fn add_message(&self, text: impl Into<String>, kind: &str) -> Result<(), ArbiterError> {
        let kind: ChannelKind = kind.parse()?;
        self.push(kind, text);
        Ok(())
    }

    pub fn push(&self, kind: ChannelKind, text: impl Into<String>) {
        let text = text.into();
        tracing::debug!(kind = %kind, len = text.len(), "message accepted");
        match kind {
            ChannelKind::System => self.system.enqueue(text),
            ChannelKind::Mic => self.mic.set(text),
            ChannelKind::Chat => self.chat.add(text),
        }
    }

    /// Poll for the next message to answer. Never blocks.
    pub fn next(&self) -> Next {
        if let Some(text) = self.system.dequeue() {
            return Next::System(text);
        }
        if let Some(text) = self.mic.take() {
            return Next::Mic(text);
        }
        if let Some(length) = self.cooldown.try_begin() {
            let picked = self.chat.pick();
            tracing::debug!(
                cooldown_ms = length.as_millis() as u64,
                picked = picked.is_some(),
                "chat selected, cooldown started"
            );
            return Next::Chat(picked);
        }
        Next::Empty
    }

    /// Merge a follow-up into a still-pending chat message.
    pub fn edit_chat(&self, old: &str, new: impl Into<String>) -> Result<(), PoolError> {
        self.chat.edit(old, new)
    }

    pub fn delete_chat(&self, index: usize) -> Result<(), PoolError> {
        self.chat.delete(index)
    }

    pub fn chat_snapshot(&self) -> Vec<(usize, String)> {
        self.chat.snapshot()
    }

    pub fn chat_on_cooldown(&self) -> bool {
        self.cooldown.is_active()
    }

    pub fn pending_chat(&self) -> usize {
        self.chat.len()
    }

    pub fn pending_system(&self) -> usize {
        self.system.len()
    }

    pub fn has_mic_message(&self) -> bool {
        self.mic.has_message()
    }
}
