//! Producer-side adapters. Producers only ever talk to the arbiter.

use std::sync::Arc;

use crate::arbiter::pool::PoolError;
use crate::arbiter::{ChannelKind, MessageArbiter};

/// Chat bot whose messages are never answered; its follow alerts become system events.
const ALERT_BOT: &str = "streamelements";
const FOLLOW_MARKER: &str = "just followed!";

/// What [`ChatFeed::accept`] did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatAction {
    Skipped,
    /// A follow alert was turned into this system message.
    Alert(String),
    /// The message was folded into the author's still-pending entry.
    Merged(String),
    Queued(String),
}

/// Feeds one chat source into the arbiter, merging rapid-fire follow-ups
/// from the same author into a single pending entry.
#[derive(Debug)]
pub struct ChatFeed {
    arbiter: Arc<MessageArbiter>,
    last_author: Option<String>,
    last_message: String,
}

impl ChatFeed {
    pub fn new(arbiter: Arc<MessageArbiter>) -> Self {
        Self {
            arbiter,
            last_author: None,
            last_message: String::new(),
        }
    }

    pub fn accept(&mut self, author: &str, text: &str) -> ChatAction {
        let text = text.trim();
        if text.is_empty() || text.starts_with('!') {
            return ChatAction::Skipped;
        }

        if author.eq_ignore_ascii_case(ALERT_BOT) {
            if !text.to_lowercase().contains(FOLLOW_MARKER) {
                return ChatAction::Skipped;
            }
            let follower = text
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .trim_start_matches('@');
            let event = format!(
                "EVENT: {follower} just followed you on Twitch. Thank them! Read their name!"
            );
            tracing::info!(follower, "follow alert forwarded as system message");
            self.arbiter.push(ChannelKind::System, event.clone());
            return ChatAction::Alert(event);
        }

        if self.last_author.as_deref() == Some(author) {
            let merged = format!("{} {}", self.last_message, text);
            match self.arbiter.edit_chat(&self.last_message, merged.clone()) {
                Ok(()) => {
                    tracing::debug!(author, "chat follow-up merged");
                    self.last_message = merged.clone();
                    return ChatAction::Merged(merged);
                }
                Err(PoolError::NotFound) => {
                    tracing::debug!(author, "merge target already picked or evicted, queueing anew");
                }
                Err(e) => {
                    tracing::warn!(author, error = %e, "chat merge failed");
                }
            }
        }

        let message = format!("{author}: {text}");
        self.last_author = Some(author.to_owned());
        self.last_message = message.clone();
        self.arbiter.push(ChannelKind::Chat, message.clone());
        ChatAction::Queued(message)
    }
}

/// Queue a recognized utterance as the current live input.
/// Blank recognitions are dropped. Returns true if something was queued.
pub fn submit_mic(arbiter: &MessageArbiter, username: &str, text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return false;
    }
    arbiter.push(ChannelKind::Mic, format!("{username}: {text}"));
    true
}

/// The text of an `"<author>: <text>"` message without its author.
pub fn strip_author(message: &str) -> &str {
    message.split_once(": ").map_or(message, |(_, body)| body)
}
