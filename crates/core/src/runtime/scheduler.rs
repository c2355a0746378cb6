use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::Session;
use super::shutdown::ShutdownGuard;
use crate::arbiter::ChannelKind;
use crate::config::AikoCfg;
use crate::identity::{PersonaTable, SentimentAnalyzer};
use crate::io::input::strip_author;
use crate::io::output::{self, OutputMessage, OutputReceiver, OutputSender};

/// The single consumer: pulls the next message from the arbiter and drives
/// completion, memory, mood and personality for it, one message at a time.
pub struct Runtime {
    session: Session,
    sentiment: Arc<dyn SentimentAnalyzer>,
    personas: PersonaTable,
    idle_poll: Duration,
    output_tx: OutputSender,
    shutdown: ShutdownGuard,
    answered: u64,
}

impl Runtime {
    /// Create a runtime. Replies are delivered on the returned receiver.
    pub fn new(
        cfg: &AikoCfg,
        session: Session,
        sentiment: Arc<dyn SentimentAnalyzer>,
        personas: PersonaTable,
    ) -> (Self, OutputReceiver) {
        let (output_tx, output_rx) = output::channel(64);
        let runtime = Self {
            session,
            sentiment,
            personas,
            idle_poll: Duration::from_millis(cfg.idle_poll_ms),
            output_tx,
            shutdown: ShutdownGuard::new(),
            answered: 0,
        };
        (runtime, output_rx)
    }

    pub fn token(&self) -> CancellationToken {
        self.shutdown.token()
    }

    pub fn answered(&self) -> u64 {
        self.answered
    }

    /// Start the background tasks and run the consumer loop until cancelled.
    pub async fn run(&mut self) {
        self.shutdown.spawn_signal_listener();
        let token = self.shutdown.token();
        let sweeper = self.session.arbiter.spawn_sweeper(token.clone());
        let silence = self.session.silence.spawn(token.clone());

        tracing::info!("aiko runtime started");

        loop {
            if token.is_cancelled() {
                break;
            }
            if self.step().await {
                continue;
            }
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.idle_poll) => {}
            }
        }

        for task in [sweeper, silence] {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "background task ended abnormally");
            }
        }
        tracing::info!(answered = self.answered, "aiko runtime stopped");
    }

    /// Answer at most one message. Returns false if there was nothing to do.
    pub async fn step(&mut self) -> bool {
        let Some((kind, message)) = self.session.arbiter.next().into_message() else {
            return false;
        };
        let span = tracing::info_span!("message", kind = %kind);
        self.handle(kind, message).instrument(span).await;
        true
    }

    async fn handle(&mut self, kind: ChannelKind, message: String) {
        let use_system_role = kind == ChannelKind::System;

        let reply = {
            let mut character = self.session.character.lock().await;
            character.interact(&message, use_system_role).await
        };
        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "message dropped");
                return;
            }
        };

        self.answered += 1;
        self.session.silence.mark_spoken();
        self.update_mood(kind, &message).await;

        let out = OutputMessage::new(kind, message, reply.text);
        if self.output_tx.send(out).await.is_err() {
            tracing::debug!("output receiver dropped");
        }
    }

    /// Only what was said counts toward mood, not who said it.
    async fn update_mood(&self, kind: ChannelKind, message: &str) {
        let said = match kind {
            ChannelKind::System => message,
            ChannelKind::Mic | ChannelKind::Chat => strip_author(message),
        };
        let sentiment = self.sentiment.analyze(said);
        self.session.mood.apply(sentiment);
        let level = self.session.mood.current_level();

        let Some(target) = self.personas.personality_for(level) else {
            return;
        };
        let mut character = self.session.character.lock().await;
        if character.memory().active_personality() == target {
            return;
        }
        if let Err(e) = character.memory_mut().switch_personality(target) {
            tracing::warn!(level = %level, error = %e, "mood personality not loaded");
        }
    }
}
