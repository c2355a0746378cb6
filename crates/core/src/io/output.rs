use tokio::sync::mpsc;

use crate::arbiter::ChannelKind;
use crate::io::input::strip_author;

/// One answered message, delivered to whatever is presenting the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputMessage {
    pub kind: ChannelKind,
    pub prompt: String,
    pub reply: String,
}

impl OutputMessage {
    pub fn new(kind: ChannelKind, prompt: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            kind,
            prompt: prompt.into(),
            reply: reply.into(),
        }
    }

    /// Chat messages are read aloud before answering; returns the part to read.
    pub fn chat_body(&self) -> Option<&str> {
        match self.kind {
            ChannelKind::Chat if self.prompt.contains(": ") => Some(strip_author(&self.prompt)),
            _ => None,
        }
    }
}

/// The runtime pushes replies here.
pub type OutputSender = mpsc::Sender<OutputMessage>;
/// Presenters consume replies from here.
pub type OutputReceiver = mpsc::Receiver<OutputMessage>;

/// Create an output channel with the given buffer size.
pub fn channel(buffer: usize) -> (OutputSender, OutputReceiver) {
    mpsc::channel(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_body_strips_author() {
        let msg = OutputMessage::new(ChannelKind::Chat, "bob: hi there", "hello bob");
        assert_eq!(msg.chat_body(), Some("hi there"));
        let msg = OutputMessage::new(ChannelKind::Mic, "Ulaidh: hi", "hey");
        assert_eq!(msg.chat_body(), None);
    }

    #[tokio::test]
    async fn channel_send_recv() {
        let (tx, mut rx) = channel(4);
        tx.send(OutputMessage::new(ChannelKind::System, "EVENT", "ok"))
            .await
            .unwrap();
        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.reply, "ok");
    }
}
