//! Operator console: line commands that steer the character while it streams.

use std::str::FromStr;

use crate::arbiter::ChannelKind;
use crate::io::input::{ChatAction, ChatFeed, submit_mic};
use crate::runtime::Session;

const HELP: &str = "\
help                     this list
sys <text>               queue a system directive
mic <text>               speak as the streamer
chat <author>: <text>    inject a chat message
note <text>              add a side note
note_del <i>             delete note in slot i
note_clear               delete all notes
notes                    list notes
scenario [text]          set the scenario (no text clears it)
scenario?                show the scenario
persona <id>             switch personality
mood                     show mood score, level and thresholds
mood_reset               return mood to neutral
pool                     list pending chat messages
pool_del <i>             drop pending chat message i
sb_start | sb_stop | sb? silence breaker control
exit                     shut down";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("unknown command: {0} (try `help`)")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("not a slot index: {0}")]
    BadIndex(String),
    #[error("expected `chat <author>: <text>`")]
    BadChat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Help,
    System(String),
    Mic(String),
    Chat { author: String, text: String },
    Note(String),
    NoteDelete(usize),
    NoteClear,
    Notes,
    Scenario(String),
    ScenarioQuery,
    Persona(String),
    Mood,
    MoodReset,
    Pool,
    PoolDelete(usize),
    SilenceStart,
    SilenceStop,
    SilenceQuery,
    Exit,
}

impl FromStr for ConsoleCommand {
    type Err = ConsoleError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };
        let required = |name: &'static str| {
            if rest.is_empty() {
                Err(ConsoleError::MissingArgument(name))
            } else {
                Ok(rest.to_owned())
            }
        };
        let index = |name: &'static str| -> Result<usize, ConsoleError> {
            let arg = required(name)?;
            arg.parse().map_err(|_| ConsoleError::BadIndex(arg))
        };

        Ok(match head {
            "help" => Self::Help,
            "sys" => Self::System(required("sys")?),
            "mic" => Self::Mic(required("mic")?),
            "chat" => {
                let (author, text) = rest.split_once(':').ok_or(ConsoleError::BadChat)?;
                let (author, text) = (author.trim(), text.trim());
                if author.is_empty() || text.is_empty() {
                    return Err(ConsoleError::BadChat);
                }
                Self::Chat {
                    author: author.to_owned(),
                    text: text.to_owned(),
                }
            }
            "note" => Self::Note(required("note")?),
            "note_del" => Self::NoteDelete(index("note_del")?),
            "note_clear" => Self::NoteClear,
            "notes" => Self::Notes,
            "scenario" => Self::Scenario(rest.to_owned()),
            "scenario?" => Self::ScenarioQuery,
            "persona" => Self::Persona(required("persona")?.to_uppercase()),
            "mood" => Self::Mood,
            "mood_reset" => Self::MoodReset,
            "pool" => Self::Pool,
            "pool_del" => Self::PoolDelete(index("pool_del")?),
            "sb_start" => Self::SilenceStart,
            "sb_stop" => Self::SilenceStop,
            "sb?" => Self::SilenceQuery,
            "exit" | "quit" => Self::Exit,
            other => return Err(ConsoleError::Unknown(other.to_owned())),
        })
    }
}

/// What the console loop should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Print(String),
    Exit,
}

pub struct Console {
    session: Session,
    feed: ChatFeed,
    username: String,
}

impl Console {
    pub fn new(session: Session, username: impl Into<String>) -> Self {
        let feed = ChatFeed::new(session.arbiter.clone());
        Self {
            session,
            feed,
            username: username.into(),
        }
    }

    /// Parse and run one line. Parse errors are reported, never fatal.
    pub async fn handle_line(&mut self, line: &str) -> Outcome {
        if line.trim().is_empty() {
            return Outcome::Print(String::new());
        }
        match line.parse::<ConsoleCommand>() {
            Ok(cmd) => self.execute(cmd).await,
            Err(e) => Outcome::Print(e.to_string()),
        }
    }

    pub async fn execute(&mut self, cmd: ConsoleCommand) -> Outcome {
        tracing::debug!(command = ?cmd, "console command");
        let arbiter = &self.session.arbiter;
        let text = match cmd {
            ConsoleCommand::Help => HELP.to_owned(),
            ConsoleCommand::Exit => return Outcome::Exit,
            ConsoleCommand::System(text) => {
                arbiter.push(ChannelKind::System, text);
                "Queued system message.".to_owned()
            }
            ConsoleCommand::Mic(text) => {
                submit_mic(arbiter, &self.username, &text);
                "Sent as mic input.".to_owned()
            }
            ConsoleCommand::Chat { author, text } => match self.feed.accept(&author, &text) {
                ChatAction::Skipped => "Chat message skipped.".to_owned(),
                ChatAction::Alert(event) => format!("Queued alert: {event}"),
                ChatAction::Merged(merged) => format!("Merged: {merged}"),
                ChatAction::Queued(message) => format!("Queued: {message}"),
            },
            ConsoleCommand::Note(text) => {
                self.session.character.lock().await.memory_mut().add_note(text);
                "Note added.".to_owned()
            }
            ConsoleCommand::NoteDelete(index) => {
                match self.session.character.lock().await.memory_mut().delete_note(index) {
                    Ok(()) => format!("Deleted note {index}."),
                    Err(e) => e.to_string(),
                }
            }
            ConsoleCommand::NoteClear => {
                self.session.character.lock().await.memory_mut().clear_notes();
                "Notes cleared.".to_owned()
            }
            ConsoleCommand::Notes => {
                let character = self.session.character.lock().await;
                let notes = character.memory().notes();
                if notes.is_empty() {
                    "No notes.".to_owned()
                } else {
                    numbered(notes.into_iter())
                }
            }
            ConsoleCommand::Scenario(text) => {
                self.session
                    .character
                    .lock()
                    .await
                    .memory_mut()
                    .change_scenario(&text);
                if text.is_empty() {
                    "Scenario cleared.".to_owned()
                } else {
                    "Changed scenario.".to_owned()
                }
            }
            ConsoleCommand::ScenarioQuery => {
                let character = self.session.character.lock().await;
                match character.memory().scenario() {
                    Some(scenario) => format!("Current scenario: {scenario}"),
                    None => "No scenario set.".to_owned(),
                }
            }
            ConsoleCommand::Persona(id) => {
                let mut character = self.session.character.lock().await;
                match character.memory_mut().switch_personality(&id) {
                    Ok(()) => format!("Personality is now {id}."),
                    Err(e) => {
                        let known: Vec<&str> = character.memory().personality_ids().collect();
                        format!("{e} (loaded: {})", known.join(", "))
                    }
                }
            }
            ConsoleCommand::Mood => {
                let character = self.session.character.lock().await;
                let mood = &self.session.mood;
                let thresholds = mood
                    .table()
                    .iter()
                    .skip(1)
                    .map(|range| format!("{}@{}", range.level, range.start))
                    .collect::<Vec<_>>()
                    .join(" ");
                format!(
                    "score {} | level {} | personality {}\nthresholds: {thresholds}",
                    mood.current_score(),
                    mood.current_level(),
                    character.memory().active_personality()
                )
            }
            ConsoleCommand::MoodReset => {
                self.session.mood.reset();
                "Mood reset to neutral.".to_owned()
            }
            ConsoleCommand::Pool => {
                let pending = arbiter.chat_snapshot();
                let cooldown = if arbiter.chat_on_cooldown() {
                    "on cooldown"
                } else {
                    "ready"
                };
                let status = format!(
                    "system queued: {} | mic pending: {} | chat pending: {} ({cooldown})",
                    arbiter.pending_system(),
                    if arbiter.has_mic_message() { "yes" } else { "no" },
                    arbiter.pending_chat(),
                );
                if pending.is_empty() {
                    status
                } else {
                    let list = numbered(pending.iter().map(|(i, text)| (*i, text.as_str())));
                    format!("{list}\n{status}")
                }
            }
            ConsoleCommand::PoolDelete(index) => match arbiter.delete_chat(index) {
                Ok(()) => format!("Dropped chat message {index}."),
                Err(e) => e.to_string(),
            },
            ConsoleCommand::SilenceStart => {
                self.session.silence.enable();
                "Silence breaker running.".to_owned()
            }
            ConsoleCommand::SilenceStop => {
                self.session.silence.disable();
                "Silence breaker paused.".to_owned()
            }
            ConsoleCommand::SilenceQuery => {
                let state = if self.session.silence.is_enabled() {
                    "running"
                } else {
                    "paused"
                };
                format!(
                    "Silence breaker is {state} ({} spontaneous prompts left).",
                    self.session.silence.spontaneous_left()
                )
            }
        };
        Outcome::Print(text)
    }
}

fn numbered<'a>(items: impl Iterator<Item = (usize, &'a str)>) -> String {
    items
        .map(|(i, text)| format!("[{i}] {text}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    use aiko_llm::provider::MockProvider;

    use crate::arbiter::{ArbiterCfg, MessageArbiter, Next};
    use crate::cognition::character::Character;
    use crate::config::AikoCfg;
    use crate::identity::MoodEngine;
    use crate::memory::ConversationMemory;
    use crate::runtime::SilenceBreaker;

    fn session() -> Session {
        let cfg = AikoCfg::default();
        let arbiter = Arc::new(MessageArbiter::new(ArbiterCfg {
            mic_expiration: Duration::from_secs(10),
            chat_min_cooldown: Duration::ZERO,
            chat_max_cooldown: Duration::ZERO,
            chat_pool_capacity: 10,
        }));
        let personalities = BTreeMap::from([
            ("AIKO".to_string(), "You are Aiko.".to_string()),
            ("GRUMPY".to_string(), "You are grumpy.".to_string()),
        ]);
        let memory = ConversationMemory::new(personalities, "AIKO", 3, 10).unwrap();
        let character = Character::new(&cfg, memory, Arc::new(MockProvider::new("ok")));
        let silence = SilenceBreaker::from_cfg(&cfg, arbiter.clone(), vec![], vec![]);
        Session::new(arbiter, character, MoodEngine::from_cfg(&cfg).unwrap(), silence)
    }

    fn cmd(line: &str) -> Result<ConsoleCommand, ConsoleError> {
        line.parse()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(cmd("help"), Ok(ConsoleCommand::Help));
        assert_eq!(
            cmd("sys  be nice "),
            Ok(ConsoleCommand::System("be nice".into()))
        );
        assert_eq!(
            cmd("chat bob: hi: there"),
            Ok(ConsoleCommand::Chat {
                author: "bob".into(),
                text: "hi: there".into()
            })
        );
        assert_eq!(cmd("note_del 2"), Ok(ConsoleCommand::NoteDelete(2)));
        assert_eq!(cmd("scenario"), Ok(ConsoleCommand::Scenario(String::new())));
        assert_eq!(cmd("scenario?"), Ok(ConsoleCommand::ScenarioQuery));
        assert_eq!(cmd("persona grumpy"), Ok(ConsoleCommand::Persona("GRUMPY".into())));
        assert_eq!(cmd("sb?"), Ok(ConsoleCommand::SilenceQuery));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            cmd("dance"),
            Err(ConsoleError::Unknown("dance".into()))
        );
        assert_eq!(
            cmd("sys"),
            Err(ConsoleError::MissingArgument("sys"))
        );
        assert_eq!(
            cmd("note_del x"),
            Err(ConsoleError::BadIndex("x".into()))
        );
        assert_eq!(cmd("chat nobody"), Err(ConsoleError::BadChat));
    }

    #[tokio::test]
    async fn routes_producer_commands_through_arbiter() {
        let session = session();
        let mut console = Console::new(session.clone(), "Ulaidh");
        console.handle_line("chat bob: hello").await;
        console.handle_line("mic testing").await;
        console.handle_line("sys EVENT").await;
        assert_eq!(session.arbiter.next(), Next::System("EVENT".into()));
        assert_eq!(session.arbiter.next(), Next::Mic("Ulaidh: testing".into()));
        assert_eq!(session.arbiter.next(), Next::Chat(Some("bob: hello".into())));
    }

    #[tokio::test]
    async fn edits_memory() {
        let session = session();
        let mut console = Console::new(session.clone(), "Ulaidh");
        console.handle_line("note first").await;
        console.handle_line("note second").await;
        assert_eq!(
            console.handle_line("notes").await,
            Outcome::Print("[1] first\n[2] second".into())
        );
        console.handle_line("note_del 1").await;
        assert_eq!(
            console.handle_line("notes").await,
            Outcome::Print("[2] second".into())
        );
        assert!(matches!(
            console.handle_line("note_del 9").await,
            Outcome::Print(msg) if msg.contains("out of range")
        ));

        console.handle_line("scenario at the beach").await;
        assert_eq!(
            console.handle_line("scenario?").await,
            Outcome::Print("Current scenario: at the beach".into())
        );
        console.handle_line("persona grumpy").await;
        assert_eq!(
            session.character.lock().await.memory().active_personality(),
            "GRUMPY"
        );
    }

    #[tokio::test]
    async fn toggles_silence_breaker() {
        let session = session();
        let mut console = Console::new(session.clone(), "Ulaidh");
        console.handle_line("sb_start").await;
        assert!(session.silence.is_enabled());
        console.handle_line("sb_stop").await;
        assert_eq!(
            console.handle_line("sb?").await,
            Outcome::Print("Silence breaker is paused (0 spontaneous prompts left).".into())
        );
        assert_eq!(console.handle_line("exit").await, Outcome::Exit);
    }

    #[tokio::test]
    async fn reports_pool_and_mood() {
        let session = session();
        let mut console = Console::new(session.clone(), "Ulaidh");
        console.handle_line("sys hello").await;
        console.handle_line("mic hi").await;
        console.handle_line("chat bob: yo").await;
        let Outcome::Print(pool) = console.handle_line("pool").await else {
            panic!("pool should print");
        };
        assert!(pool.starts_with("[9] bob: yo"));
        assert!(pool.contains("system queued: 1 | mic pending: yes | chat pending: 1"));

        session.mood.update(crate::types::SentimentLabel::Positive, 700);
        let Outcome::Print(mood) = console.handle_line("mood").await else {
            panic!("mood should print");
        };
        assert!(mood.starts_with("score 700 | level +1 | personality AIKO"));
        assert!(mood.contains("thresholds: -1@-900 0@-600 +1@600 +2@900"));

        console.handle_line("mood_reset").await;
        assert_eq!(session.mood.current_score(), 0);
    }
}
