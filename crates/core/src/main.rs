use std::io::{self, Write};
use std::sync::Arc;

use aiko_core::arbiter::{ArbiterCfg, MessageArbiter};
use aiko_core::cognition::Character;
use aiko_core::config::AikoCfg;
use aiko_core::identity::{KeywordSentiment, MoodEngine, PersonaTable};
use aiko_core::io::console::{Console, Outcome};
use aiko_core::io::output::{OutputMessage, OutputReceiver};
use aiko_core::memory::ConversationMemory;
use aiko_core::prompts;
use aiko_core::runtime::{Runtime, Session, SilenceBreaker};
use aiko_llm::provider::LlmProvider;
use anyhow::Context;
use rustyline::ExternalPrinter;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const PROMPT: &str = "aiko> ";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let cfg = AikoCfg::load()?;

    let personalities = prompts::load_personalities(&cfg.personalities_dir())?;
    let keywords = prompts::load_text_dir(&cfg.keywords_dir())?;
    let profile = prompts::load_text(&cfg.prompts_dir.join("profile.txt"))?;
    let scenarios = prompts::load_lines(&cfg.prompts_dir.join("scenarios.txt"))?;
    let spontaneous = prompts::load_lines(&cfg.prompts_dir.join("spontaneous_messages.txt"))?;
    let generic = prompts::load_lines(&cfg.prompts_dir.join("generic_messages.txt"))?;

    let mut memory = ConversationMemory::new(
        personalities,
        &cfg.default_personality.to_uppercase(),
        cfg.max_side_prompts,
        cfg.max_context_turns,
    )?
    .with_profile(profile)
    .with_keywords(keywords);
    if let Some(scenario) = prompts::random_line(&scenarios) {
        tracing::info!(scenario, "opening scenario chosen");
        memory.change_scenario(scenario);
    }

    let llm: Arc<dyn LlmProvider> = aiko_llm::http::from_env()
        .map(|p| Arc::new(p) as _)
        .context("no completion provider: set AIKO_LLM_MODEL and AIKO_LLM_API_KEY")?;

    let arbiter = Arc::new(MessageArbiter::new(ArbiterCfg::from(&cfg)));
    let character = Character::new(&cfg, memory, llm);
    let mood = MoodEngine::from_cfg(&cfg)?;
    let personas = PersonaTable::from_labels(&cfg.mood_personalities)?;
    if personas.is_empty() {
        tracing::info!("no mood_personalities configured, personality follows the operator only");
    }
    for id in personas.ids() {
        if !character.memory().has_personality(id) {
            tracing::warn!(personality = id, "mood personality has no prompt file");
        }
    }
    let silence = SilenceBreaker::from_cfg(&cfg, arbiter.clone(), spontaneous, generic);
    let session = Session::new(arbiter, character, mood, silence);

    let (mut runtime, output_rx) = Runtime::new(
        &cfg,
        session.clone(),
        Arc::new(KeywordSentiment::new()),
        personas,
    );
    let token = runtime.token();
    let console = Console::new(session, cfg.username.clone());

    let runtime_fut = runtime.run();
    let repl_fut = run_repl(console, output_rx, token.clone(), cfg.character_name.clone());
    tokio::pin!(runtime_fut);
    tokio::pin!(repl_fut);

    tokio::select! {
        _ = &mut runtime_fut => {
            token.cancel();
            (&mut repl_fut).await
        }
        result = &mut repl_fut => {
            token.cancel();
            (&mut runtime_fut).await;
            result
        }
    }
}

/// `RUST_LOG` filters; `AIKO_LOG_FILE` switches to JSON lines in that file,
/// which keeps the console readable.
fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    match std::env::var_os("AIKO_LOG_FILE") {
        Some(path) => {
            let file = std::fs::File::create(&path)
                .with_context(|| format!("cannot create log file {}", path.to_string_lossy()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_target(true).with_writer(file))
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stderr))
                .init();
        }
    }
    Ok(())
}

async fn run_repl(
    mut console: Console,
    mut output_rx: OutputReceiver,
    token: CancellationToken,
    character_name: String,
) -> anyhow::Result<()> {
    println!("{character_name} is live. Type `help` for commands.");

    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<InputEvent>();
    let (ready_tx, ready_rx) = std::sync::mpsc::channel::<()>();
    spawn_input_thread(line_tx, ready_rx);
    request_next_prompt(&ready_tx);
    let mut printer: Option<Box<dyn ExternalPrinter + Send>> = None;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            line = line_rx.recv() => {
                let Some(line) = line else {
                    break;
                };
                match line {
                    InputEvent::Line(line) => match console.handle_line(&line).await {
                        Outcome::Exit => break,
                        Outcome::Print(text) => {
                            if !text.is_empty() {
                                println!("{text}");
                            }
                            request_next_prompt(&ready_tx);
                        }
                    },
                    InputEvent::Printer(p) => printer = Some(p),
                    InputEvent::Interrupted | InputEvent::Eof => break,
                    InputEvent::Error(err) => {
                        eprintln!("input error: {err}");
                        break;
                    }
                }
            }
            msg = output_rx.recv() => {
                let Some(msg) = msg else {
                    break;
                };
                print_reply(&msg, &character_name, printer.as_deref_mut())?;
            }
        }
    }
    drop(ready_tx);
    println!();
    Ok(())
}

/// Replies arrive while the input thread is blocked in `readline`. The
/// external printer redraws the prompt and any half-typed line below them.
fn print_reply(
    msg: &OutputMessage,
    character_name: &str,
    printer: Option<&mut (dyn ExternalPrinter + Send + 'static)>,
) -> anyhow::Result<()> {
    let heard = match msg.chat_body() {
        Some(body) => {
            let author = msg.prompt.split_once(": ").map_or("", |(author, _)| author);
            format!("(CHAT) {author} says: {body}")
        }
        None => format!("({}) {}", msg.kind.as_str().to_uppercase(), msg.prompt),
    };
    let text = format!("{heard}\n{character_name}: {}\n", msg.reply);
    match printer {
        Some(printer) => printer.print(text)?,
        None => {
            print!("\r\x1b[2K{text}\n{PROMPT}");
            io::stdout().flush()?;
        }
    }
    Ok(())
}

fn request_next_prompt(ready_tx: &std::sync::mpsc::Sender<()>) {
    let _ = ready_tx.send(());
}

fn spawn_input_thread(
    line_tx: mpsc::UnboundedSender<InputEvent>,
    ready_rx: std::sync::mpsc::Receiver<()>,
) {
    std::thread::spawn(move || {
        let mut editor = match rustyline::DefaultEditor::new() {
            Ok(editor) => editor,
            Err(e) => {
                let _ = line_tx.send(InputEvent::Error(e.to_string()));
                return;
            }
        };
        match editor.create_external_printer() {
            Ok(printer) => {
                let _ = line_tx.send(InputEvent::Printer(Box::new(printer)));
            }
            Err(e) => tracing::debug!(error = %e, "no external printer, replies may hide the prompt"),
        }

        while ready_rx.recv().is_ok() {
            let event = match editor.readline(PROMPT) {
                Ok(line) => {
                    let _ = editor.add_history_entry(line.as_str());
                    InputEvent::Line(line)
                }
                Err(ReadlineError::Interrupted) => InputEvent::Interrupted,
                Err(ReadlineError::Eof) => InputEvent::Eof,
                Err(e) => InputEvent::Error(e.to_string()),
            };
            let last = !matches!(event, InputEvent::Line(_));
            if line_tx.send(event).is_err() || last {
                break;
            }
        }
    });
}

enum InputEvent {
    Line(String),
    Printer(Box<dyn ExternalPrinter + Send>),
    Interrupted,
    Eof,
    Error(String),
}
