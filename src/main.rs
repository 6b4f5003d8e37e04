use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voicebot::integration::{
    BotConfig, SessionEvent, SessionHandle, SessionWorker, DEFAULT_SECRETS_PATH,
};
use voicebot::llm::SAMPLE_QUESTIONS;
use voicebot::messages::Speaker;

const HELP: &str = "\
Commands:
  /samples        list sample questions
  /1 .. /5        ask a sample question
  /audio <path>   transcribe a WAV file and send it
  /reset          clear the conversation
  /quit           exit";

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voicebot=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    info!("Starting voice bot");

    let config = BotConfig::load(DEFAULT_SECRETS_PATH)
        .context("No API key found; set OPENAI_API_KEY or add it to secrets.toml")?;
    debug!("Loaded {:?}", config);

    let handle = SessionWorker::from_config(&config)?.spawn()?;

    println!("AI Engineer Voice Bot. Ask me anything about my journey in AI.");
    println!("{}", HELP);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let input = line.trim();

        let submitted = match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => {
                println!("{}", HELP);
                continue;
            }
            "/samples" => {
                for (i, question) in SAMPLE_QUESTIONS.iter().enumerate() {
                    println!("  /{}  {}", i + 1, question);
                }
                continue;
            }
            "/reset" => handle.reset(),
            _ if audio_path(input).is_some() => {
                let path = audio_path(input).unwrap_or_default();
                if path.is_empty() {
                    println!("Usage: /audio <path>");
                    continue;
                }
                match std::fs::read(path) {
                    Ok(bytes) => handle.submit_audio(bytes),
                    Err(e) => {
                        println!("Could not read {:?}: {}", path, e);
                        continue;
                    }
                }
            }
            _ => match sample_question(input) {
                Some(question) => handle.submit_text(question),
                None => handle.submit_text(input),
            },
        };

        match submitted {
            Ok(()) => wait_for_idle(&handle),
            Err(e) => println!("{}", e),
        }
    }

    handle.shutdown();
    info!("Voice bot stopped");
    Ok(())
}

/// `/N` selects the N-th sample question
fn sample_question(input: &str) -> Option<&'static str> {
    let index: usize = input.strip_prefix('/')?.parse().ok()?;
    SAMPLE_QUESTIONS.get(index.checked_sub(1)?).copied()
}

/// Path argument of an `/audio` command; empty when the path is missing
fn audio_path(input: &str) -> Option<&str> {
    let rest = input.strip_prefix("/audio")?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

/// Print events until the worker is ready for the next command
fn wait_for_idle(handle: &SessionHandle) {
    loop {
        match handle.recv_event_timeout(Duration::from_secs(120)) {
            Some(SessionEvent::TurnAppended(turn)) => match turn.speaker {
                Speaker::User => println!("{}: {}", turn.speaker, turn.text),
                Speaker::Assistant => println!("\n{}: {}\n", turn.speaker, turn.text),
            },
            Some(SessionEvent::Speak(utterance)) => {
                debug!("Speakable reply: {}", utterance.text);
            }
            Some(SessionEvent::Error(message)) => warn!("{}", message),
            Some(SessionEvent::ResetComplete) => {
                println!("Conversation cleared.");
                return;
            }
            Some(SessionEvent::Idle) => return,
            Some(SessionEvent::Shutdown) | None => {
                warn!("Session worker is not responding");
                return;
            }
        }
    }
}
