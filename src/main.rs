//! Jira chat terminal client
//!
//! Entry point: a line-oriented front end over [`StreamingChatClient`].

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::io::Write as _;

use anyhow::Context as _;
use dotenvy::dotenv;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use jira_chat_client::config::{AppConfig, LogConfig, LogFormat, OutputMode};
use jira_chat_client::events::ChatEvent;
use jira_chat_client::preferences::Preferences;
use jira_chat_client::session::Navigation;
use jira_chat_client::state::InitialState;
use jira_chat_client::view::MessageRole;
use jira_chat_client::{ChatClient, ChatError, ChatSettings, StreamingChatClient, SubmitOutcome};

const HELP: &str = "\
Commands:
  <text>           send a message
  /sessions        list chat sessions
  /open <id>       open a session
  /new             start a new chat
  /rename <title>  rename the current chat
  /delete [--yes]  delete the current chat (asks first)
  /auto [on|off]   show or set ticket auto-assign
  /html            print the chat pane as HTML
  /help            show this help
  /quit            exit
Ctrl-C while a reply streams cancels it; at the prompt it exits.";

const DELETE_PROMPT: &str =
    "Are you sure you want to delete this chat? This action cannot be undone. [y/N] ";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Send(String),
    Sessions,
    Open(String),
    New,
    Rename(String),
    Delete { confirmed: bool },
    AutoAssign(Option<bool>),
    Html,
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Self::Send(line.to_string());
        };
        let (name, arg) = rest
            .split_once(char::is_whitespace)
            .map_or((rest, ""), |(n, a)| (n, a.trim()));

        match (name, arg) {
            ("sessions", _) => Self::Sessions,
            ("open", id) if !id.is_empty() => Self::Open(id.to_string()),
            ("new", _) => Self::New,
            ("rename", title) => Self::Rename(title.to_string()),
            ("delete", "") => Self::Delete { confirmed: false },
            ("delete", "--yes" | "-y") => Self::Delete { confirmed: true },
            ("auto", "") => Self::AutoAssign(None),
            ("auto", "on") => Self::AutoAssign(Some(true)),
            ("auto", "off") => Self::AutoAssign(Some(false)),
            ("html", _) => Self::Html,
            ("quit" | "exit", _) => Self::Quit,
            _ => Self::Help,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenv();

    let config = AppConfig::load().context("Configuration error")?;
    init_tracing(&config.log);

    info!(
        name: "config.loaded",
        base_url = %config.server.base_url,
        session = ?config.server.session_id,
        "Configuration loaded"
    );

    let mut initial = match &config.client.history_file {
        Some(path) => InitialState::from_file(path)
            .await
            .with_context(|| format!("Failed to read initial state from {path}"))?,
        None => InitialState::default(),
    };
    if config.server.session_id.is_some() {
        initial.current_session_id.clone_from(&config.server.session_id);
    }
    if config.server.csrf_token.is_some() {
        initial.csrf_token.clone_from(&config.server.csrf_token);
    }

    let mut client =
        ChatClient::with_connect_timeout(&config.server.base_url, config.client.connect_timeout())?;
    if initial.csrf_token.is_none() {
        match client.discover_csrf_token(&initial.page_path()).await {
            Ok(Some(token)) => client = client.with_csrf_token(token),
            Ok(None) => warn!(name: "csrf.missing", "No CSRF token found; sending without one"),
            Err(e) => warn!(name: "csrf.lookup.failed", error = %e, "Could not load chat page"),
        }
    }

    let prefs_path = config.client.preferences_path.clone();
    let saved = match Preferences::load(&prefs_path).await {
        Ok(saved) => saved,
        Err(e) => {
            warn!(name: "preferences.load.failed", error = %e, "Ignoring saved preferences");
            None
        }
    };
    let settings = ChatSettings {
        auto_assign: config
            .client
            .auto_assign
            .or(saved.map(|p| p.auto_assign))
            .unwrap_or(false),
        idle_timeout: config.client.stream_idle_timeout(),
    };

    let mut chat = open_page(&client, initial, settings).await;
    let output = config.client.output;

    let mut interrupts = spawn_interrupt_listener();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match prompt(&mut lines, &mut interrupts, "> ").await? {
            Input::Line(line) => line,
            Input::Interrupted | Input::Closed => break,
        };

        let navigation = match Command::parse(&line) {
            Command::Send(text) => {
                run_submit(&chat, &text, output, &mut interrupts).await;
                None
            }
            Command::Sessions => {
                match chat.load_sessions().await {
                    Ok(()) => print_sessions(&chat),
                    Err(e) => warn!(name: "chat.sessions.failed", error = %e, "Error loading chat sessions"),
                }
                None
            }
            Command::Open(id) => Some(chat.click_session(&id)),
            Command::New => match chat.new_chat().await {
                Ok(nav) => Some(nav),
                Err(e) => {
                    warn!(name: "chat.new.failed", error = %e, "Error creating new chat");
                    None
                }
            },
            Command::Rename(title) => {
                match chat.rename_chat(&title).await {
                    Ok(stored) => println!("Renamed to \"{stored}\""),
                    Err(ChatError::EmptyInput) => println!("Usage: /rename <title>"),
                    Err(e) => warn!(name: "chat.rename.failed", error = %e, "Error renaming chat"),
                }
                None
            }
            Command::Delete { confirmed } => {
                let confirmed = confirmed
                    || chat.current_session_id().is_none()
                    || match prompt(&mut lines, &mut interrupts, DELETE_PROMPT).await? {
                        Input::Line(answer) => is_yes(&answer),
                        Input::Interrupted | Input::Closed => false,
                    };
                if confirmed {
                    match chat.delete_chat().await {
                        Ok(nav) => Some(nav),
                        Err(e) => {
                            warn!(name: "chat.delete.failed", error = %e, "Error deleting chat");
                            None
                        }
                    }
                } else {
                    println!("Delete cancelled.");
                    None
                }
            }
            Command::AutoAssign(value) => {
                let enabled = value.unwrap_or_else(|| chat.auto_assign());
                println!("{}", chat.set_auto_assign(enabled));
                if value.is_some() {
                    let prefs = Preferences {
                        auto_assign: enabled,
                    };
                    if let Err(e) = prefs.save(&prefs_path).await {
                        warn!(name: "preferences.save.failed", error = %e, "Could not save preferences");
                    }
                }
                None
            }
            Command::Html => {
                println!("{}", chat.render_sessions());
                println!("{}", chat.render_chat());
                None
            }
            Command::Help => {
                println!("{HELP}");
                None
            }
            Command::Quit => break,
        };

        let session_id = match navigation {
            Some(Navigation::Session(id)) => Some(id),
            Some(Navigation::Home) => None,
            Some(Navigation::Stay) | None => continue,
        };
        let settings = ChatSettings {
            auto_assign: chat.auto_assign(),
            ..settings
        };
        chat = open_page(&client, InitialState::for_session(session_id), settings).await;
    }

    Ok(())
}

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));

    // Logs go to stderr so replies on stdout stay clean.
    let (text, json) = match log.format {
        LogFormat::Text => (
            Some(fmt::layer().with_target(true).with_writer(std::io::stderr)),
            None,
        ),
        LogFormat::Json => (None, Some(fmt::layer().json().with_writer(std::io::stderr))),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .init();
}

/// Build the controller for a page, show its history and load the sidebar.
async fn open_page(
    client: &ChatClient,
    initial: InitialState,
    settings: ChatSettings,
) -> StreamingChatClient {
    let chat = StreamingChatClient::new(client.clone(), initial, settings);
    info!(name: "chat.page.opened", path = %chat.page_path(), "Chat page opened");

    match chat.current_session_id() {
        Some(id) => println!("── chat {id} ──"),
        None => println!("── new chat ──"),
    }
    for message in chat.view().messages() {
        let label = match message.role {
            MessageRole::User => "You",
            MessageRole::Bot => "AI",
            MessageRole::Error => "Error",
        };
        println!("{label}: {}", message.text);
    }

    if let Err(e) = chat.load_sessions().await {
        warn!(name: "chat.sessions.failed", error = %e, "Error loading chat sessions");
    }
    chat
}

/// One read from the terminal.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Line(String),
    Interrupted,
    Closed,
}

/// Forward every Ctrl-C to a channel.
///
/// Listening once for the whole session keeps SIGINT handled while no
/// reply is streaming.
fn spawn_interrupt_listener() -> mpsc::UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx.send(()).is_err() {
                break;
            }
        }
    });
    rx
}

/// Print `label` and wait for a line or an interrupt, whichever comes first.
async fn prompt<R>(
    lines: &mut Lines<R>,
    interrupts: &mut mpsc::UnboundedReceiver<()>,
    label: &str,
) -> std::io::Result<Input>
where
    R: AsyncBufRead + Unpin,
{
    print!("{label}");
    std::io::stdout().flush()?;

    tokio::select! {
        biased;
        Some(()) = interrupts.recv() => {
            println!();
            Ok(Input::Interrupted)
        }
        line = lines.next_line() => Ok(line?.map_or(Input::Closed, Input::Line)),
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Send a message, printing the reply as it streams. Ctrl-C cancels it.
async fn run_submit(
    chat: &StreamingChatClient,
    text: &str,
    output: OutputMode,
    interrupts: &mut mpsc::UnboundedReceiver<()>,
) {
    let submit = chat.submit_with(text, |event| print_event(event, output));
    tokio::pin!(submit);

    let outcome = loop {
        tokio::select! {
            outcome = &mut submit => break outcome,
            Some(()) = interrupts.recv() => {
                chat.cancel();
            }
        }
    };
    // Extra presses made while the cancelled reply wound down.
    while interrupts.try_recv().is_ok() {}

    match outcome {
        Ok(SubmitOutcome::Failed { error }) => {
            warn!(name: "chat.submit.failed", error = %error, "Message not delivered");
        }
        Ok(_) => {}
        Err(e) => warn!(name: "chat.submit.rejected", error = %e, "Message not sent"),
    }
}

fn print_event(event: &ChatEvent, output: OutputMode) {
    if output == OutputMode::Events {
        println!("{}", event.to_json_line());
        return;
    }

    let mut stdout = std::io::stdout().lock();
    let _ = match event {
        ChatEvent::ResponseStarted => write!(stdout, "AI: "),
        ChatEvent::Fragment { text } => write!(stdout, "{text}"),
        ChatEvent::ResponseComplete { .. } => writeln!(stdout),
        ChatEvent::Cancelled { .. } => writeln!(stdout, " [cancelled]"),
        ChatEvent::Failed { message, .. } => writeln!(stdout, "Error: {message}"),
        ChatEvent::SubmitStarted { .. }
        | ChatEvent::UserMessage { .. }
        | ChatEvent::InputUnlocked => Ok(()),
    };
    let _ = stdout.flush();
}

fn print_sessions(chat: &StreamingChatClient) {
    let sessions = chat.sessions();
    if sessions.entries().is_empty() {
        println!("No chats yet.");
    }
    for entry in sessions.entries() {
        let marker = if entry.active { "*" } else { " " };
        println!(
            "{marker} {}  {}  ({} messages, {})",
            entry.session_id, entry.title, entry.message_count, entry.last_activity
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_sent() {
        assert_eq!(
            Command::parse("create a bug"),
            Command::Send("create a bug".to_string())
        );
    }

    #[test]
    fn test_commands() {
        assert_eq!(Command::parse("/sessions"), Command::Sessions);
        assert_eq!(Command::parse("/open abc"), Command::Open("abc".into()));
        assert_eq!(Command::parse("/open"), Command::Help);
        assert_eq!(
            Command::parse("/rename  Sprint 12 bugs "),
            Command::Rename("Sprint 12 bugs".into())
        );
        assert_eq!(Command::parse("/auto on"), Command::AutoAssign(Some(true)));
        assert_eq!(Command::parse("/auto"), Command::AutoAssign(None));
        assert_eq!(Command::parse("/exit"), Command::Quit);
        assert_eq!(Command::parse("/bogus"), Command::Help);
    }

    #[test]
    fn test_delete_asks_unless_confirmed() {
        assert_eq!(Command::parse("/delete"), Command::Delete { confirmed: false });
        assert_eq!(Command::parse("/delete --yes"), Command::Delete { confirmed: true });
        assert_eq!(Command::parse("/delete -y"), Command::Delete { confirmed: true });
        assert_eq!(Command::parse("/delete now"), Command::Help);
    }

    #[test]
    fn test_only_yes_confirms() {
        assert!(is_yes("y"));
        assert!(is_yes(" YES \n"));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("sure"));
    }

    #[tokio::test]
    async fn test_prompt_returns_line() {
        let (_tx, mut interrupts) = mpsc::unbounded_channel();
        let mut lines = BufReader::new(&b"hello\n"[..]).lines();

        let input = prompt(&mut lines, &mut interrupts, "").await.unwrap();
        assert_eq!(input, Input::Line("hello".to_string()));
        let input = prompt(&mut lines, &mut interrupts, "").await.unwrap();
        assert_eq!(input, Input::Closed);
    }

    #[tokio::test]
    async fn test_interrupt_at_prompt() {
        let (tx, mut interrupts) = mpsc::unbounded_channel();
        // A reader that never yields a line, like an idle terminal.
        let (reader, _writer) = tokio::io::duplex(64);
        let mut lines = BufReader::new(reader).lines();

        tx.send(()).unwrap();
        let input = prompt(&mut lines, &mut interrupts, "").await.unwrap();
        assert_eq!(input, Input::Interrupted);
    }
}
