#[cfg(test)]
#[path = "repl_test.rs"]
mod tests;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use yansi::Paint;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::AgentTask;
use crate::domain::models::Event;
use crate::domain::models::Message;
use crate::domain::models::MessageKind;
use crate::domain::models::Progress;
use crate::domain::models::Role;
use crate::domain::models::SendOutcome;
use crate::domain::models::Session;
use crate::domain::models::SlashCommand;
use crate::domain::models::TaskStatus;
use crate::domain::services::ChatService;
use crate::domain::services::RevealSequence;
use crate::domain::services::SessionManager;
use crate::infrastructure::api::AgentD;

pub fn help_text() -> String {
    let text = r#"
COMMANDS:
- /sessions (/s) - List sessions, marking the active one.
- /new (/n) [TITLE] - Start a new session.
- /select (/o) ID - Switch to a session and print its history.
- /delete (/d) ID - Delete a session.
- /help (/h) - Print this help.
- /quit (/q, /exit) - Exit the chat.
        "#;

    return text.trim().to_string();
}

fn truncate_line(text: &str, max: usize) -> String {
    let line = text.split('\n').next().unwrap_or_default();
    if line.chars().count() <= max {
        return line.to_string();
    }

    let cut = line.chars().take(max.saturating_sub(3)).collect::<String>();
    return format!("{cut}...");
}

pub fn format_session(session: &Session) -> String {
    return format!(
        "- (ID: {}) {}, {}",
        session.id,
        session.updated_at.format("%Y-%m-%d %H:%M"),
        truncate_line(&session.title, 70)
    );
}

pub fn format_task(task: &AgentTask) -> String {
    let mut res = format!("- (ID: {}) {} [{}]", task.id, task.name, task.status);
    if let Some(last_result) = &task.last_result {
        res = format!("{res}, {}", truncate_line(last_result, 70));
    }

    return res;
}

pub fn format_progress(progress: &Progress) -> String {
    let mut res = format!(
        "[{:>3}%] step {}/{}",
        progress.percent(),
        progress.step,
        progress.total
    );
    if !progress.message.is_empty() {
        res = format!("{res}: {}", progress.message);
    }

    return res;
}

pub fn format_message(message: &Message) -> String {
    let author = match message.role {
        Role::User => Paint::cyan("you").bold().to_string(),
        Role::Assistant => Paint::green("agent").bold().to_string(),
    };

    match message.message_kind() {
        MessageKind::Error => return format!("{author}: {}", Paint::red(&message.content)),
        MessageKind::Normal => return format!("{author}: {}", message.content),
    }
}

pub fn format_task_status(status: TaskStatus) -> String {
    let text = status.to_string();
    return match status {
        TaskStatus::Completed => Paint::green(text).to_string(),
        TaskStatus::Failed => Paint::red(text).to_string(),
        TaskStatus::Running => Paint::yellow(text).to_string(),
        TaskStatus::Idle => text,
    };
}

fn render_event(event: &Event) {
    match event {
        Event::Presentation(_, state) if state.is_awaiting() => match state.progress() {
            Some(progress) => println!("{}", Paint::new(format_progress(progress)).dimmed()),
            None => println!("{}", Paint::new("Waiting for the agent...").dimmed()),
        },
        Event::PersistFailed(session_id, err) => {
            eprintln!(
                "{}",
                Paint::yellow(format!("Message in session {session_id} was not saved: {err}"))
            );
        }
        _ => {}
    }
}

/// Line-based chat front end over a `ChatService`.
pub struct Repl {
    chat: ChatService,
    events: mpsc::UnboundedReceiver<Event>,
    typing_delay: Duration,
}

impl Repl {
    pub fn new(chat: ChatService, events: mpsc::UnboundedReceiver<Event>, typing_delay: Duration) -> Repl {
        return Repl {
            chat,
            events,
            typing_delay,
        };
    }

    /// Connects to the configured backend and picks the session to talk to:
    /// a fresh one, the configured `session-id`, or the most recent.
    pub async fn connect(new_session: bool) -> Result<Repl> {
        let backend = Arc::new(AgentD::default());
        let (tx, rx) = mpsc::unbounded_channel::<Event>();
        let sessions = SessionManager::new(backend.clone(), Config::session_kind()?, tx);
        let repl = Repl::new(
            ChatService::new(sessions, backend),
            rx,
            Config::get_duration(ConfigKey::TypingDelay)?,
        );

        let sessions = repl.chat.sessions();
        if new_session {
            sessions.initialize_new().await?;
            return Ok(repl);
        }

        sessions.initialize().await?;
        let session_id = Config::get(ConfigKey::SessionID);
        if !session_id.is_empty() {
            sessions.select_session(&session_id).await?;
        } else if let Some(active) = sessions.active_session_id().await {
            sessions.load_messages(&active).await?;
        }

        return Ok(repl);
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            render_event(&event);
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        self.drain_events();
        if let Some(session) = self.chat.sessions().active_session().await {
            println!("{}", Paint::new(format!("Session: {}", session.title)).bold());
            for message in &session.messages {
                println!("{}", format_message(message));
            }
        }
        println!("{}", Paint::new("Type /help for commands.").dimmed());

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("{} ", Paint::cyan(">").bold());
            std::io::stdout().flush()?;

            let line = match lines.next_line().await? {
                Some(line) => line,
                None => break,
            };
            let text = line.trim();
            if text.is_empty() {
                continue;
            }

            if let Some(cmd) = SlashCommand::parse(text) {
                if !self.handle_command(&cmd).await? {
                    break;
                }
                continue;
            }
            if text.starts_with('/') {
                println!("Unknown command. Type /help for commands.");
                continue;
            }

            self.send(text).await?;
        }

        return Ok(());
    }

    /// Returns false when the REPL should exit.
    async fn handle_command(&mut self, cmd: &SlashCommand) -> Result<bool> {
        let sessions = self.chat.sessions().clone();

        if cmd.is_quit() {
            return Ok(false);
        }

        if cmd.is_help() {
            println!("{}", help_text());
            return Ok(true);
        }

        let res = if cmd.is_sessions() {
            let snapshot = sessions.snapshot().await;
            for session in snapshot.sessions() {
                let line = format_session(session);
                if snapshot.active_session_id() == Some(session.id.as_str()) {
                    println!("{}", Paint::new(format!("{line} (active)")).bold());
                } else {
                    println!("{line}");
                }
            }
            Ok(())
        } else if cmd.is_new() {
            sessions
                .create_session(cmd.rest().as_deref())
                .await
                .map(|session| {
                    println!("Started session {} ({})", session.id, session.title);
                })
        } else if cmd.is_select() {
            let session_id = cmd.target().unwrap_or_default();
            match sessions.select_session(session_id).await {
                Ok(()) => {
                    if let Some(session) = sessions.active_session().await {
                        println!("{}", Paint::new(format!("Session: {}", session.title)).bold());
                        for message in &session.messages {
                            println!("{}", format_message(message));
                        }
                    }
                    Ok(())
                }
                Err(err) => Err(err),
            }
        } else if cmd.is_delete() {
            let session_id = cmd.target().unwrap_or_default();
            sessions
                .delete_session(session_id)
                .await
                .map(|_| {
                    println!("Deleted session {session_id}");
                })
        } else {
            Ok(())
        };

        self.drain_events();
        if let Err(err) = res {
            eprintln!("{}", Paint::red(err.to_string()));
        }

        return Ok(true);
    }

    /// Sends one message, printing progress while it is in flight.
    pub async fn send(&mut self, text: &str) -> Result<Option<SendOutcome>> {
        let chat = self.chat.clone();
        let send = chat.send_message(text);
        tokio::pin!(send);

        let res = loop {
            tokio::select! {
                res = &mut send => break res,
                Some(event) = self.events.recv() => render_event(&event),
            }
        };
        self.drain_events();

        match res {
            Ok(outcome) => {
                self.print_reply(&outcome).await;
                return Ok(Some(outcome));
            }
            Err(err) => {
                eprintln!("{}", Paint::red(err.to_string()));
                return Ok(None);
            }
        }
    }

    async fn print_reply(&self, outcome: &SendOutcome) {
        if outcome.is_failure() {
            println!("{}", Paint::red(outcome.text()));
            return;
        }

        if self.typing_delay.is_zero() {
            println!("{}", outcome.text());
            return;
        }

        let lines = outcome.text().split('\n').collect::<Vec<&str>>();
        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let reveal = RevealSequence::start(outcome.text(), self.typing_delay, tx);
        let mut printed = 0;

        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(Event::RevealLine(line)) => {
                        println!("{line}");
                        printed += 1;
                    }
                    Some(Event::RevealDone()) | None => break,
                    Some(_) => {}
                },
                _ = tokio::signal::ctrl_c() => {
                    reveal.cancel();
                    for line in lines.iter().skip(printed) {
                        println!("{line}");
                    }
                    break;
                }
            }
        }
    }
}
