//! Interactive chat session for the terminal front end.
//!
//! Lines typed by the user are parsed into [`Command`]s. Plain text is a
//! message for the selected chat; slash commands manage chats and the
//! view. Store events drive what gets printed: while the view follows
//! the bottom, new messages are rendered as they land; once the user has
//! scrolled back, only a "new messages below" hint is shown until they
//! jump back to the latest message.

use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use colloquy_chat::{lock_store, ChatError, Reconciler, SendOutcome};
use colloquy_core::config::TranscriptConfig;
use colloquy_core::{ChatId, StoreEvent};
use colloquy_ui::{render_message, render_transcript, ConfirmOutcome, DeleteConfirmation, ScrollController};

/// Height of one terminal line in the units the follow threshold uses.
pub const LINE_HEIGHT: f64 = 20.0;

/// Lines shown when the view is redrawn at the bottom or scrolled back.
const PAGE_LINES: usize = 20;

const HELP: &[&str] = &[
    "Type a message and press enter to send it to the selected chat.",
    "  /new [name]     create a chat and switch to it",
    "  /list           list chats",
    "  /open <n|id>    switch to a chat by list position or id",
    "  /delete [n|id]  delete a chat (repeat to confirm)",
    "  /refresh        reload the chat list",
    "  /back <lines>   scroll back through the transcript",
    "  /latest         jump to the newest message",
    "  /help           show this help",
    "  /quit           leave",
];

// =============================================================================
// Commands
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    New(Option<String>),
    List,
    Open(String),
    Delete(Option<String>),
    Refresh,
    Back(usize),
    Latest,
    Help,
    Quit,
    Unknown(String),
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Some(Command::Send(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, Some(arg.trim().to_string()).filter(|a| !a.is_empty())),
        None => (rest, None),
    };

    let cmd = match (name, arg) {
        ("new", arg) => Command::New(arg),
        ("list" | "ls", None) => Command::List,
        ("open", Some(arg)) => Command::Open(arg),
        ("delete" | "rm", arg) => Command::Delete(arg),
        ("refresh", None) => Command::Refresh,
        ("back", Some(arg)) => match arg.parse() {
            Ok(lines) => Command::Back(lines),
            Err(_) => Command::Unknown(line.to_string()),
        },
        ("latest", None) => Command::Latest,
        ("help" | "?", None) => Command::Help,
        ("quit" | "exit" | "q", None) => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    };
    Some(cmd)
}

/// What the caller should do after a command ran.
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    Print(Vec<String>),
    /// Spawn [`ChatSession::send_task`] for this text.
    Send(String),
    Quit,
}

// =============================================================================
// Session
// =============================================================================

pub struct ChatSession {
    reconciler: Reconciler,
    scroll: ScrollController,
    confirm: DeleteConfirmation,
    confirm_window: Duration,
    /// Lines the view is currently scrolled back from the bottom.
    offset_lines: usize,
}

impl ChatSession {
    pub fn new(reconciler: Reconciler, transcript: &TranscriptConfig) -> Self {
        Self {
            reconciler,
            scroll: ScrollController::new(transcript.follow_threshold),
            confirm: DeleteConfirmation::default(),
            confirm_window: Duration::seconds(transcript.delete_confirm_secs as i64),
            offset_lines: 0,
        }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn scroll(&self) -> &ScrollController {
        &self.scroll
    }

    /// Load the chat list and open the newest chat.
    ///
    /// Output comes through the resulting store events.
    pub async fn start(&mut self) -> Result<(), ChatError> {
        let chats = self.reconciler.refresh_chats().await?;
        if let Some(first) = chats.first() {
            self.reconciler.open_chat(&first.id).await?;
        }
        Ok(())
    }

    /// Run one command. Errors are turned into output lines.
    pub async fn execute(&mut self, cmd: Command, now: DateTime<Utc>) -> Step {
        let result = match cmd {
            Command::Send(text) => return Step::Send(text),
            Command::Quit => return Step::Quit,
            Command::Help => Ok(HELP.iter().map(|l| l.to_string()).collect()),
            Command::Unknown(line) => Ok(vec![format!("? unknown command: {line} (try /help)")]),
            Command::List => Ok(self.list_lines()),
            Command::Back(lines) => Ok(self.scroll_back(lines)),
            Command::Latest => Ok(self.jump_to_latest()),
            Command::New(name) => {
                let name = name.unwrap_or_else(|| self.reconciler.config().default_chat_name.clone());
                self.reconciler.create_chat(&name).await.map(|_| Vec::new())
            }
            Command::Open(target) => match self.resolve_target(&target) {
                Some(chat_id) => self.reconciler.open_chat(&chat_id).await.map(|_| Vec::new()),
                None => Ok(vec![format!("! no chat matches '{target}'")]),
            },
            Command::Refresh => self
                .reconciler
                .refresh_chats()
                .await
                .map(|chats| vec![format!("{} chat(s)", chats.len())]),
            Command::Delete(target) => self.delete(target, now).await,
        };
        match result {
            Ok(lines) => Step::Print(lines),
            Err(e) => Step::Print(vec![format!("! {e}")]),
        }
    }

    /// Build the send for `text` against the currently selected chat.
    ///
    /// The future owns its own handle on the reconciler so it can be
    /// spawned and keep running while the user switches chats.
    pub fn send_task(
        &self,
        text: String,
    ) -> impl Future<Output = Result<SendOutcome, ChatError>> + Send + 'static {
        let reconciler = self.reconciler.clone();
        let chat_id = lock_store(reconciler.store()).current_chat_id().cloned();
        async move { reconciler.send(chat_id, &text).await }
    }

    /// Report how a spawned send finished.
    pub fn on_send_result(&mut self, result: Result<SendOutcome, ChatError>) -> Vec<String> {
        match result {
            Ok(outcome) => {
                debug!(chat_id = %outcome.chat_id, message_id = %outcome.user.id, "Send settled");
                Vec::new()
            }
            Err(e) if e.is_user_visible() => vec![format!("! {e}")],
            Err(e) => {
                debug!(error = %e, "Send rejected");
                Vec::new()
            }
        }
    }

    /// React to a store change. Returns the lines to print.
    pub fn on_event(&mut self, event: &StoreEvent) -> Vec<String> {
        let current = self.current_chat_id();
        match event {
            StoreEvent::ChatSelected { chat_id: Some(chat_id) } => {
                self.scroll.reset();
                self.offset_lines = 0;
                let mut lines = self.header_lines(chat_id);
                if self.scroll.apply_pending_scroll() {
                    lines.extend(self.tail(0));
                }
                lines
            }
            StoreEvent::ChatSelected { chat_id: None } => vec!["-- no chat selected --".to_string()],
            StoreEvent::MessageAppended {
                chat_id,
                message_id,
            } if current.as_ref() == Some(chat_id) => {
                if !self.scroll.on_message_appended() {
                    return vec!["-- new messages below, /latest to jump --".to_string()];
                }
                self.scroll.apply_pending_scroll();
                let store = lock_store(self.reconciler.store());
                let lines = store
                    .messages(chat_id)
                    .and_then(|msgs| msgs.iter().find(|m| &m.id == message_id))
                    .map(|m| render_message(m, store.is_provisional(&m.id)))
                    .unwrap_or_default();
                lines
            }
            StoreEvent::ChatDeleted { chat_id, selected } => {
                let mut lines = vec![format!("-- chat {chat_id} deleted --")];
                if selected.is_none() {
                    lines.push("-- no chats left, /new to start one --".to_string());
                }
                lines
            }
            other => {
                debug!(event = other.event_name(), "Store event");
                Vec::new()
            }
        }
    }

    /// The broadcast channel dropped events; redraw from the store.
    pub fn on_lagged(&mut self, skipped: u64) -> Vec<String> {
        warn!(skipped, "Missed store events, redrawing");
        self.jump_to_latest()
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn current_chat_id(&self) -> Option<ChatId> {
        lock_store(self.reconciler.store()).current_chat_id().cloned()
    }

    fn header_lines(&self, chat_id: &ChatId) -> Vec<String> {
        let store = lock_store(self.reconciler.store());
        let name = store.chat(chat_id).map(|c| c.name.as_str()).unwrap_or("?");
        vec![format!("== {name} ({chat_id}) ==")]
    }

    fn list_lines(&self) -> Vec<String> {
        let store = lock_store(self.reconciler.store());
        let current = store.current_chat_id();
        let chats = store.list_chats();
        if chats.is_empty() {
            return vec!["no chats yet, /new to start one".to_string()];
        }
        chats
            .iter()
            .enumerate()
            .map(|(i, chat)| {
                let marker = if current == Some(&chat.id) { '*' } else { ' ' };
                format!(
                    "{marker} {:>2}. {} ({}, {})",
                    i + 1,
                    chat.name,
                    chat.id,
                    chat.created_at.format("%Y-%m-%d %H:%M")
                )
            })
            .collect()
    }

    /// A 1-based list position or a chat id.
    fn resolve_target(&self, target: &str) -> Option<ChatId> {
        let store = lock_store(self.reconciler.store());
        if let Ok(pos) = target.parse::<usize>() {
            if let Some(chat) = pos.checked_sub(1).and_then(|i| store.list_chats().get(i).cloned()) {
                return Some(chat.id);
            }
        }
        let id = ChatId::new(target);
        store.contains_chat(&id).then_some(id)
    }

    async fn delete(&mut self, target: Option<String>, now: DateTime<Utc>) -> Result<Vec<String>, ChatError> {
        let chat_id = match target {
            Some(t) => match self.resolve_target(&t) {
                Some(id) => id,
                None => return Ok(vec![format!("! no chat matches '{t}'")]),
            },
            None => match self.current_chat_id() {
                Some(id) => id,
                None => return Ok(vec!["! no chat selected".to_string()]),
            },
        };

        match self.confirm.request(&chat_id, now, self.confirm_window) {
            ConfirmOutcome::AwaitingConfirmation { .. } => Ok(vec![format!(
                "delete {chat_id}? repeat the command within {}s to confirm",
                self.confirm_window.num_seconds()
            )]),
            ConfirmOutcome::Confirmed(chat_id) => {
                let selected = self.reconciler.delete_chat(&chat_id).await?;
                if let Some(next) = selected {
                    self.reconciler.open_chat(&next).await?;
                }
                Ok(Vec::new())
            }
        }
    }

    fn transcript_lines(&self) -> Vec<String> {
        let store = lock_store(self.reconciler.store());
        render_transcript(store.current_messages(), |id| store.is_provisional(id))
    }

    /// The page of transcript lines ending `offset` lines above the bottom.
    fn tail(&self, offset: usize) -> Vec<String> {
        let lines = self.transcript_lines();
        let end = lines.len().saturating_sub(offset);
        let start = end.saturating_sub(PAGE_LINES);
        lines[start..end].to_vec()
    }

    fn scroll_back(&mut self, by: usize) -> Vec<String> {
        let total = self.transcript_lines().len();
        self.offset_lines = (self.offset_lines + by).min(total.saturating_sub(1));
        self.scroll.on_scroll(self.offset_lines as f64 * LINE_HEIGHT);
        let mut lines = self.tail(self.offset_lines);
        if self.scroll.shows_jump_affordance() {
            lines.push(format!("-- {} line(s) below, /latest to jump --", self.offset_lines));
        }
        lines
    }

    fn jump_to_latest(&mut self) -> Vec<String> {
        self.scroll.jump_to_latest();
        self.offset_lines = 0;
        if self.scroll.apply_pending_scroll() {
            self.tail(0)
        } else {
            Vec::new()
        }
    }
}
