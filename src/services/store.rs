//! Shared client state for the root component.
//!
//! Every mutation goes through `AppStore`, which notifies subscribers with a
//! `StateChange` right after the state has been updated. Subscribers are
//! called synchronously on the UI thread.

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::api::{ChatHistory, ReplyUpdate};
use crate::config::ERROR_BANNER_TIMEOUT;
use crate::models::{Attachment, ChatId, Conversation, Message};
use crate::services::chat::TurnEvent;
use crate::services::upload::{validate_attachment, UploadError};

#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    /// The chat list or the active chat changed.
    ChatsChanged,
    /// The whole message list was replaced.
    MessagesReset,
    MessageAppended,
    LastMessageUpdated,
    LastMessageRemoved,
    /// The "thinking" placeholder became visible or hidden.
    PlaceholderChanged(bool),
    BusyChanged(bool),
    FilesChanged,
    AttachmentChanged,
    ErrorRaised { generation: u64 },
    ErrorCleared,
    Toast { title: String, body: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBanner {
    pub message: String,
    /// Bumped on every raise so a stale timer never clears a newer error.
    pub generation: u64,
}

#[derive(Debug)]
pub struct InFlightTurn {
    pub id: u64,
    pub chat_id: ChatId,
    pub cancel: CancellationToken,
    pub reply_started: bool,
    /// Handed back to the user if the upload fails.
    pub attachment: Option<Attachment>,
}

/// Everything a background turn needs, detached from the store.
#[derive(Debug, Clone)]
pub struct TurnTicket {
    pub turn_id: u64,
    pub chat_id: ChatId,
    pub prompt: String,
    pub attachment: Option<Attachment>,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("Nothing to send")]
    Empty,
    #[error("No chat is selected")]
    NoActiveChat,
    #[error("A reply is still being generated")]
    Busy,
    #[error("The chat history is still loading")]
    Loading,
}

#[derive(Debug, Default)]
pub struct AppState {
    pub chats: Vec<Conversation>,
    pub active_chat: Option<ChatId>,
    pub messages: Vec<Message>,
    pub files: Vec<String>,
    pub pending_attachment: Option<Attachment>,
    pub turn: Option<InFlightTurn>,
    pub loading_history: bool,
    pub error: Option<ErrorBanner>,
}

impl AppState {
    pub fn is_busy(&self) -> bool {
        self.turn.is_some()
    }

    pub fn placeholder_visible(&self) -> bool {
        self.turn.as_ref().is_some_and(|t| !t.reply_started)
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        let id = self.active_chat?;
        self.chats.iter().find(|c| c.id == id)
    }

    pub fn can_delete(&self) -> bool {
        self.chats.len() > 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(&StateChange, &AppState)>;

#[derive(Default)]
pub struct AppStore {
    state: AppState,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    next_turn: u64,
    error_generation: u64,
}

impl AppStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&StateChange, &AppState) + 'static,
    {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    fn notify(&self, change: StateChange) {
        for (_, listener) in &self.listeners {
            listener(&change, &self.state);
        }
    }

    /// Replace the chat list. Keeps the active chat when it is still listed,
    /// otherwise activates the first chat. Returns the chat whose history
    /// now has to be fetched, if the active chat changed.
    pub fn set_chats(&mut self, chats: Vec<Conversation>) -> Option<ChatId> {
        self.state.chats = chats;
        let still_listed = self
            .state
            .active_chat
            .is_some_and(|id| self.state.chats.iter().any(|c| c.id == id));

        if still_listed {
            self.notify(StateChange::ChatsChanged);
            None
        } else {
            let first = self.state.chats.first().map(|c| c.id);
            self.activate(first);
            first
        }
    }

    /// Append a freshly created chat and make it active.
    pub fn add_chat(&mut self, chat: Conversation) -> ChatId {
        let id = chat.id;
        self.state.chats.retain(|c| c.id != id);
        self.state.chats.push(chat);
        self.activate(Some(id));
        id
    }

    /// Drop a deleted chat. When it was active, the first remaining chat takes
    /// over; its id is returned so its history can be fetched.
    pub fn remove_chat(&mut self, chat_id: ChatId) -> Option<ChatId> {
        self.state.chats.retain(|c| c.id != chat_id);
        if self.state.active_chat == Some(chat_id) {
            let next = self.state.chats.first().map(|c| c.id);
            self.activate(next);
            next
        } else {
            self.notify(StateChange::ChatsChanged);
            None
        }
    }

    /// Switch to a listed chat. Returns false when it is already active or unknown.
    pub fn select_chat(&mut self, chat_id: ChatId) -> bool {
        if self.state.active_chat == Some(chat_id)
            || !self.state.chats.iter().any(|c| c.id == chat_id)
        {
            return false;
        }
        self.activate(Some(chat_id));
        true
    }

    fn activate(&mut self, chat_id: Option<ChatId>) {
        self.cancel_turn();
        self.state.active_chat = chat_id;
        self.state.messages.clear();
        self.state.files.clear();
        self.state.loading_history = chat_id.is_some();
        let had_attachment = self.state.pending_attachment.take().is_some();

        self.notify(StateChange::ChatsChanged);
        self.notify(StateChange::MessagesReset);
        self.notify(StateChange::FilesChanged);
        if had_attachment {
            self.notify(StateChange::AttachmentChanged);
        }
    }

    fn cancel_turn(&mut self) {
        if let Some(turn) = self.state.turn.take() {
            tracing::debug!("Cancelling turn {} in chat {}", turn.id, turn.chat_id);
            turn.cancel.cancel();
            if !turn.reply_started {
                self.notify(StateChange::PlaceholderChanged(false));
            }
            self.notify(StateChange::BusyChanged(false));
        }
    }

    /// History arrived for `chat_id`. Ignored if the user has moved on.
    pub fn load_history(&mut self, chat_id: ChatId, history: ChatHistory) -> bool {
        if self.state.active_chat != Some(chat_id) {
            tracing::debug!("Dropping history for inactive chat {}", chat_id);
            return false;
        }
        self.state.files = history.files.clone();
        let mut messages = history.into_messages();
        if messages.is_empty() {
            messages.push(Message::greeting());
        }
        self.state.messages = messages;
        self.state.loading_history = false;
        self.notify(StateChange::MessagesReset);
        self.notify(StateChange::FilesChanged);
        true
    }

    pub fn history_failed(&mut self, chat_id: ChatId, message: &str) -> Option<u64> {
        if self.state.active_chat != Some(chat_id) {
            return None;
        }
        self.state.loading_history = false;
        self.state.messages = vec![Message::greeting()];
        self.notify(StateChange::MessagesReset);
        Some(self.raise_error(message))
    }

    /// Hold `attachment` for the next submit. Unsupported types are refused
    /// with a toast and clear any pending attachment.
    pub fn select_attachment(&mut self, attachment: Attachment) -> Result<(), UploadError> {
        if let Err(e) = validate_attachment(&attachment) {
            tracing::info!("Refusing {} ({})", attachment.filename, attachment.mime_type);
            self.clear_attachment();
            self.toast(e.to_string(), None);
            return Err(e);
        }
        self.state.pending_attachment = Some(attachment);
        self.notify(StateChange::AttachmentChanged);
        Ok(())
    }

    pub fn clear_attachment(&mut self) {
        if self.state.pending_attachment.take().is_some() {
            self.notify(StateChange::AttachmentChanged);
        }
    }

    /// Admit a prompt: append the user message, show the placeholder and hand
    /// out the ticket the background turn runs with.
    pub fn begin_turn(&mut self, prompt: &str) -> Result<TurnTicket, SubmitError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(SubmitError::Empty);
        }
        let chat_id = self.state.active_chat.ok_or(SubmitError::NoActiveChat)?;
        if self.state.is_busy() {
            return Err(SubmitError::Busy);
        }
        if self.state.loading_history {
            return Err(SubmitError::Loading);
        }

        self.next_turn += 1;
        let cancel = CancellationToken::new();
        let attachment = self.state.pending_attachment.take();
        self.state.turn = Some(InFlightTurn {
            id: self.next_turn,
            chat_id,
            cancel: cancel.clone(),
            reply_started: false,
            attachment: attachment.clone(),
        });
        self.state.messages.push(Message::user(prompt));

        self.notify(StateChange::MessageAppended);
        self.notify(StateChange::BusyChanged(true));
        self.notify(StateChange::PlaceholderChanged(true));
        if attachment.is_some() {
            self.notify(StateChange::AttachmentChanged);
        }

        Ok(TurnTicket {
            turn_id: self.next_turn,
            chat_id,
            prompt: prompt.to_string(),
            attachment,
            cancel,
        })
    }

    /// Apply progress from turn `turn_id`. Events from a cancelled or finished
    /// turn are dropped and `false` is returned.
    pub fn apply_turn_event(&mut self, turn_id: u64, event: TurnEvent) -> bool {
        let Some(turn) = self.state.turn.as_mut().filter(|t| t.id == turn_id) else {
            tracing::debug!("Ignoring event from stale turn {}", turn_id);
            return false;
        };

        match event {
            TurnEvent::Uploaded(receipt) => {
                turn.attachment = None;
                if !self.state.files.contains(&receipt.filename) {
                    self.state.files.push(receipt.filename.clone());
                    self.notify(StateChange::FilesChanged);
                }
                self.toast("File uploaded successfully".to_string(), Some(receipt.summary()));
            }
            TurnEvent::Reply(ReplyUpdate::Started(text)) => {
                turn.reply_started = true;
                self.state.messages.push(Message::agent(text));
                self.notify(StateChange::PlaceholderChanged(false));
                self.notify(StateChange::MessageAppended);
            }
            TurnEvent::Reply(ReplyUpdate::Updated(text)) => {
                if let Some(last) = self.state.messages.last_mut() {
                    last.content = text;
                }
                self.notify(StateChange::LastMessageUpdated);
            }
            TurnEvent::Reply(ReplyUpdate::Finished(text)) => {
                let started = turn.reply_started;
                self.state.turn = None;
                if started {
                    if let Some(last) = self.state.messages.last_mut() {
                        last.content = text;
                    }
                    self.notify(StateChange::LastMessageUpdated);
                } else {
                    self.notify(StateChange::PlaceholderChanged(false));
                }
                self.notify(StateChange::BusyChanged(false));
            }
            TurnEvent::Reply(ReplyUpdate::Failed(message)) => self.fail_turn(&message, false),
            TurnEvent::Aborted(message) => self.fail_turn(&message, true),
        }
        true
    }

    /// End the in-flight turn with `message` in the banner. The partial reply
    /// is dropped; with `restore_attachment` the file that failed to upload
    /// becomes pending again so the user can retry.
    fn fail_turn(&mut self, message: &str, restore_attachment: bool) {
        let Some(turn) = self.state.turn.take() else {
            return;
        };
        if turn.reply_started {
            self.state.messages.pop();
            self.notify(StateChange::LastMessageRemoved);
        } else {
            self.notify(StateChange::PlaceholderChanged(false));
        }
        if restore_attachment && self.state.pending_attachment.is_none() {
            if let Some(attachment) = turn.attachment {
                self.state.pending_attachment = Some(attachment);
                self.notify(StateChange::AttachmentChanged);
            }
        }
        self.notify(StateChange::BusyChanged(false));
        self.raise_error(message);
    }

    /// Show `message` in the error banner. Returns the banner generation the
    /// dismissal timer must present to clear it.
    pub fn raise_error(&mut self, message: &str) -> u64 {
        self.error_generation += 1;
        let generation = self.error_generation;
        tracing::warn!("{}", message);
        self.state.error = Some(ErrorBanner {
            message: message.to_string(),
            generation,
        });
        self.notify(StateChange::ErrorRaised { generation });
        generation
    }

    /// Clear the banner if it still shows the error from `generation`.
    pub fn dismiss_error(&mut self, generation: u64) -> bool {
        match &self.state.error {
            Some(banner) if banner.generation == generation => {
                self.state.error = None;
                self.notify(StateChange::ErrorCleared);
                true
            }
            _ => false,
        }
    }

    pub fn toast(&mut self, title: String, body: Option<String>) {
        self.notify(StateChange::Toast { title, body });
    }
}

/// Resolves once the banner raised with `generation` is due to clear.
pub async fn banner_expiry(generation: u64) -> u64 {
    tokio::time::sleep(ERROR_BANNER_TIMEOUT).await;
    generation
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use super::*;
    use crate::api::types::HistoryEntry;
    use crate::config::GREETING;
    use crate::models::Role;
    use crate::services::upload::UploadReceipt;

    fn chat(id: ChatId, title: &str) -> Conversation {
        Conversation {
            id,
            title: title.to_string(),
        }
    }

    fn recording(store: &mut AppStore) -> Rc<RefCell<Vec<StateChange>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        store.subscribe(move |change, _| sink.borrow_mut().push(change.clone()));
        log
    }

    fn store_with_chat() -> AppStore {
        let mut store = AppStore::new();
        store.set_chats(vec![chat(1, "First"), chat(2, "Second")]);
        store.load_history(1, ChatHistory::default());
        store
    }

    #[test]
    fn test_initial_load_selects_first_chat() {
        let mut store = AppStore::new();
        assert_eq!(store.set_chats(vec![chat(4, "a"), chat(9, "b")]), Some(4));
        assert_eq!(store.state().active_chat, Some(4));
        assert!(store.state().loading_history);

        // A refresh keeps the selection.
        assert_eq!(store.set_chats(vec![chat(9, "b"), chat(4, "renamed")]), None);
        assert_eq!(store.state().active_chat, Some(4));
        assert_eq!(store.state().active_conversation().unwrap().title, "renamed");
    }

    #[test]
    fn test_empty_list_has_no_active_chat() {
        let mut store = AppStore::new();
        assert_eq!(store.set_chats(Vec::new()), None);
        assert_eq!(store.state().active_chat, None);
        assert!(!store.state().loading_history);
        assert_eq!(store.begin_turn("hello").unwrap_err(), SubmitError::NoActiveChat);
    }

    #[test]
    fn test_empty_history_shows_greeting() {
        let store = store_with_chat();
        assert_eq!(store.state().messages.len(), 1);
        assert_eq!(store.state().messages[0].role, Role::Agent);
        assert_eq!(store.state().messages[0].content, GREETING);
    }

    #[test]
    fn test_history_for_inactive_chat_is_dropped() {
        let mut store = store_with_chat();
        let history = ChatHistory {
            messages: vec![HistoryEntry {
                role: "user".to_string(),
                value: "old".to_string(),
            }],
            files: vec!["a.pdf".to_string()],
        };
        assert!(!store.load_history(2, history.clone()));
        assert_eq!(store.state().messages[0].content, GREETING);

        assert!(store.select_chat(2));
        assert!(store.load_history(2, history));
        assert_eq!(store.state().messages, vec![Message::user("old")]);
        assert_eq!(store.state().files, vec!["a.pdf".to_string()]);
    }

    #[test]
    fn test_history_failure_raises_banner() {
        let mut store = AppStore::new();
        store.set_chats(vec![chat(1, "First")]);
        let generation = store
            .history_failed(1, "Failed to load chat history: Network error: refused")
            .unwrap();
        assert_eq!(generation, 1);
        assert_eq!(
            store.state().error.as_ref().unwrap().message,
            "Failed to load chat history: Network error: refused"
        );
        assert!(!store.state().loading_history);
    }

    #[test]
    fn test_deleting_only_chat_clears_active() {
        let mut store = AppStore::new();
        store.set_chats(vec![chat(1, "Only")]);
        assert_eq!(store.remove_chat(1), None);
        assert_eq!(store.state().active_chat, None);
        assert!(store.state().chats.is_empty());
        assert!(store.state().messages.is_empty());
    }

    #[test]
    fn test_deleting_active_chat_falls_back_to_first() {
        let mut store = store_with_chat();
        store.select_chat(2);
        assert_eq!(store.remove_chat(2), Some(1));
        assert_eq!(store.state().active_chat, Some(1));

        store.add_chat(chat(3, "Third"));
        assert_eq!(store.remove_chat(1), None);
        assert_eq!(store.state().active_chat, Some(3));
        assert!(!store.state().can_delete());
    }

    #[test]
    fn test_add_chat_activates_it() {
        let mut store = store_with_chat();
        assert_eq!(store.add_chat(chat(7, "New Chat")), 7);
        assert_eq!(store.state().active_chat, Some(7));
        assert_eq!(store.state().chats.last().unwrap().id, 7);
        assert!(store.state().can_delete());
    }

    #[test]
    fn test_unsupported_attachment_is_refused_with_toast() {
        let mut store = store_with_chat();
        let pdf = Attachment::new("report.pdf", "application/pdf", vec![1]);
        store.select_attachment(pdf).unwrap();
        let log = recording(&mut store);

        let note = Attachment::new("notes.txt", "text/plain", b"hi".to_vec());
        assert!(store.select_attachment(note).is_err());
        assert!(store.state().pending_attachment.is_none());
        assert_eq!(
            log.borrow().as_slice(),
            [
                StateChange::AttachmentChanged,
                StateChange::Toast {
                    title: "That file type is not supported!".to_string(),
                    body: None,
                },
            ]
        );
    }

    #[test]
    fn test_submit_refused_while_history_loads() {
        let mut store = AppStore::new();
        store.set_chats(vec![chat(1, "First")]);
        assert_eq!(store.begin_turn("hi").unwrap_err(), SubmitError::Loading);
        assert!(store.state().messages.is_empty());
        assert!(!store.state().is_busy());

        let history = ChatHistory {
            messages: vec![
                HistoryEntry {
                    role: "user".to_string(),
                    value: "old question".to_string(),
                },
                HistoryEntry {
                    role: "agent".to_string(),
                    value: "old answer".to_string(),
                },
            ],
            files: Vec::new(),
        };
        store.load_history(1, history);

        let ticket = store.begin_turn("hi").unwrap();
        store.apply_turn_event(
            ticket.turn_id,
            TurnEvent::Reply(ReplyUpdate::Finished(String::new())),
        );
        assert_eq!(
            store.state().messages,
            vec![
                Message::user("old question"),
                Message::agent("old answer"),
                Message::user("hi"),
            ]
        );
    }

    #[test]
    fn test_submit_rules() {
        let mut store = store_with_chat();
        assert_eq!(store.begin_turn("   ").unwrap_err(), SubmitError::Empty);

        let ticket = store.begin_turn("  hi there ").unwrap();
        assert_eq!(ticket.prompt, "hi there");
        assert_eq!(ticket.chat_id, 1);
        assert!(store.state().placeholder_visible());
        assert_eq!(store.state().messages.last(), Some(&Message::user("hi there")));

        assert_eq!(store.begin_turn("again").unwrap_err(), SubmitError::Busy);
    }

    #[test]
    fn test_streamed_reply_lifecycle() {
        let mut store = store_with_chat();
        let log = recording(&mut store);
        let ticket = store.begin_turn("hi").unwrap();
        let id = ticket.turn_id;

        store.apply_turn_event(id, TurnEvent::Reply(ReplyUpdate::Started("He".into())));
        assert!(!store.state().placeholder_visible());
        store.apply_turn_event(id, TurnEvent::Reply(ReplyUpdate::Updated("Hello".into())));
        store.apply_turn_event(id, TurnEvent::Reply(ReplyUpdate::Finished("Hello!".into())));

        let messages = &store.state().messages;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2], Message::agent("Hello!"));
        assert!(!store.state().is_busy());
        assert_eq!(
            log.borrow().iter().filter(|c| **c == StateChange::MessageAppended).count(),
            2
        );
    }

    #[test]
    fn test_empty_reply_appends_nothing() {
        let mut store = store_with_chat();
        let ticket = store.begin_turn("hi").unwrap();
        store.apply_turn_event(
            ticket.turn_id,
            TurnEvent::Reply(ReplyUpdate::Finished(String::new())),
        );
        assert_eq!(store.state().messages.len(), 2);
        assert!(!store.state().placeholder_visible());
    }

    #[test]
    fn test_failure_removes_partial_reply() {
        let mut store = store_with_chat();
        let ticket = store.begin_turn("hi").unwrap();
        let id = ticket.turn_id;
        store.apply_turn_event(id, TurnEvent::Reply(ReplyUpdate::Started("par".into())));
        store.apply_turn_event(id, TurnEvent::Reply(ReplyUpdate::Failed("quota exceeded".into())));

        assert_eq!(store.state().messages.last(), Some(&Message::user("hi")));
        assert_eq!(store.state().error.as_ref().unwrap().message, "quota exceeded");
        assert!(!store.state().is_busy());
    }

    #[test]
    fn test_switching_chat_cancels_turn_and_ignores_late_updates() {
        let mut store = store_with_chat();
        let ticket = store.begin_turn("hi").unwrap();

        assert!(store.select_chat(2));
        assert!(ticket.cancel.is_cancelled());
        assert!(!store.state().is_busy());
        assert!(store.state().messages.is_empty());

        let applied = store.apply_turn_event(
            ticket.turn_id,
            TurnEvent::Reply(ReplyUpdate::Started("late".into())),
        );
        assert!(!applied);
        assert!(store.state().messages.is_empty());
    }

    #[test]
    fn test_attachment_travels_with_ticket() {
        let mut store = store_with_chat();
        let pdf = Attachment::new("report.pdf", "application/pdf", vec![0; 1024 * 1024]);
        store.select_attachment(pdf).unwrap();

        let ticket = store.begin_turn("summarize").unwrap();
        assert_eq!(ticket.attachment.as_ref().unwrap().filename, "report.pdf");
        assert!(store.state().pending_attachment.is_none());

        let log = recording(&mut store);
        let receipt = UploadReceipt {
            filename: "report.pdf".to_string(),
            size_mb: 1.0,
        };
        store.apply_turn_event(ticket.turn_id, TurnEvent::Uploaded(receipt.clone()));
        store.apply_turn_event(ticket.turn_id, TurnEvent::Uploaded(receipt));
        assert_eq!(store.state().files, vec!["report.pdf".to_string()]);
        assert!(log.borrow().contains(&StateChange::Toast {
            title: "File uploaded successfully".to_string(),
            body: Some("report.pdf - 1.00 MB".to_string()),
        }));
    }

    #[test]
    fn test_failed_upload_puts_attachment_back() {
        let mut store = store_with_chat();
        let pdf = Attachment::new("report.pdf", "application/pdf", vec![7; 16]);
        store.select_attachment(pdf.clone()).unwrap();
        let ticket = store.begin_turn("summarize").unwrap();
        assert!(store.state().pending_attachment.is_none());

        let log = recording(&mut store);
        store.apply_turn_event(
            ticket.turn_id,
            TurnEvent::Aborted("File upload failed: Could not index document".to_string()),
        );
        assert_eq!(store.state().pending_attachment, Some(pdf));
        assert!(log.borrow().contains(&StateChange::AttachmentChanged));
        assert_eq!(
            store.state().error.as_ref().unwrap().message,
            "File upload failed: Could not index document"
        );
        assert!(!store.state().is_busy());

        // A failed reply after a successful upload does not bring it back.
        let ticket = store.begin_turn("summarize").unwrap();
        let receipt = UploadReceipt {
            filename: "report.pdf".to_string(),
            size_mb: 0.0,
        };
        store.apply_turn_event(ticket.turn_id, TurnEvent::Uploaded(receipt));
        store.apply_turn_event(
            ticket.turn_id,
            TurnEvent::Reply(ReplyUpdate::Failed("quota exceeded".to_string())),
        );
        assert!(store.state().pending_attachment.is_none());
    }

    #[test]
    fn test_old_timer_does_not_clear_newer_error() {
        let mut store = AppStore::new();
        let first = store.raise_error("first");
        let second = store.raise_error("second");

        assert!(!store.dismiss_error(first));
        assert_eq!(store.state().error.as_ref().unwrap().message, "second");
        assert!(store.dismiss_error(second));
        assert!(store.state().error.is_none());
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let mut store = AppStore::new();
        let log = Rc::new(RefCell::new(0));
        let sink = log.clone();
        let id = store.subscribe(move |_, _| *sink.borrow_mut() += 1);

        store.raise_error("one");
        assert!(store.unsubscribe(id));
        store.raise_error("two");
        assert_eq!(*log.borrow(), 1);
        assert!(!store.unsubscribe(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_banner_expires_after_timeout() {
        let started = tokio::time::Instant::now();
        assert_eq!(banner_expiry(3).await, 3);
        assert!(started.elapsed() >= Duration::from_secs(10));
    }
}
