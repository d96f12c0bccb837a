use std::path::PathBuf;
use std::sync::Arc;

use adw::prelude::*;
use relm4::prelude::*;

use crate::api::{ChatBackend, ChatHistory, ReplyUpdate};
use crate::config;
use crate::models::{Attachment, ChatId, Conversation};
use crate::services::chat::{run_turn, TurnEvent};
use crate::services::conversation::{self, ConversationError};
use crate::services::store::{banner_expiry, AppState, AppStore, StateChange};
use crate::ui::chat_view::{ChatView, ChatViewMsg, ChatViewOutput};
use crate::ui::sidebar::{Sidebar, SidebarMsg, SidebarOutput};

pub struct App {
    store: AppStore,
    backend: Arc<dyn ChatBackend>,
    sidebar: Controller<Sidebar>,
    chat_view: Controller<ChatView>,
}

#[derive(Debug)]
pub enum AppMsg {
    NewChat,
    ChatSelected(ChatId),
    DeleteChat(ChatId),
    Submit(String),
    AttachmentPicked(PathBuf),
    ClearAttachment,
    ScheduleErrorExpiry(u64),
}

#[derive(Debug)]
pub enum AppCmd {
    ChatsLoaded(Result<Vec<Conversation>, ConversationError>),
    HistoryLoaded(ChatId, Result<ChatHistory, ConversationError>),
    ChatCreated(Result<Conversation, ConversationError>),
    ChatDeleted(ChatId, Result<(), ConversationError>),
    Turn(u64, TurnEvent),
    ErrorExpired(u64),
    AttachmentLoaded(PathBuf, std::io::Result<Attachment>),
}

#[relm4::component(pub, async)]
impl AsyncComponent for App {
    type Init = Arc<dyn ChatBackend>;
    type Input = AppMsg;
    type Output = ();
    type CommandOutput = AppCmd;

    view! {
        adw::ApplicationWindow {
            set_title: Some(config::APP_NAME),
            set_default_width: 1100,
            set_default_height: 760,
            set_width_request: 360,
            set_height_request: 480,

            #[local_ref]
            toast_overlay -> adw::ToastOverlay {},
        }
    }

    async fn init(
        backend: Self::Init,
        root: Self::Root,
        sender: AsyncComponentSender<Self>,
    ) -> AsyncComponentParts<Self> {
        let sidebar = Sidebar::builder()
            .launch(())
            .forward(sender.input_sender(), |output| match output {
                SidebarOutput::NewChat => AppMsg::NewChat,
                SidebarOutput::ChatSelected(id) => AppMsg::ChatSelected(id),
                SidebarOutput::DeleteChat(id) => AppMsg::DeleteChat(id),
            });

        let chat_view = ChatView::builder()
            .launch(())
            .forward(sender.input_sender(), |output| match output {
                ChatViewOutput::Submit(text) => AppMsg::Submit(text),
                ChatViewOutput::AttachmentPicked(path) => AppMsg::AttachmentPicked(path),
                ChatViewOutput::ClearAttachment => AppMsg::ClearAttachment,
            });

        let toast_overlay = adw::ToastOverlay::new();
        toast_overlay.set_hexpand(true);
        toast_overlay.set_vexpand(true);

        let content_stack = gtk::Stack::new();
        content_stack.set_hexpand(true);
        content_stack.set_vexpand(true);

        // Shown while there is no chat at all
        let empty_page = adw::StatusPage::new();
        empty_page.set_title("No Chats Yet");
        empty_page.set_description(Some("Start a conversation to ask a question"));
        empty_page.set_icon_name(Some("chat-symbolic"));
        let new_chat_btn = gtk::Button::builder()
            .label("New Chat")
            .halign(gtk::Align::Center)
            .build();
        new_chat_btn.add_css_class("suggested-action");
        new_chat_btn.add_css_class("pill");
        let sender_btn = sender.input_sender().clone();
        new_chat_btn.connect_clicked(move |_| {
            sender_btn.send(AppMsg::NewChat).unwrap();
        });
        empty_page.set_child(Some(&new_chat_btn));
        content_stack.add_named(&empty_page, Some("empty"));
        content_stack.add_named(chat_view.widget(), Some("chat"));
        content_stack.set_visible_child_name("empty");

        let window_title = adw::WindowTitle::new(config::APP_NAME, "");
        let content_header = adw::HeaderBar::new();
        content_header.set_show_start_title_buttons(false);
        content_header.set_title_widget(Some(&window_title));

        let content_toolbar = adw::ToolbarView::new();
        content_toolbar.add_top_bar(&content_header);
        content_toolbar.set_content(Some(&content_stack));

        let content_page = adw::NavigationPage::builder()
            .title("Chat")
            .tag("content")
            .child(&content_toolbar)
            .build();

        let sidebar_page = adw::NavigationPage::builder()
            .title("Chats")
            .tag("sidebar")
            .child(sidebar.widget())
            .build();

        let split_view = adw::NavigationSplitView::new();
        split_view.set_hexpand(true);
        split_view.set_vexpand(true);
        split_view.set_min_sidebar_width(200.0);
        split_view.set_max_sidebar_width(300.0);
        split_view.set_sidebar(Some(&sidebar_page));
        split_view.set_content(Some(&content_page));

        let breakpoint = adw::Breakpoint::new(
            adw::BreakpointCondition::parse("max-width: 600px")
                .expect("Invalid breakpoint condition"),
        );
        breakpoint.add_setter(&split_view, "collapsed", Some(&true.to_value()));
        breakpoint.add_setter(&content_header, "show-start-title-buttons", Some(&true.to_value()));
        root.add_breakpoint(breakpoint);

        toast_overlay.set_child(Some(&split_view));

        let mut store = AppStore::new();
        let sidebar_sender = sidebar.sender().clone();
        let chat_sender = chat_view.sender().clone();
        let app_sender = sender.input_sender().clone();
        let toasts = toast_overlay.clone();
        store.subscribe(move |change, state| match change {
            StateChange::ChatsChanged => {
                sidebar_sender.emit(SidebarMsg::SetChats {
                    chats: state.chats.clone(),
                    active: state.active_chat,
                });
                chat_sender.emit(ChatViewMsg::SetHasChat(state.active_chat.is_some()));
                match state.active_conversation() {
                    Some(chat) => {
                        window_title.set_title(&chat.display_title());
                        content_stack.set_visible_child_name("chat");
                    }
                    None => {
                        window_title.set_title(config::APP_NAME);
                        content_stack.set_visible_child_name("empty");
                    }
                }
            }
            StateChange::ErrorRaised { generation } => {
                let message = state.error.as_ref().map(|e| e.message.clone());
                // The banner lives in the chat page, which is hidden without a chat.
                if let (None, Some(text)) = (state.active_chat, &message) {
                    toasts.add_toast(adw::Toast::new(&glib::markup_escape_text(text)));
                }
                chat_sender.emit(ChatViewMsg::SetError(message));
                app_sender.emit(AppMsg::ScheduleErrorExpiry(*generation));
            }
            StateChange::Toast { title, body } => {
                let text = match body {
                    Some(body) => format!("{}: {}", title, body),
                    None => title.clone(),
                };
                toasts.add_toast(adw::Toast::new(&glib::markup_escape_text(&text)));
            }
            other => {
                for msg in chat_view_updates(other, state) {
                    chat_sender.emit(msg);
                }
            }
        });

        let model = App {
            store,
            backend,
            sidebar,
            chat_view,
        };

        let widgets = view_output!();

        let app = relm4::main_adw_application();
        let sender_new = sender.input_sender().clone();
        let new_chat_action = gio::SimpleAction::new("new-chat", None);
        new_chat_action.connect_activate(move |_, _| {
            sender_new.send(AppMsg::NewChat).unwrap();
        });
        app.add_action(&new_chat_action);
        app.set_accels_for_action("app.new-chat", &["<Control>n"]);

        let backend = model.backend.clone();
        sender.command(move |out, _| {
            Box::pin(async move {
                let chats = conversation::load_chats(backend.as_ref()).await;
                out.send(AppCmd::ChatsLoaded(chats)).unwrap();
            })
        });

        AsyncComponentParts { model, widgets }
    }

    async fn update(
        &mut self,
        msg: Self::Input,
        sender: AsyncComponentSender<Self>,
        _root: &Self::Root,
    ) {
        match msg {
            AppMsg::NewChat => {
                let backend = self.backend.clone();
                sender.command(move |out, _| {
                    Box::pin(async move {
                        let created = conversation::create_chat(backend.as_ref()).await;
                        out.send(AppCmd::ChatCreated(created)).unwrap();
                    })
                });
            }
            AppMsg::ChatSelected(id) => {
                if self.store.select_chat(id) {
                    self.load_history(id, &sender);
                }
            }
            AppMsg::DeleteChat(id) => {
                if !self.store.state().can_delete() {
                    return;
                }
                let backend = self.backend.clone();
                sender.command(move |out, _| {
                    Box::pin(async move {
                        let result = conversation::delete_chat(backend.as_ref(), id).await;
                        out.send(AppCmd::ChatDeleted(id, result)).unwrap();
                    })
                });
            }
            AppMsg::Submit(text) => match self.store.begin_turn(&text) {
                Ok(ticket) => {
                    let backend = self.backend.clone();
                    let turn_id = ticket.turn_id;
                    sender.command(move |out, _| {
                        Box::pin(async move {
                            run_turn(backend, ticket, |event| {
                                out.send(AppCmd::Turn(turn_id, event)).unwrap();
                            })
                            .await;
                        })
                    });
                }
                Err(e) => tracing::debug!("Prompt not submitted: {}", e),
            },
            AppMsg::AttachmentPicked(path) => {
                sender.oneshot_command(async move {
                    let loaded = Attachment::load(&path).await;
                    AppCmd::AttachmentLoaded(path, loaded)
                });
            }
            AppMsg::ClearAttachment => self.store.clear_attachment(),
            AppMsg::ScheduleErrorExpiry(generation) => {
                sender.oneshot_command(async move {
                    AppCmd::ErrorExpired(banner_expiry(generation).await)
                });
            }
        }
    }

    async fn update_cmd(
        &mut self,
        msg: Self::CommandOutput,
        sender: AsyncComponentSender<Self>,
        _root: &Self::Root,
    ) {
        match msg {
            AppCmd::ChatsLoaded(Ok(chats)) => {
                if let Some(id) = self.store.set_chats(chats) {
                    self.load_history(id, &sender);
                }
            }
            AppCmd::ChatsLoaded(Err(e)) => {
                self.store.raise_error(&e.to_string());
            }
            AppCmd::HistoryLoaded(id, Ok(history)) => {
                self.store.load_history(id, history);
            }
            AppCmd::HistoryLoaded(id, Err(e)) => {
                self.store.history_failed(id, &e.to_string());
            }
            AppCmd::ChatCreated(Ok(chat)) => {
                let id = self.store.add_chat(chat);
                self.load_history(id, &sender);
            }
            AppCmd::ChatCreated(Err(e)) => {
                self.store.raise_error(&e.to_string());
            }
            AppCmd::ChatDeleted(id, Ok(())) => {
                if let Some(next) = self.store.remove_chat(id) {
                    self.load_history(next, &sender);
                }
            }
            AppCmd::ChatDeleted(_, Err(e)) => {
                self.store.raise_error(&e.to_string());
            }
            AppCmd::Turn(turn_id, event) => {
                let finished = matches!(event, TurnEvent::Reply(ReplyUpdate::Finished(_)));
                if self.store.apply_turn_event(turn_id, event) && finished {
                    // Titles are generated server-side after the first reply.
                    self.refresh_chats(&sender);
                }
            }
            AppCmd::ErrorExpired(generation) => {
                self.store.dismiss_error(generation);
            }
            AppCmd::AttachmentLoaded(_, Ok(attachment)) => {
                let _ = self.store.select_attachment(attachment);
            }
            AppCmd::AttachmentLoaded(path, Err(e)) => {
                tracing::error!("Failed to read {}: {}", path.display(), e);
                self.store
                    .toast(format!("Could not read {}", path.display()), None);
            }
        }
    }
}

impl App {
    fn load_history(&self, chat_id: ChatId, sender: &AsyncComponentSender<Self>) {
        let backend = self.backend.clone();
        sender.command(move |out, _| {
            Box::pin(async move {
                let history = conversation::load_history(backend.as_ref(), chat_id).await;
                out.send(AppCmd::HistoryLoaded(chat_id, history)).unwrap();
            })
        });
    }

    fn refresh_chats(&self, sender: &AsyncComponentSender<Self>) {
        let backend = self.backend.clone();
        sender.command(move |out, _| {
            Box::pin(async move {
                match conversation::load_chats(backend.as_ref()).await {
                    Ok(chats) => out.send(AppCmd::ChatsLoaded(Ok(chats))).unwrap(),
                    // A failed refresh keeps the current list.
                    Err(e) => tracing::warn!("{}", e),
                }
            })
        });
    }
}

/// Translate a store change into the messages the chat view needs.
fn chat_view_updates(change: &StateChange, state: &AppState) -> Vec<ChatViewMsg> {
    match change {
        StateChange::MessagesReset => vec![
            ChatViewMsg::SetLoading(state.loading_history),
            ChatViewMsg::ResetMessages(state.messages.clone()),
        ],
        StateChange::MessageAppended => state
            .messages
            .last()
            .map(|m| ChatViewMsg::AppendMessage(m.clone()))
            .into_iter()
            .collect(),
        StateChange::LastMessageUpdated => state
            .messages
            .last()
            .map(|m| ChatViewMsg::UpdateLastMessage(m.content.clone()))
            .into_iter()
            .collect(),
        StateChange::LastMessageRemoved => vec![ChatViewMsg::RemoveLastMessage],
        StateChange::PlaceholderChanged(visible) => vec![ChatViewMsg::SetThinking(*visible)],
        StateChange::BusyChanged(busy) => vec![ChatViewMsg::SetBusy(*busy)],
        StateChange::FilesChanged => vec![ChatViewMsg::SetFiles(state.files.clone())],
        StateChange::AttachmentChanged => vec![ChatViewMsg::SetAttachment(
            state
                .pending_attachment
                .as_ref()
                .map(|a| format!("{} ({:.2} MB)", a.filename, a.size_mb())),
        )],
        StateChange::ErrorCleared => vec![ChatViewMsg::SetError(None)],
        StateChange::ChatsChanged | StateChange::ErrorRaised { .. } | StateChange::Toast { .. } => {
            Vec::new()
        }
    }
}
