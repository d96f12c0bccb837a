use std::path::PathBuf;

use adw::prelude::*;
use relm4::factory::FactoryVecDeque;
use relm4::prelude::*;

use crate::models::Message;
use crate::ui::input_area::{InputArea, InputAreaMsg, InputAreaOutput};
use crate::ui::message_widget::{MessageBubble, MessageBubbleMsg};

pub struct ChatView {
    messages: FactoryVecDeque<MessageBubble>,
    input_area: Controller<InputArea>,
    scrolled_window: gtk::ScrolledWindow,
    thinking: bool,
    loading: bool,
    files: Vec<String>,
    error: Option<String>,
}

#[derive(Debug)]
pub enum ChatViewMsg {
    ResetMessages(Vec<Message>),
    AppendMessage(Message),
    UpdateLastMessage(String),
    RemoveLastMessage,
    SetThinking(bool),
    SetLoading(bool),
    SetBusy(bool),
    SetHasChat(bool),
    SetFiles(Vec<String>),
    SetAttachment(Option<String>),
    SetError(Option<String>),
    ScrollToBottom,
    // Forwarded from the input area
    Submit(String),
    AttachmentPicked(PathBuf),
    ClearAttachment,
}

#[derive(Debug)]
pub enum ChatViewOutput {
    Submit(String),
    AttachmentPicked(PathBuf),
    ClearAttachment,
}

#[relm4::component(pub)]
impl Component for ChatView {
    type Init = ();
    type Input = ChatViewMsg;
    type Output = ChatViewOutput;
    type CommandOutput = ();

    view! {
        gtk::Box {
            set_orientation: gtk::Orientation::Vertical,
            set_vexpand: true,

            adw::Banner {
                #[watch]
                set_title: model.error.as_deref().unwrap_or(""),
                #[watch]
                set_revealed: model.error.is_some(),
                add_css_class: "error",
            },

            // Files indexed for this chat
            gtk::Label {
                set_halign: gtk::Align::Start,
                set_margin_start: 16,
                set_margin_top: 6,
                set_ellipsize: gtk::pango::EllipsizeMode::End,
                add_css_class: "caption",
                add_css_class: "dim-label",
                #[watch]
                set_visible: !model.files.is_empty(),
                #[watch]
                set_label: &format!("Files: {}", model.files.join(", ")),
            },

            gtk::Overlay {
                set_vexpand: true,

                #[local_ref]
                scrolled_window -> gtk::ScrolledWindow {
                    set_vexpand: true,
                    set_hscrollbar_policy: gtk::PolicyType::Never,

                    gtk::Box {
                        set_orientation: gtk::Orientation::Vertical,
                        set_margin_top: 8,
                        set_margin_bottom: 8,
                        set_margin_start: 16,
                        set_margin_end: 16,

                        #[local_ref]
                        message_list -> gtk::Box {
                            set_orientation: gtk::Orientation::Vertical,
                            set_spacing: 0,
                        },

                        // Placeholder shown until the first reply text arrives
                        gtk::Box {
                            set_orientation: gtk::Orientation::Horizontal,
                            set_spacing: 8,
                            set_halign: gtk::Align::Start,
                            set_margin_start: 12,
                            set_margin_top: 4,
                            #[watch]
                            set_visible: model.thinking,

                            gtk::Spinner {
                                #[watch]
                                set_spinning: model.thinking,
                            },
                            gtk::Label {
                                set_label: "Thinking...",
                                add_css_class: "dim-label",
                            },
                        },
                    },
                },

                add_overlay = &gtk::Spinner {
                    set_halign: gtk::Align::Center,
                    set_valign: gtk::Align::Center,
                    set_width_request: 32,
                    set_height_request: 32,
                    #[watch]
                    set_visible: model.loading,
                    #[watch]
                    set_spinning: model.loading,
                },
            },

            gtk::Separator {
                set_orientation: gtk::Orientation::Horizontal,
            },

            model.input_area.widget().clone(),
        }
    }

    fn init(
        _init: Self::Init,
        root: Self::Root,
        sender: ComponentSender<Self>,
    ) -> ComponentParts<Self> {
        let messages = FactoryVecDeque::builder()
            .launch(gtk::Box::default())
            .detach();

        let input_area = InputArea::builder()
            .launch(())
            .forward(sender.input_sender(), |output| match output {
                InputAreaOutput::Submit(text) => ChatViewMsg::Submit(text),
                InputAreaOutput::AttachmentPicked(path) => ChatViewMsg::AttachmentPicked(path),
                InputAreaOutput::ClearAttachment => ChatViewMsg::ClearAttachment,
            });

        let scrolled_window = gtk::ScrolledWindow::new();

        let model = Self {
            messages,
            input_area,
            scrolled_window: scrolled_window.clone(),
            thinking: false,
            loading: false,
            files: Vec::new(),
            error: None,
        };

        let message_list = model.messages.widget();
        let widgets = view_output!();

        ComponentParts { model, widgets }
    }

    fn update(&mut self, msg: Self::Input, sender: ComponentSender<Self>, _root: &Self::Root) {
        match msg {
            ChatViewMsg::ResetMessages(messages) => {
                let mut guard = self.messages.guard();
                guard.clear();
                for message in messages {
                    guard.push_back(message);
                }
                drop(guard);
                sender.input(ChatViewMsg::ScrollToBottom);
            }
            ChatViewMsg::AppendMessage(message) => {
                self.messages.guard().push_back(message);
                sender.input(ChatViewMsg::ScrollToBottom);
            }
            ChatViewMsg::UpdateLastMessage(text) => {
                if let Some(last) = self.messages.len().checked_sub(1) {
                    self.messages.send(last, MessageBubbleMsg::SetContent(text));
                }
                sender.input(ChatViewMsg::ScrollToBottom);
            }
            ChatViewMsg::RemoveLastMessage => {
                self.messages.guard().pop_back();
            }
            ChatViewMsg::SetThinking(thinking) => {
                self.thinking = thinking;
                if thinking {
                    sender.input(ChatViewMsg::ScrollToBottom);
                }
            }
            ChatViewMsg::SetLoading(loading) => {
                self.loading = loading;
                self.input_area.emit(InputAreaMsg::SetLoading(loading));
            }
            ChatViewMsg::SetBusy(busy) => self.input_area.emit(InputAreaMsg::SetBusy(busy)),
            ChatViewMsg::SetHasChat(has_chat) => {
                self.input_area.emit(InputAreaMsg::SetHasChat(has_chat))
            }
            ChatViewMsg::SetFiles(files) => self.files = files,
            ChatViewMsg::SetAttachment(label) => {
                self.input_area.emit(InputAreaMsg::SetAttachment(label))
            }
            ChatViewMsg::SetError(error) => self.error = error,
            ChatViewMsg::ScrollToBottom => {
                let adj = self.scrolled_window.vadjustment();
                glib::idle_add_local_once(move || {
                    adj.set_value(adj.upper());
                });
            }
            ChatViewMsg::Submit(text) => {
                let _ = sender.output(ChatViewOutput::Submit(text));
            }
            ChatViewMsg::AttachmentPicked(path) => {
                let _ = sender.output(ChatViewOutput::AttachmentPicked(path));
            }
            ChatViewMsg::ClearAttachment => {
                let _ = sender.output(ChatViewOutput::ClearAttachment);
            }
        }
    }
}
