use std::path::PathBuf;

use gtk::prelude::*;
use relm4::prelude::*;

use crate::config::ACCEPTED_UPLOAD_MIME_TYPES;

pub struct InputArea {
    buffer: gtk::TextBuffer,
    busy: bool,
    has_chat: bool,
    /// History of the active chat has not arrived yet.
    loading: bool,
    char_count: i32,
    /// Label of the file waiting to go out with the next message.
    attachment: Option<String>,
}

#[derive(Debug)]
pub enum InputAreaMsg {
    SendClicked,
    SetBusy(bool),
    SetHasChat(bool),
    SetLoading(bool),
    SetAttachment(Option<String>),
    PickFile,
    ClearAttachment,
    // Internal
    FilePicked(PathBuf),
    TextChanged,
}

#[derive(Debug)]
pub enum InputAreaOutput {
    Submit(String),
    AttachmentPicked(PathBuf),
    ClearAttachment,
}

#[relm4::component(pub)]
impl Component for InputArea {
    type Init = ();
    type Input = InputAreaMsg;
    type Output = InputAreaOutput;
    type CommandOutput = ();

    view! {
        gtk::Box {
            set_orientation: gtk::Orientation::Vertical,
            set_spacing: 0,

            // Pending attachment chip
            gtk::Box {
                set_orientation: gtk::Orientation::Horizontal,
                set_spacing: 4,
                set_halign: gtk::Align::Start,
                set_margin_start: 16,
                set_margin_top: 6,
                add_css_class: "attachment-chip",
                #[watch]
                set_visible: model.attachment.is_some(),

                gtk::Image {
                    set_icon_name: Some("mail-attachment-symbolic"),
                },

                gtk::Label {
                    set_ellipsize: gtk::pango::EllipsizeMode::Middle,
                    set_max_width_chars: 40,
                    #[watch]
                    set_label: model.attachment.as_deref().unwrap_or(""),
                },

                gtk::Button {
                    set_icon_name: "window-close-symbolic",
                    set_tooltip_text: Some("Remove attachment"),
                    add_css_class: "flat",
                    add_css_class: "circular",
                    #[watch]
                    set_sensitive: !model.busy,
                    connect_clicked => InputAreaMsg::ClearAttachment,
                },
            },

            gtk::Box {
                set_orientation: gtk::Orientation::Horizontal,
                set_spacing: 6,
                set_margin_top: 8,
                set_margin_bottom: 8,
                set_margin_start: 12,
                set_margin_end: 12,
                add_css_class: "input-card",

                gtk::Button {
                    set_icon_name: "mail-attachment-symbolic",
                    set_tooltip_text: Some("Attach a PDF or Word document"),
                    set_valign: gtk::Align::End,
                    add_css_class: "flat",
                    add_css_class: "circular",
                    #[watch]
                    set_sensitive: model.can_send(),
                    connect_clicked => InputAreaMsg::PickFile,
                },

                gtk::ScrolledWindow {
                    set_hexpand: true,
                    set_max_content_height: 150,
                    set_propagate_natural_height: true,
                    set_min_content_height: 40,

                    #[name = "text_view"]
                    gtk::TextView {
                        set_wrap_mode: gtk::WrapMode::WordChar,
                        set_accepts_tab: false,
                        set_top_margin: 8,
                        set_bottom_margin: 8,
                        set_left_margin: 8,
                        set_right_margin: 8,
                        set_buffer: Some(&model.buffer),
                    },
                },

                gtk::Button {
                    set_icon_name: "go-up-symbolic",
                    set_tooltip_text: Some("Send message (Enter)"),
                    set_valign: gtk::Align::End,
                    add_css_class: "suggested-action",
                    add_css_class: "circular",
                    #[watch]
                    set_sensitive: model.can_send() && model.char_count > 0,
                    connect_clicked => InputAreaMsg::SendClicked,
                },
            },
        }
    }

    fn init(
        _init: Self::Init,
        root: Self::Root,
        sender: ComponentSender<Self>,
    ) -> ComponentParts<Self> {
        let buffer = gtk::TextBuffer::new(None::<&gtk::TextTagTable>);

        let model = Self {
            buffer: buffer.clone(),
            busy: false,
            has_chat: false,
            loading: false,
            char_count: 0,
            attachment: None,
        };

        let widgets = view_output!();

        // Enter sends, Shift+Enter inserts a newline
        let sender_key = sender.clone();
        let key_controller = gtk::EventControllerKey::new();
        key_controller.connect_key_pressed(move |_, key, _code, modifier| {
            let is_enter = key == gtk::gdk::Key::Return || key == gtk::gdk::Key::KP_Enter;
            if is_enter && !modifier.contains(gtk::gdk::ModifierType::SHIFT_MASK) {
                sender_key.input(InputAreaMsg::SendClicked);
                gtk::glib::Propagation::Stop
            } else {
                gtk::glib::Propagation::Proceed
            }
        });
        widgets.text_view.add_controller(key_controller);

        let sender_buf = sender.clone();
        buffer.connect_changed(move |_| {
            sender_buf.input(InputAreaMsg::TextChanged);
        });

        ComponentParts { model, widgets }
    }

    fn update(&mut self, msg: Self::Input, sender: ComponentSender<Self>, root: &Self::Root) {
        match msg {
            InputAreaMsg::SendClicked => {
                let text = self.text();
                if !self.can_send() || text.trim().is_empty() {
                    return;
                }
                let _ = sender.output(InputAreaOutput::Submit(text));
                self.buffer.set_text("");
            }
            InputAreaMsg::SetBusy(busy) => self.busy = busy,
            InputAreaMsg::SetHasChat(has_chat) => self.has_chat = has_chat,
            InputAreaMsg::SetLoading(loading) => self.loading = loading,
            InputAreaMsg::SetAttachment(label) => self.attachment = label,
            InputAreaMsg::PickFile => {
                let dialog = gtk::FileDialog::builder().title("Attach Document").build();

                let documents = gtk::FileFilter::new();
                documents.set_name(Some("PDF and Word documents"));
                for mime in ACCEPTED_UPLOAD_MIME_TYPES {
                    documents.add_mime_type(mime);
                }
                let any = gtk::FileFilter::new();
                any.set_name(Some("All files"));
                any.add_pattern("*");

                let filters = gio::ListStore::new::<gtk::FileFilter>();
                filters.append(&documents);
                filters.append(&any);
                dialog.set_filters(Some(&filters));

                let sender_dlg = sender.input_sender().clone();
                if let Some(window) = root.root().and_then(|r| r.downcast::<gtk::Window>().ok()) {
                    dialog.open(Some(&window), None::<&gio::Cancellable>, move |result| {
                        if let Ok(file) = result {
                            if let Some(path) = file.path() {
                                sender_dlg.send(InputAreaMsg::FilePicked(path)).unwrap();
                            }
                        }
                    });
                }
            }
            InputAreaMsg::ClearAttachment => {
                let _ = sender.output(InputAreaOutput::ClearAttachment);
            }
            InputAreaMsg::FilePicked(path) => {
                let _ = sender.output(InputAreaOutput::AttachmentPicked(path));
            }
            InputAreaMsg::TextChanged => {
                self.char_count = self.buffer.char_count();
            }
        }
    }
}

impl InputArea {
    fn can_send(&self) -> bool {
        self.has_chat && !self.busy && !self.loading
    }

    fn text(&self) -> String {
        let start = self.buffer.start_iter();
        let end = self.buffer.end_iter();
        self.buffer.text(&start, &end, false).to_string()
    }
}
