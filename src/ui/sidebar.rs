use adw::prelude::*;
use relm4::factory::FactoryVecDeque;
use relm4::prelude::*;

use crate::models::{ChatId, Conversation};

// --- ConversationRow factory component ---

#[derive(Debug)]
pub struct ConversationRow {
    pub conversation: Conversation,
    can_delete: bool,
}

pub struct RowInit {
    pub conversation: Conversation,
    pub can_delete: bool,
}

#[derive(Debug)]
pub enum ConversationRowMsg {
    Delete,
}

#[derive(Debug)]
pub enum ConversationRowOutput {
    Delete(ChatId),
}

#[relm4::factory(pub)]
impl FactoryComponent for ConversationRow {
    type Init = RowInit;
    type Input = ConversationRowMsg;
    type Output = ConversationRowOutput;
    type CommandOutput = ();
    type ParentWidget = gtk::ListBox;

    view! {
        gtk::Box {
            set_orientation: gtk::Orientation::Horizontal,
            set_spacing: 6,
            set_margin_all: 6,

            gtk::Label {
                set_label: &self.conversation.display_title(),
                set_tooltip_text: Some(&self.conversation.title),
                set_halign: gtk::Align::Start,
                set_hexpand: true,
                set_xalign: 0.0,
                add_css_class: "heading",
            },

            gtk::Button {
                set_icon_name: "user-trash-symbolic",
                set_tooltip_text: Some("Delete Chat"),
                set_visible: self.can_delete,
                set_valign: gtk::Align::Center,
                add_css_class: "flat",
                add_css_class: "circular",
                connect_clicked => ConversationRowMsg::Delete,
            },
        }
    }

    fn init_model(init: Self::Init, _index: &DynamicIndex, _sender: FactorySender<Self>) -> Self {
        Self {
            conversation: init.conversation,
            can_delete: init.can_delete,
        }
    }

    fn update(&mut self, msg: Self::Input, sender: FactorySender<Self>) {
        match msg {
            ConversationRowMsg::Delete => {
                let _ = sender.output(ConversationRowOutput::Delete(self.conversation.id));
            }
        }
    }
}

// --- Sidebar component ---

pub struct Sidebar {
    conversations: FactoryVecDeque<ConversationRow>,
}

#[derive(Debug)]
pub enum SidebarMsg {
    SetChats {
        chats: Vec<Conversation>,
        active: Option<ChatId>,
    },
    NewChat,
    RowActivated(usize),
    Delete(ChatId),
}

#[derive(Debug)]
pub enum SidebarOutput {
    NewChat,
    ChatSelected(ChatId),
    DeleteChat(ChatId),
}

#[relm4::component(pub)]
impl Component for Sidebar {
    type Init = ();
    type Input = SidebarMsg;
    type Output = SidebarOutput;
    type CommandOutput = ();

    view! {
        adw::ToolbarView {
            add_top_bar = &adw::HeaderBar {
                set_show_end_title_buttons: false,

                pack_start = &gtk::Button {
                    set_icon_name: "list-add-symbolic",
                    set_tooltip_text: Some("New Chat"),
                    connect_clicked => SidebarMsg::NewChat,
                },

                #[wrap(Some)]
                set_title_widget = &adw::WindowTitle {
                    set_title: "Chats",
                },
            },

            #[wrap(Some)]
            set_content = &gtk::ScrolledWindow {
                set_hscrollbar_policy: gtk::PolicyType::Never,
                set_vexpand: true,

                #[local_ref]
                conversation_list -> gtk::ListBox {
                    set_selection_mode: gtk::SelectionMode::Single,
                    add_css_class: "navigation-sidebar",
                },
            },
        }
    }

    fn init(
        _init: Self::Init,
        root: Self::Root,
        sender: ComponentSender<Self>,
    ) -> ComponentParts<Self> {
        let conversations = FactoryVecDeque::builder()
            .launch(gtk::ListBox::default())
            .forward(sender.input_sender(), |output| match output {
                ConversationRowOutput::Delete(id) => SidebarMsg::Delete(id),
            });

        let model = Self { conversations };

        let conversation_list = model.conversations.widget();
        let widgets = view_output!();

        let sender_rows = sender.clone();
        model
            .conversations
            .widget()
            .connect_row_activated(move |_, row| {
                sender_rows.input(SidebarMsg::RowActivated(row.index() as usize));
            });

        ComponentParts { model, widgets }
    }

    fn update(&mut self, msg: Self::Input, sender: ComponentSender<Self>, _root: &Self::Root) {
        match msg {
            SidebarMsg::SetChats { chats, active } => {
                let can_delete = chats.len() > 1;
                let active_index = active.and_then(|id| chats.iter().position(|c| c.id == id));

                let mut guard = self.conversations.guard();
                guard.clear();
                for conversation in chats {
                    guard.push_back(RowInit {
                        conversation,
                        can_delete,
                    });
                }
                drop(guard);

                let list = self.conversations.widget();
                match active_index.and_then(|i| list.row_at_index(i as i32)) {
                    Some(row) => list.select_row(Some(&row)),
                    None => list.unselect_all(),
                }
            }
            SidebarMsg::NewChat => {
                let _ = sender.output(SidebarOutput::NewChat);
            }
            SidebarMsg::RowActivated(index) => {
                if let Some(row) = self.conversations.get(index) {
                    let _ = sender.output(SidebarOutput::ChatSelected(row.conversation.id));
                }
            }
            SidebarMsg::Delete(id) => {
                let _ = sender.output(SidebarOutput::DeleteChat(id));
            }
        }
    }
}
