use gtk::prelude::*;
use relm4::prelude::*;

use crate::models::{Message, Role};
use crate::services::markdown::{parse_markdown, spans_to_markup, Block, Span};

pub struct MessageBubble {
    pub message: Message,
    content_box: gtk::Box,
}

#[derive(Debug)]
pub enum MessageBubbleMsg {
    /// Replace the displayed text; sent for every streamed chunk.
    SetContent(String),
}

#[relm4::factory(pub)]
impl FactoryComponent for MessageBubble {
    type Init = Message;
    type Input = MessageBubbleMsg;
    type Output = ();
    type CommandOutput = ();
    type ParentWidget = gtk::Box;

    view! {
        gtk::Box {
            set_orientation: gtk::Orientation::Horizontal,
            set_margin_top: 4,
            set_margin_bottom: 4,
            set_margin_start: 12,
            set_margin_end: 12,
            set_halign: if self.message.role == Role::User {
                gtk::Align::End
            } else {
                gtk::Align::Start
            },
        }
    }

    fn init_model(message: Self::Init, _index: &DynamicIndex, _sender: FactorySender<Self>) -> Self {
        let content_box = gtk::Box::builder()
            .orientation(gtk::Orientation::Vertical)
            .spacing(4)
            .margin_start(10)
            .margin_end(10)
            .margin_top(8)
            .margin_bottom(8)
            .build();
        Self {
            message,
            content_box,
        }
    }

    fn init_widgets(
        &mut self,
        _index: &DynamicIndex,
        root: Self::Root,
        _returned_widget: &<Self::ParentWidget as relm4::factory::FactoryView>::ReturnedWidget,
        _sender: FactorySender<Self>,
    ) -> Self::Widgets {
        let bubble = gtk::Box::builder()
            .orientation(gtk::Orientation::Vertical)
            .build();
        bubble.add_css_class("card");
        bubble.add_css_class(match self.message.role {
            Role::User => "message-bubble-user",
            Role::Agent => "message-bubble-agent",
        });

        render_markdown(&self.content_box, &self.message.content);
        bubble.append(&self.content_box);
        root.append(&bubble);

        let widgets = view_output!();
        widgets
    }

    fn update(&mut self, msg: Self::Input, _sender: FactorySender<Self>) {
        match msg {
            MessageBubbleMsg::SetContent(text) => {
                if text != self.message.content {
                    render_markdown(&self.content_box, &text);
                    self.message.content = text;
                }
            }
        }
    }
}

pub fn render_markdown(content_box: &gtk::Box, text: &str) {
    while let Some(child) = content_box.first_child() {
        content_box.remove(&child);
    }

    for block in parse_markdown(text) {
        content_box.append(&block_widget(&block));
    }
}

fn markup_label(spans: &[Span]) -> gtk::Label {
    let label = gtk::Label::builder()
        .halign(gtk::Align::Start)
        .xalign(0.0)
        .wrap(true)
        .wrap_mode(gtk::pango::WrapMode::WordChar)
        .selectable(true)
        .use_markup(true)
        .build();
    label.set_markup(&spans_to_markup(spans));
    label
}

fn block_widget(block: &Block) -> gtk::Widget {
    match block {
        Block::Paragraph(spans) => markup_label(spans).upcast(),
        Block::Heading { level, spans } => {
            let label = markup_label(spans);
            label.add_css_class(match level {
                1 => "title-1",
                2 => "title-2",
                3 => "title-3",
                _ => "title-4",
            });
            label.upcast()
        }
        Block::Code { language, code } => code_block(language.as_deref(), code),
        Block::Quote(inner) => {
            let quote = gtk::Box::builder()
                .orientation(gtk::Orientation::Vertical)
                .spacing(4)
                .build();
            quote.add_css_class("blockquote");
            for block in inner {
                quote.append(&block_widget(block));
            }
            quote.upcast()
        }
        Block::List { start, items } => list(*start, items),
        Block::Table { header, rows } => table(header, rows),
        Block::Rule => gtk::Separator::builder()
            .orientation(gtk::Orientation::Horizontal)
            .margin_top(4)
            .margin_bottom(4)
            .build()
            .upcast(),
    }
}

fn code_block(language: Option<&str>, code: &str) -> gtk::Widget {
    let outer = gtk::Box::builder()
        .orientation(gtk::Orientation::Vertical)
        .margin_top(4)
        .margin_bottom(4)
        .build();
    outer.add_css_class("code-block");

    let header = gtk::Box::builder()
        .orientation(gtk::Orientation::Horizontal)
        .spacing(8)
        .build();

    let lang_label = gtk::Label::builder()
        .label(language.unwrap_or(""))
        .halign(gtk::Align::Start)
        .hexpand(true)
        .margin_start(12)
        .build();
    lang_label.add_css_class("caption");
    lang_label.add_css_class("dim-label");
    header.append(&lang_label);

    let copy_button = gtk::Button::builder()
        .icon_name("edit-copy-symbolic")
        .tooltip_text("Copy code")
        .build();
    copy_button.add_css_class("flat");
    copy_button.add_css_class("circular");

    let code_for_copy = code.to_string();
    copy_button.connect_clicked(move |btn| {
        if let Some(display) = gtk::gdk::Display::default() {
            display.clipboard().set_text(&code_for_copy);
            btn.set_icon_name("object-select-symbolic");
            let btn = btn.clone();
            glib::timeout_add_local_once(std::time::Duration::from_millis(1500), move || {
                // Streaming re-renders may have dropped the block by now.
                if btn.parent().is_some() {
                    btn.set_icon_name("edit-copy-symbolic");
                }
            });
        }
    });
    header.append(&copy_button);
    outer.append(&header);

    let text_view = gtk::TextView::builder()
        .editable(false)
        .cursor_visible(false)
        .wrap_mode(gtk::WrapMode::WordChar)
        .monospace(true)
        .top_margin(8)
        .bottom_margin(8)
        .left_margin(12)
        .right_margin(12)
        .build();
    text_view.buffer().set_text(code);
    outer.append(&text_view);

    outer.upcast()
}

fn list(start: Option<u64>, items: &[Vec<Block>]) -> gtk::Widget {
    let list_box = gtk::Box::builder()
        .orientation(gtk::Orientation::Vertical)
        .spacing(2)
        .margin_start(4)
        .build();

    for (i, item) in items.iter().enumerate() {
        let row = gtk::Box::builder()
            .orientation(gtk::Orientation::Horizontal)
            .spacing(6)
            .build();

        let marker = match start {
            Some(first) => format!("{}.", first + i as u64),
            None => "\u{2022}".to_string(),
        };
        let marker = gtk::Label::builder()
            .label(&marker)
            .valign(gtk::Align::Start)
            .build();
        row.append(&marker);

        let content = gtk::Box::builder()
            .orientation(gtk::Orientation::Vertical)
            .spacing(2)
            .hexpand(true)
            .build();
        for block in item {
            content.append(&block_widget(block));
        }
        row.append(&content);
        list_box.append(&row);
    }

    list_box.upcast()
}

fn table(header: &[Vec<Span>], rows: &[Vec<Vec<Span>>]) -> gtk::Widget {
    let grid = gtk::Grid::builder()
        .row_spacing(4)
        .column_spacing(16)
        .margin_top(4)
        .margin_bottom(4)
        .build();
    grid.add_css_class("markdown-table");

    for (col, cell) in header.iter().enumerate() {
        let label = markup_label(cell);
        label.add_css_class("heading");
        grid.attach(&label, col as i32, 0, 1, 1);
    }
    for (r, row) in rows.iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            grid.attach(&markup_label(cell), col as i32, r as i32 + 1, 1, 1);
        }
    }

    let scroller = gtk::ScrolledWindow::builder()
        .hscrollbar_policy(gtk::PolicyType::Automatic)
        .vscrollbar_policy(gtk::PolicyType::Never)
        .child(&grid)
        .build();
    scroller.upcast()
}
