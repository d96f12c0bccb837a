use pulldown_cmark::{CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// A block-level piece of a rendered message.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Vec<Span>),
    Heading {
        level: u8,
        spans: Vec<Span>,
    },
    Code {
        language: Option<String>,
        code: String,
    },
    Quote(Vec<Block>),
    /// `start` is `Some` for ordered lists and carries the first item number.
    List {
        start: Option<u64>,
        items: Vec<Vec<Block>>,
    },
    Table {
        header: Vec<Vec<Span>>,
        rows: Vec<Vec<Vec<Span>>>,
    },
    Rule,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Style {
    pub bold: bool,
    pub italic: bool,
    pub strike: bool,
    pub code: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub style: Style,
    pub link: Option<String>,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: Style::default(),
            link: None,
        }
    }
}

pub fn parse_markdown(input: &str) -> Vec<Block> {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES;
    let mut builder = BlockBuilder::default();
    for event in Parser::new_ext(input, options) {
        builder.event(event);
    }
    builder.finish()
}

/// Open containers, innermost last.
enum Frame {
    Quote(Vec<Block>),
    List {
        start: Option<u64>,
        items: Vec<Vec<Block>>,
    },
    Item(Vec<Block>),
    Table {
        header: Vec<Vec<Span>>,
        rows: Vec<Vec<Vec<Span>>>,
        row: Vec<Vec<Span>>,
    },
}

#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<Block>,
    frames: Vec<Frame>,
    spans: Vec<Span>,
    style: Style,
    link: Option<String>,
    heading: Option<u8>,
    code: Option<(Option<String>, String)>,
}

impl BlockBuilder {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(text),
            Event::Code(code) => {
                let style = Style {
                    code: true,
                    ..self.style
                };
                self.push_span(code.to_string(), style);
            }
            Event::SoftBreak => self.push_span(" ".to_string(), self.style),
            Event::HardBreak => self.push_span("\n".to_string(), self.style),
            Event::Rule => {
                self.flush_spans();
                self.push_block(Block::Rule);
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush_spans();
                self.heading = Some(heading_number(level));
            }
            Tag::Strong => self.style.bold = true,
            Tag::Emphasis => self.style.italic = true,
            Tag::Strikethrough => self.style.strike = true,
            Tag::Link { dest_url, .. } => self.link = Some(dest_url.to_string()),
            // The alt text arrives as ordinary text events and is shown in place.
            Tag::Image { .. } => {}
            Tag::CodeBlock(kind) => {
                self.flush_spans();
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some((language, String::new()));
            }
            Tag::BlockQuote(_) => {
                self.flush_spans();
                self.frames.push(Frame::Quote(Vec::new()));
            }
            Tag::List(start) => {
                self.flush_spans();
                self.frames.push(Frame::List {
                    start,
                    items: Vec::new(),
                });
            }
            Tag::Item => self.frames.push(Frame::Item(Vec::new())),
            Tag::Table(_) => {
                self.flush_spans();
                self.frames.push(Frame::Table {
                    header: Vec::new(),
                    rows: Vec::new(),
                    row: Vec::new(),
                });
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.flush_spans(),
            TagEnd::Heading(_) => {
                let spans = std::mem::take(&mut self.spans);
                if let Some(level) = self.heading.take() {
                    self.push_block(Block::Heading { level, spans });
                }
            }
            TagEnd::Strong => self.style.bold = false,
            TagEnd::Emphasis => self.style.italic = false,
            TagEnd::Strikethrough => self.style.strike = false,
            TagEnd::Link => self.link = None,
            TagEnd::CodeBlock => {
                if let Some((language, code)) = self.code.take() {
                    let code = code.trim_end_matches('\n').to_string();
                    self.push_block(Block::Code { language, code });
                }
            }
            TagEnd::BlockQuote(_) => {
                self.flush_spans();
                if let Some(Frame::Quote(inner)) = self.frames.pop() {
                    self.push_block(Block::Quote(inner));
                }
            }
            TagEnd::Item => {
                self.flush_spans();
                if let Some(Frame::Item(blocks)) = self.frames.pop() {
                    if let Some(Frame::List { items, .. }) = self.frames.last_mut() {
                        items.push(blocks);
                    }
                }
            }
            TagEnd::List(_) => {
                if let Some(Frame::List { start, items }) = self.frames.pop() {
                    self.push_block(Block::List { start, items });
                }
            }
            TagEnd::TableCell => {
                let cell = std::mem::take(&mut self.spans);
                if let Some(Frame::Table { row, .. }) = self.frames.last_mut() {
                    row.push(cell);
                }
            }
            TagEnd::TableHead => {
                if let Some(Frame::Table { header, row, .. }) = self.frames.last_mut() {
                    *header = std::mem::take(row);
                }
            }
            TagEnd::TableRow => {
                if let Some(Frame::Table { rows, row, .. }) = self.frames.last_mut() {
                    rows.push(std::mem::take(row));
                }
            }
            TagEnd::Table => {
                if let Some(Frame::Table { header, rows, .. }) = self.frames.pop() {
                    self.push_block(Block::Table { header, rows });
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: CowStr<'_>) {
        match &mut self.code {
            Some((_, code)) => code.push_str(&text),
            None => self.push_span(text.to_string(), self.style),
        }
    }

    fn push_span(&mut self, text: String, style: Style) {
        // Adjacent text with identical formatting is merged.
        if let Some(last) = self.spans.last_mut() {
            if last.style == style && last.link == self.link {
                last.text.push_str(&text);
                return;
            }
        }
        self.spans.push(Span {
            text,
            style,
            link: self.link.clone(),
        });
    }

    /// Turns pending inline text into a paragraph. Table cells and headings
    /// collect their own spans.
    fn flush_spans(&mut self) {
        if self.spans.is_empty() || self.heading.is_some() {
            return;
        }
        if matches!(self.frames.last(), Some(Frame::Table { .. })) {
            return;
        }
        let spans = std::mem::take(&mut self.spans);
        self.push_block(Block::Paragraph(spans));
    }

    fn push_block(&mut self, block: Block) {
        match self.frames.last_mut() {
            Some(Frame::Quote(blocks)) | Some(Frame::Item(blocks)) => blocks.push(block),
            _ => self.blocks.push(block),
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush_spans();
        // Unterminated markup while a reply is still streaming.
        if let Some((language, code)) = self.code.take() {
            self.push_block(Block::Code { language, code });
        }
        self.blocks
    }
}

fn heading_number(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Pango markup for a run of spans.
pub fn spans_to_markup(spans: &[Span]) -> String {
    let mut markup = String::new();
    for span in spans {
        let mut close: Vec<&str> = Vec::new();
        if let Some(url) = &span.link {
            markup.push_str(&format!("<a href=\"{}\">", glib::markup_escape_text(url)));
            close.push("</a>");
        }
        for (on, open, end) in [
            (span.style.strike, "<s>", "</s>"),
            (span.style.italic, "<i>", "</i>"),
            (span.style.bold, "<b>", "</b>"),
            (span.style.code, "<tt>", "</tt>"),
        ] {
            if on {
                markup.push_str(open);
                close.push(end);
            }
        }
        markup.push_str(&glib::markup_escape_text(&span.text));
        for tag in close.iter().rev() {
            markup.push_str(tag);
        }
    }
    markup
}
