use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, content: Vec<Inline> },
    Paragraph(Vec<Inline>),
    List { start: Option<u64>, items: Vec<Vec<Block>> },
    CodeBlock { lang: Option<String>, code: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Strong(Vec<Inline>),
    Emphasis(Vec<Inline>),
    Code(String),
    Break,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leaf {
    Paragraph,
    Heading(u8),
    /// Text directly inside a tight list item
    Implicit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpanKind {
    Strong,
    Emphasis,
}

enum Frame {
    Root(Vec<Block>),
    List { start: Option<u64>, items: Vec<Vec<Block>> },
    Item(Vec<Block>),
}

struct Builder {
    frames: Vec<Frame>,
    leaf: Option<Leaf>,
    inlines: Vec<Inline>,
    spans: Vec<(SpanKind, Vec<Inline>)>,
    code: Option<(Option<String>, String)>,
}

impl Builder {
    fn new() -> Self {
        Self {
            frames: vec![Frame::Root(Vec::new())],
            leaf: None,
            inlines: Vec::new(),
            spans: Vec::new(),
            code: None,
        }
    }

    fn push_inline(&mut self, inline: Inline) {
        if self.leaf.is_none() {
            self.leaf = Some(Leaf::Implicit);
        }
        let target = match self.spans.last_mut() {
            Some((_, children)) => children,
            None => &mut self.inlines,
        };
        // pulldown-cmark splits text at some punctuation
        if let (Inline::Text(next), Some(Inline::Text(prev))) = (&inline, target.last_mut()) {
            prev.push_str(next);
            return;
        }
        target.push(inline);
    }

    fn push_block(&mut self, block: Block) {
        match self.frames.last_mut() {
            Some(Frame::Root(blocks)) | Some(Frame::Item(blocks)) => blocks.push(block),
            Some(Frame::List { items, .. }) => items.push(vec![block]),
            None => {}
        }
    }

    fn flush_leaf(&mut self) {
        let Some(leaf) = self.leaf.take() else {
            return;
        };
        while let Some((kind, children)) = self.spans.pop() {
            self.push_inline_raw(wrap(kind, children));
        }
        let content = std::mem::take(&mut self.inlines);
        if content.is_empty() && !matches!(leaf, Leaf::Heading(_)) {
            return;
        }
        let block = match leaf {
            Leaf::Heading(level) => Block::Heading { level, content },
            Leaf::Paragraph | Leaf::Implicit => Block::Paragraph(content),
        };
        self.push_block(block);
    }

    fn push_inline_raw(&mut self, inline: Inline) {
        match self.spans.last_mut() {
            Some((_, children)) => children.push(inline),
            None => self.inlines.push(inline),
        }
    }

    fn start(&mut self, tag: Tag) {
        match tag {
            Tag::Paragraph => {
                self.flush_leaf();
                self.leaf = Some(Leaf::Paragraph);
            }
            Tag::Heading { level, .. } => {
                self.flush_leaf();
                self.leaf = Some(Leaf::Heading(level as u8));
            }
            Tag::CodeBlock(kind) => {
                self.flush_leaf();
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some((lang, String::new()));
            }
            Tag::List(start) => {
                self.flush_leaf();
                self.frames.push(Frame::List { start, items: Vec::new() });
            }
            Tag::Item => {
                self.flush_leaf();
                self.frames.push(Frame::Item(Vec::new()));
            }
            Tag::Strong => self.spans.push((SpanKind::Strong, Vec::new())),
            Tag::Emphasis => self.spans.push((SpanKind::Emphasis, Vec::new())),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Heading(_) => self.flush_leaf(),
            TagEnd::CodeBlock => {
                if let Some((lang, mut code)) = self.code.take() {
                    if code.ends_with('\n') {
                        code.pop();
                    }
                    self.push_block(Block::CodeBlock { lang, code });
                }
            }
            TagEnd::Item => {
                self.flush_leaf();
                if let Some(Frame::Item(blocks)) = self.frames.pop() {
                    if let Some(Frame::List { items, .. }) = self.frames.last_mut() {
                        items.push(blocks);
                    }
                }
            }
            TagEnd::List(_) => {
                self.flush_leaf();
                if let Some(Frame::List { start, items }) = self.frames.pop() {
                    self.push_block(Block::List { start, items });
                }
            }
            TagEnd::Strong | TagEnd::Emphasis => {
                if let Some((kind, children)) = self.spans.pop() {
                    self.push_inline(wrap(kind, children));
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        match self.code.as_mut() {
            Some((_, code)) => code.push_str(text),
            None => self.push_inline(Inline::Text(text.to_string())),
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush_leaf();
        // Close anything the parser left open
        while self.frames.len() > 1 {
            match self.frames.pop() {
                Some(Frame::Item(blocks)) => {
                    if let Some(Frame::List { items, .. }) = self.frames.last_mut() {
                        items.push(blocks);
                    }
                }
                Some(Frame::List { start, items }) => self.push_block(Block::List { start, items }),
                _ => {}
            }
        }
        match self.frames.pop() {
            Some(Frame::Root(blocks)) => blocks,
            _ => Vec::new(),
        }
    }
}

fn wrap(kind: SpanKind, children: Vec<Inline>) -> Inline {
    match kind {
        SpanKind::Strong => Inline::Strong(children),
        SpanKind::Emphasis => Inline::Emphasis(children),
    }
}

/// Parse assistant markdown. Constructs outside headings, lists, emphasis
/// and code keep only their text.
pub fn parse(source: &str) -> Vec<Block> {
    let mut builder = Builder::new();

    for event in Parser::new_ext(source, Options::empty()) {
        match event {
            Event::Start(tag) => builder.start(tag),
            Event::End(tag) => builder.end(tag),
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => builder.text(&text),
            Event::Code(code) => builder.push_inline(Inline::Code(code.to_string())),
            Event::SoftBreak | Event::HardBreak => builder.push_inline(Inline::Break),
            Event::Rule => builder.flush_leaf(),
            _ => {}
        }
    }

    builder.finish()
}

/// Plain text of an inline run, markup removed
#[cfg(test)]
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(t) | Inline::Code(t) => out.push_str(t),
            Inline::Strong(children) | Inline::Emphasis(children) => out.push_str(&plain_text(children)),
            Inline::Break => out.push('\n'),
        }
    }
    out
}

/// Convert parsed blocks into styled terminal lines
pub fn to_lines(blocks: &[Block]) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    render_blocks(blocks, "", &mut lines);
    lines
}

fn render_blocks(blocks: &[Block], indent: &str, lines: &mut Vec<Line<'static>>) {
    for (i, block) in blocks.iter().enumerate() {
        // Headings get breathing room above, like a section break
        if i > 0 && matches!(block, Block::Heading { .. }) {
            lines.push(Line::default());
        }
        match block {
            Block::Heading { level, content } => {
                let mut style = Style::default().add_modifier(Modifier::BOLD);
                if *level <= 3 {
                    style = style.fg(Color::Cyan);
                }
                for spans in inline_lines(content, style) {
                    lines.push(prefixed(indent, spans));
                }
            }
            Block::Paragraph(content) => {
                for spans in inline_lines(content, Style::default()) {
                    lines.push(prefixed(indent, spans));
                }
            }
            Block::List { start, items } => {
                for (n, item) in items.iter().enumerate() {
                    let marker = match start {
                        Some(first) => format!("{}. ", first + n as u64),
                        None => "• ".to_string(),
                    };
                    let mut item_lines = Vec::new();
                    render_blocks(item, "", &mut item_lines);
                    let continuation = " ".repeat(marker.chars().count());
                    for (j, line) in item_lines.into_iter().enumerate() {
                        let lead = if j == 0 {
                            format!("{}{}", indent, marker)
                        } else {
                            format!("{}{}", indent, continuation)
                        };
                        let mut spans = vec![Span::raw(lead)];
                        spans.extend(line.spans);
                        lines.push(Line::from(spans));
                    }
                }
            }
            Block::CodeBlock { code, .. } => {
                let style = Style::default().fg(Color::Green);
                for code_line in code.lines() {
                    lines.push(Line::from(vec![
                        Span::raw(format!("{}  ", indent)),
                        Span::styled(code_line.to_string(), style),
                    ]));
                }
            }
        }
    }
}

fn prefixed(indent: &str, spans: Vec<Span<'static>>) -> Line<'static> {
    if indent.is_empty() {
        Line::from(spans)
    } else {
        let mut all = vec![Span::raw(indent.to_string())];
        all.extend(spans);
        Line::from(all)
    }
}

/// Styled spans split into visual lines at breaks
fn inline_lines(inlines: &[Inline], base: Style) -> Vec<Vec<Span<'static>>> {
    let mut lines = vec![Vec::new()];
    collect_spans(inlines, base, &mut lines);
    lines
}

fn collect_spans(inlines: &[Inline], style: Style, lines: &mut Vec<Vec<Span<'static>>>) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => push_span(lines, Span::styled(text.clone(), style)),
            Inline::Code(code) => push_span(
                lines,
                Span::styled(code.clone(), style.fg(Color::Yellow)),
            ),
            Inline::Strong(children) => {
                collect_spans(children, style.add_modifier(Modifier::BOLD), lines)
            }
            Inline::Emphasis(children) => {
                collect_spans(children, style.add_modifier(Modifier::ITALIC), lines)
            }
            Inline::Break => lines.push(Vec::new()),
        }
    }
}

fn push_span(lines: &mut Vec<Vec<Span<'static>>>, span: Span<'static>) {
    if let Some(current) = lines.last_mut() {
        current.push(span);
    }
}
