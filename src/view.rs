use ratatui::{
    layout::Alignment,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
};
use crate::conversation::{ChatMessage, ChatRole};
use crate::markdown::{self, Block};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Shown exactly as typed
    Plain(String),
    Markdown(Vec<Block>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub role: ChatRole,
    pub alignment: Alignment,
    pub label: &'static str,
    pub body: Body,
    pub time: Option<String>,
}

pub fn project(messages: &[ChatMessage]) -> Vec<Row> {
    messages.iter().map(project_message).collect()
}

fn project_message(message: &ChatMessage) -> Row {
    let time = message.timestamp.map(|t| t.format("%H:%M").to_string());
    match message.role {
        ChatRole::User => Row {
            role: ChatRole::User,
            alignment: Alignment::Right,
            label: "You",
            body: Body::Plain(message.content.clone()),
            time,
        },
        // Only service output is interpreted as markup
        ChatRole::Assistant => Row {
            role: ChatRole::Assistant,
            alignment: Alignment::Left,
            label: "AI",
            body: Body::Markdown(markdown::parse(&message.content)),
            time,
        },
    }
}

impl Row {
    pub fn lines(&self) -> Vec<Line<'static>> {
        let label_style = match self.role {
            ChatRole::User => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ChatRole::Assistant => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        };

        let mut header = vec![Span::styled(format!("{}:", self.label), label_style)];
        if let Some(time) = &self.time {
            header.push(Span::styled(format!(" {}", time), Style::default().fg(Color::DarkGray)));
        }

        let mut lines = vec![Line::from(header)];
        match &self.body {
            Body::Plain(text) => {
                lines.extend(text.split('\n').map(|l| Line::from(l.to_string())));
            }
            Body::Markdown(blocks) => lines.extend(markdown::to_lines(blocks)),
        }
        lines.push(Line::default());

        lines
            .into_iter()
            .map(|line| line.alignment(self.alignment))
            .collect()
    }
}

/// Chat paragraph: word-wrapped, whitespace kept. `line_count` on the
/// result gives the rendered height used for scrolling.
pub fn paragraph(lines: Vec<Line<'static>>) -> Paragraph<'static> {
    Paragraph::new(lines).wrap(Wrap { trim: false })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    fn at(hour: u32, minute: u32) -> chrono::DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 1, hour, minute, 0).unwrap()
    }

    fn conversation() -> Vec<ChatMessage> {
        vec![
            ChatMessage::user("Senior backend engineer, 5 years Go", at(9, 5)),
            ChatMessage::assistant("### Strengths\n- Strong Go experience", at(9, 6)),
        ]
    }

    #[test]
    fn test_alignment_by_role() {
        let rows = project(&conversation());
        assert_eq!(rows[0].alignment, Alignment::Right);
        assert_eq!(rows[1].alignment, Alignment::Left);
        assert_eq!(rows[0].time.as_deref(), Some("09:05"));

        for line in rows[0].lines() {
            assert_eq!(line.alignment, Some(Alignment::Right));
        }
    }

    #[test]
    fn test_projection_is_repeatable() {
        let messages = conversation();
        let first = project(&messages);
        let second = project(&messages);
        assert_eq!(first, second);
        assert_eq!(first[0].lines(), second[0].lines());
        assert_eq!(first[1].lines(), second[1].lines());
    }

    #[test]
    fn test_user_markdown_stays_literal() {
        let rows = project(&[
            ChatMessage::user("**bold**", at(10, 0)),
            ChatMessage::assistant("**bold**", at(10, 1)),
        ]);

        assert_eq!(rows[0].body, Body::Plain("**bold**".to_string()));
        let user_lines = rows[0].lines();
        assert_eq!(user_lines[1].to_string(), "**bold**");
        assert!(user_lines[1]
            .spans
            .iter()
            .all(|s| !s.style.add_modifier.contains(Modifier::BOLD)));

        let assistant_lines = rows[1].lines();
        assert_eq!(assistant_lines[1].to_string(), "bold");
        assert!(assistant_lines[1].spans[0].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_end_to_end_rendering() {
        let rows = project(&conversation());

        assert_eq!(rows[0].body, Body::Plain("Senior backend engineer, 5 years Go".to_string()));
        match &rows[1].body {
            Body::Markdown(blocks) => {
                assert!(matches!(&blocks[0], Block::Heading { level: 3, content } if markdown::plain_text(content) == "Strengths"));
                match &blocks[1] {
                    Block::List { start: None, items } => {
                        assert_eq!(items.len(), 1);
                        assert!(matches!(&items[0][0], Block::Paragraph(c) if markdown::plain_text(c) == "Strong Go experience"));
                    }
                    other => panic!("unexpected block: {other:?}"),
                }
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn test_multiline_user_text() {
        let rows = project(&[ChatMessage::user("line one\nline two", at(8, 0))]);
        let lines = rows[0].lines();
        // header, two text lines, spacer
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[2].to_string(), "line two");
    }

    #[test]
    fn test_paragraph_height() {
        let lines = vec![
            Line::from("x".repeat(25)),
            Line::default(),
            Line::from("short"),
        ];
        assert_eq!(paragraph(lines).line_count(10), 3 + 1 + 1);
    }

    #[test]
    fn test_paragraph_height_breaks_on_words() {
        // 12 columns fit in two rows of 6, but the words need three
        let lines = vec![Line::from("abcd efg hij")];
        assert_eq!(paragraph(lines).line_count(6), 3);
    }
}
