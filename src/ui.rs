use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};
use crate::app::{App, InputMode};
use crate::notify::NotificationKind;
use crate::view;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    // Popups on top
    if app.input_mode == InputMode::FilePrompt {
        render_file_prompt(app, frame, area);
    }
    render_toasts(app, frame, area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Resume AI Analysis ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!("→ {} ", app.endpoint), Style::default().fg(Color::Gray)),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

/// Lines for the whole conversation plus the in-flight indicator
pub fn chat_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = view::project(app.conversation.all())
        .iter()
        .flat_map(|row| row.lines())
        .collect();

    if app.conversation.is_submitting() {
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(
            Line::from(Span::styled(
                format!("Analyzing{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ))
            .alignment(Alignment::Center),
        );
    }
    lines
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    // Inner size minus borders, for scroll calculations
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let lines = if app.conversation.is_empty() && !app.conversation.is_submitting() {
        vec![Line::from(Span::styled(
            "Attach a resume with Ctrl+O, then paste the job description below...",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        chat_lines(app)
    };

    // Measure with the same wrapping the widget renders with
    let chat = view::paragraph(lines);
    let total = chat.line_count(app.chat_width.max(1));
    app.sync_scroll(u16::try_from(total).unwrap_or(u16::MAX));

    let chat = chat.block(block).scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);

    if total > usize::from(app.chat_height) {
        let mut state = ScrollbarState::new(total.saturating_sub(usize::from(app.chat_height)))
            .position(usize::from(app.chat_scroll));
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area,
            &mut state,
        );
    }
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if app.conversation.is_submitting() {
        Color::DarkGray
    } else if editing {
        Color::Yellow
    } else {
        Color::Gray
    };

    let attachment = match &app.attachment {
        Some(a) => format!(" 📎 {} ", a.file_name),
        None => " no resume attached ".to_string(),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Job description ")
        .title_bottom(Line::from(attachment).right_aligned());

    let (visible, cursor_x) = visible_input(&app.input, app.cursor, area.width.saturating_sub(2));
    let content = if app.input.is_empty() {
        Span::styled("Enter the job description...", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(visible)
    };

    frame.render_widget(Paragraph::new(Line::from(content)).block(block), area);

    if editing {
        frame.set_cursor_position((area.x + 1 + cursor_x, area.y + 1));
    }
}

/// Horizontal scrolling for single-line inputs: the slice of `text` that
/// fits in `width` columns while keeping the cursor visible, and the
/// cursor column within that slice
fn visible_input(text: &str, cursor: usize, width: u16) -> (String, u16) {
    let inner_width = usize::from(width);
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor >= inner_width {
        cursor - inner_width + 1
    } else {
        0
    };

    let visible: String = text.chars().skip(scroll_offset).take(inner_width).collect();
    let cursor_x = u16::try_from(cursor - scroll_offset).unwrap_or(width);
    (visible, cursor_x.min(width.saturating_sub(1)))
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let (mode_text, mode_style) = if app.conversation.is_submitting() {
        (" ANALYZING ", Style::default().bg(Color::Magenta).fg(Color::White))
    } else {
        match app.input_mode {
            InputMode::Editing => (" SEND ", Style::default().bg(Color::Blue).fg(Color::White)),
            InputMode::FilePrompt => (" ATTACH ", Style::default().bg(Color::Yellow).fg(Color::Black)),
        }
    };

    let hints = match app.input_mode {
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Ctrl+O ", key_style),
            Span::styled(" attach ", label_style),
            Span::styled(" Ctrl+X ", key_style),
            Span::styled(" detach ", label_style),
            Span::styled(" PgUp/PgDn ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" Ctrl+C ", key_style),
            Span::styled(" quit ", label_style),
        ],
        InputMode::FilePrompt => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" attach ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" cancel ", label_style),
        ],
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_file_prompt(app: &App, frame: &mut Frame, area: Rect) {
    let popup = centered_rect(70, 3, area);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Resume path (.pdf) ");

    let (visible, cursor_x) =
        visible_input(&app.file_input, app.file_cursor, popup.width.saturating_sub(2));
    frame.render_widget(Paragraph::new(visible).block(block), popup);
    frame.set_cursor_position((popup.x + 1 + cursor_x, popup.y + 1));
}

fn render_toasts(app: &App, frame: &mut Frame, area: Rect) {
    if app.toasts.is_empty() {
        return;
    }
    let mut y = area.y + 1;
    for toast in app.toasts.visible().iter().rev() {
        let (icon, color) = match toast.kind {
            NotificationKind::Success => ("✔", Color::Green),
            NotificationKind::Warning => ("⚠", Color::Yellow),
            NotificationKind::Error => ("✘", Color::Red),
        };
        let text = format!(" {} {} ", icon, toast.text);
        let width = (text.chars().count() as u16 + 2).min(area.width);
        if y + 3 > area.y + area.height {
            break;
        }
        let rect = Rect::new(area.x + area.width - width, y, width, 3);
        frame.render_widget(Clear, rect);
        frame.render_widget(
            Paragraph::new(text)
                .style(Style::default().fg(color))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(color))
                        .title_bottom(Line::from(" Esc ").right_aligned()),
                ),
            rect,
        );
        y += 3;
    }
}

/// Fixed-height rectangle centered in `area`, `percent_x` wide
fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let [_, middle, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(height),
        Constraint::Fill(1),
    ])
    .areas(area);
    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(middle);
    center
}
