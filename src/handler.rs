use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::{App, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick(),
        AppEvent::AnalysisFinished { request, outcome } => app.on_analysis_finished(request, outcome),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Editing => handle_draft_editing(app, key),
        InputMode::FilePrompt => handle_file_prompt(app, key),
    }
}

fn handle_draft_editing(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        // Reserved for multi-line input
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => {}
        KeyCode::Enter => app.submit(),
        KeyCode::Esc => {
            if !app.toasts.dismiss() && app.input.is_empty() {
                app.should_quit = true;
            }
        }
        KeyCode::Char('o') if ctrl => {
            app.file_input = app
                .attachment
                .as_ref()
                .map(|a| a.path.display().to_string())
                .unwrap_or_default();
            app.file_cursor = app.file_input.chars().count();
            app.input_mode = InputMode::FilePrompt;
        }
        KeyCode::Char('x') if ctrl => app.detach_file(),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(page(app)),
        KeyCode::PageDown => app.scroll_down(page(app)),
        _ => {
            edit_line(&mut app.input, &mut app.cursor, key);
        }
    }
}

fn handle_file_prompt(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.file_input.clear();
            app.file_cursor = 0;
            app.input_mode = InputMode::Editing;
        }
        KeyCode::Enter => {
            app.attach_from_prompt();
        }
        _ => {
            edit_line(&mut app.file_input, &mut app.file_cursor, key);
        }
    }
}

/// Pasted text goes into the active input as one line. A paste never submits.
fn handle_paste(app: &mut App, pasted: &str) {
    let text: String = pasted
        .replace("\r\n", " ")
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();

    let (input, cursor) = match app.input_mode {
        InputMode::Editing => (&mut app.input, &mut app.cursor),
        InputMode::FilePrompt => (&mut app.file_input, &mut app.file_cursor),
    };
    let byte_pos = char_to_byte_index(input, *cursor);
    input.insert_str(byte_pos, &text);
    *cursor += text.chars().count();
}

fn page(app: &App) -> u16 {
    (app.chat_height / 2).max(1)
}

/// Single-line editing shared by the draft and the file prompt.
/// Returns true when the key was consumed.
fn edit_line(text: &mut String, cursor: &mut usize, key: KeyEvent) -> bool {
    if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
        return false;
    }

    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = text.chars().count();
            if *cursor < char_count {
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            *cursor = cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = text.chars().count();
            *cursor = (*cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            *cursor = 0;
        }
        KeyCode::End => {
            *cursor = text.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => return false,
    }
    true
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}
