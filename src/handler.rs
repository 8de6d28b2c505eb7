use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, FocusPane, InputMode};

pub fn handle_key(app: &mut App, key: KeyEvent) {
    // Ctrl-C quits from anywhere
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
        }
        KeyCode::Tab => {
            app.cycle_focus();
        }
        KeyCode::Char('i') => {
            app.focus = FocusPane::Input;
            app.input_mode = InputMode::Editing;
        }
        KeyCode::Enter if app.focus == FocusPane::Input => {
            app.input_mode = InputMode::Editing;
        }
        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::Products => app.sidebar_scroll_down(),
            _ => app.chat_scroll_down(),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::Products => app.sidebar_scroll_up(),
            _ => app.chat_scroll_up(),
        },
        KeyCode::Char('G') | KeyCode::End => {
            app.scroll_chat_to_bottom();
        }
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    // The input is disabled while a reply is streaming; only leaving the
    // editing mode stays available.
    if app.transcript.is_busy() {
        match key.code {
            KeyCode::Esc => app.input_mode = InputMode::Normal,
            KeyCode::Tab => app.cycle_focus(),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Tab => {
            app.cycle_focus();
        }
        KeyCode::Enter => {
            app.submit_input();
        }
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.input_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
            app.input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

pub fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    let in_sidebar = app.sidebar_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_input = app.input_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_sidebar {
                app.sidebar_scroll_down();
            } else if in_chat {
                app.chat_scroll_down();
            }
        }
        MouseEventKind::ScrollUp => {
            if in_sidebar {
                app.sidebar_scroll_up();
            } else if in_chat {
                app.chat_scroll_up();
            }
        }
        MouseEventKind::Down(_) => {
            if in_input {
                app.focus = FocusPane::Input;
                app.input_mode = InputMode::Editing;
            } else if in_sidebar {
                app.focus = FocusPane::Products;
                app.input_mode = InputMode::Normal;
            } else if in_chat {
                app.focus = FocusPane::Chat;
                app.input_mode = InputMode::Normal;
            }
        }
        _ => {}
    }
}

/// Convert a char index into a byte index for String mutation
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::gemini::GeminiClient;
    use crate::session::SessionManager;
    use crossterm::event::KeyEventKind;

    fn test_app() -> App {
        let catalog = Catalog::builtin().unwrap();
        let instruction = catalog.system_instruction();
        // Point at a dead local port so spawned exchanges never leave the box.
        let client =
            GeminiClient::new("test-key", "gemini-2.0-flash").with_base_url("http://127.0.0.1:9");
        App::new(catalog, SessionManager::new(client, instruction))
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: crossterm::event::KeyEventState::NONE,
        }
    }

    #[test]
    fn test_typing_inserts_at_cursor() {
        let mut app = test_app();
        for c in "héllo".chars() {
            handle_key(&mut app, press(KeyCode::Char(c)));
        }
        handle_key(&mut app, press(KeyCode::Left));
        handle_key(&mut app, press(KeyCode::Char('!')));

        assert_eq!(app.input, "héll!o");
        assert_eq!(app.input_cursor, 5);
    }

    #[test]
    fn test_backspace_removes_multibyte_chars() {
        let mut app = test_app();
        for c in "café".chars() {
            handle_key(&mut app, press(KeyCode::Char(c)));
        }
        handle_key(&mut app, press(KeyCode::Backspace));

        assert_eq!(app.input, "caf");
        assert_eq!(app.input_cursor, 3);
    }

    #[tokio::test]
    async fn test_editing_keys_ignored_while_busy() {
        let mut app = test_app();
        app.input = "first question".to_string();
        app.input_cursor = app.input.chars().count();
        handle_key(&mut app, press(KeyCode::Enter));
        assert!(app.transcript.is_busy());

        // Typing and submitting are disabled mid-reply
        handle_key(&mut app, press(KeyCode::Char('x')));
        handle_key(&mut app, press(KeyCode::Enter));

        assert!(app.input.is_empty());
        assert_eq!(app.transcript.messages().len(), 3);
    }

    #[test]
    fn test_quit_keys() {
        let mut app = test_app();
        app.input_mode = InputMode::Normal;
        handle_key(&mut app, press(KeyCode::Char('q')));
        assert!(app.should_quit);

        let mut app = test_app();
        let mut key = press(KeyCode::Char('c'));
        key.modifiers = KeyModifiers::CONTROL;
        handle_key(&mut app, key);
        assert!(app.should_quit);
    }
}
