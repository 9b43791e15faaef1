use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::{App, FocusPane};
use crate::tui::TermEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: TermEvent) -> Result<()> {
    match event {
        TermEvent::Key(key) => handle_key(app, key),
        TermEvent::Mouse(mouse) => handle_mouse(app, mouse),
        TermEvent::Resize => app.scroll_chat_to_bottom(),
        TermEvent::Tick => app.tick_animation(),
    }
    app.poll_send_task().await;
    app.follow_latest();
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any pane
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => app.should_quit = true,
            KeyCode::Char('n') => app.new_chat(),
            KeyCode::Char('t') => app.toggle_dark_mode(),
            _ => {}
        }
        // Unbound Ctrl chords never reach the input line
        return;
    }

    match key.code {
        KeyCode::PageUp => {
            for _ in 0..5 {
                app.scroll_up();
            }
            return;
        }
        KeyCode::PageDown => {
            for _ in 0..5 {
                app.scroll_down();
            }
            return;
        }
        _ => {}
    }

    match app.focus {
        FocusPane::Sidebar => handle_sidebar(app, key),
        FocusPane::Input => handle_input(app, key),
    }
}

fn handle_sidebar(app: &mut App, key: KeyEvent) {
    match key.code {
        // Quit (ends the session)
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('j') | KeyCode::Down => app.sidebar_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.sidebar_nav_up(),
        KeyCode::Enter | KeyCode::Char('l') => app.open_highlighted(),
        KeyCode::Char('n') => app.new_chat(),
        KeyCode::Char('t') => app.toggle_dark_mode(),
        KeyCode::Char('i') | KeyCode::Tab | KeyCode::Esc => app.focus = FocusPane::Input,
        _ => {}
    }
}

fn handle_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Tab => {
            app.focus = FocusPane::Sidebar;
        }
        KeyCode::Enter => {
            // Input stays disabled while a reply is outstanding
            if !app.is_pending() {
                app.submit_input();
            }
        }
        KeyCode::Up => app.scroll_up(),
        KeyCode::Down => app.scroll_down(),
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.cursor = (app.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.scroll_up(),
        MouseEventKind::ScrollDown => app.scroll_down(),
        _ => {}
    }
}
