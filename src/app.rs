use ratatui::layout::Rect;

use crate::catalog::Catalog;
use crate::chat::{BotStatus, Role, Transcript};
use crate::gemini::RemoteServiceError;
use crate::session::{ReplyStream, SessionManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Products,
    Chat,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub focus: FocusPane,
    pub input_mode: InputMode,

    // Input box
    pub input: String,
    pub input_cursor: usize, // cursor position in chars

    // Conversation state
    pub transcript: Transcript,
    pub session: SessionManager,
    pub reply: Option<ReplyStream>,

    // Chat scroll state
    pub chat_scroll: u16,
    pub chat_height: u16, // inner height of the chat area, set during render
    pub chat_width: u16,  // inner width, for wrap calculations

    // Sidebar
    pub catalog: Catalog,
    pub sidebar_scroll: u16,
    pub sidebar_height: u16,
    pub sidebar_lines: u16,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub sidebar_area: Option<Rect>,
    pub chat_area: Option<Rect>,
    pub input_area: Option<Rect>,
}

impl App {
    pub fn new(catalog: Catalog, session: SessionManager) -> Self {
        Self {
            should_quit: false,
            focus: FocusPane::Input,
            input_mode: InputMode::Editing,

            input: String::new(),
            input_cursor: 0,

            transcript: Transcript::with_welcome(),
            session,
            reply: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            catalog,
            sidebar_scroll: 0,
            sidebar_height: 0,
            sidebar_lines: 0,

            animation_frame: 0,

            sidebar_area: None,
            chat_area: None,
            input_area: None,
        }
    }

    pub fn status(&self) -> BotStatus {
        self.transcript.status()
    }

    /// Submit whatever is in the input box. The transcript guard rejects
    /// blank text and submissions while a reply is in flight.
    pub fn submit_input(&mut self) {
        let text = self.input.clone();
        if self.transcript.begin_exchange(&text).is_none() {
            return;
        }

        self.input.clear();
        self.input_cursor = 0;
        self.reply = Some(self.session.submit(&text));
        self.scroll_chat_to_bottom();
    }

    /// Apply the next item pulled off the in-flight reply stream.
    pub fn on_reply_event(&mut self, item: Option<Result<String, RemoteServiceError>>) {
        match item {
            Some(Ok(fragment)) => {
                self.transcript.push_fragment(&fragment);
            }
            Some(Err(_)) => {
                self.transcript.fail();
                self.reply = None;
            }
            None => {
                self.transcript.complete();
                self.reply = None;
            }
        }
        self.scroll_chat_to_bottom();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.transcript.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            FocusPane::Products => FocusPane::Chat,
            FocusPane::Chat => FocusPane::Input,
            FocusPane::Input => FocusPane::Products,
        };
        self.input_mode = InputMode::Normal;
    }

    // Chat scrolling
    pub fn chat_scroll_down(&mut self) {
        let max_scroll = self.chat_line_count().saturating_sub(self.chat_height);
        if self.chat_scroll < max_scroll {
            self.chat_scroll = self.chat_scroll.saturating_add(1);
        }
    }

    pub fn chat_scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    /// Keep the newest content (and the thinking indicator) visible.
    pub fn scroll_chat_to_bottom(&mut self) {
        let total_lines = self.chat_line_count();
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        } else {
            self.chat_scroll = 0;
        }
    }

    /// Wrapped line count of the transcript, mirroring how ui.rs lays the
    /// chat out: role header, wrapped content lines, blank separator.
    fn chat_line_count(&self) -> u16 {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for message in self.transcript.messages() {
            total_lines += 1; // Role line ("You:" or "Assistant:")
            if message.role == Role::Assistant
                && message.content.is_empty()
                && self.transcript.open_assistant() == Some(message.id)
            {
                total_lines += 1; // Thinking indicator
            }
            for line in message.content.lines() {
                // Char count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after message
        }

        total_lines
    }

    // Sidebar scrolling
    pub fn sidebar_scroll_down(&mut self) {
        let max_scroll = self.sidebar_lines.saturating_sub(self.sidebar_height);
        if self.sidebar_scroll < max_scroll {
            self.sidebar_scroll = self.sidebar_scroll.saturating_add(1);
        }
    }

    pub fn sidebar_scroll_up(&mut self) {
        self.sidebar_scroll = self.sidebar_scroll.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::GeminiClient;
    use crate::session::SessionManager;

    fn test_app() -> App {
        let catalog = Catalog::builtin().unwrap();
        let instruction = catalog.system_instruction();
        // Point at a dead local port so spawned exchanges never leave the box.
        let client =
            GeminiClient::new("test-key", "gemini-2.0-flash").with_base_url("http://127.0.0.1:9");
        App::new(catalog, SessionManager::new(client, instruction))
    }

    #[tokio::test]
    async fn test_submit_clears_input_and_tracks_stream() {
        let mut app = test_app();
        app.input = "do you ship abroad?".to_string();
        app.input_cursor = app.input.chars().count();

        app.submit_input();

        assert!(app.input.is_empty());
        assert_eq!(app.input_cursor, 0);
        assert!(app.reply.is_some());
        assert_eq!(app.status(), BotStatus::Thinking);
        // welcome + user + placeholder
        assert_eq!(app.transcript.messages().len(), 3);
    }

    #[tokio::test]
    async fn test_blank_submit_is_a_no_op() {
        let mut app = test_app();
        app.input = "   ".to_string();

        app.submit_input();

        assert!(app.reply.is_none());
        assert_eq!(app.transcript.messages().len(), 1);
        // The untouched input stays put for the user to edit.
        assert_eq!(app.input, "   ");
    }

    #[tokio::test]
    async fn test_reply_events_drive_the_transcript() {
        let mut app = test_app();
        app.input = "hello".to_string();
        app.submit_input();

        app.on_reply_event(Some(Ok("Hi".to_string())));
        app.on_reply_event(Some(Ok(" there".to_string())));
        app.on_reply_event(None);

        let messages = app.transcript.messages();
        assert_eq!(messages.last().unwrap().content, "Hi there");
        assert_eq!(app.status(), BotStatus::Idle);
        assert!(app.reply.is_none());
    }

    #[tokio::test]
    async fn test_reply_error_sets_fallback() {
        let mut app = test_app();
        app.input = "hello".to_string();
        app.submit_input();

        app.on_reply_event(Some(Ok("par".to_string())));
        app.on_reply_event(Some(Err(crate::gemini::RemoteServiceError::Network(
            "connection reset".to_string(),
        ))));

        let messages = app.transcript.messages();
        assert_eq!(messages.last().unwrap().content, crate::chat::FALLBACK_REPLY);
        assert_eq!(app.status(), BotStatus::Error);
        assert!(app.reply.is_none());
    }

    #[test]
    fn test_animation_only_advances_while_thinking() {
        let mut app = test_app();
        app.tick_animation();
        assert_eq!(app.animation_frame, 0);
    }
}
