use ratatui::widgets::ListState;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use windchat_core::{
    AskReply, Config, GatewayError, HttpGateway, MessageId, PendingSend, SessionController,
    SessionError, SessionSnapshot,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Sidebar,
    Input,
}

/// The send currently awaiting a reply
pub struct SendTask {
    pub ticket: PendingSend,
    pub handle: JoinHandle<Result<AskReply, GatewayError>>,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub focus: FocusPane,
    pub dark_mode: bool,
    pub status: Option<String>,

    // Session (owned), and the snapshot feed the renderer reads from
    session: SessionController<HttpGateway>,
    snapshots: watch::Receiver<SessionSnapshot>,
    pub send_task: Option<SendTask>,

    // Input state
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Sidebar state
    pub sidebar_state: ListState,

    // Chat pane state
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    last_message_id: Option<MessageId>, // newest message the chat pane has scrolled to

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(session: SessionController<HttpGateway>, dark_mode: bool) -> Self {
        let snapshots = session.subscribe();
        Self {
            should_quit: false,
            focus: FocusPane::Input,
            dark_mode,
            status: None,

            session,
            snapshots,
            send_task: None,

            input: String::new(),
            cursor: 0,

            sidebar_state: ListState::default(),

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            last_message_id: None,

            animation_frame: 0,
        }
    }

    pub fn snapshot(&self) -> watch::Ref<'_, SessionSnapshot> {
        self.snapshots.borrow()
    }

    pub fn is_pending(&self) -> bool {
        self.snapshot().pending
    }

    pub fn active_title(&self) -> Option<String> {
        self.session.active_title().map(str::to_string)
    }

    /// Best-effort history load; failure only shows in the status line.
    pub async fn hydrate(&mut self) {
        match self.session.hydrate().await {
            Ok(0) => self.status = None,
            Ok(count) => self.status = Some(format!("Loaded {} conversations", count)),
            Err(err) => self.status = Some(format!("Failed to load chat history: {}", err)),
        }
        self.sync_sidebar_selection();
    }

    /// Send the input line. Ignored while a reply is outstanding.
    pub fn submit_input(&mut self) {
        let content = self.input.trim().to_string();
        if content.is_empty() || self.send_task.is_some() {
            return;
        }

        let ticket = match self.session.begin_send(&content) {
            Ok(ticket) => ticket,
            Err(SessionError::ConcurrencyViolation) => return,
            Err(err) => {
                self.status = Some(err.to_string());
                return;
            }
        };

        let handle = tokio::spawn(self.session.request(&ticket));
        self.send_task = Some(SendTask { ticket, handle });

        self.input.clear();
        self.cursor = 0;
        self.status = None;
    }

    /// Fold a finished request back into the session.
    pub async fn poll_send_task(&mut self) {
        let finished = self
            .send_task
            .as_ref()
            .is_some_and(|task| task.handle.is_finished());
        if !finished {
            return;
        }

        if let Some(task) = self.send_task.take() {
            let outcome = match task.handle.await {
                Ok(outcome) => outcome,
                Err(err) => Err(GatewayError::Transport(format!("request task failed: {}", err))),
            };
            self.session.complete_send(task.ticket, outcome);
            self.sync_sidebar_selection();
        }
    }

    pub fn new_chat(&mut self) {
        self.session.start_new_conversation();
        self.sidebar_state.select(None);
        self.chat_scroll = 0;
        self.focus = FocusPane::Input;
    }

    pub fn open_highlighted(&mut self) {
        let id = {
            let snapshot = self.snapshot();
            self.sidebar_state
                .selected()
                .and_then(|i| snapshot.conversations.get(i))
                .map(|c| c.id)
        };

        if let Some(id) = id {
            if let Err(err) = self.session.select_conversation(id) {
                self.status = Some(err.to_string());
                return;
            }
            self.focus = FocusPane::Input;
        }
    }

    pub fn toggle_dark_mode(&mut self) {
        self.dark_mode = !self.dark_mode;
        if let Err(err) = Config::save_dark_mode(self.dark_mode) {
            tracing::warn!(error = %err, "failed to save theme preference");
            self.status = Some(format!("Theme not saved: {}", err));
        }
    }

    /// Tear the session down on the way out.
    pub fn logout(self) {
        if let Some(task) = self.send_task {
            task.handle.abort();
        }
        self.session.logout();
    }

    // Sidebar navigation
    pub fn sidebar_nav_down(&mut self) {
        let len = self.snapshot().conversations.len();
        if len > 0 {
            let next = self.sidebar_state.selected().map_or(0, |i| (i + 1).min(len - 1));
            self.sidebar_state.select(Some(next));
        }
    }

    pub fn sidebar_nav_up(&mut self) {
        let i = self.sidebar_state.selected().unwrap_or(0);
        self.sidebar_state.select(Some(i.saturating_sub(1)));
    }

    /// Keep the sidebar highlight on the active conversation after the order changes
    fn sync_sidebar_selection(&mut self) {
        let position = {
            let snapshot = self.snapshot();
            snapshot
                .active_conversation_id
                .and_then(|id| snapshot.conversations.iter().position(|c| c.id == id))
        };
        self.sidebar_state.select(position);
    }

    // Chat scrolling
    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    /// Jump to the bottom whenever the newest visible message changes
    pub fn follow_latest(&mut self) {
        let latest = self.snapshot().active_messages.last().map(|m| m.id());
        if latest != self.last_message_id {
            self.last_message_id = latest;
            self.scroll_chat_to_bottom();
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Scroll chat to bottom so the latest turn is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let (mut total_lines, pending) = {
            let snapshot = self.snapshot();
            (chat_line_count(&snapshot, wrap_width), snapshot.pending)
        };
        if pending {
            total_lines += 2; // "Assistant:" + "Thinking..."
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }
}

/// Rendered line count of the active messages at `wrap_width`
fn chat_line_count(snapshot: &SessionSnapshot, wrap_width: usize) -> u16 {
    let wrap_width = wrap_width.max(1);
    let mut total_lines: u16 = 0;

    for msg in &snapshot.active_messages {
        total_lines = total_lines.saturating_add(1); // Role line
        for line in msg.content().lines() {
            // Use character count, not byte length, for proper UTF-8 handling
            let char_count = line.chars().count();
            let wrapped = if char_count == 0 { 1 } else { char_count / wrap_width + 1 };
            total_lines = total_lines.saturating_add(wrapped as u16);
        }
        total_lines = total_lines.saturating_add(1); // Blank line after message
    }

    total_lines
}
