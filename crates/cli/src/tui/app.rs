//! TUI application state, rendering, and input handling.

use std::path::PathBuf;

use client::Attachment;
use proto::{ApiError, HistoryPage, Role, SendReply, SessionId};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use unicode_width::UnicodeWidthStr;

use super::theme::THEME;

/// Spinner animation frames (Braille pattern).
const SPINNER: &[char] = &['⣾', '⣽', '⣻', '⢿', '⡿', '⣟', '⣯', '⣷'];

// ─── Data types ──────────────────────────────────────────────

/// A single rendered entry in the conversation panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayMessage {
    /// User typed this message (optimistic echo or rehydrated history).
    User(String),
    /// Backend model response, including synthesized failure bubbles.
    Model(String),
    /// Local informational entry (slash command feedback).
    Notice(String),
    /// Local failure entry (bad command, unreadable attachment).
    Error(String),
}

/// High-level processing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// No request in flight; composer is active.
    Idle,
    /// A send is in flight; composer is disabled.
    Sending,
}

/// Parsed slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    /// `/new` — start a fresh session.
    NewSession,
    /// `/model` — list fetched models.
    ListModels,
    /// `/model <id>` — select a model verbatim.
    SelectModel(String),
    /// `/attach` — list staged attachments.
    ListAttachments,
    /// `/attach <path>` — stage a file for the next message.
    Attach(PathBuf),
    /// `/detach` — drop all staged attachments.
    Detach,
    /// `/system` — toggle the server-side system instruction mode.
    ToggleSystem,
    /// `/help` — key and command summary.
    Help,
    /// Unrecognised command with an error message.
    Invalid(String),
}

/// Parses a raw composer line into a `SlashCommand`. Returns `None` when the
/// input is not a command at all.
pub fn parse_command(raw: &str) -> Option<SlashCommand> {
    let trimmed = raw.trim();
    if !trimmed.starts_with('/') {
        return None;
    }
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let head = parts.next()?;
    let rest = parts.next().map(str::trim).filter(|s| !s.is_empty());

    Some(match (head, rest) {
        ("/new", None) => SlashCommand::NewSession,
        ("/model", None) => SlashCommand::ListModels,
        ("/model", Some(id)) => SlashCommand::SelectModel(id.to_string()),
        ("/attach", None) => SlashCommand::ListAttachments,
        ("/attach", Some(path)) => SlashCommand::Attach(PathBuf::from(path)),
        ("/detach", None) => SlashCommand::Detach,
        ("/system", None) => SlashCommand::ToggleSystem,
        ("/help", None) => SlashCommand::Help,
        (head, _) => SlashCommand::Invalid(format!("Unknown command: {head}. Try /help.")),
    })
}

const HELP_TEXT: &str = "Commands:\n\
    /new            start a fresh session\n\
    /model [id]     list models or select one\n\
    /attach [path]  stage a file or list staged files\n\
    /detach         drop staged files\n\
    /system         toggle the server-side system instruction\n\
    /help           this summary\n\
    Keys: Ctrl+Enter send · Enter newline/command · Ctrl+N new session · ↑↓ scroll · Ctrl+C quit";

// ─── ChatApp ─────────────────────────────────────────────────

/// Full state for the chat TUI session.
pub struct ChatApp {
    /// Current session identifier.
    pub session_id: SessionId,
    /// Ordered conversation log for display.
    pub messages: Vec<DisplayMessage>,
    /// Current composer text (not yet sent).
    pub input: String,
    /// Cursor position within `input` (byte offset).
    pub cursor_pos: usize,
    /// Files staged for the next send.
    pub attachments: Vec<Attachment>,
    /// Models fetched from the backend (or the fallback).
    pub models: Vec<String>,
    /// Currently selected model id.
    pub model: String,
    /// Whether the backend should apply its system instruction.
    pub use_system: bool,
    /// Current high-level processing state.
    pub state: AppState,
    /// Vertical scroll offset for the conversation panel.
    pub history_scroll: u16,
    /// Spinner animation tick counter.
    pub spinner_tick: u8,
    /// Whether the user requested exit.
    pub should_quit: bool,
}

impl ChatApp {
    /// Create the application state for a session and initial model.
    pub fn new(model: impl Into<String>, session_id: SessionId) -> Self {
        Self {
            session_id,
            messages: Vec::new(),
            input: String::new(),
            cursor_pos: 0,
            attachments: Vec::new(),
            models: Vec::new(),
            model: model.into(),
            use_system: false,
            state: AppState::Idle,
            history_scroll: 0,
            spinner_tick: 0,
            should_quit: false,
        }
    }

    /// Whether a send is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.state == AppState::Sending
    }

    // ── Request lifecycle ────────────────────────────────────

    /// Whether a send may start: idle, and something to send.
    pub fn can_send(&self) -> bool {
        self.state == AppState::Idle
            && (!self.input.trim().is_empty() || !self.attachments.is_empty())
    }

    /// Starts a send: appends the optimistic user echo, marks the app busy,
    /// and hands back the outgoing text and attachments. Returns `None`
    /// without any state change when the preconditions do not hold.
    pub fn try_begin_send(&mut self) -> Option<(String, Vec<Attachment>)> {
        if !self.can_send() {
            return None;
        }
        // Echo the raw text verbatim; the composer keeps it (disabled) until
        // the request resolves.
        self.messages.push(DisplayMessage::User(self.input.clone()));
        self.state = AppState::Sending;
        Some((self.input.clone(), self.attachments.clone()))
    }

    /// Applies the outcome of a send and performs the guaranteed cleanup.
    ///
    /// Every resolution path funnels through here exactly once: backend
    /// reply (possibly error-bearing), transport failure, or task panic
    /// mapped into an [`ApiError`] by the event loop.
    pub fn apply_send_result(&mut self, result: Result<SendReply, ApiError>) {
        let text = match result {
            Ok(reply) => reply.display_text(),
            Err(e) => format!("Request failed: {e}"),
        };
        self.messages.push(DisplayMessage::Model(text));
        self.finish_send();
    }

    /// Clears the in-flight flag and the composer. Runs once per send.
    fn finish_send(&mut self) {
        self.state = AppState::Idle;
        self.input.clear();
        self.cursor_pos = 0;
        self.attachments.clear();
    }

    /// Starts a fresh session: new identifier, empty conversation, cleared
    /// composer. Purely local — no backend call.
    pub fn reset_session(&mut self) {
        self.session_id = SessionId::new();
        self.messages.clear();
        self.input.clear();
        self.cursor_pos = 0;
        self.attachments.clear();
        self.history_scroll = 0;
    }

    /// Replaces the conversation with the fetched history; a failed fetch
    /// reads as an empty conversation.
    pub fn apply_history(&mut self, result: Result<HistoryPage, ApiError>) {
        self.messages = match result {
            Ok(page) => page
                .history
                .into_iter()
                .map(|m| match m.role {
                    Role::User => DisplayMessage::User(m.text),
                    Role::Model => DisplayMessage::Model(m.text),
                })
                .collect(),
            Err(_) => Vec::new(),
        };
    }

    /// Stores the fetched model list; a failed fetch falls back to the
    /// currently selected (default) model.
    pub fn apply_models(&mut self, result: Result<Vec<String>, ApiError>) {
        self.models = match result {
            Ok(models) => models,
            Err(_) => vec![self.model.clone()],
        };
    }

    // ── State mutations ──────────────────────────────────────

    /// Push a local notice to the conversation log.
    pub fn push_notice(&mut self, text: impl Into<String>) {
        self.messages.push(DisplayMessage::Notice(text.into()));
    }

    /// Push a local error to the conversation log.
    pub fn push_error(&mut self, text: impl Into<String>) {
        self.messages.push(DisplayMessage::Error(text.into()));
    }

    /// Take the current composer text and reset it.
    pub fn take_input(&mut self) -> String {
        self.cursor_pos = 0;
        std::mem::take(&mut self.input)
    }

    // ── Slash commands ───────────────────────────────────────

    /// Executes a slash command line. Returns `false` when the input was not
    /// a command.
    pub fn run_command(&mut self, raw: &str) -> bool {
        let Some(command) = parse_command(raw) else {
            return false;
        };
        match command {
            SlashCommand::NewSession => {
                self.reset_session();
                let prefix: String = self.session_id.as_str().chars().take(8).collect();
                self.push_notice(format!("Started new session {prefix}…"));
            }
            SlashCommand::ListModels => {
                if self.models.is_empty() {
                    self.push_notice("No models loaded yet.".to_string());
                } else {
                    let mut out = String::from("Models:");
                    for m in &self.models {
                        let marker = if *m == self.model { "*" } else { " " };
                        out.push_str(&format!("\n {marker} {m}"));
                    }
                    self.push_notice(out);
                }
            }
            SlashCommand::SelectModel(id) => {
                self.model = id.clone();
                self.push_notice(format!("Model set to {id}"));
            }
            SlashCommand::ListAttachments => {
                if self.attachments.is_empty() {
                    self.push_notice("No files staged.".to_string());
                } else {
                    let names = self
                        .attachments
                        .iter()
                        .map(|a| a.filename.as_str())
                        .collect::<Vec<_>>()
                        .join(", ");
                    self.push_notice(format!("Staged files: {names}"));
                }
            }
            SlashCommand::Attach(path) => match Attachment::from_path(&path) {
                Ok(attachment) => {
                    self.push_notice(format!(
                        "Attached {} ({} bytes)",
                        attachment.filename,
                        attachment.bytes.len()
                    ));
                    self.attachments.push(attachment);
                }
                Err(e) => {
                    self.push_error(format!("Could not attach {}: {e}", path.display()));
                }
            },
            SlashCommand::Detach => {
                let count = self.attachments.len();
                self.attachments.clear();
                self.push_notice(format!("Dropped {count} staged file(s)."));
            }
            SlashCommand::ToggleSystem => {
                self.use_system = !self.use_system;
                let state = if self.use_system { "ON" } else { "OFF" };
                self.push_notice(format!("System instruction mode {state}."));
            }
            SlashCommand::Help => {
                self.push_notice(HELP_TEXT.to_string());
            }
            SlashCommand::Invalid(message) => {
                self.push_error(message);
            }
        }
        true
    }

    // ── Input handling ───────────────────────────────────────

    /// Handle a keyboard event (everything except send submission, which the
    /// event loop owns).
    pub fn handle_key(&mut self, key: crossterm::event::KeyEvent) {
        use crossterm::event::{KeyCode, KeyModifiers};

        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c')) | (_, KeyCode::Esc) => {
                if self.state == AppState::Idle {
                    self.should_quit = true;
                }
            }
            (KeyModifiers::CONTROL, KeyCode::Char('n')) => {
                if self.state == AppState::Idle {
                    self.reset_session();
                }
            }
            (_, KeyCode::Enter) if self.state == AppState::Idle => {
                self.input.insert(self.cursor_pos, '\n');
                self.cursor_pos += 1;
            }
            (_, KeyCode::Char(c)) if self.state == AppState::Idle => {
                self.input.insert(self.cursor_pos, c);
                self.cursor_pos += c.len_utf8();
            }
            (_, KeyCode::Backspace) if self.state == AppState::Idle => {
                if self.cursor_pos > 0 {
                    // Find the previous character boundary
                    let prev = self.input[..self.cursor_pos]
                        .char_indices()
                        .last()
                        .map(|(i, _)| i)
                        .unwrap_or(0);
                    self.input.drain(prev..self.cursor_pos);
                    self.cursor_pos = prev;
                }
            }
            (_, KeyCode::Left) if self.state == AppState::Idle => {
                if self.cursor_pos > 0 {
                    self.cursor_pos = self.input[..self.cursor_pos]
                        .char_indices()
                        .last()
                        .map(|(i, _)| i)
                        .unwrap_or(0);
                }
            }
            (_, KeyCode::Right) if self.state == AppState::Idle => {
                if self.cursor_pos < self.input.len() {
                    self.cursor_pos = self.input[self.cursor_pos..]
                        .char_indices()
                        .nth(1)
                        .map(|(i, _)| self.cursor_pos + i)
                        .unwrap_or(self.input.len());
                }
            }
            (_, KeyCode::Up) => {
                self.history_scroll = self.history_scroll.saturating_sub(1);
            }
            (_, KeyCode::Down) => {
                self.history_scroll = self.history_scroll.saturating_add(1);
            }
            (_, KeyCode::PageUp) => {
                self.history_scroll = self.history_scroll.saturating_sub(10);
            }
            (_, KeyCode::PageDown) => {
                self.history_scroll = self.history_scroll.saturating_add(10);
            }
            _ => {}
        }
    }

    /// Ensure scroll is at the bottom (for auto-scroll on new messages).
    pub fn scroll_to_bottom(&mut self) {
        // Set to a large value; render_history clamps it to max_scroll.
        self.history_scroll = u16::MAX;
    }

    // ── Rendering ────────────────────────────────────────────

    /// Render the entire TUI into the given frame.
    pub fn render(&self, frame: &mut Frame<'_>) {
        let area = frame.area();

        // Layout: title(1) | history(fill) | status(1) | composer(5)
        let chunks = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(5),
        ])
        .split(area);

        self.render_title(frame, chunks[0]);
        self.render_history(frame, chunks[1]);
        self.render_status(frame, chunks[2]);
        self.render_input(frame, chunks[3]);
    }

    fn render_title(&self, frame: &mut Frame<'_>, area: Rect) {
        let session_prefix = &self.session_id.as_str()[..8.min(self.session_id.as_str().len())];
        let mut spans = vec![
            Span::styled(
                " confab ",
                Style::default()
                    .fg(THEME.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" session:{session_prefix} "),
                Style::default().fg(THEME.fg_muted),
            ),
            Span::styled(format!(" {} ", self.model), Style::default().fg(THEME.info)),
        ];
        if self.use_system {
            spans.push(Span::styled(
                " system instruction ON ",
                Style::default()
                    .fg(THEME.warning)
                    .add_modifier(Modifier::BOLD),
            ));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_history(&self, frame: &mut Frame<'_>, area: Rect) {
        let mut lines: Vec<Line<'_>> = Vec::new();

        for msg in &self.messages {
            match msg {
                DisplayMessage::User(text) => {
                    lines.push(Line::from(""));
                    push_labelled_lines(
                        &mut lines,
                        "You: ",
                        text,
                        Style::default()
                            .fg(THEME.user_label)
                            .add_modifier(Modifier::BOLD),
                    );
                }
                DisplayMessage::Model(text) => {
                    lines.push(Line::from(""));
                    push_labelled_lines(
                        &mut lines,
                        "Model: ",
                        text,
                        Style::default()
                            .fg(THEME.model_label)
                            .add_modifier(Modifier::BOLD),
                    );
                }
                DisplayMessage::Notice(text) => {
                    for line in text.lines() {
                        lines.push(Line::from(Span::styled(
                            format!("  {line}"),
                            Style::default().fg(THEME.notice),
                        )));
                    }
                }
                DisplayMessage::Error(text) => {
                    lines.push(Line::from(Span::styled(
                        format!("  ! {text}"),
                        Style::default().fg(THEME.error),
                    )));
                }
            }
        }

        // Auto-scroll to bottom
        let content_height = lines.len() as u16;
        let visible_height = area.height.saturating_sub(2); // block borders
        let max_scroll = content_height.saturating_sub(visible_height);
        let scroll = self.history_scroll.min(max_scroll);

        let history = Paragraph::new(Text::from(lines))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(THEME.border)),
            )
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0));

        frame.render_widget(history, area);
    }

    fn render_status(&self, frame: &mut Frame<'_>, area: Rect) {
        let mut spans: Vec<Span<'_>> = Vec::new();

        match self.state {
            AppState::Sending => {
                let spinner = SPINNER[(self.spinner_tick as usize) % SPINNER.len()];
                spans.push(Span::styled(
                    format!(" {spinner} Sending… "),
                    Style::default().fg(THEME.status_spinner),
                ));
            }
            AppState::Idle => {
                spans.push(Span::styled(
                    " Ctrl+Enter:send  Enter:newline//cmd  Ctrl+N:new  ↑↓:scroll  Ctrl+C:quit ",
                    Style::default().fg(THEME.status_hint),
                ));
            }
        }

        if !self.attachments.is_empty() {
            spans.push(Span::styled(
                format!(" [{} file(s)] ", self.attachments.len()),
                Style::default().fg(THEME.info),
            ));
        }
        if self.use_system {
            spans.push(Span::styled(
                " [system] ",
                Style::default().fg(THEME.warning),
            ));
        }

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_input(&self, frame: &mut Frame<'_>, area: Rect) {
        let border_color = if self.state == AppState::Idle {
            THEME.border_active
        } else {
            THEME.border
        };

        let display_text = if self.input.is_empty() && self.state == AppState::Idle {
            "Type a message…  (Ctrl+Enter to send, /help for commands)"
        } else {
            &self.input
        };

        let input_style = if self.input.is_empty() && self.state == AppState::Idle {
            Style::default().fg(THEME.fg_muted)
        } else {
            Style::default()
        };

        // Keep the cursor line visible inside the 3-row composer.
        let (cursor_row, cursor_col) = self.cursor_position();
        let visible_height = area.height.saturating_sub(2);
        let input_scroll = cursor_row.saturating_sub(visible_height.saturating_sub(1));

        let input = Paragraph::new(Text::from(
            display_text
                .split('\n')
                .map(|l| Line::from(Span::styled(l.to_string(), input_style)))
                .collect::<Vec<_>>(),
        ))
        .scroll((input_scroll, 0))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(" Message "),
        );

        frame.render_widget(input, area);

        // Show cursor when idle
        if self.state == AppState::Idle {
            frame.set_cursor_position((
                area.x + 1 + cursor_col,
                area.y + 1 + cursor_row - input_scroll,
            ));
        }
    }

    /// Returns the (row, column) of the cursor within the composer text,
    /// column measured in display cells.
    fn cursor_position(&self) -> (u16, u16) {
        let before = &self.input[..self.cursor_pos];
        let row = before.matches('\n').count() as u16;
        let col = before.rsplit('\n').next().unwrap_or("").width() as u16;
        (row, col)
    }
}

/// Pushes one message as labelled lines: the first line carries the role
/// label, continuation lines are indented to align with it.
fn push_labelled_lines(lines: &mut Vec<Line<'_>>, label: &'static str, text: &str, style: Style) {
    let mut first = true;
    let indent = " ".repeat(label.len());
    // `str::lines` drops a sole trailing newline; an empty message still
    // renders its label line.
    let mut body = text.lines();
    let head = body.next().unwrap_or("");
    for line in std::iter::once(head).chain(body) {
        if first {
            lines.push(Line::from(vec![
                Span::styled(label, style),
                Span::raw(line.to_string()),
            ]));
            first = false;
        } else {
            lines.push(Line::from(Span::raw(format!("{indent}{line}"))));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use proto::ChatMessage;

    fn make_app() -> ChatApp {
        ChatApp::new("gemini-2.5-pro", SessionId::new())
    }

    fn staged_file(name: &str) -> Attachment {
        Attachment {
            filename: name.to_string(),
            bytes: vec![0, 1, 2],
        }
    }

    fn assert_composer_cleared(app: &ChatApp) {
        assert_eq!(app.state, AppState::Idle);
        assert!(app.input.is_empty());
        assert_eq!(app.cursor_pos, 0);
        assert!(app.attachments.is_empty());
    }

    // ── Send guards ──────────────────────────────────────────

    #[test]
    fn send_is_a_no_op_without_text_or_files() {
        let mut app = make_app();
        app.input = "   \n  ".to_string();
        assert!(app.try_begin_send().is_none());
        assert!(app.messages.is_empty());
        assert_eq!(app.state, AppState::Idle);
    }

    #[test]
    fn send_allows_attachment_without_text() {
        let mut app = make_app();
        app.attachments.push(staged_file("a.png"));
        let (text, files) = app.try_begin_send().expect("files alone are sendable");
        assert_eq!(text, "");
        assert_eq!(files.len(), 1);
        assert_eq!(app.state, AppState::Sending);
    }

    #[test]
    fn send_is_refused_while_in_flight() {
        let mut app = make_app();
        app.input = "Hello".to_string();
        assert!(app.try_begin_send().is_some());

        app.input = "Second".to_string();
        assert!(app.try_begin_send().is_none());
        // Only the first echo exists.
        assert_eq!(app.messages.len(), 1);
    }

    #[test]
    fn begin_send_echoes_raw_text_verbatim() {
        let mut app = make_app();
        app.input = "  **Hello** <world>  ".to_string();
        let (text, _) = app.try_begin_send().expect("send starts");
        assert_eq!(text, "  **Hello** <world>  ");
        assert_eq!(
            app.messages,
            vec![DisplayMessage::User("  **Hello** <world>  ".to_string())]
        );
    }

    // ── Send resolution paths ────────────────────────────────

    #[test]
    fn reply_with_text_appends_model_message() {
        let mut app = make_app();
        app.input = "Hello".to_string();
        app.try_begin_send().expect("send starts");

        app.apply_send_result(Ok(SendReply {
            text: Some("Hi there".to_string()),
            error: None,
        }));

        assert_eq!(
            app.messages,
            vec![
                DisplayMessage::User("Hello".to_string()),
                DisplayMessage::Model("Hi there".to_string()),
            ]
        );
        assert_composer_cleared(&app);
    }

    #[test]
    fn reply_with_error_appends_synthesized_bubble() {
        let mut app = make_app();
        app.input = "Hello".to_string();
        app.try_begin_send().expect("send starts");

        app.apply_send_result(Ok(SendReply {
            text: None,
            error: Some("rate limited".to_string()),
        }));

        assert_eq!(
            app.messages[1],
            DisplayMessage::Model("Error: rate limited".to_string())
        );
        assert_composer_cleared(&app);
    }

    #[test]
    fn empty_reply_appends_fallback_bubble() {
        let mut app = make_app();
        app.input = "Hello".to_string();
        app.try_begin_send().expect("send starts");

        app.apply_send_result(Ok(SendReply::default()));

        assert_eq!(
            app.messages[1],
            DisplayMessage::Model("No response text.".to_string())
        );
        assert_composer_cleared(&app);
    }

    #[test]
    fn transport_failure_appends_request_failed_bubble() {
        let mut app = make_app();
        app.input = "Hello".to_string();
        app.attachments.push(staged_file("a.png"));
        app.try_begin_send().expect("send starts");

        app.apply_send_result(Err(ApiError::Transport("connection refused".to_string())));

        assert_eq!(
            app.messages[1],
            DisplayMessage::Model("Request failed: connection refused".to_string())
        );
        assert_composer_cleared(&app);
    }

    #[test]
    fn composer_keeps_text_until_resolution() {
        let mut app = make_app();
        app.input = "Hello".to_string();
        app.try_begin_send().expect("send starts");
        // Still visible (disabled) while in flight.
        assert_eq!(app.input, "Hello");
        app.apply_send_result(Ok(SendReply::default()));
        assert!(app.input.is_empty());
    }

    // ── Reset ────────────────────────────────────────────────

    #[test]
    fn reset_session_clears_state_and_changes_id() {
        let mut app = make_app();
        let old_id = app.session_id.clone();
        app.messages.push(DisplayMessage::User("Hello".to_string()));
        app.messages.push(DisplayMessage::Model("Hi".to_string()));
        app.input = "draft".to_string();
        app.cursor_pos = 5;
        app.attachments.push(staged_file("a.png"));

        app.reset_session();

        assert_ne!(app.session_id, old_id);
        assert!(app.messages.is_empty());
        assert_composer_cleared(&app);
    }

    // ── Initialize ───────────────────────────────────────────

    #[test]
    fn history_rehydrates_display_list_exactly() {
        let mut app = make_app();
        app.apply_history(Ok(HistoryPage {
            history: vec![ChatMessage::user("Hello"), ChatMessage::model("Hi there")],
        }));
        assert_eq!(
            app.messages,
            vec![
                DisplayMessage::User("Hello".to_string()),
                DisplayMessage::Model("Hi there".to_string()),
            ]
        );
    }

    #[test]
    fn history_failure_reads_as_empty_conversation() {
        let mut app = make_app();
        app.messages.push(DisplayMessage::Notice("stale".to_string()));
        app.apply_history(Err(ApiError::Transport("boom".to_string())));
        assert!(app.messages.is_empty());
    }

    #[test]
    fn model_list_failure_falls_back_to_selected_model() {
        let mut app = make_app();
        app.apply_models(Err(ApiError::Transport("boom".to_string())));
        assert_eq!(app.models, vec!["gemini-2.5-pro".to_string()]);
        assert_eq!(app.model, "gemini-2.5-pro");
    }

    #[test]
    fn model_list_success_is_stored() {
        let mut app = make_app();
        app.apply_models(Ok(vec![
            "gemini-2.5-pro".to_string(),
            "gemini-flash-latest".to_string(),
        ]));
        assert_eq!(app.models.len(), 2);
    }

    // ── Slash commands ───────────────────────────────────────

    #[test]
    fn parse_command_recognises_all_commands() {
        assert_eq!(parse_command("/new"), Some(SlashCommand::NewSession));
        assert_eq!(parse_command("/model"), Some(SlashCommand::ListModels));
        assert_eq!(
            parse_command("/model gemini-flash-latest"),
            Some(SlashCommand::SelectModel("gemini-flash-latest".to_string()))
        );
        assert_eq!(parse_command("/attach"), Some(SlashCommand::ListAttachments));
        assert_eq!(
            parse_command("/attach /tmp/a.png"),
            Some(SlashCommand::Attach(PathBuf::from("/tmp/a.png")))
        );
        assert_eq!(parse_command("/detach"), Some(SlashCommand::Detach));
        assert_eq!(parse_command("/system"), Some(SlashCommand::ToggleSystem));
        assert_eq!(parse_command("/help"), Some(SlashCommand::Help));
    }

    #[test]
    fn parse_command_rejects_non_commands_and_unknowns() {
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command(""), None);
        assert!(matches!(
            parse_command("/bogus"),
            Some(SlashCommand::Invalid(_))
        ));
        assert!(matches!(
            parse_command("/new please"),
            Some(SlashCommand::Invalid(_))
        ));
    }

    #[test]
    fn toggle_system_flips_mode_flag() {
        let mut app = make_app();
        assert!(!app.use_system);
        assert!(app.run_command("/system"));
        assert!(app.use_system);
        app.run_command("/system");
        assert!(!app.use_system);
    }

    #[test]
    fn select_model_is_verbatim() {
        let mut app = make_app();
        app.run_command("/model custom-model-id");
        assert_eq!(app.model, "custom-model-id");
    }

    #[test]
    fn attach_command_stages_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("upload.bin");
        std::fs::write(&path, b"data").expect("write file");

        let mut app = make_app();
        assert!(app.run_command(&format!("/attach {}", path.display())));
        assert_eq!(app.attachments.len(), 1);
        assert_eq!(app.attachments[0].filename, "upload.bin");
    }

    #[test]
    fn attach_command_reports_unreadable_file() {
        let mut app = make_app();
        app.run_command("/attach /no/such/file.bin");
        assert!(app.attachments.is_empty());
        assert!(matches!(&app.messages[0], DisplayMessage::Error(_)));
    }

    #[test]
    fn detach_command_clears_staged_files() {
        let mut app = make_app();
        app.attachments.push(staged_file("a.png"));
        app.attachments.push(staged_file("b.txt"));
        app.run_command("/detach");
        assert!(app.attachments.is_empty());
    }

    #[test]
    fn new_session_command_resets() {
        let mut app = make_app();
        let old_id = app.session_id.clone();
        app.messages.push(DisplayMessage::User("Hello".to_string()));
        app.run_command("/new");
        assert_ne!(app.session_id, old_id);
        // Only the confirmation notice remains.
        assert_eq!(app.messages.len(), 1);
        assert!(matches!(&app.messages[0], DisplayMessage::Notice(_)));
    }

    #[test]
    fn run_command_ignores_plain_text() {
        let mut app = make_app();
        assert!(!app.run_command("just a message"));
        assert!(app.messages.is_empty());
    }

    // ── Key handling ─────────────────────────────────────────

    #[test]
    fn handle_key_inserts_chars() {
        let mut app = make_app();
        app.handle_key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE));
        app.handle_key(KeyEvent::new(KeyCode::Char('b'), KeyModifiers::NONE));
        assert_eq!(app.input, "ab");
        assert_eq!(app.cursor_pos, 2);
    }

    #[test]
    fn handle_key_enter_inserts_newline() {
        let mut app = make_app();
        app.handle_key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE));
        app.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        app.handle_key(KeyEvent::new(KeyCode::Char('b'), KeyModifiers::NONE));
        assert_eq!(app.input, "a\nb");
    }

    #[test]
    fn handle_key_backspace_deletes() {
        let mut app = make_app();
        app.handle_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE));
        app.handle_key(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE));
        assert_eq!(app.input, "");
        assert_eq!(app.cursor_pos, 0);
    }

    #[test]
    fn handle_key_ignores_input_while_sending() {
        let mut app = make_app();
        app.state = AppState::Sending;
        app.handle_key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE));
        assert_eq!(app.input, "");
    }

    #[test]
    fn handle_key_scrolls_while_sending() {
        let mut app = make_app();
        app.state = AppState::Sending;
        app.history_scroll = 5;
        app.handle_key(KeyEvent::new(KeyCode::Up, KeyModifiers::NONE));
        assert_eq!(app.history_scroll, 4);
    }

    #[test]
    fn quit_is_gated_on_idle() {
        let mut app = make_app();
        app.state = AppState::Sending;
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(!app.should_quit);

        app.state = AppState::Idle;
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn ctrl_n_resets_session_when_idle() {
        let mut app = make_app();
        let old_id = app.session_id.clone();
        app.handle_key(KeyEvent::new(KeyCode::Char('n'), KeyModifiers::CONTROL));
        assert_ne!(app.session_id, old_id);

        let id_during_send = app.session_id.clone();
        app.state = AppState::Sending;
        app.handle_key(KeyEvent::new(KeyCode::Char('n'), KeyModifiers::CONTROL));
        assert_eq!(app.session_id, id_during_send);
    }

    #[test]
    fn take_input_resets() {
        let mut app = make_app();
        app.input = "hello".to_string();
        app.cursor_pos = 5;
        let taken = app.take_input();
        assert_eq!(taken, "hello");
        assert_eq!(app.input, "");
        assert_eq!(app.cursor_pos, 0);
    }

    #[test]
    fn scroll_to_bottom_sets_max() {
        let mut app = make_app();
        app.scroll_to_bottom();
        assert_eq!(app.history_scroll, u16::MAX);
    }

    #[test]
    fn cursor_position_tracks_lines_and_width() {
        let mut app = make_app();
        app.input = "ab\ncd".to_string();
        app.cursor_pos = app.input.len();
        assert_eq!(app.cursor_position(), (1, 2));

        app.cursor_pos = 2; // end of first line
        assert_eq!(app.cursor_position(), (0, 2));
    }
}
