//! Async event loop for the TUI — interleaves crossterm, request tasks, and
//! timer events.

use std::sync::Arc;

use client::{ApiClient, SendRequest};
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures_util::StreamExt;
use proto::{ApiError, HistoryPage, SendReply, SessionId};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::task::JoinHandle;
use tracing::debug;

use super::app::{AppState, ChatApp};
use crate::config::Config;

/// RAII guard that restores the terminal on drop (even on panic).
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(std::io::stdout(), LeaveAlternateScreen);
    }
}

/// Run the full-screen TUI until the user quits.
pub async fn run_tui(
    client: Arc<ApiClient>,
    session_id: SessionId,
    model: String,
    config: Config,
) -> anyhow::Result<()> {
    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let _guard = TerminalGuard; // Drop restores terminal

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    debug!(session = %session_id, model = %model, "TUI started");

    // App state
    let mut app = ChatApp::new(model, session_id);

    // Initialize: model list and session history load in the background.
    let mut models_task: Option<JoinHandle<Result<Vec<String>, ApiError>>> = Some({
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.list_models().await })
    });
    let mut history_task: Option<JoinHandle<Result<HistoryPage, ApiError>>> = Some({
        let client = Arc::clone(&client);
        let session = app.session_id.clone();
        tokio::spawn(async move { client.fetch_history(&session).await })
    });
    // At most one send outstanding; `try_begin_send` is the gate.
    let mut send_task: Option<JoinHandle<Result<SendReply, ApiError>>> = None;

    // Crossterm event stream (async)
    let mut crossterm_stream = EventStream::new();

    // Spinner tick interval (100ms)
    let mut spinner_interval = tokio::time::interval(std::time::Duration::from_millis(100));
    spinner_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        // Render
        terminal.draw(|frame| app.render(frame))?;

        // Event select
        tokio::select! {
            // Branch 1: crossterm terminal events
            maybe_event = crossterm_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        use crossterm::event::{KeyCode, KeyModifiers};
                        if key.code == KeyCode::Enter
                            && key.modifiers.contains(KeyModifiers::CONTROL)
                        {
                            // Submit chord. The guard refuses empty composers
                            // and overlapping sends without any state change.
                            if send_task.is_none()
                                && let Some((message, attachments)) = app.try_begin_send()
                            {
                                debug!(
                                    message_len = %message.len(),
                                    attachments = %attachments.len(),
                                    "Send task spawned"
                                );
                                app.scroll_to_bottom();
                                let req = SendRequest {
                                    session_id: app.session_id.clone(),
                                    model: app.model.clone(),
                                    message,
                                    use_system: app.use_system,
                                    temperature: Some(config.chat.temperature),
                                    attachments,
                                };
                                let client = Arc::clone(&client);
                                send_task = Some(tokio::spawn(async move {
                                    client.send_message(req).await
                                }));
                            }
                        } else if key.code == KeyCode::Enter
                            && app.state == AppState::Idle
                            && app.input.trim_start().starts_with('/')
                        {
                            let line = app.take_input();
                            debug!(command = %line, "Slash command dispatched");
                            app.run_command(&line);
                            app.scroll_to_bottom();
                        } else {
                            app.handle_key(key);
                        }
                    }
                    Some(Ok(Event::Resize(_, _))) => {
                        // Terminal will redraw on next loop iteration
                    }
                    Some(Err(_)) | None => {
                        break; // stream ended or error
                    }
                    _ => {}
                }
            }

            // Branch 2: send task completed — the single resolution point for
            // reply, transport failure, and panic alike.
            result = async {
                match send_task.as_mut() {
                    Some(handle) => handle.await,
                    None => std::future::pending().await,
                }
            } => {
                let outcome = match result {
                    Ok(inner) => inner,
                    Err(join_err) => Err(ApiError::Transport(format!("task panicked: {join_err}"))),
                };
                debug!(success = %outcome.is_ok(), "Send task completed");
                app.apply_send_result(outcome);
                app.scroll_to_bottom();
                send_task = None;
            }

            // Branch 3: history load completed
            result = async {
                match history_task.as_mut() {
                    Some(handle) => handle.await,
                    None => std::future::pending().await,
                }
            } => {
                let outcome = match result {
                    Ok(inner) => inner,
                    Err(join_err) => Err(ApiError::Transport(format!("task panicked: {join_err}"))),
                };
                debug!(success = %outcome.is_ok(), "History load completed");
                app.apply_history(outcome);
                app.scroll_to_bottom();
                history_task = None;
            }

            // Branch 4: model list load completed
            result = async {
                match models_task.as_mut() {
                    Some(handle) => handle.await,
                    None => std::future::pending().await,
                }
            } => {
                let outcome = match result {
                    Ok(inner) => inner,
                    Err(join_err) => Err(ApiError::Transport(format!("task panicked: {join_err}"))),
                };
                debug!(success = %outcome.is_ok(), "Model list load completed");
                app.apply_models(outcome);
                models_task = None;
            }

            _ = spinner_interval.tick(), if app.is_busy() => {
                app.spinner_tick = app.spinner_tick.wrapping_add(1);
            }
        }

        if app.should_quit {
            break;
        }
    }

    // TerminalGuard::drop handles cleanup
    Ok(())
}
