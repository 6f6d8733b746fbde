//! Async event handler for the TUI editor.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use futures_util::StreamExt;
use ratatui::prelude::*;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::{
    app::{App, Focus},
    events::TuiEvent,
    ui::render_ui,
};
use crate::{
    cache::SourceCache,
    config::Config,
    languages::LanguageProfile,
    session::{InputForwarder, StreamEvent},
    transport::{HttpTransport, Runnable, SessionToken, SnapshotId, Transport},
};

/// Network side of the editor. Every call spawns a task that reports back
/// through the event channel; the loop never awaits the network.
struct Runtime {
    transport: Arc<HttpTransport>,
    cache: SourceCache,
    forwarder: InputForwarder,
    event_tx: mpsc::UnboundedSender<TuiEvent>,
}

impl Runtime {
    fn start_run(&self, runnable: Runnable) {
        let transport = Arc::clone(&self.transport);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let token = match transport.register(&runnable).await {
                Ok(token) => token,
                Err(e) => {
                    warn!(error = %e, "registration failed");
                    let _ = tx.send(TuiEvent::RegisterFailed(e.to_string()));
                    return;
                }
            };
            if tx.send(TuiEvent::Registered(token.clone())).is_err() {
                return;
            }
            stream_output(transport.as_ref(), token, tx).await;
        });
    }

    fn share(&self, runnable: Runnable, existing: Option<SnapshotId>) {
        let transport = Arc::clone(&self.transport);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let event = match transport.save(&runnable, existing.as_ref()).await {
                Ok(id) => TuiEvent::Saved(id),
                Err(e) => TuiEvent::SaveFailed(e.to_string()),
            };
            let _ = tx.send(event);
        });
    }
}

/// Relay the output subscription of `token` as stream events, ending with
/// exactly one `End` or `Failed`.
async fn stream_output(transport: &dyn Transport, token: SessionToken, tx: mpsc::UnboundedSender<TuiEvent>) {
    let send = |event: StreamEvent| tx.send(TuiEvent::Stream { token: token.clone(), event }).is_ok();

    let mut output = match transport.subscribe(&token).await {
        Ok(stream) => stream,
        Err(e) => {
            send(StreamEvent::Failed(e.to_string()));
            return;
        }
    };
    while let Some(item) = output.next().await {
        match item {
            Ok(chunk) => {
                if !send(StreamEvent::Chunk(chunk)) {
                    return;
                }
            }
            Err(e) => {
                send(StreamEvent::Failed(e.to_string()));
                return;
            }
        }
    }
    send(StreamEvent::End);
}

/// Run the TUI editor, starting from `snapshot` when given. The caller
/// checks that stdout is a terminal.
pub async fn run_tui_editor(
    cfg: &Config,
    profile: &'static LanguageProfile,
    snapshot: Option<SnapshotId>,
) -> Result<()> {
    let transport = Arc::new(HttpTransport::from_config(cfg)?);
    let cache = SourceCache::from_config(cfg);

    // Fetch before touching the terminal so errors print normally.
    let mut app = match snapshot {
        Some(id) => {
            let runnable = transport.fetch_snapshot(&id).await?;
            info!(snapshot = %id, language = %runnable.language, "opened snapshot");
            App::from_snapshot(runnable, id, profile)
        }
        None => {
            let source = cache.fetch(profile.id).unwrap_or_default();
            App::new(profile, &source)
        }
    };

    let (event_tx, event_rx) = mpsc::unbounded_channel::<TuiEvent>();
    let failures = event_tx.clone();
    let forwarder = InputForwarder::spawn(transport.clone() as Arc<dyn Transport>, move |msg| {
        let _ = failures.send(TuiEvent::InputFailed(msg));
    });
    let runtime = Runtime { transport, cache, forwarder, event_tx };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, &runtime, event_rx).await;

    // Park the buffer so the next session starts where this one ended.
    if let Err(e) = runtime.cache.store(app.profile.id, &app.editor.text()) {
        warn!(error = %e, "could not store editor source");
    }

    // Restore terminal
    disable_raw_mode()?;
    terminal.backend_mut().execute(DisableBracketedPaste)?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Main application loop
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    runtime: &Runtime,
    mut event_rx: mpsc::UnboundedReceiver<TuiEvent>,
) -> Result<()> {
    // Spawn input handler
    let input_tx = runtime.event_tx.clone();
    tokio::task::spawn_blocking(move || {
        while !input_tx.is_closed() {
            if !event::poll(Duration::from_millis(100)).unwrap_or(false) {
                continue;
            }
            let forwarded = match event::read() {
                Ok(Event::Key(key)) if key.kind != KeyEventKind::Release => input_tx.send(TuiEvent::Key(key)),
                Ok(Event::Paste(text)) => input_tx.send(TuiEvent::Paste(text)),
                _ => Ok(()),
            };
            if forwarded.is_err() {
                break;
            }
        }
    });

    loop {
        terminal.draw(|frame| render_ui(frame, app))?;

        // Drain everything queued since the last frame so streamed output keeps up.
        while let Ok(tui_event) = event_rx.try_recv() {
            if handle_event(app, runtime, tui_event)? {
                return Ok(());
            }
        }

        tokio::time::sleep(Duration::from_millis(16)).await;
    }
}

/// Apply one event; `true` requests quit.
fn handle_event(app: &mut App, runtime: &Runtime, event: TuiEvent) -> Result<bool> {
    match event {
        TuiEvent::Key(key) => return handle_key_event(app, runtime, key),
        TuiEvent::Paste(text) => match app.focus {
            Focus::Editor => app.editor.insert_str(&text),
            Focus::Stdin => {
                // Each pasted line break submits like Enter.
                let mut parts = text.split('\n').peekable();
                while let Some(part) = parts.next() {
                    for c in part.chars().filter(|c| *c != '\r') {
                        app.stdin_char(c);
                    }
                    if parts.peek().is_some() {
                        if let Some(pending) = app.submit_stdin() {
                            runtime.forwarder.forward(pending);
                        }
                    }
                }
            }
        },
        TuiEvent::Registered(token) => app.on_registered(token),
        TuiEvent::RegisterFailed(message) => app.on_register_failed(&message),
        TuiEvent::Stream { token, event } => {
            app.on_stream(&token, event);
        }
        TuiEvent::InputFailed(message) => app.on_input_failed(&message),
        TuiEvent::Saved(id) => {
            let url = runtime.transport.share_url(&id);
            app.on_saved(id, url);
        }
        TuiEvent::SaveFailed(message) => app.on_save_failed(&message),
    }
    Ok(false)
}

fn handle_key_event(app: &mut App, runtime: &Runtime, key: KeyEvent) -> Result<bool> {
    // If any popup is shown, any key closes it
    if app.is_popup_shown() {
        app.hide_popup();
        return Ok(false);
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') | KeyCode::Char('q') if ctrl => return Ok(true),
        KeyCode::F(1) => {
            app.toggle_help();
            return Ok(false);
        }
        KeyCode::Esc if app.show_help => {
            app.toggle_help();
            return Ok(false);
        }
        _ if app.show_help => return Ok(false),
        KeyCode::Char('r') if ctrl => {
            if let Some(runnable) = app.request_run() {
                runtime.start_run(runnable);
            }
        }
        KeyCode::F(5) => {
            if let Some(runnable) = app.request_run() {
                runtime.start_run(runnable);
            }
        }
        KeyCode::Char('s') if ctrl => runtime.share(app.share_runnable(), app.snapshot.clone()),
        KeyCode::F(2) => {
            app.cycle_language(&runtime.cache, true);
        }
        KeyCode::F(3) => {
            app.cycle_language(&runtime.cache, false);
        }
        KeyCode::Tab => app.toggle_focus(),
        KeyCode::PageUp => app.scroll_up(),
        KeyCode::PageDown => app.scroll_down(),
        _ => match app.focus {
            Focus::Editor => handle_editor_key(app, key),
            Focus::Stdin => handle_stdin_key(app, runtime, key),
        },
    }
    Ok(false)
}

fn handle_editor_key(app: &mut App, key: KeyEvent) {
    let editor = &mut app.editor;
    match key.code {
        KeyCode::Enter => editor.newline(),
        KeyCode::Backspace => editor.backspace(),
        KeyCode::Delete => editor.delete(),
        KeyCode::Left => editor.move_left(),
        KeyCode::Right => editor.move_right(),
        KeyCode::Up => editor.move_up(),
        KeyCode::Down => editor.move_down(),
        KeyCode::Home => editor.move_home(),
        KeyCode::End => editor.move_end(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => editor.insert_char(c),
        _ => {}
    }
}

fn handle_stdin_key(app: &mut App, runtime: &Runtime, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => {
            if let Some(pending) = app.submit_stdin() {
                runtime.forwarder.forward(pending);
            }
        }
        KeyCode::Backspace => app.stdin_backspace(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => app.stdin_char(c),
        // Arrow keys would move into already-sent input.
        _ => {}
    }
}
