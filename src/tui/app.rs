//! TUI application state management.

use tracing::{debug, warn};

use super::editor::Editor;
use crate::cache::SourceCache;
use crate::languages::{self, LanguageProfile};
use crate::session::{ExecutionSession, Handled, OutputSink, PendingInput, StreamEvent, Transcript};
use crate::transport::{Runnable, SessionToken, SnapshotId};

/// Which pane receives typed characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Editor,
    /// Program stdin; only reachable while a run is streaming
    Stdin,
}

/// Popup display state
#[derive(Debug, Clone, PartialEq)]
pub enum PopupState {
    /// No popup shown
    None,
    /// Blocking warning, dismissed by any key
    Warning(String),
    /// Snapshot saved; shows the share URL
    Shared { url: String },
}

/// Application state for the TUI
#[derive(Debug)]
pub struct App {
    /// Selected language
    pub profile: &'static LanguageProfile,
    pub editor: Editor,
    /// The one session of this editor; reset after every run
    pub session: ExecutionSession,
    /// Output of the latest run
    pub transcript: Transcript,
    pub focus: Focus,
    /// Status message to display
    pub status_message: String,
    /// Whether to show help
    pub show_help: bool,
    pub popup_state: PopupState,
    /// Lines scrolled up from the bottom of the output pane
    pub output_scroll_offset: usize,
    /// Snapshot the editor content was last shared as; re-sharing updates it
    pub snapshot: Option<SnapshotId>,
}

impl App {
    pub fn new(profile: &'static LanguageProfile, source: &str) -> Self {
        let mut app = Self {
            profile,
            editor: Editor::with_text(source),
            session: ExecutionSession::for_profile(profile),
            transcript: Transcript::default(),
            focus: Focus::Editor,
            status_message: String::new(),
            show_help: false,
            popup_state: PopupState::None,
            output_scroll_offset: 0,
            snapshot: None,
        };
        app.update_status_message();
        app
    }

    /// Open a fetched snapshot. Unknown languages fall back to `fallback`.
    pub fn from_snapshot(runnable: Runnable, id: SnapshotId, fallback: &'static LanguageProfile) -> Self {
        let profile = languages::by_language(&runnable.language).unwrap_or(fallback);
        let mut app = Self::new(profile, &runnable.source);
        app.session.select(runnable.language, runnable.version);
        app.snapshot = Some(id);
        app.update_status_message();
        app
    }

    /// Park the outgoing language's text in the cache and load the incoming one.
    /// Park the current buffer and load `next`. If the buffer cannot be
    /// parked the switch is refused with a warning and nothing changes.
    pub fn switch_language(&mut self, cache: &SourceCache, next: &'static LanguageProfile) -> bool {
        if let Err(e) = cache.store(self.profile.id, &self.editor.text()) {
            warn!(language = self.profile.id, error = %e, "could not store source, staying on current language");
            self.popup_state =
                PopupState::Warning(format!("Could not save the .{} source, language not switched: {}", self.profile.id, e));
            return false;
        }
        self.editor.clear();
        self.transcript.text.clear();
        self.transcript.notices.clear();
        self.transcript.completed = false;

        self.profile = next;
        self.session
            .select(next.language, next.default_version.map(str::to_string));
        self.snapshot = None;

        if let Some(text) = cache.fetch(next.id) {
            self.editor.set_text(&text);
        }
        debug!(language = next.id, "switched language");
        self.update_status_message();
        true
    }

    pub fn cycle_language(&mut self, cache: &SourceCache, forward: bool) -> bool {
        let next = languages::cycle(self.profile.id, forward);
        self.switch_language(cache, next)
    }

    /// Try to start a run from the editor content. A refusal is shown as a
    /// warning popup and yields `None`.
    pub fn request_run(&mut self) -> Option<Runnable> {
        let runnable = self.session.runnable(self.editor.text());
        match self.session.begin(&runnable) {
            Ok(()) => {
                self.status_message = format!("Submitting {} program...", self.profile.display_mode);
                Some(runnable)
            }
            Err(e) => {
                self.popup_state = PopupState::Warning(e.to_string());
                None
            }
        }
    }

    pub fn on_registered(&mut self, token: SessionToken) {
        match self.session.registered(token, &mut self.transcript) {
            Ok(()) => {
                self.focus = Focus::Stdin;
                self.scroll_to_bottom();
                self.update_status_message();
            }
            Err(e) => debug!(error = %e, "registration reply ignored"),
        }
    }

    pub fn on_register_failed(&mut self, message: &str) {
        self.session.registration_failed();
        self.popup_state = PopupState::Warning(format!("Could not start the program: {}", message));
        self.update_status_message();
    }

    pub fn on_stream(&mut self, token: &SessionToken, event: StreamEvent) -> Handled {
        let handled = self.session.handle(token, event, &mut self.transcript);
        match handled {
            Handled::Appended => self.scroll_to_bottom(),
            Handled::Completed => {
                self.focus = Focus::Editor;
                self.update_status_message();
            }
            Handled::Stale => {}
        }
        handled
    }

    pub fn on_input_failed(&mut self, message: &str) {
        self.transcript.notice(message);
        self.status_message = message.to_string();
    }

    pub fn on_saved(&mut self, id: SnapshotId, url: String) {
        self.snapshot = Some(id);
        self.popup_state = PopupState::Shared { url };
    }

    pub fn on_save_failed(&mut self, message: &str) {
        self.popup_state = PopupState::Warning(format!("Could not share the code: {}", message));
    }

    /// Snapshot payload for sharing the current editor content.
    pub fn share_runnable(&self) -> Runnable {
        self.session.runnable(self.editor.text())
    }

    pub fn stdin_char(&mut self, c: char) {
        self.session.type_char(c);
    }

    pub fn stdin_backspace(&mut self) {
        self.session.backspace();
    }

    /// Enter in the stdin pane: the latest line, ready for the forwarder.
    pub fn submit_stdin(&mut self) -> Option<PendingInput> {
        self.session.submit_line().ok()
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Editor if self.session.is_running() => Focus::Stdin,
            _ => Focus::Editor,
        };
    }

    /// Toggle help display
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Hide any popup
    pub fn hide_popup(&mut self) {
        self.popup_state = PopupState::None;
    }

    /// Check if any popup is shown
    pub fn is_popup_shown(&self) -> bool {
        self.popup_state != PopupState::None
    }

    pub fn scroll_up(&mut self) {
        self.output_scroll_offset += 1;
    }

    pub fn scroll_down(&mut self) {
        self.output_scroll_offset = self.output_scroll_offset.saturating_sub(1);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.output_scroll_offset = 0;
    }

    fn update_status_message(&mut self) {
        let lang = format!(".{} {}", self.profile.id, self.session.version().unwrap_or(""));
        self.status_message = if self.session.is_running() {
            format!("{} | running: type input, Enter sends a line | Tab editor | F1 help", lang.trim_end())
        } else if self.transcript.completed {
            format!("{} | completed | Ctrl+R run | F2/F3 language | F1 help", lang.trim_end())
        } else {
            format!("{} | Ctrl+R run | Ctrl+S share | F2/F3 language | F1 help", lang.trim_end())
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_with_cache(lang: &str, source: &str) -> (tempfile::TempDir, SourceCache, App) {
        let dir = tempfile::tempdir().unwrap();
        let cache = SourceCache::new(dir.path().to_path_buf());
        let app = App::new(languages::resolve(lang).unwrap(), source);
        (dir, cache, app)
    }

    #[test]
    fn switching_language_stores_and_restores_source() {
        let (_dir, cache, mut app) = app_with_cache("go", "package main");

        assert!(app.switch_language(&cache, languages::resolve("rb").unwrap()));
        assert_eq!(cache.fetch("go").as_deref(), Some("package main"));
        assert!(app.editor.is_empty());
        assert_eq!(app.session.language(), "ruby");

        app.editor.insert_str("puts 1");
        assert!(app.switch_language(&cache, languages::resolve("go").unwrap()));
        assert_eq!(app.editor.text(), "package main");
        assert_eq!(cache.fetch("rb").as_deref(), Some("puts 1"));
        assert_eq!(app.session.language(), "go");
    }

    #[test]
    fn unstorable_source_keeps_language_and_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let cache = SourceCache::new(blocker);
        let mut app = App::new(languages::resolve("go").unwrap(), "package main");
        app.transcript.append("earlier output");

        assert!(!app.cycle_language(&cache, true));
        assert!(matches!(app.popup_state, PopupState::Warning(ref m) if m.contains(".go")));
        assert_eq!(app.profile.id, "go");
        assert_eq!(app.session.language(), "go");
        assert_eq!(app.editor.text(), "package main");
        assert_eq!(app.transcript.text, "earlier output");
    }

    #[test]
    fn switching_clears_output() {
        let (_dir, cache, mut app) = app_with_cache("go", "");
        app.transcript.append("old output");
        assert!(app.cycle_language(&cache, true));
        assert_eq!(app.transcript.text, "");
    }

    #[test]
    fn run_flow_moves_focus_and_back() {
        let (_dir, _cache, mut app) = app_with_cache("go", "package main");
        let runnable = app.request_run().unwrap();
        assert_eq!(runnable.language, "go");
        assert_eq!(runnable.source, "package main");

        let token = SessionToken::new("abc123");
        app.on_registered(token.clone());
        assert_eq!(app.focus, Focus::Stdin);

        app.stdin_char('4');
        app.stdin_char('2');
        let pending = app.submit_stdin().unwrap();
        assert_eq!(pending.line, "42\n");

        let chunk = StreamEvent::Chunk(crate::transport::OutputChunk("42".into()));
        assert_eq!(app.on_stream(&token, chunk), Handled::Appended);
        assert_eq!(app.on_stream(&token, StreamEvent::End), Handled::Completed);
        assert_eq!(app.focus, Focus::Editor);
        assert!(app.transcript.completed);
        assert_eq!(app.submit_stdin(), None);
    }

    #[test]
    fn second_run_shows_warning() {
        let (_dir, _cache, mut app) = app_with_cache("go", "");
        app.request_run().unwrap();
        app.on_registered(SessionToken::new("live"));
        assert!(app.request_run().is_none());
        assert!(matches!(app.popup_state, PopupState::Warning(_)));
        assert_eq!(app.session.token(), Some(&SessionToken::new("live")));
    }

    #[test]
    fn failed_registration_unlocks_editor() {
        let (_dir, _cache, mut app) = app_with_cache("py", "print(1)");
        app.request_run().unwrap();
        app.on_register_failed("connection refused");
        assert!(app.session.is_idle());
        assert!(app.is_popup_shown());
        app.hide_popup();
        assert!(app.request_run().is_some());
    }

    #[test]
    fn snapshot_opens_in_its_language() {
        let fallback = languages::resolve("go").unwrap();
        let r = Runnable::new("ruby", Some("1.9.3".into()), "puts 2");
        let app = App::from_snapshot(r, SnapshotId::new("abc"), fallback);
        assert_eq!(app.profile.id, "rb");
        assert_eq!(app.editor.text(), "puts 2");
        assert_eq!(app.session.version(), Some("1.9.3"));
        assert_eq!(app.share_runnable().version.as_deref(), Some("1.9.3"));
    }

    #[test]
    fn tab_only_reaches_stdin_while_running() {
        let (_dir, _cache, mut app) = app_with_cache("go", "");
        app.toggle_focus();
        assert_eq!(app.focus, Focus::Editor);
    }
}
