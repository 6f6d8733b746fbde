//! Execution session: the lifecycle of one remote run.
//!
//! A session moves `Idle -> Registering -> Streaming -> Idle`. It is created
//! once per UI and reset when a run ends, never recreated. All transitions are
//! synchronous; network work happens elsewhere and reports back as calls to
//! [`ExecutionSession::registered`], [`ExecutionSession::registration_failed`]
//! and [`ExecutionSession::handle`]. Stream end and stream failure are the
//! same transition because the backend's push channel cannot tell a finished
//! program from a dropped connection.

use thiserror::Error;
use tracing::{debug, info};

use crate::languages::LanguageProfile;
use crate::transport::{OutputChunk, Runnable, SessionToken, TransportError};

pub mod driver;
pub mod input;

pub use driver::{run, InputForwarder, RunSummary};
pub use input::InputBuffer;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a program is already running; wait for it to finish")]
    AlreadyActive,

    #[error("no program is running")]
    NotRunning,

    #[error("no registration is in progress")]
    NotRegistering,

    #[error("failed to start the program: {0}")]
    Register(#[source] TransportError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Registering,
    Streaming(SessionToken),
}

/// What the output subscription delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Chunk(OutputChunk),
    End,
    Failed(String),
}

/// Outcome of feeding a [`StreamEvent`] to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Appended,
    Completed,
    /// The event belongs to a token that is no longer live.
    Stale,
}

/// A stdin line ready to be forwarded, bound to the run it was typed into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInput {
    pub token: SessionToken,
    pub line: String,
}

/// Where run output and status markers go.
pub trait OutputSink {
    /// Called when a new run starts streaming.
    fn clear(&mut self);
    fn append(&mut self, text: &str);
    /// The run is over; show the completion marker.
    fn completed(&mut self);
    /// Transient, non-fatal message such as a failed stdin delivery.
    fn notice(&mut self, _message: &str) {}
}

/// In-memory sink keeping the full transcript of the current run.
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    pub text: String,
    pub completed: bool,
    pub notices: Vec<String>,
}

impl OutputSink for Transcript {
    fn clear(&mut self) {
        self.text.clear();
        self.completed = false;
        self.notices.clear();
    }

    fn append(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn completed(&mut self) {
        self.completed = true;
    }

    fn notice(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}

#[derive(Debug)]
pub struct ExecutionSession {
    phase: Phase,
    language: String,
    version: Option<String>,
    input: InputBuffer,
}

impl ExecutionSession {
    pub fn new(language: impl Into<String>, version: Option<String>) -> Self {
        Self {
            phase: Phase::Idle,
            language: language.into(),
            version,
            input: InputBuffer::default(),
        }
    }

    pub fn for_profile(profile: &LanguageProfile) -> Self {
        Self::new(profile.language, profile.default_version.map(str::to_string))
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// True exactly while a token is held.
    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Streaming(_))
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    pub fn token(&self) -> Option<&SessionToken> {
        match &self.phase {
            Phase::Streaming(token) => Some(token),
            _ => None,
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Change the language used by the next run. A run in flight is unaffected.
    pub fn select(&mut self, language: impl Into<String>, version: Option<String>) {
        self.language = language.into();
        self.version = version;
    }

    /// Build a fresh runnable from the current language selection.
    pub fn runnable(&self, source: impl Into<String>) -> Runnable {
        Runnable::new(self.language.clone(), self.version.clone(), source)
    }

    /// `Idle -> Registering`. Refused, with no state change, while another run is active.
    pub fn begin(&mut self, runnable: &Runnable) -> Result<(), SessionError> {
        if self.phase != Phase::Idle {
            return Err(SessionError::AlreadyActive);
        }
        debug!(language = %runnable.language, "registering run");
        self.phase = Phase::Registering;
        Ok(())
    }

    /// `Registering -> Streaming`: the sink is cleared and stdin starts empty.
    pub fn registered(&mut self, token: SessionToken, sink: &mut dyn OutputSink) -> Result<(), SessionError> {
        if self.phase != Phase::Registering {
            return Err(SessionError::NotRegistering);
        }
        info!(token = %token, "run streaming");
        sink.clear();
        self.input.clear();
        self.phase = Phase::Streaming(token);
        Ok(())
    }

    /// `Registering -> Idle` after the registration call failed.
    pub fn registration_failed(&mut self) {
        if self.phase == Phase::Registering {
            self.phase = Phase::Idle;
        }
    }

    /// Apply one event of the output subscription belonging to `token`.
    pub fn handle(&mut self, token: &SessionToken, event: StreamEvent, sink: &mut dyn OutputSink) -> Handled {
        if self.token() != Some(token) {
            debug!(token = %token, "dropping event for a finished run");
            return Handled::Stale;
        }
        match event {
            StreamEvent::Chunk(chunk) => {
                sink.append(chunk.as_str());
                Handled::Appended
            }
            StreamEvent::End => {
                info!(token = %token, "run completed");
                self.finish(sink)
            }
            StreamEvent::Failed(reason) => {
                info!(token = %token, %reason, "output stream closed with an error");
                self.finish(sink)
            }
        }
    }

    fn finish(&mut self, sink: &mut dyn OutputSink) -> Handled {
        self.phase = Phase::Idle;
        self.input.clear();
        sink.completed();
        Handled::Completed
    }

    pub fn input(&self) -> &InputBuffer {
        &self.input
    }

    /// Typed characters only count while a run is streaming.
    pub fn type_char(&mut self, c: char) -> bool {
        if !self.is_running() {
            return false;
        }
        self.input.push(c);
        true
    }

    pub fn type_str(&mut self, text: &str) -> bool {
        if !self.is_running() {
            return false;
        }
        self.input.push_str(text);
        true
    }

    pub fn backspace(&mut self) -> bool {
        self.is_running() && self.input.backspace()
    }

    /// Extract the line to forward on a line-submit signal.
    pub fn submit_line(&mut self) -> Result<PendingInput, SessionError> {
        let token = self.token().cloned().ok_or(SessionError::NotRunning)?;
        let line = self.input.take_line();
        Ok(PendingInput { token, line })
    }
}
