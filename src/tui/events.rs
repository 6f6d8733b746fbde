//! Events flowing into the TUI loop.

use crossterm::event::KeyEvent;

use crate::session::StreamEvent;
use crate::transport::{SessionToken, SnapshotId};

/// Everything the main loop reacts to. Network tasks never touch the
/// session directly; they report through these events.
#[derive(Debug)]
pub enum TuiEvent {
    /// User keyboard input
    Key(KeyEvent),
    /// Bracketed paste content
    Paste(String),
    /// Registration returned a token
    Registered(SessionToken),
    /// Registration failed before a token existed
    RegisterFailed(String),
    /// Output subscription event for the run named by `token`
    Stream { token: SessionToken, event: StreamEvent },
    /// A stdin line could not be delivered
    InputFailed(String),
    /// Snapshot stored under this id
    Saved(SnapshotId),
    SaveFailed(String),
}
