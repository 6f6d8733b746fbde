//! Interactive editor built on Ratatui: source pane, live output, stdin line.

pub mod app;
pub mod editor;
pub mod events;
pub mod handler;
pub mod ui;

pub use handler::run_tui_editor;
