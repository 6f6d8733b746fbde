//! Client for a remote code runner: run programs with live output and
//! interactive stdin, share snapshots, and edit in a terminal UI.

pub mod cache;
pub mod cli;
pub mod config;
pub mod handlers;
pub mod languages;
pub mod printer;
pub mod session;
pub mod transport;
pub mod tui;
