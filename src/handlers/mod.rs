//! Subcommand handlers.

pub mod edit;
pub mod fetch;
pub mod langs;
pub mod run;
pub mod share;
